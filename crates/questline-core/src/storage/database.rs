//! SQLite-backed progress store.
//!
//! Every account/domain pair is one row holding the record as JSON text.
//! The connection sits behind a mutex so the store can be shared across
//! threads. [`ProgressStore::with_account`] runs inside a `BEGIN IMMEDIATE`
//! transaction, which holds SQLite's write lock for the whole unit of work,
//! so submissions from separate connections or processes on the same file
//! never interleave.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{data_dir, migrations, AccountWork, Domain, ProgressStore};
use crate::error::{CoreError, StoreError};

/// SQLite database for progression records.
pub struct ProgressDb {
    conn: Mutex<Connection>,
}

impl ProgressDb {
    /// Open the database at `~/.config/questline/progress.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("progress.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Accounts that have at least one stored record.
    pub fn accounts(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT account_id FROM progress_records ORDER BY account_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(row?);
        }
        Ok(accounts)
    }
}

fn read_record(
    conn: &Connection,
    account_id: &str,
    domain: &Domain,
) -> Result<Option<serde_json::Value>, StoreError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM progress_records WHERE account_id = ?1 AND domain = ?2",
            params![account_id, domain.key()],
            |row| row.get(0),
        )
        .optional()?;

    // Unparseable text is handed up as a JSON string so the caller's
    // corrupt-record handling applies to it like any other bad shape.
    Ok(raw.map(|text| serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))))
}

fn write_record(
    conn: &Connection,
    account_id: &str,
    domain: &Domain,
    value: &serde_json::Value,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO progress_records (account_id, domain, value, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(account_id, domain) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at",
        params![account_id, domain.key(), value.to_string(), Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// View of the database inside an open transaction.
struct AccountTx<'a> {
    conn: &'a Connection,
}

impl ProgressStore for AccountTx<'_> {
    fn get(&self, account_id: &str, domain: &Domain) -> Result<Option<serde_json::Value>, StoreError> {
        read_record(self.conn, account_id, domain)
    }

    fn set(&self, account_id: &str, domain: &Domain, value: &serde_json::Value) -> Result<(), StoreError> {
        write_record(self.conn, account_id, domain, value)
    }

    // Already exclusive.
    fn with_account(&self, _account_id: &str, work: &mut AccountWork<'_>) -> Result<(), CoreError> {
        work(self)
    }
}

impl ProgressStore for ProgressDb {
    fn get(&self, account_id: &str, domain: &Domain) -> Result<Option<serde_json::Value>, StoreError> {
        read_record(&*self.conn()?, account_id, domain)
    }

    fn set(&self, account_id: &str, domain: &Domain, value: &serde_json::Value) -> Result<(), StoreError> {
        write_record(&*self.conn()?, account_id, domain, value)
    }

    fn with_account(&self, account_id: &str, work: &mut AccountWork<'_>) -> Result<(), CoreError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        // Dropping `tx` on error rolls the unit of work back.
        work(&AccountTx { conn: &tx })?;
        tx.commit().map_err(StoreError::from)?;
        tracing::trace!(account_id, "account transaction committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn kv_roundtrip() {
        let db = ProgressDb::open_memory().unwrap();
        assert!(db.get("acc", &Domain::Xp).unwrap().is_none());
        db.set("acc", &Domain::Xp, &serde_json::json!({ "total_xp": 5 })).unwrap();
        db.set("acc", &Domain::Xp, &serde_json::json!({ "total_xp": 7 })).unwrap();
        assert_eq!(
            db.get("acc", &Domain::Xp).unwrap(),
            Some(serde_json::json!({ "total_xp": 7 }))
        );
        assert_eq!(db.accounts().unwrap(), vec!["acc".to_string()]);
    }

    #[test]
    fn garbage_text_comes_back_as_string() {
        let db = ProgressDb::open_memory().unwrap();
        db.conn()
            .unwrap()
            .execute(
                "INSERT INTO progress_records (account_id, domain, value) VALUES ('acc', 'xp', 'not json')",
                [],
            )
            .unwrap();
        assert_eq!(
            db.get("acc", &Domain::Xp).unwrap(),
            Some(serde_json::Value::String("not json".into()))
        );
    }

    #[test]
    fn records_persist_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.db");
        {
            let db = ProgressDb::open_at(&path).unwrap();
            db.set("acc", &Domain::Skill("leadership".into()), &serde_json::json!({ "level": 2 }))
                .unwrap();
        }
        let db = ProgressDb::open_at(&path).unwrap();
        assert_eq!(
            db.get("acc", &Domain::Skill("leadership".into())).unwrap(),
            Some(serde_json::json!({ "level": 2 }))
        );
    }

    #[test]
    fn failed_unit_of_work_is_rolled_back() {
        let db = ProgressDb::open_memory().unwrap();
        db.set("acc", &Domain::Xp, &serde_json::json!(1)).unwrap();

        let result = db.with_account("acc", &mut |store| {
            store.set("acc", &Domain::Xp, &serde_json::json!(2))?;
            store.set("acc", &Domain::Badges, &serde_json::json!([]))?;
            Err(StoreError::Backend("disk full".into()).into())
        });
        assert!(matches!(result, Err(CoreError::StoreUnavailable(StoreError::Backend(_)))));
        assert_eq!(db.get("acc", &Domain::Xp).unwrap(), Some(serde_json::json!(1)));
        assert!(db.get("acc", &Domain::Badges).unwrap().is_none());
    }

    #[test]
    fn connections_on_one_file_take_turns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.db");
        ProgressDb::open_at(&path).unwrap();

        let increment = |path: std::path::PathBuf| {
            std::thread::spawn(move || {
                let db = ProgressDb::open_at(&path).unwrap();
                for _ in 0..20 {
                    db.with_account("acc", &mut |store| {
                        let n = store
                            .get("acc", &Domain::Xp)?
                            .and_then(|v| v.as_u64())
                            .unwrap_or(0);
                        std::thread::sleep(std::time::Duration::from_millis(1));
                        store.set("acc", &Domain::Xp, &serde_json::json!(n + 1))?;
                        Ok(())
                    })
                    .unwrap();
                }
            })
        };
        let a = increment(path.clone());
        let b = increment(path.clone());
        a.join().unwrap();
        b.join().unwrap();

        let db = ProgressDb::open_at(&path).unwrap();
        assert_eq!(db.get("acc", &Domain::Xp).unwrap(), Some(serde_json::json!(40)));
    }

    #[test]
    fn open_at_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no").join("such").join("dir").join("progress.db");
        assert!(matches!(ProgressDb::open_at(&path), Err(StoreError::OpenFailed { .. })));
    }
}
