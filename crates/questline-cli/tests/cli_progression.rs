//! CLI E2E tests for activity submission and snapshots.
//!
//! Each test runs the built binary against its own HOME and database.

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let db = home.join("progress.db");
    let output = Command::new(env!("CARGO_BIN_EXE_questline"))
        .env("HOME", home)
        .env_remove("QUESTLINE_ENV")
        .env_remove("RUST_LOG")
        .arg("--db")
        .arg(&db)
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(home: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn submit_chat_message() {
    let home = TempDir::new().unwrap();
    let snap = run_json(home.path(), &["activity", "submit", "kid-1", "chat_message"]);

    assert_eq!(snap["account_id"], "kid-1");
    assert_eq!(snap["activity_type"], "chat_message");
    assert_eq!(snap["xp_earned"], 2);
    assert_eq!(snap["total_xp"], 2);
    assert_eq!(snap["leveled_up"], false);
    assert_eq!(snap["streak"]["current_streak"], 1);
    let badges: Vec<&str> = snap["new_badges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert!(badges.contains(&"chatterbox"));
}

#[test]
fn snapshot_reflects_submissions() {
    let home = TempDir::new().unwrap();
    run_json(home.path(), &["activity", "submit", "kid-2", "first_chat"]);
    run_json(home.path(), &["activity", "submit", "kid-2", "chat_message"]);

    let view = run_json(home.path(), &["snapshot", "kid-2"]);
    assert_eq!(view["xp_record"]["total_xp"], 12);
    assert_eq!(view["recent_activities"].as_array().unwrap().len(), 2);
    assert_eq!(view["recent_activities"][0]["activity_type"], "chat_message");
    assert_eq!(view["skills"].as_array().unwrap().len(), 3);
    assert_eq!(view["next_badges"].as_array().unwrap().len(), 3);

    let accounts = run_json(home.path(), &["accounts"]);
    assert_eq!(accounts, serde_json::json!(["kid-2"]));
}

#[test]
fn unknown_activity_type_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["activity", "submit", "kid-3", "cartwheel"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Unknown activity type: cartwheel"), "{stderr}");

    let accounts = run_json(home.path(), &["accounts"]);
    assert_eq!(accounts, serde_json::json!([]));
}

#[test]
fn badge_catalog_and_activity_types() {
    let home = TempDir::new().unwrap();
    let badges = run_json(home.path(), &["badges"]);
    let badges = badges.as_array().unwrap();
    assert!(badges.iter().any(|b| b["id"] == "daily_dedication"
        && b["requirement"]["type"] == "streak"
        && b["requirement"]["value"] == 7));

    let types = run_json(home.path(), &["activity", "types"]);
    let chat = types
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["activity_type"] == "chat_message")
        .unwrap();
    assert_eq!(chat["xp"], 2);
    assert_eq!(chat["skill"], "communication");
}
