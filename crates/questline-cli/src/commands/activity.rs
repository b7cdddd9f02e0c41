use clap::Subcommand;
use questline_core::ActivityType;
use serde::Serialize;
use std::path::Path;

#[derive(Subcommand)]
pub enum ActivityAction {
    /// Record an activity and print the resulting snapshot
    Submit {
        /// Account id
        account: String,
        /// Activity type (e.g. "chat_message", "daily_login")
        activity_type: String,
    },
    /// List activity types and the XP each one grants
    Types,
}

#[derive(Serialize)]
struct TypeRow<'a> {
    activity_type: &'a str,
    xp: Option<u64>,
    skill: Option<&'a str>,
}

pub fn run(action: ActivityAction, db: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::open_service(db)?;

    match action {
        ActivityAction::Submit {
            account,
            activity_type,
        } => {
            let snapshot = service.submit_activity_named(&account, &activity_type)?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        ActivityAction::Types => {
            let config = service.config();
            let rows: Vec<TypeRow> = ActivityType::ALL
                .iter()
                .map(|t| TypeRow {
                    activity_type: t.as_str(),
                    xp: config.xp_for(*t),
                    skill: config.skill_for(*t),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}
