pub mod accounts;
pub mod activity;
pub mod badges;
pub mod config;
pub mod snapshot;

use questline_core::{EngineConfig, ProgressDb, ProgressionService};
use std::path::Path;

/// Load the config and open the progress database.
pub fn open_service(
    db: Option<&Path>,
) -> Result<ProgressionService<ProgressDb>, Box<dyn std::error::Error>> {
    let config = EngineConfig::load()?;
    let store = match db {
        Some(path) => ProgressDb::open_at(path)?,
        None => ProgressDb::open()?,
    };
    Ok(ProgressionService::new(store, config)?)
}
