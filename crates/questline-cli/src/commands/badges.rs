use std::path::Path;

/// Print the configured badge catalog.
pub fn run(db: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::open_service(db)?;
    println!("{}", serde_json::to_string_pretty(&service.config().badges)?);
    Ok(())
}
