use std::path::Path;

pub fn run(account: &str, db: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::open_service(db)?;
    let snapshot = service.get_snapshot(account)?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
