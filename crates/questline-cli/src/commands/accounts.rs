use std::path::Path;

/// Print the accounts that have stored progress.
pub fn run(db: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::open_service(db)?;
    let accounts = service.store().accounts()?;
    println!("{}", serde_json::to_string_pretty(&accounts)?);
    Ok(())
}
