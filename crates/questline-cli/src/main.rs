use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "questline", version, about = "Questline progression CLI")]
struct Cli {
    /// Progress database (defaults to ~/.config/questline/progress.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit activities
    Activity {
        #[command(subcommand)]
        action: commands::activity::ActivityAction,
    },
    /// Show an account's progress
    Snapshot {
        /// Account id
        account: String,
    },
    /// List the badge catalog
    Badges,
    /// List accounts with stored progress
    Accounts,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let db = cli.db.as_deref();
    let result = match cli.command {
        Commands::Activity { action } => commands::activity::run(action, db),
        Commands::Snapshot { account } => commands::snapshot::run(&account, db),
        Commands::Badges => commands::badges::run(db),
        Commands::Accounts => commands::accounts::run(db),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
