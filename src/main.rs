// Entry point for the daily exchange session loader.
// Hand-off buffer client.
mod buffer;
// Process configuration.
mod config;
// module storing defaults
mod constants;
// Record deduplication.
mod dedupe;
// Document parsing and filtering.
mod extract;
// Session archive download.
mod fetch;
// HTTP client module.
mod http {
    // HTTP client implementation.
    pub mod client;
}
// Data models.
mod model;
// Stage orchestration.
mod pipeline;
// Per-run working area.
mod run_context;
// Data storage module.
mod store {
    /// Session record storage.
    pub mod records;
    /// SQLite database interaction.
    pub mod sqlite;
}
// Two-stage archive extraction.
mod unpack;

use std::io::Write;

use clap::{Parser, Subcommand};
use dotenv::dotenv;

// Command-line argument parser.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

// Subcommands for the application.
#[derive(Subcommand, Debug)]
enum Commands {
    // Download the session archive and stage the document in the buffer.
    Stage {
        date: Option<String>,
    },
    // Load the staged document into the store.
    Load {
        date: Option<String>,
    },
    // Stage and load in one invocation; the scheduled daily entry point.
    Run {
        date: Option<String>,
    },
    // Print a JSON summary of the store.
    Status,
    // Export one session's rows as CSV, to a file or stdout.
    Export {
        date: Option<String>,
        output: Option<String>,
    },
}

// Resolves the target session date: an explicit YYYY-MM-DD argument or the
// previous session day.
fn session_date(arg: Option<String>) -> model::Result<chrono::NaiveDate> {
    match arg {
        Some(text) => chrono::NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map_err(|_| model::PregaoError::InvalidDate(text)),
        None => Ok(pipeline::default_session_date()),
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    env_logger::init();

    let args = Args::parse();

    // All configuration is mandatory; a misconfigured process must not get
    // anywhere near the pipeline.
    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("invalid configuration: {}", err);
            std::process::exit(2);
        }
    };

    if let Err(err) = dispatch(args.command, &config).await {
        log::error!("run failed: {}", err);
        std::process::exit(1);
    }
}

async fn dispatch(command: Commands, config: &config::Config) -> model::Result<()> {
    match command {
        Commands::Stage { date } => {
            let date = session_date(date)?;
            match pipeline::stage(config, date).await? {
                Some(staged) => log::info!("staged {}", staged.object_name),
                None => log::warn!("nothing staged for {}", date),
            }
        }

        Commands::Load { date } => {
            let date = session_date(date)?;
            let mut conn = store::sqlite::init_connection(&config.sqlite_file)?;
            pipeline::load(config, &mut conn, date)?;
        }

        Commands::Run { date } => {
            let date = session_date(date)?;
            let mut conn = store::sqlite::init_connection(&config.sqlite_file)?;
            match pipeline::run(config, &mut conn, date).await? {
                Some(_) => log::info!("session {} run complete", date),
                None => log::warn!("no data for session {}, run skipped", date),
            }
        }

        Commands::Status => {
            let conn = store::sqlite::init_connection(&config.sqlite_file)?;
            let summary = store::records::summary(&conn)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Export { date, output } => {
            let date = session_date(date)?;
            let conn = store::sqlite::init_connection(&config.sqlite_file)?;
            let rows = store::records::session_rows(&conn, &date.to_string())?;
            let csv = model::rows_to_csv_vec(&rows)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)?;
                    log::info!("exported {} rows to {}", rows.len(), path);
                }
                None => std::io::stdout().write_all(&csv)?,
            }
        }
    }
    Ok(())
}
