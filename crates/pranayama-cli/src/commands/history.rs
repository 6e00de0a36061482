use std::path::PathBuf;

use clap::Subcommand;
use pranayama_core::{Backup, Database};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Recorded sessions, newest first
    List {
        /// Show at most this many sessions
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Totals over all recorded sessions
    Stats,
    /// Delete all recorded sessions
    Clear,
    /// Write history and presets as a JSON backup
    Export {
        /// Output file (stdout when omitted)
        path: Option<PathBuf>,
    },
    /// Replace history and presets with a JSON backup
    Import {
        /// Backup file
        path: PathBuf,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;

    match action {
        HistoryAction::List { limit } => {
            let mut sessions = db.list_sessions()?;
            if let Some(limit) = limit {
                sessions.truncate(limit);
            }
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        HistoryAction::Stats => {
            let totals = db.history_totals()?;
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }
        HistoryAction::Clear => {
            let removed = db.clear_sessions()?;
            println!("{removed} sessions removed");
        }
        HistoryAction::Export { path } => {
            let backup = db.export_backup()?;
            match path {
                Some(path) => {
                    backup.write_to(&path)?;
                    eprintln!("backup written to {}", path.display());
                }
                None => println!("{}", backup.to_json()?),
            }
        }
        HistoryAction::Import { path } => {
            let backup = Backup::read_from(&path)?;
            db.import_backup(&backup)?;
            println!(
                "imported {} sessions and {} presets",
                backup.history.len(),
                backup.presets.len()
            );
        }
    }
    Ok(())
}
