//! Patchlog CLI
//!
//! Inspect and roll back document history kept in a SQLite store

use clap::{Parser, Subcommand};
use patchlog_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "patchlog")]
#[command(about = "Patchlog - document patch history", long_about = None)]
struct Cli {
    /// Emit debug logs on stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a document's patches, oldest first
    Log(commands::log::LogArgs),
    /// Print the document as it was after a patch
    Show(commands::show::ShowArgs),
    /// Roll a document back to a patch
    Rollback(commands::rollback::RollbackArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if cli.verbose {
        init(Profile::Development);
    }

    let result = match cli.command {
        Commands::Log(args) => commands::log::execute(args).await,
        Commands::Show(args) => commands::show::execute(args).await,
        Commands::Rollback(args) => commands::rollback::execute(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
