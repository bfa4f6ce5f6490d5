//! pkgctl - CLI for installing packages and managing package repositories
//!
//! Each command submits intent to the packaging controller and, by default,
//! polls the affected resource until reconciliation reaches a terminal state.

use anyhow::Result;
use clap::{Parser, Subcommand};

use pkgctl::cli::{
    handle_installed_command, handle_repository_command, init_logging, InstalledCommand,
    RepositoryCommand,
};

/// CLI for installing packages and managing package repositories
#[derive(Parser, Debug)]
#[command(name = "pkgctl")]
#[command(about = "Install packages and manage package repositories on a cluster", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Manage installed packages
    Installed {
        #[command(subcommand)]
        subcommand: InstalledCommand,
    },
    /// Manage package repositories
    Repository {
        #[command(subcommand)]
        subcommand: RepositoryCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    match args.command {
        Command::Installed { subcommand } => handle_installed_command(subcommand).await,
        Command::Repository { subcommand } => handle_repository_command(subcommand).await,
    }
}
