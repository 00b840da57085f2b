//! Stockroom CLI - Staff management and stock reports.
//!
//! # Usage
//!
//! ```bash
//! # Invite a staff member (random temporary password)
//! stockroom-cli invite -e lager@example.com
//!
//! # Invite with a custom confirmation landing page
//! stockroom-cli invite -e lager@example.com --redirect-to https://lager.example.com/login
//!
//! # Print stock totals as a staff member (password from STOCKROOM_PASSWORD)
//! stockroom-cli report -e lager@example.com
//! ```
//!
//! # Commands
//!
//! - `invite` - Sign up a staff user through Supabase Auth
//! - `report` - Load the dashboard catalog and print the tracked totals

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "stockroom-cli")]
#[command(author, version, about = "Stockroom CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invite a staff member
    Invite {
        /// Staff email address
        #[arg(short, long)]
        email: String,

        /// Where the confirmation email should land
        #[arg(long)]
        redirect_to: Option<String>,
    },
    /// Print stock totals
    Report {
        /// Staff email address to sign in as
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Invite { email, redirect_to } => {
            commands::invite::invite(&email, redirect_to.as_deref()).await
        }
        Commands::Report { email } => commands::report::report(&email).await,
    }
}
