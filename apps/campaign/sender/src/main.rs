//! Campaign Sender
//!
//! Sends a bulk vendor email campaign through a rotating pool of SMTP
//! accounts, resuming from the last checkpoint after an interruption, and
//! reports the number of sent emails to the activity backend.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{EnvFile, FromSource};
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use tracing::info;

mod campaign;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "campaign-sender")]
#[command(about = "Send a bulk email campaign with account rotation and resumable progress")]
struct Cli {
    /// Configuration file; the activity API token is written back here after login
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the campaign from the saved checkpoint (default)
    Send,

    /// Show checkpoint and recipient counts
    Status,

    /// Overwrite the checkpoint
    Reset {
        /// Index of the next recipient to send to
        #[arg(short, long, default_value_t = 0)]
        index: usize,
    },

    /// Log in to the activity API and save the token
    Login,

    /// Verify the activity job type exists, creating it when missing
    JobType,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();

    let env_file = EnvFile::load(&cli.env_file)
        .wrap_err_with(|| format!("Failed to load {}", cli.env_file.display()))?;
    let config = Config::from_source(&env_file)?;
    init_tracing(&config.environment, Some(&config.log_dir));

    match cli.command.unwrap_or(Commands::Send) {
        Commands::Send => campaign::send(&config, env_file).await?,

        Commands::Status => {
            let status = campaign::status(&config)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }

        Commands::Reset { index } => campaign::reset(&config, index)?,

        Commands::Login => {
            campaign::login(&config, env_file).await?;
            info!(env_file = %cli.env_file.display(), "Activity API token saved");
        }

        Commands::JobType => {
            let id = campaign::ensure_job_type(&config, env_file).await?;
            println!("{}", id);
        }
    }

    Ok(())
}
