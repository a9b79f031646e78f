//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, CredentialFlags, OutputFlags};
use crate::commands;

/// Bootstrap and tear down cloud environments with a BOSH director
#[derive(Parser)]
#[command(
    name = "envboot",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Directory holding the environment state
    #[arg(long, global = true, env = "ENVBOOT_STATE_DIR", default_value = ".")]
    pub state_dir: PathBuf,

    /// AWS named profile recorded in the environment state
    #[arg(long, global = true, env = "AWS_PROFILE")]
    pub aws_profile: Option<String>,

    /// AWS region recorded in the environment state
    #[arg(long, global = true, env = "AWS_REGION")]
    pub aws_region: Option<String>,

    /// Suppress progress output; warnings and errors still print
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or update the environment
    Up(commands::up::UpArgs),

    /// Remove the environment's load balancers
    DeleteLbs(commands::delete_lbs::DeleteLbsArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            state_dir,
            aws_profile,
            aws_region,
            quiet,
            no_color,
            debug: _,
            command,
        } = self;

        if let Command::Version = command {
            commands::version::run();
            return Ok(());
        }

        let app = AppContext::new(AppFlags {
            output: OutputFlags { no_color, quiet },
            state_dir,
            credentials: CredentialFlags {
                profile: aws_profile.filter(|p| !p.is_empty()),
                region: aws_region.filter(|r| !r.is_empty()),
            },
        })?;

        match command {
            Command::Up(args) => commands::up::run(&args, &app).await,
            Command::DeleteLbs(args) => commands::delete_lbs::run(&args, &app).await,
            Command::Version => Ok(()),
        }
    }
}
