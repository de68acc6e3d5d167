use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// stakehost - provisions a Linux host as an Ethereum staking node
#[derive(Parser)]
#[command(name = "stakehost")]
#[command(about = "An interactive installer for Docker-based Ethereum staking nodes")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: show what would be executed without making changes.
    ///
    /// Mutating commands (useradd, ufw, crontab, docker) and file writes are
    /// logged and skipped. Read-only probes still execute so the preview is
    /// realistic.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full installation pipeline
    Install {
        /// Path to a configuration file to use (skips prompts, headless mode)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Collect the configuration interactively, save it to file and exit
        #[arg(long)]
        save_config: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
    /// Obtain validator key material (individual access to the key flows)
    Keys {
        #[command(subcommand)]
        key_command: KeyCommands,
    },
    /// Run individual integration steps
    Tools {
        #[command(subcommand)]
        tool: ToolCommands,
    },
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Generate keys from a fresh mnemonic
    New {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Number of validators to derive
        #[arg(short, long, default_value = "1")]
        num_validators: u32,
    },
    /// Import an existing validator_keys backup
    Import {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Backup directory to copy keys from
        #[arg(short, long)]
        source: PathBuf,
    },
    /// Restore keys from an existing mnemonic
    Restore {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// First validator index to re-derive
        #[arg(long, default_value = "0")]
        start_index: u32,
        /// Number of validators to re-derive
        #[arg(short, long, default_value = "1")]
        num_validators: u32,
    },
}

#[derive(Subcommand)]
pub enum ToolCommands {
    /// Open the firewall ports for the configured client pair
    Firewall {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Register @reboot crontab entries for the launcher scripts
    Cron {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create desktop shortcuts for the launcher scripts
    Shortcuts {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Generate the execution<->consensus JWT secret
    Jwt {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
