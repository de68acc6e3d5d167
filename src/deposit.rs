//! Type-safe arguments for the external staking-deposit-cli.
//!
//! The deposit CLI is an opaque collaborator with a fixed command contract:
//!
//! ```text
//! deposit.sh new-mnemonic      --chain=<network> --folder=<path> --eth1_withdrawal_address=<addr>
//! deposit.sh existing-mnemonic --chain=<network> --folder=<path> --eth1_withdrawal_address=<addr> \
//!                              --validator_start_index=<n> --num_validators=<n>
//! ```
//!
//! Structs implementing [`DepositCliArgs`] are the single source of truth for
//! those flags; flag mismatches are caught at compile time instead of at
//! 2 a.m. on a staking host.

use crate::config::InstallConfig;
use crate::error::Result;
use crate::runner::{run_interactive, CommandOutput};
use crate::types::Network;
use std::path::PathBuf;
use tracing::info;

/// Environment override for the deposit CLI location.
pub const DEPOSIT_CLI_ENV: &str = "STAKEHOST_DEPOSIT_CLI";

/// Trait for typed deposit CLI invocations.
///
/// `to_cli_args()` must return the flags exactly as the tool's argument
/// parser expects them.
pub trait DepositCliArgs {
    /// The deposit CLI subcommand (`new-mnemonic` or `existing-mnemonic`).
    fn subcommand(&self) -> &'static str;

    /// Convert struct fields to CLI arguments.
    fn to_cli_args(&self) -> Vec<String>;
}

/// Arguments for `deposit.sh new-mnemonic` (fresh key generation).
#[derive(Debug, Clone)]
pub struct NewMnemonicArgs {
    /// Target chain.
    pub chain: Network,
    /// Folder the tool populates with `validator_keys/`.
    pub folder: PathBuf,
    /// Withdrawal address baked into the deposit data.
    pub withdrawal_address: String,
    /// Number of validators to derive.
    pub num_validators: u32,
}

impl DepositCliArgs for NewMnemonicArgs {
    fn subcommand(&self) -> &'static str {
        "new-mnemonic"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            format!("--chain={}", self.chain),
            format!("--folder={}", self.folder.display()),
            format!("--eth1_withdrawal_address={}", self.withdrawal_address),
            format!("--num_validators={}", self.num_validators),
        ]
    }
}

/// Arguments for `deposit.sh existing-mnemonic` (restore from seed phrase).
#[derive(Debug, Clone)]
pub struct ExistingMnemonicArgs {
    /// Target chain.
    pub chain: Network,
    /// Folder the tool populates with `validator_keys/`.
    pub folder: PathBuf,
    /// Withdrawal address baked into the deposit data.
    pub withdrawal_address: String,
    /// First validator index to re-derive.
    pub validator_start_index: u32,
    /// Number of validators to re-derive.
    pub num_validators: u32,
}

impl DepositCliArgs for ExistingMnemonicArgs {
    fn subcommand(&self) -> &'static str {
        "existing-mnemonic"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            format!("--chain={}", self.chain),
            format!("--folder={}", self.folder.display()),
            format!("--eth1_withdrawal_address={}", self.withdrawal_address),
            format!("--validator_start_index={}", self.validator_start_index),
            format!("--num_validators={}", self.num_validators),
        ]
    }
}

/// Resolve the deposit CLI launcher path: the `STAKEHOST_DEPOSIT_CLI`
/// environment variable, or `<install_path>/staking-deposit-cli/deposit.sh`.
pub fn deposit_cli_path(config: &InstallConfig) -> PathBuf {
    resolve_cli_path(
        std::env::var_os(DEPOSIT_CLI_ENV).map(PathBuf::from),
        config,
    )
}

fn resolve_cli_path(override_path: Option<PathBuf>, config: &InstallConfig) -> PathBuf {
    override_path.unwrap_or_else(|| {
        config
            .install_path
            .join("staking-deposit-cli")
            .join("deposit.sh")
    })
}

/// Run the deposit CLI with typed arguments.
///
/// Runs with inherited stdio: the tool prompts for the mnemonic and keystore
/// password directly, and those must never pass through this process.
pub fn run_deposit_cli<T: DepositCliArgs>(
    config: &InstallConfig,
    args: &T,
) -> Result<CommandOutput> {
    let tool = deposit_cli_path(config);
    let cli_args = args.to_cli_args();

    info!(
        "Running deposit CLI: {} {} {}",
        tool.display(),
        args.subcommand(),
        cli_args.join(" ")
    );

    let mut argv: Vec<&str> = vec![args.subcommand()];
    argv.extend(cli_args.iter().map(|s| s.as_str()));

    let tool_str = tool.to_string_lossy();
    run_interactive(&tool_str, &argv)
}
