//! Installation configuration: the single object every pipeline step reads.
//!
//! Built once from interactive prompts or a JSON file, validated, then passed
//! immutably to provisioning, key generation, templating and integration.
//! This replaces the free-floating `$main_user`/`$INSTALL_PATH`-style ambient
//! state with an explicit value.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{ConsensusClient, ExecutionClient, Network};

/// Shared secrets group: every role account is a member, and the JWT secret
/// and validator keystores are group-owned by it.
pub const SHARED_GROUP: &str = "stakenode";

/// Docker-capable group launcher scripts are owned by.
pub const DOCKER_GROUP: &str = "docker";

/// Maximum graffiti length accepted by the clients (bytes).
pub const MAX_GRAFFITI_BYTES: usize = 32;

/// Installation configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Root directory for node data, secrets and launcher scripts
    pub install_path: PathBuf,
    /// Target network (mainnet, holesky, ...)
    pub network: Network,
    /// Execution layer client
    pub execution_client: ExecutionClient,
    /// Consensus layer client (also supplies the validator image)
    pub consensus_client: ConsensusClient,
    /// Withdrawal address handed to the deposit CLI (`0x` + 40 hex chars)
    pub withdrawal_address: String,
    /// Fee recipient address baked into the launchers (`0x` + 40 hex chars)
    pub fee_recipient: String,
    /// Block graffiti (may be empty, at most 32 bytes)
    pub graffiti: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            install_path: PathBuf::from("/opt/stakehost"),
            network: Network::default(),
            execution_client: ExecutionClient::default(),
            consensus_client: ConsensusClient::default(),
            withdrawal_address: String::new(),
            fee_recipient: String::new(),
            graffiti: String::new(),
        }
    }
}

impl InstallConfig {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.install_path.as_os_str().is_empty() {
            anyhow::bail!("Install path must be specified");
        }
        if !self.install_path.is_absolute() {
            anyhow::bail!("Install path must be absolute (got {:?})", self.install_path);
        }

        if !is_valid_eth_address(&self.withdrawal_address) {
            anyhow::bail!(
                "Withdrawal address must be 0x followed by 40 hex characters (got {:?})",
                self.withdrawal_address
            );
        }
        if !is_valid_eth_address(&self.fee_recipient) {
            anyhow::bail!(
                "Fee recipient must be 0x followed by 40 hex characters (got {:?})",
                self.fee_recipient
            );
        }

        if self.graffiti.len() > MAX_GRAFFITI_BYTES {
            anyhow::bail!(
                "Graffiti must be at most {} bytes (got {})",
                MAX_GRAFFITI_BYTES,
                self.graffiti.len()
            );
        }

        Ok(())
    }

    /// Directory the deposit CLI populates with keystores.
    pub fn validator_keys_dir(&self) -> PathBuf {
        self.install_path.join("validator_keys")
    }

    /// Path of the execution<->consensus JWT secret.
    pub fn jwt_path(&self) -> PathBuf {
        self.install_path.join("jwt.hex")
    }
}

/// Check an Ethereum address literal: `0x` followed by exactly 40 hex digits.
///
/// This is the gate the interactive prompt loops on; nothing downstream ever
/// sees an address that fails it.
pub fn is_valid_eth_address(addr: &str) -> bool {
    let Some(hex) = addr.strip_prefix("0x") else {
        return false;
    };
    hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}
