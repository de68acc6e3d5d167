//! Type-safe configuration choices for stakehost
//!
//! This module replaces stringly-typed client/network selections with proper
//! Rust enums that provide compile-time validation and exhaustive matching.
//! Docker image references and P2P port tables live here as data attached to
//! the client enums.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Target Ethereum network.
///
/// Serialized names match the `--chain` values expected by the
/// staking-deposit-cli.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    #[strum(serialize = "mainnet")]
    Mainnet,
    #[strum(serialize = "holesky")]
    Holesky,
    #[strum(serialize = "hoodi")]
    Hoodi,
    #[strum(serialize = "sepolia")]
    Sepolia,
}

impl Network {
    /// Returns true for networks whose deposits move real ETH.
    pub fn is_mainnet(self) -> bool {
        matches!(self, Self::Mainnet)
    }
}

/// Execution client selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExecutionClient {
    #[default]
    #[strum(serialize = "geth")]
    Geth,
    #[strum(serialize = "erigon")]
    Erigon,
    #[strum(serialize = "nethermind")]
    Nethermind,
}

impl ExecutionClient {
    /// Docker image reference for this client.
    pub fn image(self) -> &'static str {
        match self {
            Self::Geth => "ethereum/client-go:stable",
            Self::Erigon => "erigontech/erigon:latest",
            Self::Nethermind => "nethermind/nethermind:latest",
        }
    }

    /// P2P ports this client listens on. Only these are opened in the
    /// firewall when the client is selected.
    pub fn p2p_ports(self) -> &'static [PortRule] {
        const DEVP2P: &[PortRule] = &[
            PortRule::new(30303, Protocol::Tcp),
            PortRule::new(30303, Protocol::Udp),
        ];
        // Erigon adds the snapshot/torrent port on top of devp2p
        const DEVP2P_TORRENT: &[PortRule] = &[
            PortRule::new(30303, Protocol::Tcp),
            PortRule::new(30303, Protocol::Udp),
            PortRule::new(42069, Protocol::Tcp),
            PortRule::new(42069, Protocol::Udp),
        ];

        match self {
            Self::Geth | Self::Nethermind => DEVP2P,
            Self::Erigon => DEVP2P_TORRENT,
        }
    }
}

/// Consensus (beacon) client selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConsensusClient {
    #[default]
    #[strum(serialize = "lighthouse")]
    Lighthouse,
    #[strum(serialize = "prysm")]
    Prysm,
    #[strum(serialize = "teku")]
    Teku,
}

impl ConsensusClient {
    /// Docker image reference for the beacon node.
    pub fn image(self) -> &'static str {
        match self {
            Self::Lighthouse => "sigp/lighthouse:latest",
            Self::Prysm => "gcr.io/prysmaticlabs/prysm/beacon-chain:stable",
            Self::Teku => "consensys/teku:latest",
        }
    }

    /// Docker image reference for the validator client. Lighthouse and Teku
    /// ship both roles in one image; Prysm splits them.
    pub fn validator_image(self) -> &'static str {
        match self {
            Self::Lighthouse => "sigp/lighthouse:latest",
            Self::Prysm => "gcr.io/prysmaticlabs/prysm/validator:stable",
            Self::Teku => "consensys/teku:latest",
        }
    }

    /// P2P ports the beacon node listens on.
    pub fn p2p_ports(self) -> &'static [PortRule] {
        const LIBP2P: &[PortRule] = &[
            PortRule::new(9000, Protocol::Tcp),
            PortRule::new(9000, Protocol::Udp),
        ];
        const PRYSM_P2P: &[PortRule] = &[
            PortRule::new(13000, Protocol::Tcp),
            PortRule::new(12000, Protocol::Udp),
        ];

        match self {
            Self::Lighthouse | Self::Teku => LIBP2P,
            Self::Prysm => PRYSM_P2P,
        }
    }
}

/// How validator key material is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    /// Generate a fresh mnemonic and derive new keys
    #[strum(serialize = "new")]
    New,
    /// Copy an existing validator_keys backup into place
    #[strum(serialize = "import")]
    Import,
    /// Re-derive keys from an existing seed phrase
    #[strum(serialize = "restore")]
    Restore,
}

/// Transport protocol for a firewall rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    #[strum(serialize = "tcp")]
    Tcp,
    #[strum(serialize = "udp")]
    Udp,
}

/// A single port/protocol pair to open in the packet filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRule {
    pub port: u16,
    pub protocol: Protocol,
}

impl PortRule {
    pub const fn new(port: u16, protocol: Protocol) -> Self {
        Self { port, protocol }
    }

    /// `ufw` rule argument, e.g. `30303/tcp`.
    pub fn to_ufw_arg(self) -> String {
        format!("{}/{}", self.port, self.protocol)
    }
}

/// Node roles provisioned on the host. One OS account and one launcher
/// script exist per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum NodeRole {
    #[strum(serialize = "execution")]
    Execution,
    #[strum(serialize = "consensus")]
    Consensus,
    #[strum(serialize = "validator")]
    Validator,
}

impl NodeRole {
    /// OS account name for this role.
    pub fn account_name(self) -> &'static str {
        match self {
            Self::Execution => "execution",
            Self::Consensus => "consensus",
            Self::Validator => "validator",
        }
    }

    /// Launcher script filename for this role.
    pub fn launcher_name(self) -> &'static str {
        match self {
            Self::Execution => "start_execution.sh",
            Self::Consensus => "start_consensus.sh",
            Self::Validator => "start_validator.sh",
        }
    }

    /// All roles in pipeline order.
    pub const fn all() -> &'static [Self] {
        &[Self::Execution, Self::Consensus, Self::Validator]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_network_roundtrip() {
        for network in Network::iter() {
            let s = network.to_string();
            assert_eq!(Network::from_str(&s).unwrap(), network);
        }
        assert_eq!(Network::from_str("mainnet").unwrap(), Network::Mainnet);
    }

    #[test]
    fn test_execution_ports_geth() {
        let ports = ExecutionClient::Geth.p2p_ports();
        assert_eq!(ports.len(), 2);
        assert!(ports.contains(&PortRule::new(30303, Protocol::Tcp)));
        assert!(ports.contains(&PortRule::new(30303, Protocol::Udp)));
    }

    #[test]
    fn test_erigon_ports_extend_devp2p() {
        let erigon = ExecutionClient::Erigon.p2p_ports();
        for rule in ExecutionClient::Geth.p2p_ports() {
            assert!(erigon.contains(rule));
        }
        assert!(erigon.contains(&PortRule::new(42069, Protocol::Tcp)));
        assert!(erigon.contains(&PortRule::new(42069, Protocol::Udp)));
    }

    #[test]
    fn test_consensus_ports_prysm() {
        let ports = ConsensusClient::Prysm.p2p_ports();
        assert!(ports.contains(&PortRule::new(13000, Protocol::Tcp)));
        assert!(ports.contains(&PortRule::new(12000, Protocol::Udp)));
        assert_eq!(ports.len(), 2);
    }

    #[test]
    fn test_port_rule_ufw_arg() {
        assert_eq!(PortRule::new(9000, Protocol::Udp).to_ufw_arg(), "9000/udp");
        assert_eq!(PortRule::new(30303, Protocol::Tcp).to_ufw_arg(), "30303/tcp");
    }

    #[test]
    fn test_prysm_has_split_validator_image() {
        assert_ne!(
            ConsensusClient::Prysm.image(),
            ConsensusClient::Prysm.validator_image()
        );
        assert_eq!(
            ConsensusClient::Lighthouse.image(),
            ConsensusClient::Lighthouse.validator_image()
        );
    }

    #[test]
    fn test_role_names() {
        assert_eq!(NodeRole::Execution.launcher_name(), "start_execution.sh");
        assert_eq!(NodeRole::Validator.account_name(), "validator");
        assert_eq!(NodeRole::all().len(), 3);
    }

    #[test]
    fn test_key_source_parse() {
        assert_eq!(KeySource::from_str("import").unwrap(), KeySource::Import);
        assert!(KeySource::from_str("bogus").is_err());
    }
}
