//! Configuration persistence and address-gate behaviour.

use proptest::prelude::*;
use stakehost::config::{is_valid_eth_address, InstallConfig, MAX_GRAFFITI_BYTES};
use stakehost::types::{ConsensusClient, ExecutionClient, Network};
use std::path::PathBuf;

fn valid_config() -> InstallConfig {
    InstallConfig {
        install_path: PathBuf::from("/opt/node"),
        network: Network::Hoodi,
        execution_client: ExecutionClient::Nethermind,
        consensus_client: ConsensusClient::Teku,
        withdrawal_address: format!("0x{}", "ab".repeat(20)),
        fee_recipient: format!("0x{}", "cd".repeat(20)),
        graffiti: "roundtrip".to_string(),
    }
}

#[test]
fn save_load_preserves_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stakehost.json");

    let config = valid_config();
    config.save_to_file(&path).unwrap();
    let loaded = InstallConfig::load_from_file(&path).unwrap();

    assert_eq!(loaded, config);
    assert!(loaded.validate().is_ok());
}

#[test]
fn config_file_uses_lowercase_enum_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stakehost.json");
    valid_config().save_to_file(&path).unwrap();

    // The on-disk names match what the interactive prompt accepts, so a
    // saved file can be hand-edited with the same vocabulary.
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"hoodi\""));
    assert!(raw.contains("\"nethermind\""));
    assert!(raw.contains("\"teku\""));
}

#[test]
fn loading_garbage_fails_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stakehost.json");
    std::fs::write(&path, "{\"network\": \"ropsten\"}").unwrap();

    let err = InstallConfig::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("parse"));
}

#[test]
fn loading_missing_file_fails() {
    assert!(InstallConfig::load_from_file("/no/such/config.json").is_err());
}

proptest! {
    #[test]
    fn well_formed_addresses_always_pass(hex in "[0-9a-fA-F]{40}") {
        let addr = format!("0x{}", hex);
        prop_assert!(is_valid_eth_address(&addr));
    }

    #[test]
    fn wrong_length_addresses_always_fail(hex in "[0-9a-fA-F]{0,60}") {
        prop_assume!(hex.len() != 40);
        let addr = format!("0x{}", hex);
        prop_assert!(!is_valid_eth_address(&addr));
    }

    #[test]
    fn unprefixed_strings_always_fail(s in "[0-9a-fA-F]{40}") {
        prop_assert!(!is_valid_eth_address(&s));
    }

    #[test]
    fn non_hex_payloads_always_fail(s in "0x[g-zG-Z!-/]{40}") {
        prop_assert!(!is_valid_eth_address(&s));
    }

    #[test]
    fn graffiti_gate_matches_byte_length(s in ".{0,48}") {
        let config = InstallConfig {
            graffiti: s.clone(),
            ..valid_config()
        };
        prop_assert_eq!(config.validate().is_ok(), s.len() <= MAX_GRAFFITI_BYTES);
    }
}
