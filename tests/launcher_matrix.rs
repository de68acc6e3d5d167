//! Cross-client launcher and firewall behaviour over the whole
//! network/client selection matrix.

use stakehost::config::InstallConfig;
use stakehost::firewall::rules_for;
use stakehost::launchers::render_launcher;
use stakehost::types::{ConsensusClient, ExecutionClient, Network, NodeRole};
use std::path::PathBuf;
use strum::IntoEnumIterator;

fn config_for(
    network: Network,
    execution: ExecutionClient,
    consensus: ConsensusClient,
) -> InstallConfig {
    InstallConfig {
        install_path: PathBuf::from("/opt/node"),
        network,
        execution_client: execution,
        consensus_client: consensus,
        withdrawal_address: format!("0x{}", "ab".repeat(20)),
        fee_recipient: format!("0x{}", "cd".repeat(20)),
        graffiti: "matrix".to_string(),
    }
}

fn all_configs() -> impl Iterator<Item = InstallConfig> {
    Network::iter().flat_map(|network| {
        ExecutionClient::iter().flat_map(move |execution| {
            ConsensusClient::iter().map(move |consensus| config_for(network, execution, consensus))
        })
    })
}

#[test]
fn rendering_is_deterministic_across_the_matrix() {
    for config in all_configs() {
        for role in NodeRole::all() {
            let first = render_launcher(&config, *role);
            let second = render_launcher(&config, *role);
            assert_eq!(
                first, second,
                "non-deterministic render for {:?}/{:?}/{:?} {:?}",
                config.network, config.execution_client, config.consensus_client, role
            );
        }
    }
}

#[test]
fn every_launcher_is_a_single_exec_script() {
    for config in all_configs() {
        for role in NodeRole::all() {
            let script = render_launcher(&config, *role);
            assert!(script.starts_with("#!/usr/bin/env bash\n"));
            assert!(script.contains("set -euo pipefail"));
            assert_eq!(
                script.matches("exec docker run").count(),
                1,
                "exactly one docker invocation per launcher"
            );
            assert!(script.ends_with('\n'));
        }
    }
}

#[test]
fn launchers_reference_the_selected_images() {
    for config in all_configs() {
        let execution = render_launcher(&config, NodeRole::Execution);
        assert!(execution.contains(config.execution_client.image()));

        let consensus = render_launcher(&config, NodeRole::Consensus);
        assert!(consensus.contains(config.consensus_client.image()));

        let validator = render_launcher(&config, NodeRole::Validator);
        assert!(validator.contains(config.consensus_client.validator_image()));
    }
}

#[test]
fn fee_recipient_reaches_consensus_and_validator_launchers() {
    for config in all_configs() {
        for role in [NodeRole::Consensus, NodeRole::Validator] {
            let script = render_launcher(&config, role);
            assert!(
                script.contains(&config.fee_recipient),
                "fee recipient missing from {:?} launcher for {:?}",
                role,
                config.consensus_client
            );
        }
    }
}

#[test]
fn jwt_secret_is_mounted_read_only_where_needed() {
    for config in all_configs() {
        for role in [NodeRole::Execution, NodeRole::Consensus] {
            let script = render_launcher(&config, role);
            assert!(script.contains("/opt/node/jwt.hex:/jwt.hex:ro"));
        }
        // The validator talks to the beacon node, not the engine API
        let validator = render_launcher(&config, NodeRole::Validator);
        assert!(!validator.contains("jwt.hex"));
    }
}

#[test]
fn firewall_opens_only_the_selected_clients_ports() {
    for config in all_configs() {
        let rules = rules_for(&config);
        let expected: Vec<_> = config
            .execution_client
            .p2p_ports()
            .iter()
            .chain(config.consensus_client.p2p_ports())
            .collect();

        for rule in &rules {
            assert!(
                expected.contains(&rule),
                "rule {:?} does not belong to {:?}/{:?}",
                rule,
                config.execution_client,
                config.consensus_client
            );
        }
        // and every selected-client port is present
        for rule in expected {
            assert!(rules.contains(rule));
        }
    }
}

#[test]
fn changing_any_selection_changes_some_launcher() {
    let base = config_for(Network::Holesky, ExecutionClient::Geth, ConsensusClient::Lighthouse);
    let base_scripts: Vec<String> = NodeRole::all()
        .iter()
        .map(|role| render_launcher(&base, *role))
        .collect();

    for config in all_configs() {
        if config == base {
            continue;
        }
        let scripts: Vec<String> = NodeRole::all()
            .iter()
            .map(|role| render_launcher(&config, *role))
            .collect();
        assert_ne!(
            scripts, base_scripts,
            "distinct selections must not collapse to identical launchers"
        );
    }
}
