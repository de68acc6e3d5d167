//! Launcher script templating.
//!
//! One start script per node role: a fixed bash preamble plus a single
//! interpolated `docker run` invocation. Rendering is a pure function of the
//! configuration — identical inputs yield byte-identical scripts — and the
//! files are overwritten (never appended) on every run, chmod 0755 and owned
//! by the role account plus the docker group.

use crate::config::{InstallConfig, DOCKER_GROUP};
use crate::error::Result;
use crate::provision::chown_path;
use crate::report::{Outcome, RunReport};
use crate::runner::is_dry_run;
use crate::types::{ConsensusClient, ExecutionClient, Network, NodeRole};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tracing::info;

const PREAMBLE: &str = "#!/usr/bin/env bash\n\
# Generated by stakehost. Re-running the installer overwrites this file.\n\
set -euo pipefail\n\n";

/// Single-quote a value for interpolation into the generated script. Inside
/// single quotes bash performs no expansion at all; an embedded quote ends
/// the literal, escapes the quote and reopens it.
fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Render the launcher for a role. Pure; no filesystem access.
pub fn render_launcher(config: &InstallConfig, role: NodeRole) -> String {
    match role {
        NodeRole::Execution => render_execution(config),
        NodeRole::Consensus => render_consensus(config),
        NodeRole::Validator => render_validator(config),
    }
}

fn render_execution(config: &InstallConfig) -> String {
    let data_dir = config.install_path.join("execution");
    let jwt = config.jwt_path();
    let client_args = execution_args(config.execution_client, config.network);

    format!(
        "{preamble}exec docker run --rm --name stakehost-execution \\\n\
        \x20 --network host \\\n\
        \x20 -v {data} \\\n\
        \x20 -v {jwt} \\\n\
        \x20 {image} \\\n\
        \x20 {args}\n",
        preamble = PREAMBLE,
        data = sh_quote(&format!("{}:/data", data_dir.display())),
        jwt = sh_quote(&format!("{}:/jwt.hex:ro", jwt.display())),
        image = config.execution_client.image(),
        args = client_args,
    )
}

fn render_consensus(config: &InstallConfig) -> String {
    let data_dir = config.install_path.join("consensus");
    let jwt = config.jwt_path();
    let client_args = consensus_args(config.consensus_client, config.network, &config.fee_recipient);

    format!(
        "{preamble}exec docker run --rm --name stakehost-consensus \\\n\
        \x20 --network host \\\n\
        \x20 -v {data} \\\n\
        \x20 -v {jwt} \\\n\
        \x20 {image} \\\n\
        \x20 {args}\n",
        preamble = PREAMBLE,
        data = sh_quote(&format!("{}:/data", data_dir.display())),
        jwt = sh_quote(&format!("{}:/jwt.hex:ro", jwt.display())),
        image = config.consensus_client.image(),
        args = client_args,
    )
}

fn render_validator(config: &InstallConfig) -> String {
    let data_dir = config.install_path.join("validator");
    let keys_dir = config.validator_keys_dir();
    let client_args = validator_args(
        config.consensus_client,
        config.network,
        &config.fee_recipient,
        &config.graffiti,
    );

    format!(
        "{preamble}exec docker run --rm --name stakehost-validator \\\n\
        \x20 --network host \\\n\
        \x20 -v {data} \\\n\
        \x20 -v {keys} \\\n\
        \x20 {image} \\\n\
        \x20 {args}\n",
        preamble = PREAMBLE,
        data = sh_quote(&format!("{}:/data", data_dir.display())),
        keys = sh_quote(&format!("{}:/keys:ro", keys_dir.display())),
        image = config.consensus_client.validator_image(),
        args = client_args,
    )
}

/// Execution client command line. The jwt secret and data dir paths are the
/// in-container mounts, not host paths.
fn execution_args(client: ExecutionClient, network: Network) -> String {
    match client {
        ExecutionClient::Geth => {
            let chain = match network {
                Network::Mainnet => String::new(),
                other => format!("--{} ", other),
            };
            format!(
                "{}--datadir /data --port 30303 \
                 --authrpc.addr 127.0.0.1 --authrpc.port 8551 --authrpc.jwtsecret /jwt.hex",
                chain
            )
        }
        ExecutionClient::Erigon => format!(
            "--chain {} --datadir /data --port 30303 --torrent.port 42069 \
             --authrpc.addr 127.0.0.1 --authrpc.port 8551 --authrpc.jwtsecret /jwt.hex",
            network
        ),
        ExecutionClient::Nethermind => format!(
            "--config {} --datadir /data --Network.P2PPort 30303 \
             --JsonRpc.JwtSecretFile /jwt.hex --JsonRpc.EngineHost 127.0.0.1 --JsonRpc.EnginePort 8551",
            network
        ),
    }
}

/// Beacon node command line.
fn consensus_args(client: ConsensusClient, network: Network, fee_recipient: &str) -> String {
    match client {
        ConsensusClient::Lighthouse => format!(
            "lighthouse bn --network {} --datadir /data --port 9000 \
             --execution-endpoint http://127.0.0.1:8551 --execution-jwt /jwt.hex \
             --suggested-fee-recipient {}",
            network, fee_recipient
        ),
        ConsensusClient::Prysm => format!(
            "--{} --datadir=/data --p2p-tcp-port=13000 --p2p-udp-port=12000 \
             --execution-endpoint=http://127.0.0.1:8551 --jwt-secret=/jwt.hex \
             --suggested-fee-recipient={} --accept-terms-of-use",
            network, fee_recipient
        ),
        ConsensusClient::Teku => format!(
            "--network={} --data-path=/data --p2p-port=9000 \
             --ee-endpoint=http://127.0.0.1:8551 --ee-jwt-secret-file=/jwt.hex \
             --validators-proposer-default-fee-recipient={}",
            network, fee_recipient
        ),
    }
}

/// Validator client command line.
fn validator_args(
    client: ConsensusClient,
    network: Network,
    fee_recipient: &str,
    graffiti: &str,
) -> String {
    // Graffiti is free-form operator input going into a root-run script;
    // it must land as an inert single-quoted literal.
    let graffiti = sh_quote(graffiti);
    match client {
        ConsensusClient::Lighthouse => format!(
            "lighthouse vc --network {} --datadir /data \
             --suggested-fee-recipient {} --graffiti {}",
            network, fee_recipient, graffiti
        ),
        ConsensusClient::Prysm => format!(
            "--{} --wallet-dir=/data --suggested-fee-recipient={} \
             --graffiti={} --accept-terms-of-use",
            network, fee_recipient, graffiti
        ),
        ConsensusClient::Teku => format!(
            "validator-client --network={} --data-path=/data \
             --validators-proposer-default-fee-recipient={} --validators-graffiti={}",
            network, fee_recipient, graffiti
        ),
    }
}

/// Host path of a role's launcher script.
pub fn launcher_path(config: &InstallConfig, role: NodeRole) -> PathBuf {
    config.install_path.join(role.launcher_name())
}

/// Write all three launchers: overwrite, chmod 0755, chown role:docker.
pub fn install_launchers(config: &InstallConfig, report: &mut RunReport) -> Result<()> {
    for role in NodeRole::all() {
        let path = launcher_path(config, *role);
        let content = render_launcher(config, *role);

        if is_dry_run() {
            info!("[dry-run] write launcher {:?}", path);
            report.record(format!("launcher {:?}", path), Outcome::Skipped);
            continue;
        }

        let outcome = match fs::read_to_string(&path) {
            Ok(existing) if existing == content => Outcome::Unchanged,
            Ok(_) => Outcome::Updated,
            Err(_) => Outcome::Created,
        };

        fs::write(&path, &content)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        chown_path(&path, role.account_name(), DOCKER_GROUP)?;

        info!("Wrote launcher {:?}", path);
        report.record(format!("launcher {:?}", path), outcome);
    }
    Ok(())
}
