//! Firewall integration via ufw.
//!
//! Opens exactly the P2P ports of the selected execution/consensus pair and
//! nothing else. `ufw allow` is idempotent, so re-runs are safe; its output
//! distinguishes a fresh rule from an existing one and the report reflects
//! that.

use crate::config::InstallConfig;
use crate::error::Result;
use crate::report::{Outcome, RunReport};
use crate::runner::{is_dry_run, run_checked, run_probe};
use crate::types::PortRule;
use tracing::info;

/// The full set of rules for a configuration: execution ports then
/// consensus ports, deduplicated in order.
pub fn rules_for(config: &InstallConfig) -> Vec<PortRule> {
    let mut rules = Vec::new();
    for rule in config
        .execution_client
        .p2p_ports()
        .iter()
        .chain(config.consensus_client.p2p_ports())
    {
        if !rules.contains(rule) {
            rules.push(*rule);
        }
    }
    rules
}

/// Make sure ufw itself is active before adding rules.
fn ensure_ufw_enabled(report: &mut RunReport) -> Result<()> {
    let status = run_probe("ufw", &["status"])?;
    status.ensure_success("ufw status")?;

    if status.stdout.contains("Status: active") {
        report.record("ufw enabled", Outcome::Unchanged);
        return Ok(());
    }
    if is_dry_run() {
        info!("[dry-run] ufw --force enable");
        report.record("ufw enabled", Outcome::Skipped);
        return Ok(());
    }
    run_checked("ufw", &["--force", "enable"])?;
    report.record("ufw enabled", Outcome::Updated);
    Ok(())
}

/// Open the selected clients' ports.
pub fn apply_firewall(config: &InstallConfig, report: &mut RunReport) -> Result<()> {
    ensure_ufw_enabled(report)?;

    for rule in rules_for(config) {
        let arg = rule.to_ufw_arg();
        let output = run_checked("ufw", &["allow", &arg])?;

        let outcome = if is_dry_run() {
            Outcome::Skipped
        } else if output.stdout.contains("Skipping") {
            // "Skipping adding existing rule"
            Outcome::Unchanged
        } else {
            Outcome::Updated
        };
        report.record(format!("ufw allow {}", arg), outcome);
    }
    Ok(())
}
