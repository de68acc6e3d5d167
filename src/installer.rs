//! Pipeline orchestration.
//!
//! Runs the setup stages in order against a validated `InstallConfig`,
//! tracking progress in the [`SetupContext`] stage machine and recording
//! every step outcome in a [`RunReport`]. The first failed privileged
//! operation aborts the remaining sequence; the report of completed steps is
//! returned alongside the error so the operator can see how far the run got.

use crate::config::InstallConfig;
use crate::error::{Result, StakehostError};
use crate::firewall::apply_firewall;
use crate::install_state::{SetupContext, SetupStage};
use crate::keys;
use crate::launchers::install_launchers;
use crate::probe;
use crate::provision::provision_host;
use crate::report::{Outcome, RunReport};
use crate::secrets;
use std::path::PathBuf;
use tracing::{error, info};

/// How the key-generation stage should obtain validator keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPlan {
    /// Fresh mnemonic via the deposit CLI
    New { num_validators: u32 },
    /// Copy an existing validator_keys backup
    Import { source: PathBuf },
    /// Re-derive from an existing mnemonic
    Restore {
        validator_start_index: u32,
        num_validators: u32,
    },
    /// Leave key material alone (headless runs manage keys separately)
    Skip,
}

/// Run the whole pipeline. Returns the step report together with the
/// overall result; on failure the report covers everything that completed
/// before the abort.
pub fn run_pipeline(config: &InstallConfig, key_plan: &KeyPlan) -> (RunReport, Result<()>) {
    let mut report = RunReport::new();
    let mut ctx = SetupContext::new();

    let result = run_stages(config, key_plan, &mut ctx, &mut report);
    if let Err(ref e) = result {
        ctx.fail();
        error!(
            "Setup failed during '{}': {}",
            ctx.failed_stage().map(|s| s.description()).unwrap_or("?"),
            e
        );
    }
    (report, result)
}

fn run_stages(
    config: &InstallConfig,
    key_plan: &KeyPlan,
    ctx: &mut SetupContext,
    report: &mut RunReport,
) -> Result<()> {
    advance(ctx, SetupStage::Probing)?;
    probe::report_existing_state(config);

    advance(ctx, SetupStage::Configuring)?;
    config
        .validate()
        .map_err(|e| StakehostError::config(e.to_string()))?;

    advance(ctx, SetupStage::Provisioning)?;
    provision_host(config, report)?;
    report.record("jwt secret", secrets::ensure_jwt_secret(config)?);

    advance(ctx, SetupStage::GeneratingKeys)?;
    run_key_plan(config, key_plan, report)?;

    advance(ctx, SetupStage::WritingLaunchers)?;
    install_launchers(config, report)?;

    advance(ctx, SetupStage::Integrating)?;
    apply_firewall(config, report)?;
    crate::schedule::register_cron(config, report)?;
    crate::schedule::install_shortcuts(config, report)?;

    advance(ctx, SetupStage::Completed)?;
    info!("Setup completed");
    Ok(())
}

fn run_key_plan(
    config: &InstallConfig,
    key_plan: &KeyPlan,
    report: &mut RunReport,
) -> Result<()> {
    match key_plan {
        KeyPlan::New { num_validators } => {
            let outcome = keys::generate_new(config, *num_validators)?;
            report.record("validator keys (new mnemonic)", outcome);
        }
        KeyPlan::Import { source } => {
            let outcome = keys::import_from_backup(config, source)?;
            report.record("validator keys (import)", outcome);
        }
        KeyPlan::Restore {
            validator_start_index,
            num_validators,
        } => {
            report.record("wallet password", secrets::ensure_wallet_password(config)?);
            let outcome =
                keys::restore_from_mnemonic(config, *validator_start_index, *num_validators)?;
            report.record("validator keys (restore)", outcome);
        }
        KeyPlan::Skip => {
            info!("Key generation skipped by plan");
            report.record("validator keys", Outcome::Skipped);
        }
    }
    Ok(())
}

fn advance(ctx: &mut SetupContext, expected: SetupStage) -> Result<()> {
    let reached = ctx
        .advance()
        .map_err(|e| StakehostError::transition(e.to_string()))?;
    debug_assert_eq!(reached, expected);
    info!("==> {}", expected.description());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_plan_skip_records_outcome() {
        let config = InstallConfig::default();
        let mut report = RunReport::new();
        run_key_plan(&config, &KeyPlan::Skip, &mut report).unwrap();
        assert_eq!(report.entries()[0].1, Outcome::Skipped);
    }

    #[test]
    fn test_pipeline_aborts_on_invalid_config() {
        // Default config has empty addresses, so validation must fail before
        // anything privileged is attempted.
        let config = InstallConfig::default();
        let (report, result) = run_pipeline(&config, &KeyPlan::Skip);
        assert!(result.is_err());
        assert!(report.is_empty(), "no step may run after validation fails");
    }

    #[test]
    fn test_import_plan_with_missing_source_fails() {
        let config = InstallConfig {
            withdrawal_address: format!("0x{}", "ab".repeat(20)),
            fee_recipient: format!("0x{}", "cd".repeat(20)),
            ..InstallConfig::default()
        };
        let plan = KeyPlan::Import {
            source: PathBuf::from("/no/such/backup"),
        };
        let mut report = RunReport::new();
        let err = run_key_plan(&config, &plan, &mut report).unwrap_err();
        assert!(matches!(err, StakehostError::KeyGen(_)));
    }
}
