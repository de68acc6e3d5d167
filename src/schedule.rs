//! Boot scheduling and desktop integration.
//!
//! Registers the launcher scripts as `@reboot` crontab entries (merged into
//! the existing crontab, never duplicated) and drops `.desktop` shortcuts on
//! the operator's desktop when one exists.

use crate::config::InstallConfig;
use crate::error::Result;
use crate::launchers::launcher_path;
use crate::report::{Outcome, RunReport};
use crate::runner::{is_dry_run, run_probe, run_with_input};
use crate::types::NodeRole;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment override for the desktop shortcut directory.
pub const DESKTOP_DIR_ENV: &str = "STAKEHOST_DESKTOP_DIR";

/// The `@reboot` line for one role's launcher.
fn cron_line(config: &InstallConfig, role: NodeRole) -> String {
    format!("@reboot {}", launcher_path(config, role).display())
}

/// Current crontab content; a missing crontab reads as empty.
fn read_crontab() -> Result<String> {
    let output = run_probe("crontab", &["-l"])?;
    if output.success {
        Ok(output.stdout)
    } else {
        // `crontab -l` exits 1 with "no crontab for <user>" on a fresh host
        debug!("No existing crontab: {}", output.stderr.trim());
        Ok(String::new())
    }
}

/// Merge desired lines into `current`, appending only what is missing.
/// Returns None when nothing needs to change.
fn merge_cron_lines(current: &str, desired: &[String]) -> Option<String> {
    let existing: Vec<&str> = current.lines().collect();
    let missing: Vec<&String> = desired
        .iter()
        .filter(|line| !existing.contains(&line.as_str()))
        .collect();
    if missing.is_empty() {
        return None;
    }

    let mut merged = current.to_string();
    if !merged.is_empty() && !merged.ends_with('\n') {
        merged.push('\n');
    }
    for line in missing {
        merged.push_str(line);
        merged.push('\n');
    }
    Some(merged)
}

/// Register `@reboot` entries for all three launchers.
pub fn register_cron(config: &InstallConfig, report: &mut RunReport) -> Result<()> {
    let desired: Vec<String> = NodeRole::all()
        .iter()
        .map(|role| cron_line(config, *role))
        .collect();

    let current = read_crontab()?;
    match merge_cron_lines(&current, &desired) {
        None => {
            info!("All @reboot entries already registered");
            report.record("crontab @reboot entries", Outcome::Unchanged);
        }
        Some(merged) => {
            let output = run_with_input("crontab", &["-"], &merged)?;
            output.ensure_success("crontab -")?;
            info!("Registered @reboot entries");
            report.record(
                "crontab @reboot entries",
                if is_dry_run() {
                    Outcome::Skipped
                } else {
                    Outcome::Updated
                },
            );
        }
    }
    Ok(())
}

/// Directory for desktop shortcuts: the `STAKEHOST_DESKTOP_DIR` override, or
/// `$HOME/Desktop`. None when neither resolves to an existing directory.
fn desktop_dir() -> Option<PathBuf> {
    let dir = std::env::var_os(DESKTOP_DIR_ENV)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join("Desktop")))?;
    dir.is_dir().then_some(dir)
}

/// Render the `.desktop` entry launching one role's script in a terminal.
fn render_shortcut(config: &InstallConfig, role: NodeRole) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name=Start {role} client\n\
         Comment=Launch the staking node {role} client\n\
         Exec=bash {script}\n\
         Terminal=true\n\
         Categories=System;\n",
        role = role,
        script = launcher_path(config, role).display(),
    )
}

/// Drop desktop shortcuts for all launchers. Headless hosts (no desktop
/// directory) skip this step without failing.
pub fn install_shortcuts(config: &InstallConfig, report: &mut RunReport) -> Result<()> {
    let Some(dir) = desktop_dir() else {
        warn!("No desktop directory found, skipping shortcuts");
        report.record("desktop shortcuts", Outcome::Skipped);
        return Ok(());
    };

    let outcome = write_shortcuts(&dir, config)?;
    report.record("desktop shortcuts", outcome);
    Ok(())
}

fn write_shortcuts(dir: &Path, config: &InstallConfig) -> Result<Outcome> {
    let mut outcome = Outcome::Unchanged;
    for role in NodeRole::all() {
        let path = dir.join(format!("stakehost-{}.desktop", role));
        let content = render_shortcut(config, *role);

        if is_dry_run() {
            info!("[dry-run] write shortcut {:?}", path);
            outcome = outcome.combine(Outcome::Skipped);
            continue;
        }

        let changed = fs::read_to_string(&path).map(|c| c != content).unwrap_or(true);
        if changed {
            fs::write(&path, &content)?;
            info!("Wrote desktop shortcut {:?}", path);
            outcome = outcome.combine(Outcome::Updated);
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config() -> InstallConfig {
        InstallConfig {
            install_path: PathBuf::from("/opt/node"),
            ..InstallConfig::default()
        }
    }

    #[test]
    fn test_cron_line() {
        let line = cron_line(&test_config(), NodeRole::Execution);
        assert_eq!(line, "@reboot /opt/node/start_execution.sh");
    }

    #[test]
    fn test_merge_into_empty_crontab() {
        let desired = vec!["@reboot /opt/node/start_execution.sh".to_string()];
        let merged = merge_cron_lines("", &desired).unwrap();
        assert_eq!(merged, "@reboot /opt/node/start_execution.sh\n");
    }

    #[test]
    fn test_merge_preserves_existing_entries() {
        let current = "0 3 * * * /usr/local/bin/backup.sh\n";
        let desired = vec!["@reboot /opt/node/start_consensus.sh".to_string()];
        let merged = merge_cron_lines(current, &desired).unwrap();
        assert!(merged.starts_with(current));
        assert!(merged.contains("@reboot /opt/node/start_consensus.sh\n"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let desired = vec![
            "@reboot /opt/node/start_execution.sh".to_string(),
            "@reboot /opt/node/start_consensus.sh".to_string(),
        ];
        let first = merge_cron_lines("", &desired).unwrap();
        // Everything present: no second write
        assert!(merge_cron_lines(&first, &desired).is_none());
    }

    #[test]
    fn test_merge_handles_missing_trailing_newline() {
        let current = "@reboot /opt/node/start_execution.sh";
        let desired = vec![
            "@reboot /opt/node/start_execution.sh".to_string(),
            "@reboot /opt/node/start_validator.sh".to_string(),
        ];
        let merged = merge_cron_lines(current, &desired).unwrap();
        assert!(merged.contains("start_execution.sh\n@reboot"));
    }

    #[test]
    fn test_shortcut_rendering() {
        let content = render_shortcut(&test_config(), NodeRole::Validator);
        assert!(content.starts_with("[Desktop Entry]\n"));
        assert!(content.contains("Exec=bash /opt/node/start_validator.sh"));
        assert!(content.contains("Terminal=true"));
    }

    #[test]
    fn test_write_shortcuts_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();

        let first = write_shortcuts(tmp.path(), &test_config()).unwrap();
        assert_eq!(first, Outcome::Updated);
        assert!(tmp.path().join("stakehost-execution.desktop").exists());
        assert!(tmp.path().join("stakehost-validator.desktop").exists());

        // Second run changes nothing
        let second = write_shortcuts(tmp.path(), &test_config()).unwrap();
        assert_eq!(second, Outcome::Unchanged);
    }
}
