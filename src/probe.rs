//! Pre-flight environment probe
//!
//! Verifies the host before anything is mutated:
//! - Required runtime binaries are present
//! - Running with root privileges (EUID 0)
//! - What already exists (accounts, install directory) for logging
//!
//! If a hard check fails, the program exits with a clear remediation message
//! before the pipeline starts.

use crate::config::InstallConfig;
use crate::runner::binary_exists;
use crate::types::NodeRole;
use tracing::{debug, info, warn};

/// Required runtime binaries for installation. Docker is absent on purpose:
/// the provisioning step installs it when missing.
const REQUIRED_BINARIES: &[&str] = &[
    "bash",    // launcher scripts
    "ufw",     // firewall rules
    "crontab", // @reboot registration
];

/// Optional binaries (warn if missing but don't fail)
const OPTIONAL_BINARIES: &[&str] = &[
    "zenity", // graphical prompts when running from a desktop session
];

/// Result of environment verification
#[derive(Debug)]
pub struct PreflightResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
}

impl PreflightResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && self.is_root
    }
}

/// Check if running as root (EUID 0)
fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Perform all pre-flight checks and return the result
pub fn verify_environment() -> PreflightResult {
    let mut missing = Vec::new();

    for binary in REQUIRED_BINARIES {
        if !binary_exists(binary) {
            missing.push((*binary).to_string());
        }
    }

    for binary in OPTIONAL_BINARIES {
        if !binary_exists(binary) {
            debug!("Optional binary not found: {}", binary);
        }
    }

    PreflightResult {
        missing_binaries: missing,
        is_root: is_running_as_root(),
    }
}

/// Print an error message to stderr and exit with code 1.
/// Runs before any host mutation, so plain stderr output is safe.
pub fn print_error_and_exit(result: &PreflightResult) -> ! {
    eprintln!();
    eprintln!("stakehost: pre-flight check failed");
    eprintln!();

    if !result.is_root {
        eprintln!("error: root privileges required");
        eprintln!("  creating accounts, writing secrets and opening firewall ports");
        eprintln!("  all need root. Re-run with:");
        eprintln!("    sudo stakehost install");
        eprintln!();
    }

    if !result.missing_binaries.is_empty() {
        eprintln!("error: missing required binaries");
        for binary in &result.missing_binaries {
            eprintln!("  - {} (install: apt-get install {})", binary, package_for_binary(binary));
        }
        let packages: Vec<&str> = result
            .missing_binaries
            .iter()
            .map(|b| package_for_binary(b))
            .collect();
        eprintln!();
        eprintln!("  Install them with:");
        eprintln!("    apt-get install -y {}", packages.join(" "));
        eprintln!();
    }

    std::process::exit(1);
}

/// Map binary names to their Debian/Ubuntu package names
fn package_for_binary(binary: &str) -> &'static str {
    match binary {
        "bash" => "bash",
        "docker" => "docker.io",
        "ufw" => "ufw",
        "crontab" => "cron",
        "zenity" => "zenity",
        _ => "unknown",
    }
}

/// Skip root check (for development/testing)
/// Set STAKEHOST_SKIP_ROOT_CHECK=1 to skip
pub fn should_skip_root_check() -> bool {
    std::env::var("STAKEHOST_SKIP_ROOT_CHECK")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Main entry point: verify environment and exit if checks fail
pub fn run_preflight_checks() {
    debug!("Running pre-flight checks...");

    let mut result = verify_environment();

    if should_skip_root_check() {
        warn!("Root check skipped (STAKEHOST_SKIP_ROOT_CHECK=1)");
        result.is_root = true;
    }

    if !result.is_ok() {
        print_error_and_exit(&result);
    }

    info!("Pre-flight checks passed");
}

/// Log what already exists on the host for the chosen install path.
/// Purely informational; the provisioning step re-checks everything itself.
pub fn report_existing_state(config: &InstallConfig) {
    if config.install_path.exists() {
        info!("Install path {:?} already exists, contents will be kept", config.install_path);
    }
    for role in NodeRole::all() {
        if account_exists(role.account_name()) {
            info!("Account '{}' already exists, will only repair group membership", role.account_name());
        }
    }
    if config.jwt_path().exists() {
        info!("JWT secret already present, will not be regenerated");
    }
}

/// Check whether an OS account exists, via the passwd database.
pub fn account_exists(name: &str) -> bool {
    matches!(nix::unistd::User::from_name(name), Ok(Some(_)))
}

/// Check whether an OS group exists, via the group database.
pub fn group_exists(name: &str) -> bool {
    matches!(nix::unistd::Group::from_name(name), Ok(Some(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_result_is_ok() {
        let ok = PreflightResult {
            missing_binaries: vec![],
            is_root: true,
        };
        assert!(ok.is_ok());

        let missing = PreflightResult {
            missing_binaries: vec!["docker".to_string()],
            is_root: true,
        };
        assert!(!missing.is_ok());

        let not_root = PreflightResult {
            missing_binaries: vec![],
            is_root: false,
        };
        assert!(!not_root.is_ok());
    }

    #[test]
    fn test_docker_is_not_required_up_front() {
        // Provisioning installs docker.io when the engine is missing; a
        // hard preflight requirement would make that branch unreachable.
        assert!(!REQUIRED_BINARIES.contains(&"docker"));
    }

    #[test]
    fn test_package_mapping() {
        assert_eq!(package_for_binary("docker"), "docker.io");
        assert_eq!(package_for_binary("crontab"), "cron");
        assert_eq!(package_for_binary("ufw"), "ufw");
    }

    #[test]
    fn test_account_exists_root() {
        // root exists on any Linux host
        assert!(account_exists("root"));
        assert!(!account_exists("no_such_account_zz9"));
    }

    #[test]
    fn test_group_exists_root() {
        assert!(group_exists("root"));
        assert!(!group_exists("no_such_group_zz9"));
    }
}
