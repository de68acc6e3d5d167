//! Idempotent host provisioning: accounts, groups, directories, ownership.
//!
//! Contract: given the role accounts and an `InstallConfig`, ensure each
//! account exists, belongs to the required groups (docker, the shared
//! secrets group, its per-role group) and that target directories exist with
//! the documented owner:group and mode.
//!
//! Safe to re-run: existing accounts are detected and only group membership
//! is repaired, never recreated; directory creation uses create-if-missing
//! semantics. Any failed privileged operation aborts the remaining sequence
//! and surfaces the underlying error — no partial silent continuation.

use crate::config::{InstallConfig, DOCKER_GROUP, SHARED_GROUP};
use crate::error::{Result, StakehostError};
use crate::probe::{account_exists, group_exists};
use crate::report::{Outcome, RunReport};
use crate::runner::{self, is_dry_run, run_checked, run_probe};
use crate::types::NodeRole;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::{debug, info};

/// One OS account per client role, with the groups it must belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAccount {
    pub username: String,
    pub groups: Vec<String>,
}

impl HostAccount {
    /// The account for a node role: its own primary group plus the shared
    /// secrets group and the docker group.
    pub fn for_role(role: NodeRole) -> Self {
        Self {
            username: role.account_name().to_string(),
            groups: vec![SHARED_GROUP.to_string(), DOCKER_GROUP.to_string()],
        }
    }
}

/// Ensure an OS group exists.
pub fn ensure_group(name: &str) -> Result<Outcome> {
    if group_exists(name) {
        debug!("Group '{}' already exists", name);
        return Ok(Outcome::Unchanged);
    }
    if is_dry_run() {
        info!("[dry-run] groupadd {}", name);
        return Ok(Outcome::Skipped);
    }
    run_checked("groupadd", &["-r", name])?;
    info!("Created group '{}'", name);
    Ok(Outcome::Created)
}

/// Current supplementary group membership of an account, via `id -nG`.
fn current_groups(username: &str) -> Result<Vec<String>> {
    let output = run_probe("id", &["-nG", username])?;
    output.ensure_success(&format!("id -nG {}", username))?;
    Ok(output
        .stdout
        .split_whitespace()
        .map(|s| s.to_string())
        .collect())
}

/// Ensure a role account exists with the required group memberships.
///
/// An existing account is never recreated; missing memberships are added
/// with `usermod -aG` (membership is only ever added, never removed).
pub fn ensure_account(account: &HostAccount) -> Result<Outcome> {
    if !account_exists(&account.username) {
        if is_dry_run() {
            info!(
                "[dry-run] useradd -r -M -s /usr/sbin/nologin -G {} {}",
                account.groups.join(","),
                account.username
            );
            return Ok(Outcome::Skipped);
        }
        run_checked(
            "useradd",
            &[
                "-r",
                "-M",
                "-s",
                "/usr/sbin/nologin",
                "-G",
                &account.groups.join(","),
                &account.username,
            ],
        )?;
        info!("Created account '{}'", account.username);
        return Ok(Outcome::Created);
    }

    let existing = current_groups(&account.username)?;
    let mut outcome = Outcome::Unchanged;
    for group in &account.groups {
        if existing.iter().any(|g| g == group) {
            continue;
        }
        if is_dry_run() {
            info!("[dry-run] usermod -aG {} {}", group, account.username);
            outcome = outcome.combine(Outcome::Skipped);
            continue;
        }
        run_checked("usermod", &["-aG", group, &account.username])?;
        info!("Added '{}' to group '{}'", account.username, group);
        outcome = outcome.combine(Outcome::Updated);
    }
    Ok(outcome)
}

/// Change ownership of a path to `user:group` by database lookup.
pub fn chown_path(path: &Path, user: &str, group: &str) -> Result<()> {
    let uid = nix::unistd::User::from_name(user)
        .map_err(|e| StakehostError::provision(format!("lookup of user '{}': {}", user, e)))?
        .ok_or_else(|| StakehostError::provision(format!("user '{}' does not exist", user)))?
        .uid;
    let gid = nix::unistd::Group::from_name(group)
        .map_err(|e| StakehostError::provision(format!("lookup of group '{}': {}", group, e)))?
        .ok_or_else(|| StakehostError::provision(format!("group '{}' does not exist", group)))?
        .gid;
    nix::unistd::chown(path, Some(uid), Some(gid))
        .map_err(|e| StakehostError::provision(format!("chown {:?} to {}:{}: {}", path, user, group, e)))
}

/// Ensure a directory exists with the given mode and owner.
///
/// Existing directories are kept; mode and ownership are normalized on
/// every run so a re-run repairs drifted permissions without recreating
/// anything.
pub fn ensure_dir(path: &Path, mode: u32, owner: &str, group: &str) -> Result<Outcome> {
    if is_dry_run() {
        info!(
            "[dry-run] mkdir -p {:?} && chmod {:o} && chown {}:{}",
            path, mode, owner, group
        );
        return Ok(Outcome::Skipped);
    }

    let outcome = if path.is_dir() {
        Outcome::Unchanged
    } else {
        fs::create_dir_all(path)?;
        info!("Created directory {:?}", path);
        Outcome::Created
    };

    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    chown_path(path, owner, group)?;
    Ok(outcome)
}

/// Run the whole provisioning step for a configuration, recording every
/// sub-operation in the report. Aborts at the first failed privileged
/// operation.
pub fn provision_host(config: &InstallConfig, report: &mut RunReport) -> Result<()> {
    ensure_docker_installed(report)?;

    for group in [SHARED_GROUP, DOCKER_GROUP] {
        let outcome = ensure_group(group)?;
        report.record(format!("group '{}'", group), outcome);
    }

    for role in NodeRole::all() {
        let account = HostAccount::for_role(*role);
        let outcome = ensure_account(&account)?;
        report.record(format!("account '{}'", account.username), outcome);
    }

    let root = &config.install_path;
    report.record(
        format!("directory {:?}", root),
        ensure_dir(root, 0o755, "root", SHARED_GROUP)?,
    );

    for role in NodeRole::all() {
        let data_dir = root.join(role.account_name());
        report.record(
            format!("directory {:?}", data_dir),
            ensure_dir(&data_dir, 0o750, role.account_name(), role.account_name())?,
        );
    }

    let keys_dir = config.validator_keys_dir();
    report.record(
        format!("directory {:?}", keys_dir),
        ensure_dir(
            &keys_dir,
            0o750,
            NodeRole::Validator.account_name(),
            SHARED_GROUP,
        )?,
    );

    Ok(())
}

/// Ensure the docker engine is installed; installs `docker.io` via apt when
/// the binary is absent.
fn ensure_docker_installed(report: &mut RunReport) -> Result<()> {
    if runner::binary_exists("docker") {
        report.record("docker engine", Outcome::Unchanged);
        return Ok(());
    }
    if is_dry_run() {
        info!("[dry-run] apt-get install -y docker.io");
        report.record("docker engine", Outcome::Skipped);
        return Ok(());
    }
    run_checked("apt-get", &["update", "-qq"])?;
    run_checked("apt-get", &["install", "-y", "docker.io"])?;
    report.record("docker engine", Outcome::Created);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstallConfig;
    use std::path::PathBuf;

    #[test]
    fn test_host_account_for_role() {
        let account = HostAccount::for_role(NodeRole::Validator);
        assert_eq!(account.username, "validator");
        assert!(account.groups.contains(&SHARED_GROUP.to_string()));
        assert!(account.groups.contains(&DOCKER_GROUP.to_string()));
    }

    #[test]
    fn test_current_groups_for_root() {
        // root belongs at least to the root group on any Linux host
        let groups = current_groups("root").unwrap();
        assert!(groups.iter().any(|g| g == "root"));
    }

    #[test]
    fn test_ensure_dir_creates_and_normalizes() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("data");

        // chown to the current user's own name always succeeds
        let me = nix::unistd::User::from_uid(nix::unistd::geteuid())
            .unwrap()
            .unwrap();
        let my_group = nix::unistd::Group::from_gid(nix::unistd::getegid())
            .unwrap()
            .unwrap();

        let first = ensure_dir(&target, 0o750, &me.name, &my_group.name).unwrap();
        assert_eq!(first, Outcome::Created);

        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);

        let second = ensure_dir(&target, 0o750, &me.name, &my_group.name).unwrap();
        assert_eq!(second, Outcome::Unchanged);
    }

    #[test]
    fn test_chown_to_unknown_user_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = chown_path(tmp.path(), "no_such_user_zz9", "root").unwrap_err();
        assert!(err.to_string().contains("no_such_user_zz9"));
    }

    #[test]
    fn test_ensure_group_existing_is_unchanged() {
        assert_eq!(ensure_group("root").unwrap(), Outcome::Unchanged);
    }

    #[test]
    fn test_provision_paths_derive_from_config() {
        let config = InstallConfig {
            install_path: PathBuf::from("/srv/node"),
            ..InstallConfig::default()
        };
        assert_eq!(
            config.validator_keys_dir(),
            PathBuf::from("/srv/node/validator_keys")
        );
    }
}
