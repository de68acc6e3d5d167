//! Validator key material: generation, import, restore, permission policy.
//!
//! Three ways to obtain keys (all ending in the same permission policy):
//!
//! - **new** — fresh mnemonic via the deposit CLI
//! - **import** — copy an existing `validator_keys` backup into place
//! - **restore** — re-derive from an existing seed phrase
//!
//! Signing keys must not be world-readable. Every flow finishes with
//! [`enforce_key_permissions`], which applies one unified restrictive policy
//! (the original installer applied different modes per flow; that divergence
//! was judged accidental and is gone).

use crate::config::{InstallConfig, SHARED_GROUP};
use crate::deposit::{run_deposit_cli, ExistingMnemonicArgs, NewMnemonicArgs};
use crate::error::{Result, StakehostError};
use crate::provision::chown_path;
use crate::report::Outcome;
use crate::runner::is_dry_run;
use crate::types::NodeRole;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::{debug, info};

/// Unified permission policy for produced key material.
#[derive(Debug, Clone, Copy)]
pub struct KeyPermissionPolicy {
    /// Keystore JSON files (signing key, password-encrypted)
    pub keystore_mode: u32,
    /// Deposit data JSON files (public, but kept tight anyway)
    pub deposit_data_mode: u32,
    /// The validator_keys directory itself
    pub dir_mode: u32,
}

/// The one policy every flow applies: the most restrictive variant found in
/// the original installer.
pub const KEY_POLICY: KeyPermissionPolicy = KeyPermissionPolicy {
    keystore_mode: 0o440,
    deposit_data_mode: 0o444,
    dir_mode: 0o750,
};

/// Generate fresh keys via `deposit.sh new-mnemonic`.
pub fn generate_new(config: &InstallConfig, num_validators: u32) -> Result<Outcome> {
    let args = NewMnemonicArgs {
        chain: config.network,
        folder: config.install_path.clone(),
        withdrawal_address: config.withdrawal_address.clone(),
        num_validators,
    };
    let output = run_deposit_cli(config, &args)?;
    output.ensure_success("deposit CLI (new-mnemonic)")?;

    enforce_key_permissions(config)?;
    Ok(if is_dry_run() {
        Outcome::Skipped
    } else {
        Outcome::Created
    })
}

/// Re-derive keys from an existing mnemonic via `deposit.sh existing-mnemonic`.
pub fn restore_from_mnemonic(
    config: &InstallConfig,
    validator_start_index: u32,
    num_validators: u32,
) -> Result<Outcome> {
    let args = ExistingMnemonicArgs {
        chain: config.network,
        folder: config.install_path.clone(),
        withdrawal_address: config.withdrawal_address.clone(),
        validator_start_index,
        num_validators,
    };
    let output = run_deposit_cli(config, &args)?;
    output.ensure_success("deposit CLI (existing-mnemonic)")?;

    enforce_key_permissions(config)?;
    Ok(if is_dry_run() {
        Outcome::Skipped
    } else {
        Outcome::Created
    })
}

/// Import an existing `validator_keys` backup.
///
/// If the canonicalized source equals the destination the copy is skipped
/// (re-import over the live directory), but the permission policy is still
/// applied. A missing source aborts.
pub fn import_from_backup(config: &InstallConfig, source: &Path) -> Result<Outcome> {
    if !source.is_dir() {
        return Err(StakehostError::keygen(format!(
            "backup directory {:?} does not exist",
            source
        )));
    }

    let destination = config.validator_keys_dir();
    let same_tree = match (source.canonicalize(), destination.canonicalize()) {
        (Ok(src), Ok(dst)) => src == dst,
        // Destination may not exist yet; distinct paths then
        _ => false,
    };

    let outcome = if same_tree {
        info!("Backup source equals destination, skipping copy");
        Outcome::Unchanged
    } else if is_dry_run() {
        info!("[dry-run] copy {:?} -> {:?}", source, destination);
        Outcome::Skipped
    } else {
        copy_tree(source, &destination)?;
        info!("Imported validator keys from {:?}", source);
        Outcome::Created
    };

    enforce_key_permissions(config)?;
    Ok(outcome)
}

/// Recursively copy `src` into `dst` (files overwrite, nothing is deleted).
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Apply [`KEY_POLICY`] to everything under `validator_keys`, and transfer
/// ownership to the validator account and the shared secrets group.
pub fn enforce_key_permissions(config: &InstallConfig) -> Result<()> {
    if is_dry_run() {
        info!("[dry-run] tighten permissions under {:?}", config.validator_keys_dir());
        return Ok(());
    }

    let dir = config.validator_keys_dir();
    if !dir.is_dir() {
        // Nothing produced yet (e.g. the deposit CLI was aborted); nothing to fix.
        debug!("No validator_keys directory at {:?}", dir);
        return Ok(());
    }

    apply_policy(&dir, NodeRole::Validator.account_name(), SHARED_GROUP)?;
    info!("Applied key permission policy under {:?}", dir);
    Ok(())
}

/// Walk `dir` depth-first: [`KEY_POLICY`] dir mode on every directory, the
/// per-file mode on every file, ownership transferred throughout. Imported
/// backups arrive with arbitrary nesting and source modes, so nothing may
/// be skipped.
fn apply_policy(dir: &Path, owner: &str, group: &str) -> Result<()> {
    fs::set_permissions(dir, fs::Permissions::from_mode(KEY_POLICY.dir_mode))?;
    chown_path(dir, owner, group)?;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            apply_policy(&path, owner, group)?;
        } else {
            let mode = mode_for_file(&entry.file_name().to_string_lossy());
            fs::set_permissions(&path, fs::Permissions::from_mode(mode))?;
            chown_path(&path, owner, group)?;
            debug!("Set {:?} to {:o} {}:{}", path, mode, owner, group);
        }
    }
    Ok(())
}

/// Pick the policy mode for a produced file by name. Unknown files get the
/// keystore treatment: when in doubt, restrict.
fn mode_for_file(name: &str) -> u32 {
    if name.starts_with("deposit_data") {
        KEY_POLICY.deposit_data_mode
    } else {
        KEY_POLICY.keystore_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config(install_path: &Path) -> InstallConfig {
        InstallConfig {
            install_path: install_path.to_path_buf(),
            withdrawal_address: format!("0x{}", "ab".repeat(20)),
            fee_recipient: format!("0x{}", "cd".repeat(20)),
            ..InstallConfig::default()
        }
    }

    #[test]
    fn test_mode_for_file() {
        assert_eq!(mode_for_file("deposit_data-1700000000.json"), 0o444);
        assert_eq!(mode_for_file("keystore-m_12381_3600_0_0_0-17.json"), 0o440);
        assert_eq!(mode_for_file("something_else.json"), 0o440);
    }

    #[test]
    fn test_import_missing_source_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        let err = import_from_backup(&config, &PathBuf::from("/no/such/backup")).unwrap_err();
        assert!(matches!(err, StakehostError::KeyGen(_)));
    }

    #[test]
    fn test_copy_tree_copies_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("backup");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("keystore-1.json"), "{}").unwrap();
        fs::write(src.join("nested/deposit_data-1.json"), "[]").unwrap();

        let dst = tmp.path().join("restored");
        copy_tree(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("keystore-1.json")).unwrap(), "{}");
        assert_eq!(
            fs::read_to_string(dst.join("nested/deposit_data-1.json")).unwrap(),
            "[]"
        );
        // Source untouched
        assert!(src.join("keystore-1.json").exists());
    }

    #[test]
    fn test_policy_reaches_nested_backup_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let keys = tmp.path().join("validator_keys");
        fs::create_dir_all(keys.join("nested")).unwrap();
        fs::write(keys.join("keystore-1.json"), "{}").unwrap();
        fs::write(keys.join("nested/keystore-2.json"), "{}").unwrap();
        fs::write(keys.join("nested/deposit_data-1.json"), "[]").unwrap();

        // World-readable, the way an imported backup might arrive
        for file in ["keystore-1.json", "nested/keystore-2.json"] {
            fs::set_permissions(keys.join(file), fs::Permissions::from_mode(0o644)).unwrap();
        }

        let me = nix::unistd::User::from_uid(nix::unistd::geteuid())
            .unwrap()
            .unwrap();
        let my_group = nix::unistd::Group::from_gid(nix::unistd::getegid())
            .unwrap()
            .unwrap();
        apply_policy(&keys, &me.name, &my_group.name).unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&keys), KEY_POLICY.dir_mode);
        assert_eq!(mode(&keys.join("nested")), KEY_POLICY.dir_mode);
        assert_eq!(mode(&keys.join("keystore-1.json")), KEY_POLICY.keystore_mode);
        assert_eq!(
            mode(&keys.join("nested/keystore-2.json")),
            KEY_POLICY.keystore_mode
        );
        assert_eq!(
            mode(&keys.join("nested/deposit_data-1.json")),
            KEY_POLICY.deposit_data_mode
        );
    }

    #[test]
    fn test_same_tree_detection() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        let keys = config.validator_keys_dir();
        fs::create_dir_all(&keys).unwrap();

        let src = keys.canonicalize().unwrap();
        let dst = config.validator_keys_dir().canonicalize().unwrap();
        assert_eq!(src, dst);
    }
}
