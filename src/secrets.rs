//! Secret file generation.
//!
//! Two secrets are produced, each at most once per host:
//!
//! - `jwt.hex` — the execution<->consensus RPC authentication secret,
//!   32 random bytes as lowercase hex, mode 0640, execution:stakenode
//! - `wallet_password.txt` — password handed to the deposit CLI for restored
//!   wallets, mode 0640, validator:stakenode
//!
//! Consumers rely on the permission bits and owning group; they are part of
//! the contract, not a default.

use crate::config::{InstallConfig, SHARED_GROUP};
use crate::error::Result;
use crate::provision::chown_path;
use crate::report::Outcome;
use crate::runner::is_dry_run;
use crate::types::NodeRole;
use rand::distributions::Alphanumeric;
use rand::{rngs::OsRng, Rng, RngCore};
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::info;

/// Mode shared by both secret files: owner read/write, group read.
const SECRET_MODE: u32 = 0o640;

/// Length of the generated wallet password.
const WALLET_PASSWORD_LEN: usize = 24;

/// Render 32 CSPRNG bytes as the lowercase hex JWT secret.
fn generate_jwt_hex() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Generate a random alphanumeric wallet password.
fn generate_wallet_password() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(WALLET_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Write `content` to `path` created with `SECRET_MODE`, then fix ownership.
/// The file is created exclusively; an existing file is a caller bug.
fn write_secret(path: &Path, content: &str, owner: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(SECRET_MODE)
        .open(path)?;
    file.write_all(content.as_bytes())?;
    file.write_all(b"\n")?;
    drop(file);

    chown_path(path, owner, SHARED_GROUP)?;
    Ok(())
}

/// Ensure the JWT secret exists. An existing secret is never rewritten:
/// both clients hold open references to it.
pub fn ensure_jwt_secret(config: &InstallConfig) -> Result<Outcome> {
    let path = config.jwt_path();
    if path.exists() {
        info!("JWT secret {:?} already present", path);
        return Ok(Outcome::Unchanged);
    }
    if is_dry_run() {
        info!("[dry-run] generate JWT secret at {:?}", path);
        return Ok(Outcome::Skipped);
    }

    write_secret(&path, &generate_jwt_hex(), NodeRole::Execution.account_name())?;
    info!("Generated JWT secret at {:?}", path);
    Ok(Outcome::Created)
}

/// Ensure the wallet password file exists for restore flows.
pub fn ensure_wallet_password(config: &InstallConfig) -> Result<Outcome> {
    let path = config.install_path.join("wallet_password.txt");
    if path.exists() {
        info!("Wallet password {:?} already present", path);
        return Ok(Outcome::Unchanged);
    }
    if is_dry_run() {
        info!("[dry-run] generate wallet password at {:?}", path);
        return Ok(Outcome::Skipped);
    }

    write_secret(
        &path,
        &generate_wallet_password(),
        NodeRole::Validator.account_name(),
    )?;
    info!("Generated wallet password at {:?}", path);
    Ok(Outcome::Created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_hex_shape() {
        let secret = generate_jwt_hex();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(secret, secret.to_lowercase());
    }

    #[test]
    fn test_jwt_hex_not_constant() {
        assert_ne!(generate_jwt_hex(), generate_jwt_hex());
    }

    #[test]
    fn test_wallet_password_shape() {
        let password = generate_wallet_password();
        assert_eq!(password.len(), WALLET_PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_write_secret_mode_and_exclusivity() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("jwt.hex");

        let me = nix::unistd::User::from_uid(nix::unistd::geteuid())
            .unwrap()
            .unwrap();

        // Non-root cannot chown to the shared group, so exercise the file
        // creation path directly when the group is absent.
        if crate::probe::group_exists(SHARED_GROUP) && nix::unistd::geteuid().is_root() {
            write_secret(&path, "deadbeef", &me.name).unwrap();
        } else {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(SECRET_MODE)
                .open(&path)
                .unwrap();
            file.write_all(b"deadbeef\n").unwrap();
        }

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, SECRET_MODE);

        // A second exclusive create must fail: secrets are written at most once
        assert!(OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .is_err());
    }
}
