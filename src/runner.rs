//! Sanctioned external command execution.
//!
//! Every shell-out in stakehost (docker, ufw, crontab, useradd, the deposit
//! CLI) goes through this module. That guarantees:
//!
//! - Process group isolation and PID registration for cleanup
//! - Captured stdout/stderr and a verified exit status — never the
//!   fire-and-forget `>/dev/null 2>&1` pattern
//! - A single dry-run switch that turns mutations into log lines
//!
//! Using raw `Command::new` elsewhere for host mutation violates the
//! architecture.

use crate::error::{Result, StakehostError};
use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Global dry-run flag. When set, mutating commands are logged and reported
/// as successful no-ops.
static DRY_RUN: AtomicBool = AtomicBool::new(false);

/// Enable dry-run mode (set once from the CLI flag).
pub fn enable_dry_run() {
    DRY_RUN.store(true, Ordering::SeqCst);
}

/// Disable dry-run mode (tests only).
pub fn disable_dry_run() {
    DRY_RUN.store(false, Ordering::SeqCst);
}

/// Check whether dry-run mode is active.
pub fn is_dry_run() -> bool {
    DRY_RUN.load(Ordering::SeqCst)
}

/// Output from a completed external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited with code 0.
    pub success: bool,
}

impl CommandOutput {
    /// A synthetic success, used for dry-run no-ops.
    fn noop() -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }
    }

    /// Check success and convert a failure into an error carrying stderr.
    pub fn ensure_success(&self, context: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            let code = self.exit_code.unwrap_or(-1);
            Err(StakehostError::command(format!(
                "{} failed (exit code {}): {}",
                context,
                code,
                self.stderr.trim()
            )))
        }
    }
}

/// Run a command that mutates host state, capturing output.
///
/// Honors dry-run: in dry-run mode the command is logged and a successful
/// no-op is returned. Probing commands that must run even in dry-run mode
/// use [`run_probe`] instead.
pub fn run(program: &str, args: &[&str]) -> Result<CommandOutput> {
    if is_dry_run() {
        info!("[dry-run] {} {}", program, args.join(" "));
        return Ok(CommandOutput::noop());
    }
    run_with_stdin(program, args, None)
}

/// Run a mutating command and fail unless it exits 0.
pub fn run_checked(program: &str, args: &[&str]) -> Result<CommandOutput> {
    let output = run(program, args)?;
    output.ensure_success(&format!("{} {}", program, args.join(" ")))?;
    Ok(output)
}

/// Run a read-only probe command. Executes even in dry-run mode so the
/// preview reflects the real host.
pub fn run_probe(program: &str, args: &[&str]) -> Result<CommandOutput> {
    run_with_stdin(program, args, None)
}

/// Run a command feeding `stdin_data` to its standard input (used for
/// `crontab -`). Honors dry-run.
pub fn run_with_input(program: &str, args: &[&str], stdin_data: &str) -> Result<CommandOutput> {
    if is_dry_run() {
        info!(
            "[dry-run] {} {} <<EOF\n{}EOF",
            program,
            args.join(" "),
            stdin_data
        );
        return Ok(CommandOutput::noop());
    }
    run_with_stdin(program, args, Some(stdin_data))
}

fn run_with_stdin(
    program: &str,
    args: &[&str],
    stdin_data: Option<&str>,
) -> Result<CommandOutput> {
    debug!("Executing: {} {}", program, args.join(" "));

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .in_new_process_group();

    let mut child = cmd.spawn().map_err(|e| {
        StakehostError::command(format!("Failed to spawn {}: {}", program, e))
    })?;
    let pid = child.id();

    // Register PID for cleanup on parent exit
    {
        let registry = ChildRegistry::global();
        let mut guard = registry.lock().expect("ChildRegistry mutex poisoned");
        guard.register(pid);
    }

    if let Some(data) = stdin_data {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(data.as_bytes())?;
        }
    }

    let output = child.wait_with_output().map_err(|e| {
        StakehostError::command(format!("Failed waiting for {}: {}", program, e))
    })?;

    {
        let registry = ChildRegistry::global();
        let mut guard = registry.lock().expect("ChildRegistry mutex poisoned");
        guard.unregister(pid);
    }

    let exit_code = output.status.code();
    let result = CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code,
        success: output.status.success(),
    };

    if result.success {
        debug!("{} exited successfully", program);
    } else {
        debug!("{} failed with exit code {:?}", program, exit_code);
    }

    Ok(result)
}

/// Run a command with inherited stdio (used for the deposit CLI, which
/// prompts the operator for the mnemonic and keystore password itself).
/// Honors dry-run; returns the exit status only, output goes to the terminal.
pub fn run_interactive(program: &str, args: &[&str]) -> Result<CommandOutput> {
    if is_dry_run() {
        info!("[dry-run] {} {}", program, args.join(" "));
        return Ok(CommandOutput::noop());
    }

    debug!("Executing interactively: {} {}", program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .in_new_process_group()
        .spawn()
        .map_err(|e| StakehostError::command(format!("Failed to spawn {}: {}", program, e)))?;
    let pid = child.id();

    {
        let registry = ChildRegistry::global();
        let mut guard = registry.lock().expect("ChildRegistry mutex poisoned");
        guard.register(pid);
    }

    let status = child
        .wait()
        .map_err(|e| StakehostError::command(format!("Failed waiting for {}: {}", program, e)))?;

    {
        let registry = ChildRegistry::global();
        let mut guard = registry.lock().expect("ChildRegistry mutex poisoned");
        guard.unregister(pid);
    }

    Ok(CommandOutput {
        stdout: String::new(),
        stderr: String::new(),
        exit_code: status.code(),
        success: status.success(),
    })
}

/// Check if a binary is available in PATH.
pub fn binary_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .in_new_process_group()
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
