//! Interactive configuration collection.
//!
//! Line-based prompts with local re-prompt loops: invalid input is rejected
//! with a message and asked again; end-of-input aborts the run. The prompter
//! is generic over its input so the loops are testable without a terminal.

use crate::config::{is_valid_eth_address, InstallConfig, MAX_GRAFFITI_BYTES};
use crate::error::{Result, StakehostError};
use crate::types::{ConsensusClient, ExecutionClient, KeySource, Network};
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use strum::IntoEnumIterator;

/// Reads operator answers from any buffered source (stdin in production,
/// a byte buffer in tests).
pub struct Prompter<R: BufRead> {
    input: R,
}

impl Prompter<io::StdinLock<'static>> {
    /// Prompter over the process stdin.
    pub fn stdin() -> Self {
        Prompter {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> Prompter<R> {
    pub fn new(input: R) -> Self {
        Prompter { input }
    }

    /// Read one trimmed line, printing `prompt` first.
    /// EOF is an abort (operator closed the terminal or piped input ran out).
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut line = String::new();
        let n = self.input.read_line(&mut line)?;
        if n == 0 {
            return Err(StakehostError::validation(
                "input closed before configuration was complete",
            ));
        }
        Ok(line.trim().to_string())
    }

    /// Ask for an Ethereum address, looping until it matches
    /// `0x` + 40 hex characters.
    pub fn ask_address(&mut self, what: &str) -> Result<String> {
        loop {
            let answer = self.read_line(&format!("{} (0x + 40 hex chars): ", what))?;
            if is_valid_eth_address(&answer) {
                return Ok(answer);
            }
            println!("  '{}' is not a valid address, try again", answer);
        }
    }

    /// Ask the operator to pick one variant of a strum enum by name,
    /// looping on unknown answers. An empty answer picks `default`.
    pub fn ask_choice<T>(&mut self, what: &str, default: T) -> Result<T>
    where
        T: IntoEnumIterator + Display + FromStr + Copy,
    {
        let options: Vec<String> = T::iter().map(|v| v.to_string()).collect();
        loop {
            let answer = self.read_line(&format!(
                "{} [{}] (default {}): ",
                what,
                options.join("/"),
                default
            ))?;
            if answer.is_empty() {
                return Ok(default);
            }
            match T::from_str(&answer) {
                Ok(value) => return Ok(value),
                Err(_) => println!("  '{}' is not one of: {}", answer, options.join(", ")),
            }
        }
    }

    /// Ask for an absolute install path, looping until one is given.
    pub fn ask_install_path(&mut self, default: &str) -> Result<PathBuf> {
        loop {
            let answer = self.read_line(&format!("Install path (default {}): ", default))?;
            let path = if answer.is_empty() {
                PathBuf::from(default)
            } else {
                PathBuf::from(&answer)
            };
            if path.is_absolute() {
                return Ok(path);
            }
            println!("  install path must be absolute, try again");
        }
    }

    /// Ask for graffiti; empty is allowed, over-long is re-prompted.
    pub fn ask_graffiti(&mut self) -> Result<String> {
        loop {
            let answer = self.read_line("Graffiti (optional, max 32 bytes): ")?;
            if answer.len() <= MAX_GRAFFITI_BYTES {
                return Ok(answer);
            }
            println!("  graffiti is limited to {} bytes", MAX_GRAFFITI_BYTES);
        }
    }

    /// Yes/no confirmation. Empty answer means `default`.
    pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let answer = self
                .read_line(&format!("{} [{}]: ", question, hint))?
                .to_lowercase();
            match answer.as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("  please answer y or n"),
            }
        }
    }

    /// Free-form answer (used for the backup source path; existence is
    /// checked by the import step itself, a missing backup aborts the run).
    pub fn ask_line(&mut self, prompt: &str) -> Result<String> {
        self.read_line(&format!("{}: ", prompt))
    }

    /// Ask for a small number, looping on non-numeric answers. Empty picks
    /// `default`.
    pub fn ask_u32(&mut self, what: &str, default: u32) -> Result<u32> {
        loop {
            let answer = self.read_line(&format!("{} (default {}): ", what, default))?;
            if answer.is_empty() {
                return Ok(default);
            }
            match answer.parse() {
                Ok(value) => return Ok(value),
                Err(_) => println!("  '{}' is not a number", answer),
            }
        }
    }

    /// Numbered menu for the key-material source.
    pub fn ask_key_source(&mut self) -> Result<KeySource> {
        println!("How should validator keys be obtained?");
        println!("  1) generate a new mnemonic");
        println!("  2) import an existing validator_keys backup");
        println!("  3) restore from an existing mnemonic");
        loop {
            let answer = self.read_line("Choice [1-3]: ")?;
            match answer.as_str() {
                "1" => return Ok(KeySource::New),
                "2" => return Ok(KeySource::Import),
                "3" => return Ok(KeySource::Restore),
                _ => println!("  enter 1, 2 or 3"),
            }
        }
    }

    /// Collect a full configuration interactively.
    pub fn collect_config(&mut self) -> Result<InstallConfig> {
        let defaults = InstallConfig::default();

        let network = self.ask_choice("Network", Network::default())?;
        let execution_client = self.ask_choice("Execution client", ExecutionClient::default())?;
        let consensus_client = self.ask_choice("Consensus client", ConsensusClient::default())?;
        let install_path =
            self.ask_install_path(&defaults.install_path.to_string_lossy())?;
        let withdrawal_address = self.ask_address("Withdrawal address")?;
        let fee_recipient = self.ask_address("Fee recipient")?;
        let graffiti = self.ask_graffiti()?;

        let config = InstallConfig {
            install_path,
            network,
            execution_client,
            consensus_client,
            withdrawal_address,
            fee_recipient,
            graffiti,
        };
        config
            .validate()
            .map_err(|e| StakehostError::validation(e.to_string()))?;
        Ok(config)
    }
}
