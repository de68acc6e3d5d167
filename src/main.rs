//! stakehost - main entry point
//!
//! Dispatches the CLI surface: the full install pipeline (interactive or
//! headless), config validation, the three key flows, and the individual
//! integration tools.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use stakehost::cli::{Cli, Commands, KeyCommands, ToolCommands};
use stakehost::config::InstallConfig;
use stakehost::error::{Result, StakehostError};
use stakehost::installer::{self, KeyPlan};
use stakehost::prompts::Prompter;
use stakehost::report::RunReport;
use stakehost::types::KeySource;
use stakehost::{firewall, keys, probe, process_guard, runner, schedule, secrets};

/// Initialize the tracing subscriber with RUST_LOG override, info default.
fn init_logger() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

fn main() {
    init_logger();
    info!("stakehost starting up");

    // Child cleanup on SIGINT/SIGTERM: an orphaned apt-get or deposit CLI
    // must not keep running after the installer dies.
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    let cli = Cli::parse_args();
    if cli.dry_run {
        runner::enable_dry_run();
        info!("Dry-run mode: no host state will be changed");
    }

    let outcome = match cli.command {
        Some(Commands::Validate { config }) => run_validate(&config),
        Some(Commands::Install {
            config,
            save_config,
        }) => run_install(config.as_deref(), save_config.as_deref()),
        Some(Commands::Keys { key_command }) => run_key_command(&key_command),
        Some(Commands::Tools { tool }) => run_tool_command(&tool),
        None => run_install(None, None),
    };

    if let Err(e) = outcome {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

/// Validate a configuration file and report the result.
fn run_validate(path: &Path) -> Result<()> {
    info!("Validating configuration file: {:?}", path);
    load_config(path)?;
    println!("✓ Configuration file is valid: {:?}", path);
    Ok(())
}

/// Run the installation pipeline, interactively or from a config file.
fn run_install(config_path: Option<&Path>, save_path: Option<&Path>) -> Result<()> {
    probe::run_preflight_checks();

    let (config, key_plan) = match config_path {
        Some(path) => {
            info!("Running headless installation with config: {:?}", path);
            // Headless runs manage key material separately (`stakehost keys`):
            // the deposit CLI prompts for the mnemonic and cannot run
            // unattended.
            (load_config(path)?, KeyPlan::Skip)
        }
        None => {
            let mut prompter = Prompter::stdin();
            let config = prompter.collect_config()?;

            if let Some(save) = save_path {
                config
                    .save_to_file(save)
                    .map_err(|e| StakehostError::config(e.to_string()))?;
                println!("✓ Configuration saved to {:?}", save);
                println!("  Run it later with: stakehost install --config {:?}", save);
                return Ok(());
            }

            let key_plan = collect_key_plan(&mut prompter)?;
            if !prompter.confirm("Proceed with installation?", true)? {
                println!("Aborted.");
                std::process::exit(1);
            }
            (config, key_plan)
        }
    };

    let (report, result) = installer::run_pipeline(&config, &key_plan);
    if !report.is_empty() {
        print!("{}", report);
    }
    result?;
    println!(
        "✓ Host is provisioned. Launchers live in {:?}",
        config.install_path
    );
    Ok(())
}

/// Turn the key-source menu choice into a concrete plan.
fn collect_key_plan<R: std::io::BufRead>(prompter: &mut Prompter<R>) -> Result<KeyPlan> {
    Ok(match prompter.ask_key_source()? {
        KeySource::New => KeyPlan::New {
            num_validators: prompter.ask_u32("Number of validators", 1)?,
        },
        KeySource::Import => KeyPlan::Import {
            source: PathBuf::from(prompter.ask_line("Backup directory to import from")?),
        },
        KeySource::Restore => KeyPlan::Restore {
            validator_start_index: prompter.ask_u32("First validator index", 0)?,
            num_validators: prompter.ask_u32("Number of validators", 1)?,
        },
    })
}

/// Run one key flow directly against an existing configuration.
fn run_key_command(command: &KeyCommands) -> Result<()> {
    probe::run_preflight_checks();

    match command {
        KeyCommands::New {
            config,
            num_validators,
        } => {
            let config = load_config(config)?;
            let outcome = keys::generate_new(&config, *num_validators)?;
            println!("✓ validator keys (new mnemonic): {}", outcome);
        }
        KeyCommands::Import { config, source } => {
            let config = load_config(config)?;
            let outcome = keys::import_from_backup(&config, source)?;
            println!("✓ validator keys (import): {}", outcome);
        }
        KeyCommands::Restore {
            config,
            start_index,
            num_validators,
        } => {
            let config = load_config(config)?;
            secrets::ensure_wallet_password(&config)?;
            let outcome = keys::restore_from_mnemonic(&config, *start_index, *num_validators)?;
            println!("✓ validator keys (restore): {}", outcome);
        }
    }
    Ok(())
}

/// Run one integration step directly against an existing configuration.
fn run_tool_command(tool: &ToolCommands) -> Result<()> {
    let mut report = RunReport::new();

    match tool {
        ToolCommands::Firewall { config } => {
            let config = load_config(config)?;
            firewall::apply_firewall(&config, &mut report)?;
        }
        ToolCommands::Cron { config } => {
            let config = load_config(config)?;
            schedule::register_cron(&config, &mut report)?;
        }
        ToolCommands::Shortcuts { config } => {
            let config = load_config(config)?;
            schedule::install_shortcuts(&config, &mut report)?;
        }
        ToolCommands::Jwt { config } => {
            let config = load_config(config)?;
            let outcome = secrets::ensure_jwt_secret(&config)?;
            report.record("jwt secret", outcome);
        }
    }

    print!("{}", report);
    Ok(())
}

/// Load and validate a configuration file.
fn load_config(path: &Path) -> Result<InstallConfig> {
    debug!("Loading configuration from {:?}", path);
    let config = InstallConfig::load_from_file(path)
        .map_err(|e| StakehostError::config(e.to_string()))?;
    config
        .validate()
        .map_err(|e| StakehostError::config(e.to_string()))?;
    Ok(config)
}
