//! stakehost - provisions a Linux host as a Docker-based Ethereum staking node
//!
//! The crate is organised as a pipeline over a validated [`InstallConfig`]:
//! pre-flight probes, host provisioning (accounts, groups, directories,
//! secrets), validator key orchestration through the external deposit CLI,
//! launcher script templating, and host integration (firewall, cron,
//! desktop shortcuts). Every privileged command runs through [`runner`],
//! which honours the global dry-run switch and verifies postconditions
//! instead of trusting exit codes silently.

pub mod cli;
pub mod config;
pub mod deposit;
pub mod error;
pub mod firewall;
pub mod install_state;
pub mod installer;
pub mod keys;
pub mod launchers;
pub mod probe;
pub mod process_guard;
pub mod prompts;
pub mod provision;
pub mod report;
pub mod runner;
pub mod schedule;
pub mod secrets;
pub mod types;

pub use config::InstallConfig;
pub use error::{Result, StakehostError};
pub use install_state::{SetupContext, SetupStage, SetupTransitionError};
pub use installer::{run_pipeline, KeyPlan};
pub use prompts::Prompter;
pub use report::{Outcome, RunReport};
pub use types::{ConsensusClient, ExecutionClient, KeySource, Network, NodeRole};
