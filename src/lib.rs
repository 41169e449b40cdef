//! bindsetup library
//!
//! Provisions a single-host authoritative BIND9 server: renders the zone and
//! configuration fragments, drives the host commands, and tracks progress.

pub mod cli;
pub mod command_runner;
pub mod command_traits;
pub mod commands;
pub mod config_file;
pub mod error;
pub mod files;
pub mod instructions;
pub mod process_guard;
pub mod provision_state;
pub mod provisioner;
pub mod sanity;
pub mod types;
pub mod zone;

pub use command_runner::{run_command_safe, CommandExecutor, CommandOutput, SystemExecutor};
pub use command_traits::{disable_dry_run, enable_dry_run, is_dry_run, CommandArgs};
pub use config_file::{ConfigOverrides, ProvisionConfig};
pub use error::BindSetupError;
pub use files::{ArtifactWriter, TargetRoot, WriteOutcome};
pub use instructions::render_next_steps;
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use provision_state::{ProvisionContext, ProvisionStage, StageTransitionError};
pub use provisioner::{ProvisionReport, Provisioner};
pub use types::{RecordType, ServiceAction};
pub use zone::{RenderedFiles, Serial, SoaTimers};
