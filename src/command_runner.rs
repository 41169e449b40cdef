//! Type-safe command execution
//!
//! `run_command_safe` is the only sanctioned way to run a host command. It
//! guarantees:
//!
//! - Process group isolation and PID registration (see `process_guard`)
//! - Arguments come from a `CommandArgs` struct, never a shell string
//! - Dry-run mode skips destructive commands but still runs read-only ones
//!
//! The `CommandExecutor` trait is the seam the provisioner drives; production
//! code uses `SystemExecutor`, tests substitute a recorder.

use anyhow::{Context, Result};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use crate::command_traits::{is_dry_run, CommandArgs};
use crate::error::BindSetupError;
use crate::process_guard::{ChildRegistry, CommandProcessGroup};

/// Output from a command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    pub success: bool,
    /// True when the command was skipped because of dry-run mode.
    pub dry_run: bool,
}

impl CommandOutput {
    /// Synthetic successful output for a skipped command
    pub fn skipped(command_line: &str) -> Self {
        Self {
            stdout: format!("[DRY RUN] Skipped: {}\n", command_line),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
            dry_run: true,
        }
    }

    /// Check if the command succeeded and return an error if not.
    pub fn ensure_success(&self, context: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            let code = self.exit_code.unwrap_or(-1);
            Err(BindSetupError::command(format!(
                "{} failed (exit code {}): {}",
                context,
                code,
                self.stderr.trim()
            ))
            .into())
        }
    }
}

/// Execute a host command with type-safe arguments.
///
/// # Returns
///
/// - `Ok(output)` with `success` reflecting the exit status
/// - `Err` if the binary cannot be spawned or waited on
pub fn run_command_safe<T: CommandArgs + ?Sized>(args: &T) -> Result<CommandOutput> {
    let program = args.program();
    let cli_args = args.to_cli_args();
    let env_vars = args.get_env_vars();
    let command_line = args.display_command();

    if is_dry_run() && args.is_destructive() {
        info!("[DRY RUN] Would run: {}", command_line);
        return Ok(CommandOutput::skipped(&command_line));
    }

    debug!(program, args = ?cli_args, env = ?env_vars, "run_command_safe");

    let mut cmd = Command::new(program);
    cmd.args(&cli_args)
        .envs(env_vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .in_new_process_group();

    let child = cmd
        .spawn()
        .with_context(|| format!("Failed to spawn {}", program))?;
    let pid = child.id();

    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.register(pid);
    }

    let output = child.wait_with_output();

    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.unregister(pid);
    }

    let output = output.with_context(|| format!("Failed waiting for {}", program))?;
    let exit_code = output.status.code();
    let success = output.status.success();

    if success {
        debug!("{} exited successfully", command_line);
    } else {
        warn!("{} failed with exit code {}", command_line, exit_code.unwrap_or(-1));
    }

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code,
        success,
        dry_run: false,
    })
}

/// Something that can run a typed command.
pub trait CommandExecutor {
    fn execute(&mut self, args: &dyn CommandArgs) -> Result<CommandOutput>;
}

/// Runs commands on the real host through `run_command_safe`.
#[derive(Debug, Default)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn execute(&mut self, args: &dyn CommandArgs) -> Result<CommandOutput> {
        run_command_safe(args)
    }
}
