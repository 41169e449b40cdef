//! Type-safe external command contracts.
//!
//! Every host command bindsetup runs (`apt-get`, `hostnamectl`, `systemctl`,
//! the BIND checkers, `ufw`) is described by a struct implementing
//! `CommandArgs`. The struct is the single source of truth for the program
//! name, its arguments, its environment, and whether it mutates the host.
//!
//! The process-wide dry-run flag also lives here: when set, the runner skips
//! every command whose `is_destructive()` returns true.

use std::sync::atomic::{AtomicBool, Ordering};

static DRY_RUN: AtomicBool = AtomicBool::new(false);

/// Turn on dry-run mode for the rest of the process
pub fn enable_dry_run() {
    DRY_RUN.store(true, Ordering::SeqCst);
}

pub fn disable_dry_run() {
    DRY_RUN.store(false, Ordering::SeqCst);
}

pub fn is_dry_run() -> bool {
    DRY_RUN.load(Ordering::SeqCst)
}

/// Trait for typed command arguments.
///
/// # Contract
///
/// - `program()`: binary name resolved through `PATH` (e.g. `named-checkzone`).
/// - `to_cli_args()`: arguments exactly as the tool expects them.
/// - `get_env_vars()`: extra environment for the child.
/// - `is_destructive()`: true when the command changes host state. Read-only
///   commands still run in dry-run mode so the preview reflects reality.
///
/// # Example
///
/// ```
/// use bindsetup::command_traits::CommandArgs;
/// use bindsetup::commands::bind::CheckZoneArgs;
/// use std::path::PathBuf;
///
/// let args = CheckZoneArgs {
///     zone: "example.com".to_string(),
///     file: PathBuf::from("/etc/bind/zones/db.example.com"),
/// };
/// assert_eq!(args.program(), "named-checkzone");
/// assert_eq!(args.to_cli_args(), vec!["example.com", "/etc/bind/zones/db.example.com"]);
/// assert!(!args.is_destructive());
/// ```
pub trait CommandArgs {
    /// Program to execute
    fn program(&self) -> &'static str;

    /// Convert struct fields to command-line arguments.
    fn to_cli_args(&self) -> Vec<String>;

    /// Environment variables required by the command.
    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![]
    }

    /// Whether the command modifies the host.
    fn is_destructive(&self) -> bool;

    /// Human-readable progress line, e.g. "Install BIND9".
    fn description(&self) -> String;

    /// The full command line for logs and dry-run output.
    fn display_command(&self) -> String {
        let mut parts = vec![self.program().to_string()];
        parts.extend(self.to_cli_args());
        parts.join(" ")
    }
}
