//! Pre-flight sanity checks for the provisioning host
//!
//! Verifies before anything is changed:
//! - Running with root privileges (EUID 0)
//! - The package and service managers are present
//!
//! The BIND checkers (`named-checkconf`, `named-checkzone`) are not listed:
//! they arrive with the `bind9utils` package the run installs.

use std::env;
use std::path::Path;

use crate::error::BindSetupError;

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
}

impl SanityCheckResult {
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && self.is_root
    }

    /// Multi-line explanation of what failed, empty when everything passed
    pub fn failure_report(&self) -> String {
        let mut lines = Vec::new();
        if !self.is_root {
            lines.push("❌ Please run as root or with sudo".to_string());
            lines.push("   Installing packages and writing /etc/bind requires root.".to_string());
        }
        if !self.missing_binaries.is_empty() {
            lines.push("❌ Missing required binaries:".to_string());
            for binary in &self.missing_binaries {
                lines.push(format!(
                    "   • {} (install: apt-get install {})",
                    binary,
                    package_for_binary(binary)
                ));
            }
        }
        lines.join("\n")
    }
}

const REQUIRED_BINARIES: &[&str] = &["apt-get", "hostnamectl", "systemctl"];

/// Only used when firewall management is enabled
const OPTIONAL_BINARIES: &[&str] = &["ufw"];

/// Check if a binary is available in PATH
pub fn binary_exists(name: &str) -> bool {
    let Some(path) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&path).any(|dir| is_executable(&dir.join(name)))
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Perform all sanity checks and return the result
pub fn verify_environment() -> SanityCheckResult {
    let missing = REQUIRED_BINARIES
        .iter()
        .filter(|b| !binary_exists(b))
        .map(|b| (*b).to_string())
        .collect();

    for binary in OPTIONAL_BINARIES {
        if !binary_exists(binary) {
            tracing::debug!("Optional binary not found: {}", binary);
        }
    }

    SanityCheckResult {
        missing_binaries: missing,
        is_root: is_running_as_root(),
    }
}

/// Map binary names to their Debian package names
fn package_for_binary(binary: &str) -> &'static str {
    match binary {
        "apt-get" => "apt",
        "hostnamectl" | "systemctl" => "systemd",
        "ufw" => "ufw",
        _ => "unknown",
    }
}

/// Set BINDSETUP_SKIP_ROOT_CHECK=1 to skip the root check
pub fn should_skip_root_check() -> bool {
    env::var("BINDSETUP_SKIP_ROOT_CHECK")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Run pre-flight checks, failing with a report if anything is missing
pub fn run_preflight_checks(skip_root: bool) -> anyhow::Result<()> {
    tracing::debug!("Running pre-flight sanity checks (skip_root={})", skip_root);

    let mut result = verify_environment();

    if skip_root || should_skip_root_check() {
        tracing::warn!("Root check skipped");
        result.is_root = true;
    }

    if !result.is_ok() {
        return Err(BindSetupError::system(format!(
            "Pre-flight check failed\n{}",
            result.failure_report()
        ))
        .into());
    }

    tracing::info!("Pre-flight checks passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_exists_sh() {
        assert!(binary_exists("sh"), "sh should be available");
    }

    #[test]
    fn test_binary_exists_nonexistent() {
        assert!(!binary_exists("this_binary_definitely_does_not_exist_12345"));
    }

    #[test]
    fn test_package_mapping() {
        assert_eq!(package_for_binary("apt-get"), "apt");
        assert_eq!(package_for_binary("systemctl"), "systemd");
    }

    #[test]
    fn test_sanity_result_is_ok() {
        let ok = SanityCheckResult {
            missing_binaries: vec![],
            is_root: true,
        };
        assert!(ok.is_ok());
        assert!(ok.failure_report().is_empty());

        let not_root = SanityCheckResult {
            missing_binaries: vec!["hostnamectl".to_string()],
            is_root: false,
        };
        assert!(!not_root.is_ok());
        let report = not_root.failure_report();
        assert!(report.contains("Please run as root or with sudo"));
        assert!(report.contains("hostnamectl (install: apt-get install systemd)"));
    }
}
