//! Host identity and service management (`hostnamectl`, `systemctl`).

use crate::command_traits::CommandArgs;
use crate::types::ServiceAction;

// ============================================================================
// Set Hostname
// ============================================================================

/// `hostnamectl set-hostname <hostname>`
#[derive(Debug, Clone)]
pub struct SetHostnameArgs {
    pub hostname: String,
}

impl CommandArgs for SetHostnameArgs {
    fn program(&self) -> &'static str {
        "hostnamectl"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["set-hostname".to_string(), self.hostname.clone()]
    }

    fn is_destructive(&self) -> bool {
        true
    }

    fn description(&self) -> String {
        format!("Set hostname to {}", self.hostname)
    }
}

// ============================================================================
// Systemctl
// ============================================================================

/// `systemctl <action> <unit>`
#[derive(Debug, Clone)]
pub struct SystemctlArgs {
    pub action: ServiceAction,
    pub unit: String,
}

impl CommandArgs for SystemctlArgs {
    fn program(&self) -> &'static str {
        "systemctl"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![self.action.to_string(), self.unit.clone()]
    }

    fn is_destructive(&self) -> bool {
        self.action.mutates()
    }

    fn description(&self) -> String {
        match self.action {
            ServiceAction::ReloadOrRestart => format!("Restart {}", self.unit),
            ServiceAction::Enable => format!("Enable {} on boot", self.unit),
            ServiceAction::IsActive => format!("Check {} is running", self.unit),
        }
    }
}
