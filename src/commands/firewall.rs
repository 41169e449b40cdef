//! Uncomplicated Firewall (`ufw`) probing and rule management.

use crate::command_traits::CommandArgs;

/// `ufw status`
#[derive(Debug, Clone, Default)]
pub struct UfwStatusArgs;

impl CommandArgs for UfwStatusArgs {
    fn program(&self) -> &'static str {
        "ufw"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["status".to_string()]
    }

    fn is_destructive(&self) -> bool {
        false
    }

    fn description(&self) -> String {
        "Query firewall status".to_string()
    }
}

/// Whether `ufw status` output reports an enabled firewall
pub fn ufw_is_active(status_stdout: &str) -> bool {
    status_stdout
        .lines()
        .any(|line| line.trim().eq_ignore_ascii_case("status: active"))
}

/// `ufw allow <port>`
#[derive(Debug, Clone)]
pub struct UfwAllowArgs {
    pub port: u16,
}

impl CommandArgs for UfwAllowArgs {
    fn program(&self) -> &'static str {
        "ufw"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["allow".to_string(), self.port.to_string()]
    }

    fn is_destructive(&self) -> bool {
        true
    }

    fn description(&self) -> String {
        format!("Open DNS port {} (UFW)", self.port)
    }
}
