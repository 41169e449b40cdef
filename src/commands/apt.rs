//! Package installation through `apt-get`.

use crate::command_traits::CommandArgs;

/// `apt-get update -qq`
#[derive(Debug, Clone, Default)]
pub struct AptUpdateArgs;

impl CommandArgs for AptUpdateArgs {
    fn program(&self) -> &'static str {
        "apt-get"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["update".to_string(), "-qq".to_string()]
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())]
    }

    /// Refreshes the package index on disk.
    fn is_destructive(&self) -> bool {
        true
    }

    fn description(&self) -> String {
        "Update package index".to_string()
    }
}

/// `apt-get install -y -qq <packages>`
#[derive(Debug, Clone)]
pub struct AptInstallArgs {
    pub packages: Vec<String>,
}

impl CommandArgs for AptInstallArgs {
    fn program(&self) -> &'static str {
        "apt-get"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["install".to_string(), "-y".to_string(), "-qq".to_string()];
        args.extend(
            self.packages
                .iter()
                .filter(|p| !p.trim().is_empty())
                .cloned(),
        );
        args
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())]
    }

    fn is_destructive(&self) -> bool {
        true
    }

    fn description(&self) -> String {
        format!("Install {}", self.packages.join(", "))
    }
}
