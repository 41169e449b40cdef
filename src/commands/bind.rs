//! BIND's own syntax checkers. Both are read-only and run even in dry-run mode.

use std::path::PathBuf;

use crate::command_traits::CommandArgs;

/// `named-checkconf [<file>]`
#[derive(Debug, Clone, Default)]
pub struct CheckConfArgs {
    /// Config file to check; BIND's compiled-in default when `None`
    pub file: Option<PathBuf>,
}

impl CommandArgs for CheckConfArgs {
    fn program(&self) -> &'static str {
        "named-checkconf"
    }

    fn to_cli_args(&self) -> Vec<String> {
        self.file
            .iter()
            .map(|f| f.display().to_string())
            .collect()
    }

    fn is_destructive(&self) -> bool {
        false
    }

    fn description(&self) -> String {
        "Check BIND config".to_string()
    }
}

/// `named-checkzone <zone> <file>`
#[derive(Debug, Clone)]
pub struct CheckZoneArgs {
    pub zone: String,
    pub file: PathBuf,
}

impl CommandArgs for CheckZoneArgs {
    fn program(&self) -> &'static str {
        "named-checkzone"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![self.zone.clone(), self.file.display().to_string()]
    }

    fn is_destructive(&self) -> bool {
        false
    }

    fn description(&self) -> String {
        "Check zone syntax".to_string()
    }
}
