//! Provisioning state machine
//!
//! `ProvisionContext` is the single owner of run progress. Stages only move
//! forward one step at a time; any non-terminal stage may fail.
//!
//! ```text
//! NotStarted → Preflight → InstallingPackages → SettingHostname
//!   → WritingZone → WritingConfig → CheckingConfig → RestartingService
//!   → ConfiguringFirewall → Completed
//!
//! (any non-terminal stage → Failed)
//! ```

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ProvisionStage {
    NotStarted = 0,
    Preflight = 1,
    InstallingPackages = 2,
    SettingHostname = 3,
    WritingZone = 4,
    WritingConfig = 5,
    CheckingConfig = 6,
    RestartingService = 7,
    ConfiguringFirewall = 8,
    Completed = 9,
    Failed = 255,
}

impl ProvisionStage {
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::Preflight),
            Self::Preflight => Some(Self::InstallingPackages),
            Self::InstallingPackages => Some(Self::SettingHostname),
            Self::SettingHostname => Some(Self::WritingZone),
            Self::WritingZone => Some(Self::WritingConfig),
            Self::WritingConfig => Some(Self::CheckingConfig),
            Self::CheckingConfig => Some(Self::RestartingService),
            Self::RestartingService => Some(Self::ConfiguringFirewall),
            Self::ConfiguringFirewall => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Preflight => "Running pre-flight checks",
            Self::InstallingPackages => "Installing BIND9",
            Self::SettingHostname => "Setting hostname",
            Self::WritingZone => "Writing zone file",
            Self::WritingConfig => "Writing BIND configuration",
            Self::CheckingConfig => "Checking configuration",
            Self::RestartingService => "Restarting BIND9",
            Self::ConfiguringFirewall => "Configuring firewall",
            Self::Completed => "DNS server setup complete",
            Self::Failed => "DNS server setup failed",
        }
    }

    pub const fn progress_percent(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Preflight => 5,
            Self::InstallingPackages => 15,
            Self::SettingHostname => 40,
            Self::WritingZone => 50,
            Self::WritingConfig => 60,
            Self::CheckingConfig => 70,
            Self::RestartingService => 80,
            Self::ConfiguringFirewall => 95,
            Self::Completed => 100,
            Self::Failed => 0,
        }
    }

    /// All stages in order (excluding Failed)
    pub const fn all_stages() -> &'static [Self] {
        &[
            Self::NotStarted,
            Self::Preflight,
            Self::InstallingPackages,
            Self::SettingHostname,
            Self::WritingZone,
            Self::WritingConfig,
            Self::CheckingConfig,
            Self::RestartingService,
            Self::ConfiguringFirewall,
            Self::Completed,
        ]
    }
}

impl fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageTransitionError {
    #[error("Cannot skip from {from} to {to}")]
    SkippedStage {
        from: ProvisionStage,
        to: ProvisionStage,
    },

    #[error("Cannot go backwards from {from} to {to}")]
    BackwardTransition {
        from: ProvisionStage,
        to: ProvisionStage,
    },

    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: ProvisionStage },

    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: ProvisionStage },
}

/// Tracks the stage of one provisioning run.
///
/// ```
/// use bindsetup::provision_state::{ProvisionContext, ProvisionStage};
///
/// let mut ctx = ProvisionContext::new();
/// ctx.transition_to(ProvisionStage::Preflight).unwrap();
/// assert_eq!(ctx.current_stage(), ProvisionStage::Preflight);
/// assert!(ctx.transition_to(ProvisionStage::WritingZone).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ProvisionContext {
    current: ProvisionStage,
    failed_at: Option<ProvisionStage>,
    /// (stage entered, unix timestamp)
    stage_history: Vec<(ProvisionStage, u64)>,
}

impl Default for ProvisionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvisionContext {
    pub fn new() -> Self {
        Self {
            current: ProvisionStage::NotStarted,
            failed_at: None,
            stage_history: Vec::with_capacity(ProvisionStage::all_stages().len()),
        }
    }

    #[inline]
    pub fn current_stage(&self) -> ProvisionStage {
        self.current
    }

    #[inline]
    pub fn failed_at(&self) -> Option<ProvisionStage> {
        self.failed_at
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current == ProvisionStage::Completed
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.current == ProvisionStage::Failed
    }

    #[inline]
    pub fn progress_percent(&self) -> u8 {
        self.current.progress_percent()
    }

    pub fn stage_history(&self) -> &[(ProvisionStage, u64)] {
        &self.stage_history
    }

    /// Transition to `target`, which must be exactly the next stage.
    pub fn transition_to(&mut self, target: ProvisionStage) -> Result<(), StageTransitionError> {
        if self.current.is_terminal() {
            return Err(StageTransitionError::FromTerminalState { from: self.current });
        }
        if target == ProvisionStage::Failed {
            self.fail();
            return Ok(());
        }
        if target == self.current {
            return Err(StageTransitionError::AlreadyAtStage { stage: target });
        }
        if target.order() < self.current.order() {
            return Err(StageTransitionError::BackwardTransition {
                from: self.current,
                to: target,
            });
        }
        if self.current.next() != Some(target) {
            return Err(StageTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }
        self.enter(target);
        Ok(())
    }

    /// Mark the run failed at the current stage. No-op once terminal.
    pub fn fail(&mut self) {
        if self.current.is_terminal() {
            return;
        }
        self.failed_at = Some(self.current);
        self.enter(ProvisionStage::Failed);
    }

    fn enter(&mut self, stage: ProvisionStage) {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.stage_history.push((stage, ts));
        tracing::debug!("Stage: {} -> {}", self.current, stage);
        self.current = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk_to(ctx: &mut ProvisionContext, stage: ProvisionStage) {
        while ctx.current_stage() != stage {
            let next = ctx.current_stage().next().unwrap();
            ctx.transition_to(next).unwrap();
        }
    }

    #[test]
    fn test_full_forward_run() {
        let mut ctx = ProvisionContext::new();
        walk_to(&mut ctx, ProvisionStage::Completed);
        assert!(ctx.is_complete());
        assert_eq!(ctx.progress_percent(), 100);
        assert_eq!(ctx.stage_history().len(), ProvisionStage::all_stages().len() - 1);
        assert_eq!(
            ctx.transition_to(ProvisionStage::Failed),
            Err(StageTransitionError::FromTerminalState {
                from: ProvisionStage::Completed
            })
        );
    }

    #[test]
    fn test_skip_and_backward_rejected() {
        let mut ctx = ProvisionContext::new();
        walk_to(&mut ctx, ProvisionStage::InstallingPackages);

        assert_eq!(
            ctx.transition_to(ProvisionStage::WritingZone),
            Err(StageTransitionError::SkippedStage {
                from: ProvisionStage::InstallingPackages,
                to: ProvisionStage::WritingZone,
            })
        );
        assert!(matches!(
            ctx.transition_to(ProvisionStage::Preflight),
            Err(StageTransitionError::BackwardTransition { .. })
        ));
        assert!(matches!(
            ctx.transition_to(ProvisionStage::InstallingPackages),
            Err(StageTransitionError::AlreadyAtStage { .. })
        ));
        assert!(ctx.transition_to(ProvisionStage::SettingHostname).is_ok());
    }

    #[test]
    fn test_fail_records_stage() {
        let mut ctx = ProvisionContext::new();
        walk_to(&mut ctx, ProvisionStage::InstallingPackages);
        ctx.fail();
        assert!(ctx.is_failed());
        assert_eq!(ctx.failed_at(), Some(ProvisionStage::InstallingPackages));

        // Terminal: further failure or advance changes nothing
        ctx.fail();
        assert_eq!(ctx.failed_at(), Some(ProvisionStage::InstallingPackages));
        assert!(ctx.transition_to(ProvisionStage::SettingHostname).is_err());
    }
}
