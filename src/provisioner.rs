//! Provisioning orchestration
//!
//! `Provisioner` walks the host through every stage of `ProvisionStage`,
//! running each command through a `CommandExecutor` and each file through an
//! `ArtifactWriter`. The first failure marks the run failed at the stage it
//! happened in and is returned with that stage as context.
//!
//! When the writer targets a staged root, commands that change the host are
//! not run: the host's own `/etc/bind` is not what was written. The BIND
//! checkers still run against the staged files.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::command_runner::{CommandExecutor, CommandOutput};
use crate::command_traits::CommandArgs;
use crate::commands::apt::{AptInstallArgs, AptUpdateArgs};
use crate::commands::bind::{CheckConfArgs, CheckZoneArgs};
use crate::commands::firewall::{ufw_is_active, UfwAllowArgs, UfwStatusArgs};
use crate::commands::system::{SetHostnameArgs, SystemctlArgs};
use crate::config_file::ProvisionConfig;
use crate::files::{read_existing_serial, ArtifactWriter, WriteOutcome};
use crate::provision_state::{ProvisionContext, ProvisionStage};
use crate::types::ServiceAction;
use crate::zone::{RenderedFiles, Serial};

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub serial: Serial,
    pub stages: Vec<(ProvisionStage, u64)>,
    pub files: Vec<(PathBuf, WriteOutcome)>,
    /// Command lines in execution order
    pub commands: Vec<String>,
    pub firewall_opened: bool,
}

type ProgressFn = Box<dyn FnMut(&str)>;

pub struct Provisioner<E: CommandExecutor> {
    config: ProvisionConfig,
    executor: E,
    writer: ArtifactWriter,
    ctx: ProvisionContext,
    today: NaiveDate,
    progress: Option<ProgressFn>,
    files: Vec<(PathBuf, WriteOutcome)>,
    commands: Vec<String>,
    serial: Option<Serial>,
    firewall_opened: bool,
    host_changes: bool,
}

impl<E: CommandExecutor> Provisioner<E> {
    pub fn new(config: ProvisionConfig, executor: E, writer: ArtifactWriter) -> Self {
        let host_changes = writer.root().is_system_root();
        Self {
            config,
            executor,
            writer,
            ctx: ProvisionContext::new(),
            today: Local::now().date_naive(),
            progress: None,
            files: Vec::new(),
            commands: Vec::new(),
            serial: None,
            firewall_opened: false,
            host_changes,
        }
    }

    /// Run host-changing commands even though files go to a staged root
    pub fn with_host_changes(mut self, allowed: bool) -> Self {
        self.host_changes = allowed;
        self
    }

    /// Fix the date used for the zone serial
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Receive one line per step, e.g. "🔧 Check zone syntax..."
    pub fn with_progress(mut self, f: impl FnMut(&str) + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn context(&self) -> &ProvisionContext {
        &self.ctx
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run every stage. On error the context is left in `Failed`.
    pub fn run(&mut self) -> Result<ProvisionReport> {
        info!("Starting DNS setup for {}", self.config.domain);
        match self.run_stages() {
            Ok(()) => Ok(self.report()),
            Err(e) => {
                let stage = self.ctx.current_stage();
                self.ctx.fail();
                error!("Provisioning failed during '{}': {:#}", stage, e);
                Err(e.context(format!("Provisioning failed during: {}", stage)))
            }
        }
    }

    /// Only run the BIND syntax checkers against what is on disk
    pub fn check_only(&mut self) -> Result<()> {
        self.config.validate()?;
        self.run_checks()
    }

    fn run_stages(&mut self) -> Result<()> {
        self.enter(ProvisionStage::Preflight)?;
        self.config.validate().context("Invalid configuration")?;

        self.enter(ProvisionStage::InstallingPackages)?;
        self.step(&AptUpdateArgs)?;
        self.step(&AptInstallArgs {
            packages: self.config.packages.clone(),
        })?;

        self.enter(ProvisionStage::SettingHostname)?;
        self.step(&SetHostnameArgs {
            hostname: self.config.primary_ns(),
        })?;

        self.enter(ProvisionStage::WritingZone)?;
        let serial = Serial::next(
            self.today,
            read_existing_serial(self.writer.root(), &self.config),
        );
        self.serial = Some(serial);
        let rendered = RenderedFiles::render(&self.config, serial);
        self.writer.ensure_dir(&self.config.zone_dir)?;
        let (zone_path, zone_text) = &rendered.zone;
        self.write_file(zone_path, zone_text, "Zone file created")?;

        self.enter(ProvisionStage::WritingConfig)?;
        let (local_path, local_text) = &rendered.conf_local;
        self.write_file(local_path, local_text, "Zone added to BIND config")?;
        let (options_path, options_text) = &rendered.conf_options;
        self.write_file(options_path, options_text, "BIND options configured")?;

        self.enter(ProvisionStage::CheckingConfig)?;
        if self.files.iter().any(|(_, o)| *o == WriteOutcome::Skipped) {
            self.say("⏭  Skipping syntax checks: files were not written (dry run)");
        } else {
            self.run_checks()?;
        }

        self.enter(ProvisionStage::RestartingService)?;
        let restart = self.step(&SystemctlArgs {
            action: ServiceAction::ReloadOrRestart,
            unit: self.config.service.clone(),
        })?;
        self.step(&SystemctlArgs {
            action: ServiceAction::Enable,
            unit: self.config.service.clone(),
        })?;
        if restart.dry_run {
            self.say("⏭  Skipping service check: it was not restarted");
        } else {
            self.step(&SystemctlArgs {
                action: ServiceAction::IsActive,
                unit: self.config.service.clone(),
            })?;
        }

        self.enter(ProvisionStage::ConfiguringFirewall)?;
        self.configure_firewall()?;

        self.enter(ProvisionStage::Completed)?;
        info!("DNS setup for {} complete", self.config.domain);
        Ok(())
    }

    fn enter(&mut self, stage: ProvisionStage) -> Result<()> {
        self.ctx.transition_to(stage)?;
        Ok(())
    }

    fn run_checks(&mut self) -> Result<()> {
        let root = self.writer.root().clone();
        if root.is_system_root() {
            self.step(&CheckConfArgs::default())?;
        } else {
            // A staged tree has no top-level named.conf, check the fragments
            for path in [
                self.config.named_conf_local_path(),
                self.config.named_conf_options_path(),
            ] {
                self.step(&CheckConfArgs {
                    file: Some(root.resolve(&path)),
                })?;
            }
        }
        self.step(&CheckZoneArgs {
            zone: self.config.domain.clone(),
            file: root.resolve(&self.config.zone_file_path()),
        })?;
        Ok(())
    }

    /// Open the DNS port only when ufw is installed and enabled
    fn configure_firewall(&mut self) -> Result<()> {
        if !self.config.manage_firewall {
            info!("Firewall management disabled");
            return Ok(());
        }
        if !self.host_changes {
            info!("Staged root, leaving the host firewall untouched");
            return Ok(());
        }

        let status = match self.executor.execute(&UfwStatusArgs) {
            Ok(out) => out,
            Err(e) => {
                warn!("ufw unavailable, leaving firewall untouched: {:#}", e);
                return Ok(());
            }
        };
        self.commands.push(UfwStatusArgs.display_command());

        if !status.success || !ufw_is_active(&status.stdout) {
            info!("ufw not active, leaving firewall untouched");
            return Ok(());
        }

        self.step(&UfwAllowArgs {
            port: self.config.dns_port,
        })?;
        self.firewall_opened = true;
        Ok(())
    }

    fn step(&mut self, args: &dyn CommandArgs) -> Result<CommandOutput> {
        let description = args.description();
        let command_line = args.display_command();

        if args.is_destructive() && !self.host_changes {
            self.say(&format!("⏭  Staged root, not running: {}", command_line));
            return Ok(CommandOutput::skipped(&command_line));
        }

        self.say(&format!("🔧 {}...", description));

        let output = self.executor.execute(args)?;
        self.commands.push(command_line.clone());
        output
            .ensure_success(&description)
            .with_context(|| format!("Failed: {}", command_line))?;
        Ok(output)
    }

    fn write_file(&mut self, path: &Path, contents: &str, message: &str) -> Result<()> {
        let outcome = self.writer.write(path, contents)?;
        match &outcome {
            WriteOutcome::Written { .. } => self.say(&format!("✅ {}: {}", message, path.display())),
            WriteOutcome::Unchanged => self.say(&format!("✅ {} (unchanged): {}", message, path.display())),
            WriteOutcome::Skipped => self.say(&format!("[DRY RUN] Would write {}", path.display())),
        }
        self.files.push((path.to_path_buf(), outcome));
        Ok(())
    }

    fn say(&mut self, line: &str) {
        info!("{}", line);
        if let Some(progress) = self.progress.as_mut() {
            progress(line);
        }
    }

    fn report(&self) -> ProvisionReport {
        ProvisionReport {
            serial: self.serial.unwrap_or_else(|| Serial::for_date(self.today)),
            stages: self.ctx.stage_history().to_vec(),
            files: self.files.clone(),
            commands: self.commands.clone(),
            firewall_opened: self.firewall_opened,
        }
    }
}
