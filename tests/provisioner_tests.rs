//! End-to-end provisioning runs against a staging root
//!
//! A recording executor stands in for the host: it logs every command line
//! and answers with scripted outputs, so the full stage sequence, the written
//! files, and failure handling can be checked without root. Host-changing
//! commands are switched back on for the staging root since nothing real runs.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Result;
use bindsetup::{
    ArtifactWriter, CommandArgs, CommandExecutor, CommandOutput, ProvisionConfig,
    ProvisionStage, Provisioner, Serial, TargetRoot, WriteOutcome,
};
use chrono::NaiveDate;
use tempfile::TempDir;

#[derive(Default)]
struct RecordingExecutor {
    calls: Vec<String>,
    /// Command line prefix -> (exit code, stdout)
    responses: HashMap<String, (i32, String)>,
    /// Programs that behave as if not installed
    missing: Vec<&'static str>,
}

impl RecordingExecutor {
    fn respond(mut self, prefix: &str, code: i32, stdout: &str) -> Self {
        self.responses
            .insert(prefix.to_string(), (code, stdout.to_string()));
        self
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&mut self, args: &dyn CommandArgs) -> Result<CommandOutput> {
        let line = args.display_command();
        self.calls.push(line.clone());

        if self.missing.contains(&args.program()) {
            anyhow::bail!("Failed to spawn {}", args.program());
        }

        let (code, stdout) = self
            .responses
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, r)| r.clone())
            .unwrap_or((0, String::new()));

        Ok(CommandOutput {
            stdout,
            stderr: if code == 0 { String::new() } else { "simulated failure".to_string() },
            exit_code: Some(code),
            success: code == 0,
            dry_run: false,
        })
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

fn provisioner(
    dir: &TempDir,
    config: ProvisionConfig,
    executor: RecordingExecutor,
) -> Provisioner<RecordingExecutor> {
    let writer = ArtifactWriter::new(TargetRoot::new(dir.path()), &config, false);
    Provisioner::new(config, executor, writer)
        .with_today(today())
        .with_host_changes(true)
}

fn staged(dir: &TempDir, path: &str) -> String {
    fs::read_to_string(dir.path().join(path.trim_start_matches('/'))).unwrap()
}

#[test]
fn test_full_run_executes_commands_in_order() {
    let dir = TempDir::new().unwrap();
    let executor = RecordingExecutor::default().respond("ufw status", 0, "Status: active\n");
    let mut p = provisioner(&dir, ProvisionConfig::default(), executor);

    let report = p.run().unwrap();
    assert!(p.context().is_complete());
    assert_eq!(report.serial, Serial(2026101601));
    assert!(report.firewall_opened);

    let zone_file = dir.path().join("etc/bind/zones/db.techinnovate.dpdns.org");
    let expected = vec![
        "apt-get update -qq".to_string(),
        "apt-get install -y -qq bind9 bind9utils".to_string(),
        "hostnamectl set-hostname ns1.techinnovate.dpdns.org".to_string(),
        format!(
            "named-checkconf {}",
            dir.path().join("etc/bind/named.conf.local").display()
        ),
        format!(
            "named-checkconf {}",
            dir.path().join("etc/bind/named.conf.options").display()
        ),
        format!("named-checkzone techinnovate.dpdns.org {}", zone_file.display()),
        "systemctl reload-or-restart bind9".to_string(),
        "systemctl enable bind9".to_string(),
        "systemctl is-active bind9".to_string(),
        "ufw status".to_string(),
        "ufw allow 53".to_string(),
    ];
    assert_eq!(p.executor().calls, expected);
    assert_eq!(report.commands, expected);
}

#[test]
fn test_full_run_writes_all_files() {
    let dir = TempDir::new().unwrap();
    let mut p = provisioner(&dir, ProvisionConfig::default(), RecordingExecutor::default());
    let report = p.run().unwrap();

    assert_eq!(report.files.len(), 3);
    assert!(report
        .files
        .iter()
        .all(|(_, o)| matches!(o, WriteOutcome::Written { backup: None })));

    let zone = staged(&dir, "/etc/bind/zones/db.techinnovate.dpdns.org");
    assert!(zone.contains("2026101601"));
    assert!(zone.contains("www     IN      A       50.116.10.187"));

    let local = staged(&dir, "/etc/bind/named.conf.local");
    assert!(local.contains("file \"/etc/bind/zones/db.techinnovate.dpdns.org\";"));

    let options = staged(&dir, "/etc/bind/named.conf.options");
    assert!(options.contains("recursion no;"));
}

#[test]
fn test_rerun_same_day_bumps_serial_and_backs_up() {
    let dir = TempDir::new().unwrap();
    provisioner(&dir, ProvisionConfig::default(), RecordingExecutor::default())
        .run()
        .unwrap();

    let mut second = provisioner(&dir, ProvisionConfig::default(), RecordingExecutor::default());
    let report = second.run().unwrap();
    assert_eq!(report.serial, Serial(2026101602));

    let zone_outcome = &report.files[0].1;
    let WriteOutcome::Written { backup: Some(backup) } = zone_outcome else {
        panic!("zone should have been backed up, got {:?}", zone_outcome);
    };
    assert!(fs::read_to_string(backup).unwrap().contains("2026101601"));

    // Config fragments did not change
    assert_eq!(report.files[1].1, WriteOutcome::Unchanged);
    assert_eq!(report.files[2].1, WriteOutcome::Unchanged);
}

#[test]
fn test_inactive_firewall_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let executor = RecordingExecutor::default().respond("ufw status", 0, "Status: inactive\n");
    let mut p = provisioner(&dir, ProvisionConfig::default(), executor);

    let report = p.run().unwrap();
    assert!(!report.firewall_opened);
    assert!(!p.executor().calls.iter().any(|c| c.starts_with("ufw allow")));
}

#[test]
fn test_missing_ufw_is_not_fatal() {
    let dir = TempDir::new().unwrap();
    let executor = RecordingExecutor {
        missing: vec!["ufw"],
        ..Default::default()
    };
    let mut p = provisioner(&dir, ProvisionConfig::default(), executor);
    assert!(p.run().is_ok());
    assert!(p.context().is_complete());
}

#[test]
fn test_firewall_disabled_skips_probe() {
    let dir = TempDir::new().unwrap();
    let mut config = ProvisionConfig::default();
    config.manage_firewall = false;
    let mut p = provisioner(&dir, config, RecordingExecutor::default());

    p.run().unwrap();
    assert!(!p.executor().calls.iter().any(|c| c.starts_with("ufw")));
}

#[test]
fn test_failed_zone_check_stops_before_restart() {
    let dir = TempDir::new().unwrap();
    let executor = RecordingExecutor::default().respond("named-checkzone", 1, "");
    let mut p = provisioner(&dir, ProvisionConfig::default(), executor);

    let err = p.run().unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("Checking configuration"), "got: {}", msg);
    assert!(msg.contains("Check zone syntax failed (exit code 1)"), "got: {}", msg);

    assert!(p.context().is_failed());
    assert_eq!(p.context().failed_at(), Some(ProvisionStage::CheckingConfig));
    assert!(!p.executor().calls.iter().any(|c| c.starts_with("systemctl")));
}

#[test]
fn test_inactive_service_fails_run() {
    let dir = TempDir::new().unwrap();
    let executor = RecordingExecutor::default().respond("systemctl is-active", 3, "inactive\n");
    let mut p = provisioner(&dir, ProvisionConfig::default(), executor);

    let err = p.run().unwrap_err();
    assert!(format!("{:#}", err).contains("Check bind9 is running failed"));
    assert_eq!(p.context().failed_at(), Some(ProvisionStage::RestartingService));
    assert!(!p.executor().calls.iter().any(|c| c.starts_with("ufw")));
}

#[test]
fn test_staged_root_leaves_host_alone() {
    let dir = TempDir::new().unwrap();
    let config = ProvisionConfig::default();
    let writer = ArtifactWriter::new(TargetRoot::new(dir.path()), &config, false);
    let executor = RecordingExecutor::default().respond("ufw status", 0, "Status: active\n");
    let mut p = Provisioner::new(config, executor, writer).with_today(today());

    let report = p.run().unwrap();
    assert!(p.context().is_complete());
    assert!(!report.firewall_opened);

    // Only the read-only checkers ran, against the staged files
    let calls = &p.executor().calls;
    assert_eq!(calls.len(), 3, "got: {:?}", calls);
    assert!(calls.iter().all(|c| c.starts_with("named-check")));
    assert_eq!(&report.commands, calls);

    assert!(report
        .files
        .iter()
        .all(|(_, o)| matches!(o, WriteOutcome::Written { .. })));
    assert!(staged(&dir, "/etc/bind/zones/db.techinnovate.dpdns.org").contains("2026101601"));
}

#[test]
fn test_existing_handwritten_serial_is_not_reused() {
    let dir = TempDir::new().unwrap();
    let zone_path = "/etc/bind/zones/db.techinnovate.dpdns.org";
    let on_disk = dir.path().join(zone_path.trim_start_matches('/'));
    fs::create_dir_all(on_disk.parent().unwrap()).unwrap();
    fs::write(
        &on_disk,
        "; SOA maintained by hand (see runbook)\n$TTL 3600\n@ in soa ns1.techinnovate.dpdns.org. admin.techinnovate.dpdns.org. (\n 2026101605 ; serial\n 3600 1800 604800 86400 )\n",
    )
    .unwrap();

    let report = provisioner(&dir, ProvisionConfig::default(), RecordingExecutor::default())
        .run()
        .unwrap();
    assert_eq!(report.serial, Serial(2026101606));
    assert!(staged(&dir, zone_path).contains("2026101606"));
}

#[test]
fn test_failed_install_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let executor = RecordingExecutor::default().respond("apt-get install", 100, "");
    let mut p = provisioner(&dir, ProvisionConfig::default(), executor);

    assert!(p.run().is_err());
    assert_eq!(p.context().failed_at(), Some(ProvisionStage::InstallingPackages));
    assert!(!dir.path().join("etc").exists());
}

#[test]
fn test_invalid_config_fails_in_preflight() {
    let dir = TempDir::new().unwrap();
    let mut config = ProvisionConfig::default();
    config.domain = "not a domain".to_string();
    let mut p = provisioner(&dir, config, RecordingExecutor::default());

    assert!(p.run().is_err());
    assert_eq!(p.context().failed_at(), Some(ProvisionStage::Preflight));
    assert!(p.executor().calls.is_empty());
}

#[test]
fn test_dry_run_writer_skips_checks() {
    let dir = TempDir::new().unwrap();
    let config = ProvisionConfig::default();
    let writer = ArtifactWriter::new(TargetRoot::new(dir.path()), &config, true);
    let mut p = Provisioner::new(config, RecordingExecutor::default(), writer).with_today(today());

    let report = p.run().unwrap();
    assert!(report.files.iter().all(|(_, o)| *o == WriteOutcome::Skipped));
    assert!(!p.executor().calls.iter().any(|c| c.starts_with("named-check")));
    assert!(!Path::new(&dir.path().join("etc")).exists());
}

#[test]
fn test_progress_lines_reported() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let dir = TempDir::new().unwrap();
    let lines = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&lines);
    let mut p = provisioner(&dir, ProvisionConfig::default(), RecordingExecutor::default())
        .with_progress(move |line| sink.borrow_mut().push(line.to_string()));

    p.run().unwrap();
    let lines = lines.borrow();
    assert!(lines.contains(&"🔧 Check zone syntax...".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("✅ Zone file created:")));
    assert!(lines.iter().any(|l| l.starts_with("✅ BIND options configured:")));
}

#[test]
fn test_ipv6_server_uses_aaaa_records() {
    let dir = TempDir::new().unwrap();
    let mut config = ProvisionConfig::default();
    config.domain = "example.net".to_string();
    config.server_ip = "2001:db8::53".parse().unwrap();
    let mut p = provisioner(&dir, config, RecordingExecutor::default());

    p.run().unwrap();
    let zone = staged(&dir, "/etc/bind/zones/db.example.net");
    assert!(zone.contains("ns1     IN      AAAA    2001:db8::53"));
}

#[test]
fn test_check_only_runs_checkers() {
    let dir = TempDir::new().unwrap();
    let mut p = provisioner(&dir, ProvisionConfig::default(), RecordingExecutor::default());
    p.check_only().unwrap();

    let calls = &p.executor().calls;
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|c| c.starts_with("named-check")));
}
