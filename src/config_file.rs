//! Provisioning configuration: defaults, JSON load/save and validation.
//!
//! Every field has a default so a partial JSON file only needs to name what
//! differs from the stock single-host setup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::error::{BindSetupError, Result};
use crate::zone::SoaTimers;

/// Longest presentation-format domain name accepted
const MAX_DOMAIN_LEN: usize = 253;
/// Longest single label
const MAX_LABEL_LEN: usize = 63;

/// Configuration for one provisioning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    // Zone
    pub domain: String, // Stored without the trailing root dot
    pub server_ip: IpAddr,
    pub nameservers: Vec<String>, // Relative labels, first one is the primary
    pub hosts: Vec<String>,       // Owner names pointed at server_ip ("@" is the apex)
    pub admin_mailbox: String,
    pub timers: SoaTimers,

    // Filesystem layout
    pub bind_dir: PathBuf,
    pub zone_dir: PathBuf,
    pub cache_dir: PathBuf,

    // Host
    pub packages: Vec<String>,
    pub service: String,
    pub dns_port: u16,
    pub manage_firewall: bool,

    pub registrar_url: String,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            domain: "techinnovate.dpdns.org".to_string(),
            server_ip: IpAddr::from([50, 116, 10, 187]),
            nameservers: vec!["ns1".to_string(), "ns2".to_string()],
            hosts: vec!["@".to_string(), "www".to_string()],
            admin_mailbox: "admin".to_string(),
            timers: SoaTimers::default(),
            bind_dir: PathBuf::from("/etc/bind"),
            zone_dir: PathBuf::from("/etc/bind/zones"),
            cache_dir: PathBuf::from("/var/cache/bind"),
            packages: vec!["bind9".to_string(), "bind9utils".to_string()],
            service: "bind9".to_string(),
            dns_port: 53,
            manage_firewall: true,
            registrar_url: "https://dpdns.org".to_string(),
        }
    }
}

/// Command-line values layered over the file/default configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub domain: Option<String>,
    pub server_ip: Option<IpAddr>,
    pub zone_dir: Option<PathBuf>,
    pub no_firewall: bool,
}

/// Drop the root dot of an absolute name ("example.com." -> "example.com")
pub fn normalize_domain(name: &str) -> String {
    name.trim().strip_suffix('.').unwrap_or(name.trim()).to_string()
}

impl ProvisionConfig {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BindSetupError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut config: Self = serde_json::from_str(&content)?;
        config.domain = normalize_domain(&config.domain);
        Ok(config)
    }

    /// Load from `path` if given, otherwise start from defaults, then apply overrides
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(overrides);
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref domain) = overrides.domain {
            self.domain = normalize_domain(domain);
        }
        if let Some(ip) = overrides.server_ip {
            self.server_ip = ip;
        }
        if let Some(ref dir) = overrides.zone_dir {
            self.zone_dir = dir.clone();
        }
        if overrides.no_firewall {
            self.manage_firewall = false;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_domain_name(&self.domain)?;

        if self.nameservers.is_empty() {
            return Err(BindSetupError::validation(
                "At least one nameserver label must be specified",
            ));
        }
        for ns in &self.nameservers {
            checked_label(ns, "nameserver label")?;
        }
        // FQDN of every nameserver must itself be a legal name
        for fqdn in self.ns_fqdns() {
            validate_domain_name(&fqdn)?;
        }

        for host in &self.hosts {
            if host != "@" {
                checked_label(host, "host label")?;
            }
        }

        checked_label(&self.admin_mailbox, "admin mailbox")?;
        self.timers.validate()?;

        for (name, dir) in [
            ("bind_dir", &self.bind_dir),
            ("zone_dir", &self.zone_dir),
            ("cache_dir", &self.cache_dir),
        ] {
            if !dir.is_absolute() {
                return Err(BindSetupError::validation(format!(
                    "{} must be an absolute path, got {:?}",
                    name, dir
                )));
            }
        }

        if self.packages.iter().all(|p| p.trim().is_empty()) {
            return Err(BindSetupError::validation("At least one package must be specified"));
        }
        if self.service.trim().is_empty() {
            return Err(BindSetupError::validation("Service name must be specified"));
        }
        if self.dns_port == 0 {
            return Err(BindSetupError::validation("DNS port must be non-zero"));
        }

        Ok(())
    }

    /// FQDN of the primary nameserver (also used as the host name)
    pub fn primary_ns(&self) -> String {
        self.ns_fqdns().into_iter().next().unwrap_or_else(|| self.domain.clone())
    }

    /// FQDNs of all nameservers, without trailing dot
    pub fn ns_fqdns(&self) -> Vec<String> {
        self.nameservers
            .iter()
            .map(|ns| format!("{}.{}", ns, self.domain))
            .collect()
    }

    /// SOA RNAME (mailbox encoded as a domain name), without trailing dot
    pub fn rname(&self) -> String {
        format!("{}.{}", self.admin_mailbox, self.domain)
    }

    pub fn zone_file_path(&self) -> PathBuf {
        self.zone_dir.join(format!("db.{}", self.domain))
    }

    pub fn named_conf_local_path(&self) -> PathBuf {
        self.bind_dir.join("named.conf.local")
    }

    pub fn named_conf_options_path(&self) -> PathBuf {
        self.bind_dir.join("named.conf.options")
    }
}

/// What is wrong with a DNS label, if anything
fn label_problem(label: &str) -> Option<String> {
    if label.is_empty() {
        return Some("label must not be empty".to_string());
    }
    if label.len() > MAX_LABEL_LEN {
        return Some(format!("'{}' exceeds {} characters", label, MAX_LABEL_LEN));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Some(format!("'{}' must not start or end with a hyphen", label));
    }
    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Some(format!(
            "'{}' can only contain letters, numbers, and hyphens",
            label
        ));
    }
    None
}

/// Validate a single DNS label (letters, digits, hyphen; no edge hyphens)
pub fn validate_label(label: &str) -> Result<()> {
    match label_problem(label) {
        Some(problem) => Err(BindSetupError::validation(format!("Label {}", problem))),
        None => Ok(()),
    }
}

fn checked_label(label: &str, what: &str) -> Result<()> {
    match label_problem(label) {
        Some(problem) => Err(BindSetupError::validation(format!(
            "Invalid {}: {}",
            what, problem
        ))),
        None => Ok(()),
    }
}

/// Validate a fully qualified domain name given without the trailing dot
pub fn validate_domain_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BindSetupError::validation("Domain must be specified"));
    }
    if name.ends_with('.') {
        return Err(BindSetupError::validation(format!(
            "Domain '{}' must be given without the trailing dot",
            name
        )));
    }
    if name.len() > MAX_DOMAIN_LEN {
        return Err(BindSetupError::validation(format!(
            "Domain '{}' exceeds {} characters",
            name, MAX_DOMAIN_LEN
        )));
    }
    if !name.contains('.') {
        return Err(BindSetupError::validation(format!(
            "Domain '{}' must have at least two labels",
            name
        )));
    }
    for label in name.split('.') {
        checked_label(label, &format!("domain '{}'", name))?;
    }
    Ok(())
}
