//! Zone file and BIND configuration templating
//!
//! Renders the three artefacts a run writes: the master zone file,
//! `named.conf.local` (zone declaration) and `named.conf.options`.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::config_file::ProvisionConfig;
use crate::error::{BindSetupError, Result};
use crate::types::RecordType;

/// TTL and SOA timers, all in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoaTimers {
    pub ttl: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub negative: u32,
}

impl Default for SoaTimers {
    fn default() -> Self {
        Self {
            ttl: 86400,
            refresh: 3600,
            retry: 1800,
            expire: 604800,
            negative: 86400,
        }
    }
}

impl SoaTimers {
    pub fn validate(&self) -> Result<()> {
        if self.ttl == 0 {
            return Err(BindSetupError::validation("TTL must be non-zero"));
        }
        if self.retry >= self.refresh {
            return Err(BindSetupError::validation(format!(
                "SOA retry ({}) must be shorter than refresh ({})",
                self.retry, self.refresh
            )));
        }
        if self.expire <= self.refresh {
            return Err(BindSetupError::validation(format!(
                "SOA expire ({}) must be longer than refresh ({})",
                self.expire, self.refresh
            )));
        }
        Ok(())
    }
}

/// Zone serial in `YYYYMMDDnn` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Serial(pub u32);

impl Serial {
    /// First serial of the given day (`YYYYMMDD01`)
    pub fn for_date(date: NaiveDate) -> Self {
        let day = date.year() as u32 * 10_000 + date.month() * 100 + date.day();
        Serial(day * 100 + 1)
    }

    /// Serial for a new write: the day's first serial, or one past `previous`
    /// when the existing zone already carries a serial at or beyond it.
    ///
    /// Addition wraps (RFC 1982), so `u32::MAX` is followed by `0`.
    pub fn next(today: NaiveDate, previous: Option<Serial>) -> Self {
        let base = Self::for_date(today);
        match previous {
            Some(prev) if prev >= base => Serial(prev.0.wrapping_add(1)),
            _ => base,
        }
    }

    /// RFC 1982 comparison: whether a secondary holding `other` sees `self`
    /// as newer
    pub fn follows(self, other: Serial) -> bool {
        let diff = self.0.wrapping_sub(other.0);
        diff != 0 && diff < (1 << 31)
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract the serial from existing zone text.
///
/// Finds the first `SOA` token outside `;` comments (any case) and returns
/// the third field after it: MNAME and RNAME come first. Parentheses only
/// group lines, so they are dropped before counting.
pub fn parse_serial(zone_text: &str) -> Option<Serial> {
    let mut fields = zone_text
        .lines()
        .map(|line| line.split(';').next().unwrap_or(""))
        .flat_map(str::split_whitespace)
        .flat_map(|tok| tok.split(['(', ')']))
        .filter(|tok| !tok.is_empty());

    fields.by_ref().find(|tok| tok.eq_ignore_ascii_case("SOA"))?;
    fields.nth(2)?.parse::<u32>().ok().map(Serial)
}

/// One `owner IN type value` line, column-aligned like hand-written zones
fn record_line(out: &mut String, owner: &str, rtype: &str, value: &str) {
    let _ = writeln!(out, "{:<7} IN      {:<7} {}", owner, rtype, value);
}

/// Render the master zone file
pub fn render_zone(config: &ProvisionConfig, serial: Serial) -> String {
    let t = &config.timers;
    let rtype = RecordType::for_address(&config.server_ip).to_string();
    let ip = config.server_ip.to_string();
    let mut out = String::new();

    let _ = writeln!(out, "$TTL    {}", t.ttl);
    let _ = writeln!(
        out,
        "@       IN      SOA     {}. {}. (",
        config.primary_ns(),
        config.rname()
    );
    let _ = writeln!(out, "                        {:<15} ; Serial", serial);
    let _ = writeln!(out, "                        {:<15} ; Refresh", t.refresh);
    let _ = writeln!(out, "                        {:<15} ; Retry", t.retry);
    let _ = writeln!(out, "                        {:<15} ; Expire", t.expire);
    let _ = writeln!(
        out,
        "                        {:<13} ) ; Negative Cache TTL",
        t.negative
    );

    out.push_str("\n; Name Servers\n");
    for fqdn in config.ns_fqdns() {
        record_line(&mut out, "@", "NS", &format!("{}.", fqdn));
    }

    out.push_str("\n; A records for name servers\n");
    for ns in &config.nameservers {
        record_line(&mut out, ns, &rtype, &ip);
    }

    out.push_str("\n; A records for domain\n");
    for host in &config.hosts {
        record_line(&mut out, host, &rtype, &ip);
    }

    out
}

/// Render `named.conf.local` declaring the zone as master
pub fn render_named_conf_local(config: &ProvisionConfig) -> String {
    format!(
        "\nzone \"{}\" {{\n    type master;\n    file \"{}\";\n}};\n",
        config.domain,
        config.zone_file_path().display()
    )
}

/// Render `named.conf.options` for an authoritative-only server
pub fn render_named_conf_options(config: &ProvisionConfig) -> String {
    format!(
        r#"
options {{
    directory "{}";
    recursion no;
    allow-transfer {{ none; }};
    allow-query {{ any; }};
    dnssec-validation auto;
    listen-on {{ any; }};
    listen-on-v6 {{ any; }};
}};
"#,
        config.cache_dir.display()
    )
}

/// The three rendered artefacts of one run, with their absolute target paths
#[derive(Debug, Clone)]
pub struct RenderedFiles {
    pub zone: (PathBuf, String),
    pub conf_local: (PathBuf, String),
    pub conf_options: (PathBuf, String),
}

impl RenderedFiles {
    pub fn render(config: &ProvisionConfig, serial: Serial) -> Self {
        Self {
            zone: (config.zone_file_path(), render_zone(config, serial)),
            conf_local: (config.named_conf_local_path(), render_named_conf_local(config)),
            conf_options: (
                config.named_conf_options_path(),
                render_named_conf_options(config),
            ),
        }
    }

    /// Iterate in write order: zone first, then the config fragments
    pub fn iter(&self) -> impl Iterator<Item = &(PathBuf, String)> {
        [&self.zone, &self.conf_local, &self.conf_options].into_iter()
    }
}
