use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::config_file::ConfigOverrides;

/// bindsetup - provision an authoritative BIND9 DNS server
#[derive(Parser, Debug)]
#[command(name = "bindsetup")]
#[command(about = "Install and configure BIND9 as the authoritative server for one zone")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: show what would be executed without making changes.
    ///
    /// Commands that change the host (apt-get, hostnamectl, systemctl, ufw
    /// allow) are logged and skipped, and no files are written. Read-only
    /// commands such as `ufw status` still run.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Resolve every configured path under this directory instead of `/`
    #[arg(long, global = true, default_value = "/")]
    pub root: PathBuf,

    /// Do not require root privileges (also BINDSETUP_SKIP_ROOT_CHECK=1)
    #[arg(long, global = true)]
    pub skip_root_check: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install BIND9, write the zone and configuration, restart the service
    Setup {
        #[command(flatten)]
        source: ConfigSource,
    },
    /// Print (or write into a directory) the rendered files without touching the host
    Render {
        #[command(flatten)]
        source: ConfigSource,

        /// Write files under this directory instead of printing them
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Run named-checkconf and named-checkzone against the files on disk
    Check {
        #[command(flatten)]
        source: ConfigSource,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
    /// Write the default configuration to a JSON file
    InitConfig {
        /// Destination path
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the manual registrar steps for this configuration
    NextSteps {
        #[command(flatten)]
        source: ConfigSource,
    },
}

/// Where the provisioning configuration comes from
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigSource {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Zone apex, e.g. example.com
    #[arg(long)]
    pub domain: Option<String>,

    /// Address of this server (IPv4 or IPv6)
    #[arg(long)]
    pub ip: Option<IpAddr>,

    /// Directory holding the zone file
    #[arg(long)]
    pub zone_dir: Option<PathBuf>,

    /// Never touch the firewall
    #[arg(long)]
    pub no_firewall: bool,
}

impl ConfigSource {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            domain: self.domain.clone(),
            server_ip: self.ip,
            zone_dir: self.zone_dir.clone(),
            no_firewall: self.no_firewall,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
