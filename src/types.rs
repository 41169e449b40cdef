//! Type-safe enums shared across bindsetup
//!
//! Stringly-typed values (systemctl verbs, record types) are modelled as
//! enums so typos are caught at compile time.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use strum::{Display, EnumIter, EnumString};

/// systemctl verb applied to the nameserver unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum ServiceAction {
    ReloadOrRestart,
    Enable,
    IsActive,
}

impl ServiceAction {
    /// Whether the verb changes host state
    pub fn mutates(&self) -> bool {
        !matches!(self, Self::IsActive)
    }
}

/// Address record type for the configured server address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum RecordType {
    #[strum(serialize = "A")]
    A,
    #[strum(serialize = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Pick A for IPv4 and AAAA for IPv6
    pub fn for_address(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::A,
            IpAddr::V6(_) => Self::Aaaa,
        }
    }
}
