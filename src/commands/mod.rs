//! Typed argument structs for every external command.
//!
//! Each struct maps Rust fields to the exact flags the host tool expects.

pub mod apt;
pub mod bind;
pub mod firewall;
pub mod system;
