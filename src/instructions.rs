//! Follow-up steps the operator has to perform by hand after a run.
//!
//! Delegation cannot be automated from the host: glue records and the
//! nameserver list live at the parent zone's registrar.

use std::fmt::Write as _;

use crate::config_file::ProvisionConfig;

/// Render the success banner plus manual next steps
pub fn render_next_steps(config: &ProvisionConfig) -> String {
    let ns = config.ns_fqdns();
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(out, "{:^60}", "🎉 SUCCESS! DNS Server Setup Complete");
    let _ = writeln!(out);
    let _ = writeln!(out, "📌 NEXT STEPS (Manual - REQUIRED):");
    let _ = writeln!(out, "1. Go to {} and log in", config.registrar_url);
    let _ = writeln!(out, "2. Register Glue Records:");
    for fqdn in &ns {
        let _ = writeln!(out, "   - {} → {}", fqdn, config.server_ip);
    }
    let _ = writeln!(out, "3. Set domain nameservers to:");
    for fqdn in &ns {
        let _ = writeln!(out, "   - {}", fqdn);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "🔍 Test:");
    for fqdn in &ns {
        let _ = writeln!(out, "   dig @{} {}", fqdn, config.domain);
    }

    out
}
