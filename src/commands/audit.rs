use anyhow::Result;
use colored::Colorize;
use registry::AuditStatus;

use super::{open_registry, print_json};
use crate::Context;
use crate::cli::AuditArgs;
use crate::ui;

pub fn run(ctx: &Context, args: &AuditArgs) -> Result<()> {
    let registry = open_registry(ctx)?;
    let entries = registry.audit_trail(args.tenant, args.limit)?;

    if args.json {
        return print_json(&entries);
    }

    ui::header("Audit trail");
    if entries.is_empty() {
        ui::dim("No entries.");
        return Ok(());
    }

    for entry in &entries {
        let status = match entry.status {
            AuditStatus::Success => entry.status.as_str().green(),
            AuditStatus::Fail => entry.status.as_str().red(),
        };
        let device = entry
            .device_id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        let hostname = entry.details["hostname"].as_str().unwrap_or_default();
        println!(
            "  {} {:<16} {:<8} tenant {:<4} device {:<6} {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            entry.action,
            status,
            entry.tenant_id,
            device,
            hostname
        );
    }
    Ok(())
}
