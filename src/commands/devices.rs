use anyhow::{Context as _, Result};
use colored::Colorize;
use dialoguer::Confirm;
use fleet::snippets::Snippet;
use fleet::{DeployReport, HostDescriptor, HostReport, inventory};
use registry::DeviceFilter;
use std::fs;

use super::{open_registry, print_json, run_job, services};
use crate::Context;
use crate::cli::{BackupArgs, ConfigureCommand, DeployArgs, DeviceArgs, ExecArgs, InventoryArgs};
use crate::progress::HostProgress;
use crate::tasks::{self, BackupReport, InterfacesReport, Versioning};
use crate::ui;

fn filter(tenant: Option<i64>, devices: &[i64]) -> DeviceFilter {
    let filter = match tenant {
        Some(id) => DeviceFilter::tenant(id),
        None => DeviceFilter::all(),
    };
    if devices.is_empty() {
        filter
    } else {
        filter.with_devices(devices.iter().copied())
    }
}

pub fn inventory(ctx: &Context, args: &InventoryArgs) -> Result<()> {
    let registry = open_registry(ctx)?;
    let hosts = inventory::build(&registry, &filter(args.tenant, &args.devices))?;

    if args.json {
        return print_json(&hosts);
    }

    ui::header("Inventory");
    if hosts.is_empty() {
        ui::dim("No devices with credentials match.");
        return Ok(());
    }
    print_hosts(&hosts);
    println!();
    ui::dim(&format!("{} hosts", hosts.len()));
    Ok(())
}

fn print_hosts(hosts: &[HostDescriptor]) {
    println!(
        "  {:<6} {:<24} {:<18} {:<8} {:<12} {}",
        "ID".bold(),
        "HOSTNAME".bold(),
        "ADDRESS".bold(),
        "PLATFORM".bold(),
        "STRATEGY".bold(),
        "TENANT".bold()
    );
    for host in hosts {
        println!(
            "  {:<6} {:<24} {:<18} {:<8} {:<12} {}",
            host.device_id,
            ui::truncate(&host.name, 24),
            format!("{}:{}", host.address, host.port),
            host.platform.as_str(),
            host.platform.strategy().as_str(),
            host.tenant_id
        );
    }
}

pub fn deploy(ctx: &Context, args: DeployArgs) -> Result<()> {
    let template = fs::read_to_string(&args.template)
        .with_context(|| format!("Could not read template {}", args.template.display()))?;
    let services = services(ctx, args.jobs)?;

    let targets = inventory::build(
        services.store.as_ref(),
        &filter(Some(args.tenant), &args.devices),
    )?;
    if !args.json && !ctx.quiet {
        ui::header(if args.dry_run { "Deploy (dry run)" } else { "Deploy" });
        print_hosts(&targets);
        println!();
    }

    if !args.dry_run && !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Push {} to {} hosts?", args.template.display(), targets.len()))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            ui::info("Deploy cancelled");
            return Ok(());
        }
    }

    let progress = HostProgress::new(!ctx.quiet && !args.json);
    let (tenant, devices, dry_run) = (args.tenant, args.devices, args.dry_run);
    let (snapshot, report): (_, DeployReport) = run_job(ctx, "deploy_config", move |_| {
        tasks::bulk_deploy(&services, tenant, &devices, &template, dry_run, &progress)
    })?;

    if args.json {
        return print_json(&snapshot);
    }

    ui::section("Results");
    for detail in &report.details {
        print_host_report(detail, ctx.verbose > 0 || dry_run);
    }
    println!();
    let summary = format!(
        "{} succeeded, {} failed",
        report.succeeded_count(),
        report.failed_count()
    );
    if report.is_success() {
        ui::success(&summary);
    } else {
        ui::warn(&summary);
    }
    Ok(())
}

fn print_host_report(report: &HostReport, show_output: bool) {
    let label = format!("{} ({})", report.hostname, report.ip);
    if report.failed {
        ui::error(&format!("{label}: {}", report.result));
        return;
    }
    ui::success(&label);
    if show_output && !report.result.trim().is_empty() {
        ui::block(&report.result);
    }
}

pub fn backup(ctx: &Context, args: BackupArgs) -> Result<()> {
    let services = services(ctx, args.jobs)?;
    let progress = HostProgress::new(!ctx.quiet && !args.json);

    let (snapshot, reports): (_, Vec<BackupReport>) = match (args.tenant, args.devices.as_slice()) {
        (None, [device]) => {
            let device = *device;
            run_job(ctx, "backup_config", move |_| {
                tasks::backup_device(&services, device).map(|report| vec![report])
            })?
        }
        _ => {
            let filter = filter(args.tenant, &args.devices);
            run_job(ctx, "backup_config", move |_| tasks::backup(&services, &filter, &progress))?
        }
    };

    if args.json {
        return print_json(&snapshot);
    }

    ui::header("Backup");
    for report in &reports {
        let label = format!("{} ({})", report.hostname, report.ip);
        match (&report.versioning, &report.error) {
            (Versioning::Failed { error }, _) => {
                ui::error(&format!("{label}: retrieved, versioning failed: {error}"));
            }
            (_, Some(error)) => ui::error(&format!("{label}: {error}")),
            (versioning, None) => {
                ui::success(&format!("{label}: {}", versioning.as_str()));
            }
        }
    }

    let failed = reports.iter().filter(|r| r.failed).count();
    println!();
    let summary = format!("{} backed up, {} failed", reports.len() - failed, failed);
    if failed == 0 {
        ui::success(&summary);
    } else {
        ui::warn(&summary);
    }
    Ok(())
}

pub fn exec(ctx: &Context, args: ExecArgs) -> Result<()> {
    let services = services(ctx, Some(1))?;
    let command = args.command.join(" ");
    let device = args.device;
    let (snapshot, report): (_, HostReport) = run_job(ctx, "execute_command", move |_| {
        tasks::execute_command(&services, device, &command)
    })?;

    if args.json {
        return print_json(&snapshot);
    }
    if report.failed {
        ui::error(&format!("{} ({}): {}", report.hostname, report.ip, report.result));
    } else {
        print!("{}", report.result);
    }
    Ok(())
}

pub fn interfaces(ctx: &Context, args: &DeviceArgs) -> Result<()> {
    let services = services(ctx, Some(1))?;
    let device = args.device;
    let (snapshot, report): (_, InterfacesReport) =
        run_job(ctx, "fetch_interfaces", move |_| tasks::fetch_interfaces(&services, device))?;

    if args.json {
        return print_json(&snapshot);
    }

    let host = &report.host;
    ui::header(&format!("Interfaces of {} ({})", host.hostname, host.ip));
    if host.failed {
        ui::error(&host.result);
        return Ok(());
    }
    if report.interfaces.is_empty() {
        ui::warn("Could not parse the interface summary, raw output follows");
        ui::block(&host.result);
        return Ok(());
    }

    println!(
        "  {:<28} {:<16} {:<22} {}",
        "INTERFACE".bold(),
        "ADDRESS".bold(),
        "STATUS".bold(),
        "PROTOCOL".bold()
    );
    for row in &report.interfaces {
        let status = if row.status == "up" {
            row.status.green()
        } else {
            row.status.yellow()
        };
        println!("  {:<28} {:<16} {:<22} {}", row.intf, row.ipaddr, status, row.proto);
    }
    Ok(())
}

pub fn configure(ctx: &Context, cmd: ConfigureCommand) -> Result<()> {
    let (target, snippet) = match cmd {
        ConfigureCommand::Ip {
            target,
            interface,
            address,
            mask,
        } => (target, Snippet::interface_address(&interface, &address, &mask)?),
        ConfigureCommand::Bgp {
            target,
            local_as,
            neighbor,
            remote_as,
        } => (target, Snippet::bgp_neighbor(&local_as, &neighbor, &remote_as)?),
        ConfigureCommand::Policy {
            target,
            name,
            action,
            sequence,
            prefix_list,
        } => (target, Snippet::route_map(&name, &action, &sequence, &prefix_list)?),
    };

    if !target.json && !ctx.quiet {
        ui::header(&format!("Applying to device {}", target.device));
        for line in snippet.lines() {
            ui::dim(&line);
        }
        println!();
    }

    let services = services(ctx, Some(1))?;
    let device = target.device;
    let action = snippet.action();
    let (snapshot, report): (_, HostReport) = run_job(ctx, action, move |_| {
        tasks::apply_snippet(&services, device, &snippet)
    })?;

    if target.json {
        return print_json(&snapshot);
    }
    print_host_report(&report, ctx.verbose > 0);
    Ok(())
}
