use anyhow::{Result, bail};
use colored::Colorize;

use super::{print_json, services};
use crate::Context;
use crate::cli::{DiffArgs, HistoryArgs, ShowArgs};
use crate::tasks;
use crate::ui;

pub fn history(ctx: &Context, args: &HistoryArgs) -> Result<()> {
    let services = services(ctx, None)?;
    let commits = tasks::config_history(&services, args.device, args.limit)?;

    if args.json {
        return print_json(&commits);
    }

    ui::header(&format!("Configuration history of device {}", args.device));
    if commits.is_empty() {
        ui::dim("No commits yet.");
        return Ok(());
    }
    for commit in &commits {
        println!(
            "  {} {} {}",
            commit.short_hash().yellow(),
            commit.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            ui::truncate(commit.message.lines().next().unwrap_or_default(), 60)
        );
        ui::dim(&format!("  by {}", commit.author));
    }
    Ok(())
}

pub fn show(ctx: &Context, args: &ShowArgs) -> Result<()> {
    let services = services(ctx, None)?;
    match tasks::config_at(&services, args.device, &args.commit)? {
        Some(content) => {
            print!("{content}");
            Ok(())
        }
        None => bail!(
            "No configuration of device {} at commit {}",
            args.device,
            args.commit
        ),
    }
}

pub fn diff(ctx: &Context, args: &DiffArgs) -> Result<()> {
    let services = services(ctx, None)?;
    let Some(diff) = tasks::config_diff(&services, args.device, &args.from, &args.to)? else {
        bail!(
            "Device {} has no configuration at {} or {}",
            args.device,
            args.from,
            args.to
        );
    };

    if diff.is_empty() {
        ui::info("No differences");
        return Ok(());
    }
    for line in diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("{}", line.bold());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else {
            println!("{line}");
        }
    }
    Ok(())
}
