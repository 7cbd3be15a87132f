use anyhow::{Result, bail};

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::Settings;
use crate::paths;
use crate::ui;

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Init { force } => init(ctx, force),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let settings = &ctx.settings;

    ui::header("netfleet settings");

    ui::section("Paths");
    let file = ctx.settings_path.display().to_string();
    if ctx.settings_path.exists() {
        ui::kv("Settings file", &file);
    } else {
        ui::kv("Settings file", &format!("{file} (not found, using defaults)"));
    }
    ui::kv("Config directory", &paths::config_dir()?.display().to_string());
    ui::kv("State directory", &paths::state_dir()?.display().to_string());
    ui::kv("Registry", &settings.registry_path()?.display().to_string());
    ui::kv("Mirrors", &settings.mirror_path()?.display().to_string());

    ui::section("Execution");
    ui::kv("Parallel hosts", &settings.jobs.to_string());
    ui::kv("Job workers", &settings.workers.to_string());
    ui::kv(
        "Retry",
        &format!(
            "{} attempts, {}ms base delay, x{} backoff, {}ms cap",
            settings.retry.max_attempts,
            settings.retry.base_delay_ms,
            settings.retry.backoff_factor,
            settings.retry.max_delay_ms
        ),
    );

    ui::section("SSH");
    ui::kv("Binary", &settings.ssh.binary);
    ui::kv("Connect timeout", &format!("{}s", settings.ssh.connect_timeout_secs));
    ui::kv("Keep-alive", &format!("{}s", settings.ssh.keepalive_secs));
    ui::kv("Host key checking", &settings.ssh.strict_host_key_checking);

    ui::section("Commits");
    ui::kv(
        "Author",
        &format!("{} <{}>", settings.commit.author_name, settings.commit.author_email),
    );

    if !ctx.settings_path.exists() {
        println!();
        ui::dim("Run 'netfleet config init' to write these defaults.");
    }
    Ok(())
}

fn init(ctx: &Context, force: bool) -> Result<()> {
    let path = &ctx.settings_path;
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Settings::default().save_to(path)?;
    ui::success(&format!("Wrote {}", path.display()));
    Ok(())
}
