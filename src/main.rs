mod cli;
mod commands;
mod config;
mod jobs;
mod paths;
mod progress;
mod tasks;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Settings;
use jobs::{JobQueue, PoolQueue};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub settings: Settings,
    pub settings_path: PathBuf,
    pub queue: Box<dyn JobQueue>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "netfleet", &mut io::stdout());
        return Ok(());
    }

    let settings_path = match cli.config {
        Some(path) => path,
        None => paths::settings_file()?,
    };
    let settings = Settings::load_from(&settings_path)?;
    let queue = PoolQueue::new(settings.workers)?;

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        settings,
        settings_path,
        queue: Box::new(queue),
    };

    match cli.command {
        Command::Inventory(args) => commands::devices::inventory(&ctx, &args),
        Command::Deploy(args) => commands::devices::deploy(&ctx, args),
        Command::Backup(args) => commands::devices::backup(&ctx, args),
        Command::Exec(args) => commands::devices::exec(&ctx, args),
        Command::Interfaces(args) => commands::devices::interfaces(&ctx, &args),
        Command::Configure(cmd) => commands::devices::configure(&ctx, cmd),
        Command::History(args) => commands::history::history(&ctx, &args),
        Command::Show(args) => commands::history::show(&ctx, &args),
        Command::Diff(args) => commands::history::diff(&ctx, &args),
        Command::Audit(args) => commands::audit::run(&ctx, &args),
        Command::Config(cmd) => commands::config::run(&ctx, cmd),
        Command::Completions { .. } => Ok(()),
    }
}
