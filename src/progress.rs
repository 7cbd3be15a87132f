//! Fan-out progress bar.
//!
//! Draws to stderr so `--json` output on stdout stays clean. Disabled
//! bars are no-ops.

use colored::Colorize;
use fleet::{HostResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

pub struct HostProgress {
    pb: Option<ProgressBar>,
}

impl HostProgress {
    /// `enabled` should be `!quiet && !json`.
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self { pb: None };
        }

        let pb = ProgressBar::new(0);
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { pb: Some(pb) }
    }
}

impl ProgressCallback for HostProgress {
    fn on_start(&self, hosts: usize) {
        if let Some(pb) = &self.pb {
            pb.set_length(hosts as u64);
            pb.enable_steady_tick(Duration::from_millis(100));
        }
    }

    fn on_host_complete(&self, result: &HostResult) {
        let Some(pb) = &self.pb else {
            return;
        };
        if let Some(fault) = result.fault() {
            pb.suspend(|| eprintln!("  {} {} ({})", "✗".red(), result.host, fault));
        }
        pb.set_message(result.host.clone());
        pb.inc(1);
    }

    fn on_finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }
}

impl Drop for HostProgress {
    fn drop(&mut self) {
        if let Some(pb) = &self.pb
            && !pb.is_finished()
        {
            pb.finish_and_clear();
        }
    }
}
