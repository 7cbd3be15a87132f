pub mod audit;
pub mod config;
pub mod devices;
pub mod history;

use crate::Context;
use crate::jobs::{self, JobContext, JobSnapshot, JobStatus};
use crate::tasks::Services;
use anyhow::{Context as _, Result, bail};
use fleet::Dispatcher;
use fleet::session::ssh::SshConnector;
use registry::Registry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use vault::{ConfigVault, MirrorLayout};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Open the registry named in the settings.
pub fn open_registry(ctx: &Context) -> Result<Registry> {
    let path = ctx.settings.registry_path()?;
    if !path.exists() {
        bail!(
            "Registry not found at {} (set `registry` in {})",
            path.display(),
            ctx.settings_path.display()
        );
    }
    Registry::open(&path).with_context(|| format!("Failed to open registry {}", path.display()))
}

/// Wire the record store, SSH transport and version store together.
pub fn services(ctx: &Context, jobs: Option<usize>) -> Result<Services> {
    let registry = Arc::new(open_registry(ctx)?);
    let connector = SshConnector::new(ctx.settings.ssh_options()).context("SSH transport unavailable")?;
    let dispatcher = Dispatcher::new(Arc::new(connector))
        .with_jobs(jobs.unwrap_or(ctx.settings.jobs))
        .with_retry(ctx.settings.retry_config());

    let vault = match ConfigVault::new(MirrorLayout::new(ctx.settings.mirror_path()?)) {
        Ok(vault) => Some(Arc::new(vault.with_author(ctx.settings.author()))),
        Err(e) => {
            log::warn!("Configuration versioning disabled: {e}");
            None
        }
    };

    Ok(Services {
        store: registry.clone(),
        audit: registry,
        dispatcher,
        vault,
    })
}

/// Submit `task` to the job queue and wait for it.
///
/// Returns the final snapshot together with the decoded result.
pub fn run_job<T, F>(ctx: &Context, name: &str, task: F) -> Result<(JobSnapshot, T)>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&JobContext) -> Result<T> + Send + 'static,
{
    let id = ctx.queue.submit(
        name,
        Box::new(move |job| {
            log::debug!("Running {} ({})", job.name(), job.id());
            let value = task(job)?;
            serde_json::to_value(value).context("Failed to encode job result")
        }),
    )?;
    log::info!("Submitted {name} as job {id}");

    let snapshot = jobs::wait(ctx.queue.as_ref(), &id, POLL_INTERVAL)
        .with_context(|| format!("Job {id} disappeared from the queue"))?;

    match (snapshot.status, &snapshot.result) {
        (JobStatus::Succeeded, Some(value)) => {
            let result = serde_json::from_value(value.clone()).context("Failed to decode job result")?;
            Ok((snapshot, result))
        }
        _ => bail!(
            "{} {}: {}",
            name,
            snapshot.status.as_str(),
            snapshot.error.as_deref().unwrap_or("no result")
        ),
    }
}

/// Print a serializable value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
