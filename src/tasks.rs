//! Top-level operations run as jobs.
//!
//! Each function resolves records, drives the dispatcher and, where the
//! operation changes or captures device state, writes an audit entry.

use anyhow::{Context, Result};
use fleet::session::check_output;
use fleet::snippets::{InterfaceRow, Snippet, parse_interface_brief};
use fleet::{
    DeployReport, Dispatcher, FaultKind, HostDescriptor, HostReport, HostResult, NoProgress,
    ProgressCallback, inventory,
};
use registry::{
    AuditSink, AuditStatus, DeviceFilter, DeviceId, NewAuditEntry, RecordStore, TenantId,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::slice;
use std::sync::Arc;
use vault::{CommitRecord, ConfigVault, TenantRepository};

/// Command whose output lists interface addresses and states.
pub const INTERFACE_BRIEF: &str = "show ip interface brief";

/// Everything an operation needs, injected once at startup.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn RecordStore>,
    pub audit: Arc<dyn AuditSink>,
    pub dispatcher: Dispatcher,
    /// `None` when git is not installed
    pub vault: Option<Arc<ConfigVault>>,
}

/// What happened to a retrieved configuration in the version store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Versioning {
    Committed,
    Unchanged,
    /// Retrieval failed or the tenant has no remote
    Skipped,
    Failed { error: String },
}

impl Versioning {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Unchanged => "unchanged",
            Self::Skipped => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Outcome of backing up one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupReport {
    pub device_id: DeviceId,
    pub hostname: String,
    pub ip: String,
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<FaultKind>,
    pub versioning: Versioning,
}

impl BackupReport {
    fn new(result: &HostResult, versioning: Versioning) -> Self {
        let (config, mut error, fault) = match &result.outcome {
            Ok(config) => (Some(config.clone()), None, None),
            Err(fault) => (None, Some(fault.message.clone()), Some(fault.kind)),
        };
        if let Versioning::Failed { error: e } = &versioning {
            error = Some(e.clone());
        }
        Self {
            device_id: result.device_id,
            hostname: result.host.clone(),
            ip: result.address.clone(),
            failed: result.failed() || matches!(versioning, Versioning::Failed { .. }),
            config,
            error,
            fault,
            versioning,
        }
    }
}

/// Parsed interface summary of one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfacesReport {
    #[serde(flatten)]
    pub host: HostReport,
    /// Empty when the output could not be parsed; `host.result` keeps the raw text
    pub interfaces: Vec<InterfaceRow>,
}

impl Services {
    /// Host descriptor for one device.
    ///
    /// Fails when the device, its credential reference or the credential
    /// record is missing.
    pub fn resolve_host(&self, device_id: DeviceId) -> Result<HostDescriptor> {
        let device = self.store.require_device(device_id)?;
        device.validate()?;
        let credential_id = device
            .credential_id
            .with_context(|| format!("device {} has no credential profile", device.hostname))?;
        let credential = self.store.require_credential(credential_id)?;
        Ok(inventory::host_descriptor(&device, &credential))
    }

    fn vault(&self) -> Result<&ConfigVault> {
        self.vault
            .as_deref()
            .ok_or(vault::Error::GitNotFound)
            .context("configuration history is unavailable")
    }

    /// Repository of the tenant owning `device_id`.
    fn repository_for(&self, device_id: DeviceId) -> Result<(String, TenantRepository)> {
        let device = self.store.require_device(device_id)?;
        let tenant = self.store.require_tenant(device.tenant_id)?;
        let repo = TenantRepository::from_tenant(&tenant).with_context(|| {
            format!("tenant {} has no configuration repository", tenant.name)
        })?;
        Ok((device.hostname, repo))
    }

    fn version(&self, repo: Option<&TenantRepository>, hostname: &str, config: &str) -> Versioning {
        let Some(repo) = repo else {
            log::debug!("{hostname}: tenant has no configuration repository, skipping versioning");
            return Versioning::Skipped;
        };
        let Some(vault) = &self.vault else {
            return Versioning::Failed {
                error: vault::Error::GitNotFound.to_string(),
            };
        };

        let message = format!("Automated config backup for {hostname}");
        match vault.commit(repo, hostname, config, &message) {
            Ok(true) => Versioning::Committed,
            Ok(false) => Versioning::Unchanged,
            Err(e) => {
                log::error!("{hostname}: versioning failed: {e}");
                Versioning::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn record_audit(
        &self,
        tenant_id: TenantId,
        device_id: Option<DeviceId>,
        action: &str,
        success: bool,
        details: serde_json::Value,
    ) {
        let entry = NewAuditEntry {
            tenant_id,
            device_id,
            action: action.to_string(),
            status: AuditStatus::from_success(success),
            details,
        };
        if let Err(e) = self.audit.record(&entry) {
            log::warn!("Failed to write {action} audit entry: {e}");
        }
    }
}

/// Back up one device.
pub fn backup_device(services: &Services, device_id: DeviceId) -> Result<BackupReport> {
    let host = services.resolve_host(device_id)?;
    let mut reports = backup_hosts(services, slice::from_ref(&host), &NoProgress)?;
    reports.pop().context("backup produced no result")
}

/// Back up every device matching `filter` that has a credential.
pub fn backup(
    services: &Services,
    filter: &DeviceFilter,
    progress: &dyn ProgressCallback,
) -> Result<Vec<BackupReport>> {
    let hosts = inventory::build(services.store.as_ref(), filter)?;
    backup_hosts(services, &hosts, progress)
}

fn backup_hosts(
    services: &Services,
    hosts: &[HostDescriptor],
    progress: &dyn ProgressCallback,
) -> Result<Vec<BackupReport>> {
    let results = services.dispatcher.run(hosts, progress, |host, session| {
        session.send_command(host.platform.running_config_command())
    })?;

    let mut repos: HashMap<TenantId, Option<TenantRepository>> = HashMap::new();
    let mut reports = Vec::with_capacity(results.len());

    for (host, result) in hosts.iter().zip(&results) {
        let versioning = match result.output() {
            None => Versioning::Skipped,
            Some(config) => {
                let repo = match repos.entry(host.tenant_id) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        let tenant = services.store.require_tenant(host.tenant_id)?;
                        entry.insert(TenantRepository::from_tenant(&tenant))
                    }
                };
                services.version(repo.as_ref(), &host.hostname, config)
            }
        };

        let report = BackupReport::new(result, versioning);
        services.record_audit(
            host.tenant_id,
            Some(host.device_id),
            "backup_config",
            !report.failed,
            json!({
                "hostname": report.hostname,
                "versioning": report.versioning.as_str(),
                "error": report.error,
            }),
        );
        reports.push(report);
    }

    let failed = reports.iter().filter(|r| r.failed).count();
    log::info!("Backup finished: {} succeeded, {} failed", reports.len() - failed, failed);
    Ok(reports)
}

/// Push `template` to the listed devices of `tenant_id`.
///
/// Devices without a credential, or not owned by the tenant, are left out
/// of the report.
pub fn bulk_deploy(
    services: &Services,
    tenant_id: TenantId,
    device_ids: &[DeviceId],
    template: &str,
    dry_run: bool,
    progress: &dyn ProgressCallback,
) -> Result<DeployReport> {
    if device_ids.is_empty() {
        return Err(fleet::Error::Configuration("no devices selected".to_string()).into());
    }
    if template.trim().is_empty() {
        return Err(fleet::Error::Configuration("template is empty".to_string()).into());
    }
    services.store.require_tenant(tenant_id)?;

    let filter = DeviceFilter::tenant(tenant_id).with_devices(device_ids.iter().copied());
    let hosts = inventory::build(services.store.as_ref(), &filter)?;
    if hosts.len() < device_ids.len() {
        log::warn!(
            "{} of {} requested devices are unknown to tenant {} or have no credential",
            device_ids.len() - hosts.len(),
            device_ids.len(),
            tenant_id
        );
    }

    let results = services.dispatcher.deploy(&hosts, template, dry_run, progress)?;

    for (host, result) in hosts.iter().zip(&results) {
        services.record_audit(
            tenant_id,
            Some(host.device_id),
            "deploy_config",
            !result.failed(),
            json!({
                "hostname": host.name,
                "dry_run": dry_run,
                "strategy": host.platform.strategy().as_str(),
                "result": result.to_report().result,
            }),
        );
    }

    Ok(DeployReport::from_results(&results, dry_run))
}

/// Run one exec-mode command on a device.
pub fn execute_command(services: &Services, device_id: DeviceId, command: &str) -> Result<HostReport> {
    let host = services.resolve_host(device_id)?;
    let results = services
        .dispatcher
        .exec(slice::from_ref(&host), command, &NoProgress)?;
    first_report(&results)
}

/// Fetch and parse the interface summary of a device.
pub fn fetch_interfaces(services: &Services, device_id: DeviceId) -> Result<InterfacesReport> {
    let host = services.resolve_host(device_id)?;
    let results = services
        .dispatcher
        .run(slice::from_ref(&host), &NoProgress, |host, session| {
            check_output(&host.name, session.send_command(INTERFACE_BRIEF)?)
        })?;

    let report = first_report(&results)?;
    let interfaces = if report.failed {
        Vec::new()
    } else {
        parse_interface_brief(&report.result)
    };
    if !report.failed && interfaces.is_empty() {
        log::warn!("{}: could not parse interface summary", report.hostname);
    }
    Ok(InterfacesReport {
        host: report,
        interfaces,
    })
}

/// Apply a generated configuration snippet to a device.
pub fn apply_snippet(services: &Services, device_id: DeviceId, snippet: &Snippet) -> Result<HostReport> {
    let host = services.resolve_host(device_id)?;
    let lines = snippet.lines();
    let results = services
        .dispatcher
        .run(slice::from_ref(&host), &NoProgress, |host, session| {
            check_output(&host.name, session.send_config_set(&lines)?)
        })?;

    let report = first_report(&results)?;
    services.record_audit(
        host.tenant_id,
        Some(device_id),
        snippet.action(),
        !report.failed,
        json!({
            "hostname": host.name,
            "snippet": snippet,
            "result": report.result,
        }),
    );
    Ok(report)
}

/// Most recent configuration commits of a device, newest first.
pub fn config_history(services: &Services, device_id: DeviceId, limit: usize) -> Result<Vec<CommitRecord>> {
    let (hostname, repo) = services.repository_for(device_id)?;
    Ok(services.vault()?.history(&repo, &hostname, limit))
}

/// Configuration of a device as of commit `hash`.
pub fn config_at(services: &Services, device_id: DeviceId, hash: &str) -> Result<Option<String>> {
    let (hostname, repo) = services.repository_for(device_id)?;
    Ok(services.vault()?.content_at(&repo, &hostname, hash))
}

/// Unified diff of a device's configuration between two commits.
pub fn config_diff(services: &Services, device_id: DeviceId, from: &str, to: &str) -> Result<Option<String>> {
    let (hostname, repo) = services.repository_for(device_id)?;
    Ok(services.vault()?.diff(&repo, &hostname, from, to))
}

fn first_report(results: &[HostResult]) -> Result<HostReport> {
    results
        .first()
        .map(HostResult::to_report)
        .context("operation produced no result")
}
