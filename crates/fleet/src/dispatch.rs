//! Parallel fan-out across hosts.
//!
//! Every host runs as its own task on a bounded rayon pool. A task never
//! affects another: connection failures, device rejections and panics all
//! end up as a failed [`HostResult`] for that host alone. Results are
//! returned in the order the hosts were given.

use crate::error::{Error, FaultKind, Result};
use crate::platform::Strategy;
use crate::retry::{LogCallback, with_retry};
use crate::session::script::config_lines;
use crate::session::{Connector, DeviceSession, SessionGuard, check_output};
use crate::types::{HostDescriptor, HostFault, HostResult, RetryConfig};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Default number of hosts worked on at once.
pub const DEFAULT_JOBS: usize = 8;

/// Receives per-host results as they complete.
///
/// Called from worker threads, so implementations must be `Sync`.
pub trait ProgressCallback: Sync {
    /// Called once before any host is started
    fn on_start(&self, _hosts: usize) {}

    /// Called when one host's task finishes, in completion order
    fn on_host_complete(&self, result: &HostResult);

    /// Called once after every host finished
    fn on_finish(&self) {}
}

/// No-op progress callback.
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_host_complete(&self, _result: &HostResult) {}
}

/// Runs operations on many hosts concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    connector: Arc<dyn Connector>,
    jobs: usize,
    retry: RetryConfig,
}

impl Dispatcher {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            jobs: DEFAULT_JOBS,
            retry: RetryConfig::default(),
        }
    }

    /// Limit the number of hosts worked on at once.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Retry policy for opening sessions.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Run `operation` with an open session on every host.
    ///
    /// Fails only when the worker pool cannot be created. Per-host faults
    /// are carried in the returned results.
    pub fn run<F>(
        &self,
        hosts: &[HostDescriptor],
        progress: &dyn ProgressCallback,
        operation: F,
    ) -> Result<Vec<HostResult>>
    where
        F: Fn(&HostDescriptor, &mut dyn DeviceSession) -> Result<String> + Sync,
    {
        self.fan_out(hosts, progress, |host| {
            self.with_session(host, |session| operation(host, session))
        })
    }

    /// Push `template` to every host using the host platform's strategy.
    ///
    /// Atomic platforms receive the template as one transaction and honour
    /// `dry_run`. Incremental platforms receive its non-blank lines; asking
    /// them for a dry-run fails that host without connecting to it.
    pub fn deploy(
        &self,
        hosts: &[HostDescriptor],
        template: &str,
        dry_run: bool,
        progress: &dyn ProgressCallback,
    ) -> Result<Vec<HostResult>> {
        if template.trim().is_empty() {
            return Err(Error::Configuration("template is empty".to_string()));
        }
        let lines = config_lines(template);

        self.fan_out(hosts, progress, |host| {
            let strategy = host.platform.strategy();
            if dry_run && !strategy.supports_dry_run() {
                return Err(Error::DryRunUnsupported {
                    platform: host.platform.to_string(),
                });
            }

            log::debug!("{}: deploying via {} strategy", host.name, strategy.as_str());
            self.with_session(host, |session| {
                let output = match strategy {
                    Strategy::Atomic => session.configure_atomic(template, false, dry_run)?,
                    Strategy::Incremental => session.send_config_set(&lines)?,
                };
                check_output(&host.name, output)
            })
        })
    }

    /// Run one exec-mode command on every host.
    pub fn exec(
        &self,
        hosts: &[HostDescriptor],
        command: &str,
        progress: &dyn ProgressCallback,
    ) -> Result<Vec<HostResult>> {
        if command.trim().is_empty() {
            return Err(Error::Configuration("command is empty".to_string()));
        }
        self.run(hosts, progress, |host, session| {
            check_output(&host.name, session.send_command(command)?)
        })
    }

    /// Open a session, hand it to `f`, and close it on every path.
    fn with_session<F>(&self, host: &HostDescriptor, f: F) -> Result<String>
    where
        F: FnOnce(&mut dyn DeviceSession) -> Result<String>,
    {
        let session = with_retry(&self.retry, Some(&LogCallback), || self.connector.open(host))?;
        let mut guard = SessionGuard::new(host, session);
        let output = f(&mut *guard)?;
        if let Err(e) = guard.close() {
            log::warn!("{}: close failed after success: {}", host.name, e);
        }
        Ok(output)
    }

    fn fan_out<F>(
        &self,
        hosts: &[HostDescriptor],
        progress: &dyn ProgressCallback,
        task: F,
    ) -> Result<Vec<HostResult>>
    where
        F: Fn(&HostDescriptor) -> Result<String> + Sync,
    {
        if hosts.is_empty() {
            return Ok(Vec::new());
        }

        let threads = self.jobs.min(hosts.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("fleet-worker-{i}"))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;

        log::info!("Dispatching to {} hosts with {} workers", hosts.len(), threads);
        progress.on_start(hosts.len());

        let results: Vec<HostResult> = pool.install(|| {
            hosts
                .par_iter()
                .map(|host| {
                    let outcome = match catch_unwind(AssertUnwindSafe(|| task(host))) {
                        Ok(Ok(output)) => Ok(output),
                        Ok(Err(e)) => {
                            log::debug!("{}: {}", host.name, e);
                            Err(HostFault::from(e))
                        }
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            log::error!("{}: task panicked: {}", host.name, message);
                            Err(HostFault::new(FaultKind::Internal, format!("task panicked: {message}")))
                        }
                    };
                    let result = HostResult::new(host, outcome);
                    progress.on_host_complete(&result);
                    result
                })
                .collect()
        });

        progress.on_finish();
        let failed = results.iter().filter(|r| r.failed()).count();
        log::info!("Dispatch complete: {} ok, {} failed", results.len() - failed, failed);
        Ok(results)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformTag;
    use crate::session::mock::{Call, ScriptedConnector};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    fn host(name: &str, platform: PlatformTag) -> HostDescriptor {
        HostDescriptor {
            name: name.into(),
            hostname: name.into(),
            address: format!("192.0.2.{}", name.len()),
            port: 22,
            platform,
            username: "admin".into(),
            secret: String::new(),
            tenant_id: 1,
            site_id: 1,
            device_id: 1,
        }
    }

    fn ios(name: &str) -> HostDescriptor {
        host(name, PlatformTag::Ios)
    }

    fn dispatcher(connector: &Arc<ScriptedConnector>) -> Dispatcher {
        Dispatcher::new(connector.clone()).with_retry(RetryConfig::no_retry())
    }

    #[test]
    fn test_one_result_per_host_in_input_order() {
        let connector = Arc::new(
            ScriptedConnector::new()
                .refuse("r2", "ssh: connect to host r2 port 22: Connection refused")
                .fail_commands("r4", "Connection reset by peer"),
        );
        let hosts: Vec<_> = ["r1", "r2", "r3", "r4", "r5"].into_iter().map(ios).collect();

        let results = dispatcher(&connector)
            .deploy(&hosts, "hostname test\n", false, &NoProgress)
            .unwrap();

        let names: Vec<_> = results.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(names, vec!["r1", "r2", "r3", "r4", "r5"]);
        assert_eq!(results.iter().filter(|r| r.failed()).count(), 2);
        assert_eq!(results[1].fault().unwrap().kind, FaultKind::Connectivity);
        assert_eq!(results[3].fault().unwrap().kind, FaultKind::Connectivity);
        assert_eq!(connector.open_sessions(), 0);
    }

    #[test]
    fn test_wall_time_bounded_by_slowest_host() {
        let connector = Arc::new(ScriptedConnector::new().delay_all(Duration::from_millis(300)));
        let hosts: Vec<_> = ["a", "b", "c", "d"].into_iter().map(ios).collect();

        let start = Instant::now();
        let results = dispatcher(&connector)
            .with_jobs(4)
            .exec(&hosts, "show version", &NoProgress)
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(results.len(), 4);
        assert!(elapsed < Duration::from_millis(1000), "took {elapsed:?}");
    }

    #[test]
    fn test_dry_run_on_incremental_never_touches_device() {
        let connector = Arc::new(ScriptedConnector::new());
        let hosts = vec![ios("sw1"), host("mx1", PlatformTag::Junos)];

        let results = dispatcher(&connector)
            .deploy(&hosts, "set system ntp server 10.0.0.5", true, &NoProgress)
            .unwrap();

        let fault = results[0].fault().unwrap();
        assert_eq!(fault.kind, FaultKind::PolicyViolation);
        assert_eq!(
            fault.message,
            "dry-run not supported for platform ios via incremental strategy"
        );
        assert_eq!(connector.attempts("sw1"), 0);
        assert!(connector.calls_for("sw1").is_empty());

        assert!(!results[1].failed());
        assert_eq!(
            connector.calls_for("mx1")[0],
            Call::Atomic {
                content: "set system ntp server 10.0.0.5".into(),
                replace: false,
                dry_run: true,
            }
        );
    }

    #[test]
    fn test_incremental_sends_non_blank_lines() {
        let connector = Arc::new(ScriptedConnector::new());
        let hosts = vec![host("ce1", PlatformTag::Huawei)];

        dispatcher(&connector)
            .deploy(&hosts, "sysname ce1\n\n  \nntp-service unicast-server 10.0.0.5\n", false, &NoProgress)
            .unwrap();

        assert_eq!(
            connector.calls_for("ce1"),
            vec![
                Call::ConfigSet(vec![
                    "sysname ce1".into(),
                    "ntp-service unicast-server 10.0.0.5".into()
                ]),
                Call::Close
            ]
        );
    }

    #[test]
    fn test_panic_is_isolated_and_session_closed() {
        let connector = Arc::new(ScriptedConnector::new().panic_on("bad"));
        let hosts = vec![ios("good"), ios("bad")];

        let results = dispatcher(&connector)
            .exec(&hosts, "show clock", &NoProgress)
            .unwrap();

        assert!(!results[0].failed());
        let fault = results[1].fault().unwrap();
        assert_eq!(fault.kind, FaultKind::Internal);
        assert!(fault.message.contains("scripted panic on bad"));
        assert_eq!(connector.opened(), 2);
        assert_eq!(connector.closed(), 2);
    }

    #[test]
    fn test_rejection_marker_fails_host() {
        let connector = Arc::new(ScriptedConnector::new().reject("r1", "% Invalid input detected at '^' marker."));
        let results = dispatcher(&connector)
            .deploy(&[ios("r1")], "interface Bogus0", false, &NoProgress)
            .unwrap();

        let fault = results[0].fault().unwrap();
        assert_eq!(fault.kind, FaultKind::Rejected);
        assert!(fault.message.contains("Invalid input"));
    }

    #[test]
    fn test_transient_open_failures_are_retried() {
        let connector = Arc::new(ScriptedConnector::new().flaky("r1", 2));
        let retry = RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(5),
        };

        let results = Dispatcher::new(connector.clone())
            .with_retry(retry)
            .exec(&[ios("r1")], "show clock", &NoProgress)
            .unwrap();

        assert!(!results[0].failed());
        assert_eq!(connector.attempts("r1"), 3);
    }

    #[test]
    fn test_empty_template_is_rejected_before_dispatch() {
        let connector = Arc::new(ScriptedConnector::new());
        let err = dispatcher(&connector)
            .deploy(&[ios("r1")], "  \n", false, &NoProgress)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(connector.attempts("r1"), 0);
    }

    #[test]
    fn test_no_hosts() {
        let connector = Arc::new(ScriptedConnector::new());
        let results = dispatcher(&connector)
            .exec(&[], "show clock", &NoProgress)
            .unwrap();
        assert!(results.is_empty());
    }

    struct Recorder(Mutex<Vec<String>>);

    impl ProgressCallback for Recorder {
        fn on_host_complete(&self, result: &HostResult) {
            self.0.lock().unwrap().push(result.host.clone());
        }
    }

    #[test]
    fn test_progress_sees_every_host() {
        let connector = Arc::new(ScriptedConnector::new());
        let hosts: Vec<_> = ["a", "b", "c"].into_iter().map(ios).collect();
        let recorder = Recorder(Mutex::new(Vec::new()));

        dispatcher(&connector)
            .run(&hosts, &recorder, |_, session| session.send_command("show clock"))
            .unwrap();

        let mut seen = recorder.0.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c"]);
    }
}
