//! In-memory connector for tests.
//!
//! Behaviour is scripted per host name. Every call, including `close`, is
//! recorded so tests can assert on what a device saw.

use super::{Connector, DeviceSession};
use crate::error::{Error, Result};
use crate::types::HostDescriptor;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// One call received by a scripted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Command(String),
    ConfigSet(Vec<String>),
    Atomic {
        content: String,
        replace: bool,
        dry_run: bool,
    },
    Close,
}

#[derive(Debug, Clone, Default)]
struct Behavior {
    refuse: Option<String>,
    flaky: u32,
    fail_commands: Option<String>,
    replies: HashMap<String, String>,
    delay: Option<Duration>,
    panic: bool,
    reject: Option<String>,
}

#[derive(Debug, Default)]
struct Shared {
    calls: Mutex<Vec<(String, Call)>>,
    attempts: Mutex<HashMap<String, u32>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl Shared {
    fn push(&self, host: &str, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((host.to_string(), call));
    }
}

/// Connector whose devices answer from a script.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    hosts: HashMap<String, Behavior>,
    delay: Duration,
    shared: Arc<Shared>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn behavior(&mut self, host: &str) -> &mut Behavior {
        self.hosts.entry(host.to_string()).or_default()
    }

    /// Refuse every connection to `host` with the given transport stderr.
    pub fn refuse(mut self, host: &str, stderr: &str) -> Self {
        self.behavior(host).refuse = Some(stderr.to_string());
        self
    }

    /// Refuse the first `failures` connections to `host` as unreachable.
    pub fn flaky(mut self, host: &str, failures: u32) -> Self {
        self.behavior(host).flaky = failures;
        self
    }

    /// Connect to `host`, but fail every command with the given stderr.
    pub fn fail_commands(mut self, host: &str, stderr: &str) -> Self {
        self.behavior(host).fail_commands = Some(stderr.to_string());
        self
    }

    /// Answer `command` on `host` with `output`.
    pub fn reply(mut self, host: &str, command: &str, output: &str) -> Self {
        self.behavior(host)
            .replies
            .insert(command.to_string(), output.to_string());
        self
    }

    /// Answer configuration changes on `host` with an error marker line.
    pub fn reject(mut self, host: &str, marker: &str) -> Self {
        self.behavior(host).reject = Some(marker.to_string());
        self
    }

    /// Sleep before answering anything on `host`.
    pub fn delay(mut self, host: &str, delay: Duration) -> Self {
        self.behavior(host).delay = Some(delay);
        self
    }

    /// Sleep before answering on hosts without their own delay.
    pub fn delay_all(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Panic inside any operation on `host`.
    pub fn panic_on(mut self, host: &str) -> Self {
        self.behavior(host).panic = true;
        self
    }

    /// Calls received, in arrival order, tagged with the host name.
    pub fn calls(&self) -> Vec<(String, Call)> {
        self.shared
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calls received by one host.
    pub fn calls_for(&self, host: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|(h, _)| h == host)
            .map(|(_, call)| call)
            .collect()
    }

    /// Connection attempts made to `host`, successful or not.
    pub fn attempts(&self, host: &str) -> u32 {
        self.shared
            .attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .copied()
            .unwrap_or(0)
    }

    /// Sessions opened so far.
    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed so far.
    pub fn closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }
}

impl Connector for ScriptedConnector {
    fn open(&self, host: &HostDescriptor) -> Result<Box<dyn DeviceSession>> {
        let behavior = self.hosts.get(&host.name).cloned().unwrap_or_default();

        let attempt = {
            let mut attempts = self
                .shared
                .attempts
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let count = attempts.entry(host.name.clone()).or_insert(0);
            *count += 1;
            *count
        };

        if let Some(stderr) = &behavior.refuse {
            return Err(Error::connect(&host.name, stderr));
        }
        if attempt <= behavior.flaky {
            return Err(Error::connect(
                &host.name,
                &format!("ssh: connect to host {} port {}: Connection refused", host.address, host.port),
            ));
        }

        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            host: host.name.clone(),
            delay: behavior.delay.unwrap_or(self.delay),
            behavior,
            shared: Arc::clone(&self.shared),
            closed: false,
        }))
    }
}

struct ScriptedSession {
    host: String,
    behavior: Behavior,
    delay: Duration,
    shared: Arc<Shared>,
    closed: bool,
}

impl ScriptedSession {
    fn answer(&self, call: Call) -> Result<()> {
        self.shared.push(&self.host, call);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.behavior.panic {
            panic!("scripted panic on {}", self.host);
        }
        match &self.behavior.fail_commands {
            Some(stderr) => Err(Error::command(&self.host, stderr)),
            None => Ok(()),
        }
    }

    fn change_output(&self, applied: String) -> String {
        match &self.behavior.reject {
            Some(marker) => format!("{applied}{marker}\n"),
            None => applied,
        }
    }
}

impl DeviceSession for ScriptedSession {
    fn send_command(&mut self, command: &str) -> Result<String> {
        self.answer(Call::Command(command.to_string()))?;
        Ok(self
            .behavior
            .replies
            .get(command)
            .cloned()
            .unwrap_or_default())
    }

    fn send_config_set(&mut self, lines: &[String]) -> Result<String> {
        self.answer(Call::ConfigSet(lines.to_vec()))?;
        let echoed: String = lines.iter().map(|l| format!("{}(config)# {l}\n", self.host)).collect();
        Ok(self.change_output(echoed))
    }

    fn configure_atomic(&mut self, content: &str, replace: bool, dry_run: bool) -> Result<String> {
        self.answer(Call::Atomic {
            content: content.to_string(),
            replace,
            dry_run,
        })?;
        let diff: String = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| format!("+ {l}\n"))
            .collect();
        Ok(self.change_output(diff))
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.shared.closed.fetch_add(1, Ordering::SeqCst);
            self.shared.push(&self.host, Call::Close);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformTag;

    fn host(name: &str) -> HostDescriptor {
        HostDescriptor {
            name: name.into(),
            hostname: name.into(),
            address: "192.0.2.1".into(),
            port: 22,
            platform: PlatformTag::Ios,
            username: "admin".into(),
            secret: String::new(),
            tenant_id: 1,
            site_id: 1,
            device_id: 1,
        }
    }

    #[test]
    fn test_records_calls_and_close() {
        let connector = ScriptedConnector::new().reply("r1", "show clock", "12:00:00 UTC");
        let mut session = connector.open(&host("r1")).unwrap();
        assert_eq!(session.send_command("show clock").unwrap(), "12:00:00 UTC");
        session.close().unwrap();
        session.close().unwrap();

        assert_eq!(
            connector.calls_for("r1"),
            vec![Call::Command("show clock".into()), Call::Close]
        );
        assert_eq!(connector.opened(), 1);
        assert_eq!(connector.closed(), 1);
        assert_eq!(connector.open_sessions(), 0);
    }

    #[test]
    fn test_refuse_and_flaky() {
        let connector = ScriptedConnector::new()
            .refuse("r1", "Permission denied (password).")
            .flaky("r2", 1);

        let err = connector.open(&host("r1")).err().unwrap();
        assert!(!err.is_retryable());

        assert!(connector.open(&host("r2")).err().unwrap().is_retryable());
        assert!(connector.open(&host("r2")).is_ok());
        assert_eq!(connector.attempts("r2"), 2);
    }

    #[test]
    fn test_reject_marks_output() {
        let connector = ScriptedConnector::new().reject("r1", "% Invalid input detected");
        let mut session = connector.open(&host("r1")).unwrap();
        let output = session.send_config_set(&["bogus".into()]).unwrap();
        assert!(super::super::detect_rejection(&output).is_some());
    }
}
