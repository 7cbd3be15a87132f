//! OpenSSH-backed sessions.
//!
//! Each session starts its own control master in the foreground and runs
//! every command as a client multiplexed over it, so authentication happens
//! once per host per task. Password logins go through `sshpass -e` when it is
//! installed; otherwise the client runs in batch mode and relies on keys or
//! an agent.

use super::script::{atomic_script, incremental_script};
use super::{Connector, DeviceSession};
use crate::error::{Error, ErrorCategory, Result};
use crate::platform::PlatformTag;
use crate::types::HostDescriptor;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Exit status OpenSSH uses for its own failures.
const SSH_ERROR_STATUS: i32 = 255;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Transport settings shared by every session.
#[derive(Debug, Clone)]
pub struct SshOptions {
    /// Name or path of the ssh client
    pub binary: String,
    pub connect_timeout: Duration,
    pub keepalive_interval: Duration,
    /// Value passed as `StrictHostKeyChecking`
    pub strict_host_key_checking: String,
    /// Where control sockets are created
    pub control_dir: PathBuf,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            binary: "ssh".to_string(),
            connect_timeout: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(15),
            strict_host_key_checking: "accept-new".to_string(),
            control_dir: std::env::temp_dir(),
        }
    }
}

/// Opens [`SshSession`]s with the system ssh client.
#[derive(Debug)]
pub struct SshConnector {
    ssh: PathBuf,
    sshpass: Option<PathBuf>,
    options: SshOptions,
}

impl SshConnector {
    /// Create a connector. Fails if the ssh client is not installed.
    pub fn new(options: SshOptions) -> Result<Self> {
        let ssh = which::which(&options.binary)
            .map_err(|_| Error::ExecutableNotFound(options.binary.clone()))?;
        let sshpass = which::which("sshpass").ok();
        if sshpass.is_none() {
            log::debug!("sshpass not found, password logins are unavailable");
        }
        Ok(Self {
            ssh,
            sshpass,
            options,
        })
    }

    fn master_command(&self, host: &HostDescriptor, socket: &Path) -> Command {
        let mut cmd = match (&self.sshpass, host.secret.is_empty()) {
            (Some(sshpass), false) => {
                let mut cmd = Command::new(sshpass);
                cmd.arg("-e").arg(&self.ssh).env("SSHPASS", &host.secret);
                cmd
            }
            (None, false) => {
                log::warn!(
                    "{}: password set but sshpass is not installed, trying key authentication",
                    host.name
                );
                let mut cmd = Command::new(&self.ssh);
                cmd.args(["-o", "BatchMode=yes"]);
                cmd
            }
            (_, true) => {
                let mut cmd = Command::new(&self.ssh);
                cmd.args(["-o", "BatchMode=yes"]);
                cmd
            }
        };

        cmd.args(["-o", &format!("ConnectTimeout={}", self.options.connect_timeout.as_secs())])
            .args([
                "-o",
                &format!("ServerAliveInterval={}", self.options.keepalive_interval.as_secs()),
            ])
            .args(["-o", "ServerAliveCountMax=3"])
            .args([
                "-o",
                &format!("StrictHostKeyChecking={}", self.options.strict_host_key_checking),
            ])
            .args(["-o", "ControlMaster=yes", "-N", "-S"])
            .arg(socket)
            .args(["-p", &host.port.to_string(), "-l", &host.username])
            .arg("--")
            .arg(&host.address)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Connector for SshConnector {
    fn open(&self, host: &HostDescriptor) -> Result<Box<dyn DeviceSession>> {
        let socket = self
            .options
            .control_dir
            .join(format!("nf-{}.sock", uuid::Uuid::new_v4().simple()));

        log::debug!("{}: opening control master at {}", host.name, socket.display());
        let mut master = self.master_command(host, &socket).spawn()?;

        let deadline = Instant::now() + self.options.connect_timeout + Duration::from_secs(2);
        loop {
            if socket.exists() {
                break;
            }
            if master.try_wait()?.is_some() {
                let mut stderr = String::new();
                if let Some(mut pipe) = master.stderr.take() {
                    pipe.read_to_string(&mut stderr)?;
                }
                return Err(Error::connect(&host.name, &stderr));
            }
            if Instant::now() >= deadline {
                let _ = master.kill();
                let _ = master.wait();
                return Err(Error::Connect {
                    host: host.name.clone(),
                    category: ErrorCategory::Timeout,
                    message: format!("no control connection to {} after {:?}", host.address, self.options.connect_timeout),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }

        log::debug!("{}: connected", host.name);
        Ok(Box::new(SshSession {
            host: host.name.clone(),
            address: host.address.clone(),
            port: host.port,
            username: host.username.clone(),
            platform: host.platform.clone(),
            ssh: self.ssh.clone(),
            socket,
            master: Some(master),
        }))
    }
}

/// One multiplexed connection to a device.
pub struct SshSession {
    host: String,
    address: String,
    port: u16,
    username: String,
    platform: PlatformTag,
    ssh: PathBuf,
    socket: PathBuf,
    master: Option<Child>,
}

impl SshSession {
    fn client(&self) -> Command {
        let mut cmd = Command::new(&self.ssh);
        cmd.args(["-o", "ControlMaster=no", "-S"])
            .arg(&self.socket)
            .args(["-p", &self.port.to_string(), "-l", &self.username]);
        cmd
    }

    /// Client command aimed at the device, with `flags` before the destination.
    fn remote(&self, flags: &[&str]) -> Command {
        let mut cmd = self.client();
        cmd.args(flags).arg("--").arg(&self.address);
        cmd
    }

    fn finish(&self, output: Output) -> Result<String> {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.code() == Some(SSH_ERROR_STATUS) {
            return Err(Error::command(&self.host, &stderr));
        }
        if !output.status.success() {
            log::debug!("{}: remote exited with {}", self.host, output.status);
        }

        let mut text = stdout.into_owned();
        if !stderr.trim().is_empty() {
            text.push_str(&stderr);
        }
        Ok(text)
    }

    /// Feed `script` to a remote shell on stdin.
    fn run_script(&self, script: &str, tty: bool) -> Result<String> {
        let mut cmd = self.remote(&[if tty { "-tt" } else { "-T" }]);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take();

        let output = thread::scope(|s| {
            if let Some(mut stdin) = stdin {
                s.spawn(move || {
                    if let Err(e) = stdin.write_all(script.as_bytes()) {
                        log::debug!("{}: stdin closed early: {}", self.host, e);
                    }
                });
            }
            child.wait_with_output()
        })?;

        self.finish(output)
    }
}

impl DeviceSession for SshSession {
    fn send_command(&mut self, command: &str) -> Result<String> {
        log::debug!("{}: exec {}", self.host, command);
        let output = self
            .remote(&["-T"])
            .arg(command)
            .stdin(Stdio::null())
            .output()?;
        self.finish(output)
    }

    fn send_config_set(&mut self, lines: &[String]) -> Result<String> {
        log::debug!("{}: applying {} config lines", self.host, lines.len());
        let script = incremental_script(&self.platform, lines);
        self.run_script(&script, false)
    }

    fn configure_atomic(&mut self, content: &str, replace: bool, dry_run: bool) -> Result<String> {
        let session_name = format!("nf-{}", uuid::Uuid::new_v4().simple());
        let script = atomic_script(&self.platform, content, replace, dry_run, &session_name)?;
        log::debug!(
            "{}: atomic {} (replace={}, dry_run={})",
            self.host,
            self.platform,
            replace,
            dry_run
        );
        self.run_script(&script, true)
    }

    fn close(&mut self) -> Result<()> {
        let Some(mut master) = self.master.take() else {
            return Ok(());
        };

        let exit = self
            .remote(&["-O", "exit"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if !matches!(exit, Ok(status) if status.success()) {
            log::debug!("{}: control exit failed, killing master", self.host);
            let _ = master.kill();
        }
        master.wait()?;

        match std::fs::remove_file(&self.socket) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        log::debug!("{}: disconnected", self.host);
        Ok(())
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close ssh session to {}: {}", self.host, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary() {
        let options = SshOptions {
            binary: "definitely-not-an-ssh-client".into(),
            ..Default::default()
        };
        let err = SshConnector::new(options).unwrap_err();
        assert!(matches!(err, Error::ExecutableNotFound(_)));
    }

    #[test]
    fn test_master_command_uses_batch_mode_without_secret() {
        let connector = SshConnector {
            ssh: PathBuf::from("/usr/bin/ssh"),
            sshpass: Some(PathBuf::from("/usr/bin/sshpass")),
            options: SshOptions::default(),
        };
        let host = HostDescriptor {
            name: "r1".into(),
            hostname: "r1".into(),
            address: "192.0.2.1".into(),
            port: 2222,
            platform: PlatformTag::Ios,
            username: "admin".into(),
            secret: String::new(),
            tenant_id: 1,
            site_id: 1,
            device_id: 1,
        };

        let cmd = connector.master_command(&host, Path::new("/tmp/nf-test.sock"));
        assert_eq!(cmd.get_program(), "/usr/bin/ssh");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"ControlMaster=yes".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-p" && w[1] == "2222"));
        assert_eq!(args.last().map(String::as_str), Some("192.0.2.1"));
    }

    #[test]
    fn test_master_command_uses_sshpass_with_secret() {
        let connector = SshConnector {
            ssh: PathBuf::from("/usr/bin/ssh"),
            sshpass: Some(PathBuf::from("/usr/bin/sshpass")),
            options: SshOptions::default(),
        };
        let host = HostDescriptor {
            name: "r1".into(),
            hostname: "r1".into(),
            address: "192.0.2.1".into(),
            port: 22,
            platform: PlatformTag::Ios,
            username: "admin".into(),
            secret: "pw".into(),
            tenant_id: 1,
            site_id: 1,
            device_id: 1,
        };

        let cmd = connector.master_command(&host, Path::new("/tmp/nf-test.sock"));
        assert_eq!(cmd.get_program(), "/usr/bin/sshpass");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert!(!args.iter().any(|a| a.contains("pw")));
        assert!(!args.contains(&"BatchMode=yes".to_string()));
    }

    #[test]
    fn test_address_is_never_read_as_an_option() {
        let connector = SshConnector {
            ssh: PathBuf::from("/usr/bin/ssh"),
            sshpass: None,
            options: SshOptions::default(),
        };
        let host = HostDescriptor {
            name: "r1".into(),
            hostname: "r1".into(),
            address: "-oProxyCommand=touch /tmp/pwned".into(),
            port: 22,
            platform: PlatformTag::Ios,
            username: "admin".into(),
            secret: String::new(),
            tenant_id: 1,
            site_id: 1,
            device_id: 1,
        };

        let cmd = connector.master_command(&host, Path::new("/tmp/nf-test.sock"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        let n = args.len();
        assert_eq!(args[n - 2], "--");
        assert_eq!(args[n - 1], host.address);

        let session = SshSession {
            host: host.name.clone(),
            address: host.address.clone(),
            port: 22,
            username: "admin".into(),
            platform: PlatformTag::Ios,
            ssh: PathBuf::from("/usr/bin/ssh"),
            socket: PathBuf::from("/tmp/nf-test.sock"),
            master: None,
        };
        let args: Vec<_> = session
            .remote(&["-O", "exit"])
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let dash = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(&args[dash - 2..dash], ["-O", "exit"]);
        assert_eq!(args[dash + 1], host.address);
        assert_eq!(args.len(), dash + 2);
    }
}
