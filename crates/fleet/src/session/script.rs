//! Builders for the text fed to a device's CLI.
//!
//! The SSH transport has no interactive prompt handling; every configuration
//! change is delivered as one script on the session's stdin.

use crate::error::{Error, Result};
use crate::platform::PlatformTag;

/// Split a template into configuration lines, dropping blank ones.
pub fn config_lines(template: &str) -> Vec<String> {
    template
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect()
}

/// Script applying `lines` one by one inside the platform's config mode.
pub fn incremental_script(platform: &PlatformTag, lines: &[String]) -> String {
    let (enter, leave) = platform.config_mode();
    let mut script = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum::<usize>() + 32);
    script.push_str(enter);
    script.push('\n');
    for line in lines {
        script.push_str(line);
        script.push('\n');
    }
    script.push_str(leave);
    script.push('\n');
    script
}

/// Script staging `content` as one transaction.
///
/// The candidate is always diffed against the running configuration so the
/// output carries the change. With `dry_run` the candidate is discarded,
/// otherwise committed. `replace` swaps the whole configuration instead of
/// merging into it.
pub fn atomic_script(
    platform: &PlatformTag,
    content: &str,
    replace: bool,
    dry_run: bool,
    session_name: &str,
) -> Result<String> {
    let body = content.trim_end();
    let lines: Vec<String> = match platform {
        PlatformTag::Junos => {
            let load = if replace { "override" } else { "merge" };
            vec![
                "configure private".into(),
                format!("load {load} terminal"),
                body.into(),
                "\u{4}".into(),
                "show | compare".into(),
                if dry_run { "rollback 0" } else { "commit and-quit" }.into(),
                "exit".into(),
            ]
        }
        PlatformTag::Eos => {
            let mut lines = vec![format!("configure session {session_name}")];
            if replace {
                lines.push("rollback clean-config".into());
            }
            lines.push(body.into());
            lines.push("show session-config diffs".into());
            lines.push(if dry_run { "abort" } else { "commit" }.into());
            lines.push("exit".into());
            lines
        }
        PlatformTag::IosXr => {
            let finish = match (dry_run, replace) {
                (true, _) => "abort",
                (false, true) => "commit replace",
                (false, false) => "commit",
            };
            vec![
                "configure exclusive".into(),
                body.into(),
                "show commit changes diff".into(),
                finish.into(),
                "end".into(),
                "exit".into(),
            ]
        }
        other => {
            return Err(Error::AtomicUnsupported {
                platform: other.to_string(),
            });
        }
    };

    let mut script = lines.join("\n");
    script.push('\n');
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_lines_drop_blanks() {
        let lines = config_lines("interface Gi0/1\n\n  \n description uplink\r\n");
        assert_eq!(lines, vec!["interface Gi0/1", " description uplink"]);
    }

    #[test]
    fn test_incremental_script_wraps_config_mode() {
        let lines = config_lines("hostname r1\nntp server 10.0.0.5");
        assert_eq!(
            incremental_script(&PlatformTag::Ios, &lines),
            "configure terminal\nhostname r1\nntp server 10.0.0.5\nend\n"
        );
        assert!(incremental_script(&PlatformTag::Huawei, &lines).starts_with("system-view\n"));
    }

    #[test]
    fn test_junos_dry_run_rolls_back() {
        let script = atomic_script(&PlatformTag::Junos, "set system host-name r1\n", false, true, "s")
            .unwrap();
        assert!(script.contains("load merge terminal\nset system host-name r1\n\u{4}\n"));
        assert!(script.contains("show | compare\nrollback 0\n"));
        assert!(!script.contains("commit"));
    }

    #[test]
    fn test_junos_replace_commits() {
        let script = atomic_script(&PlatformTag::Junos, "system {}", true, false, "s").unwrap();
        assert!(script.contains("load override terminal"));
        assert!(script.contains("commit and-quit"));
    }

    #[test]
    fn test_eos_session() {
        let script = atomic_script(&PlatformTag::Eos, "hostname r1", true, true, "nf-1").unwrap();
        assert!(script.starts_with("configure session nf-1\nrollback clean-config\nhostname r1\n"));
        assert!(script.contains("show session-config diffs\nabort\n"));
    }

    #[test]
    fn test_iosxr_commit() {
        let script = atomic_script(&PlatformTag::IosXr, "hostname r1", false, false, "s").unwrap();
        assert!(script.starts_with("configure exclusive\nhostname r1\n"));
        assert!(script.contains("show commit changes diff\ncommit\nend\n"));
    }

    #[test]
    fn test_atomic_unsupported() {
        let err = atomic_script(&PlatformTag::Ios, "hostname r1", false, false, "s").unwrap_err();
        assert!(matches!(err, Error::AtomicUnsupported { platform } if platform == "ios"));
    }
}
