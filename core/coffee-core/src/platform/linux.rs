use crate::config::InhibitOptions;
use crate::error::Result;
use crate::process;
use crate::types::SessionHandle;

use super::spawn::spawn_detached;
use super::{PlatformExecutor, ProcessMatcher, PROCESS_MARKER};

const PROGRAM: &str = "systemd-inhibit";

/// Linux executor holding a logind inhibitor lock via `systemd-inhibit`.
///
/// The lock lives as long as the wrapped `sleep` runs. The inhibitor is its
/// own process group leader, so stopping signals the whole group and the
/// `sleep` child does not outlive it.
pub struct LinuxExecutor;

impl LinuxExecutor {
    pub(crate) fn args(options: &InhibitOptions, duration_secs: Option<u64>) -> Vec<String> {
        let mut what = Vec::new();
        if options.prevent_display {
            what.push("idle");
        }
        if options.prevent_system || what.is_empty() {
            what.push("sleep");
        }

        let sleep_for = duration_secs
            .map(|secs| secs.to_string())
            .unwrap_or_else(|| "infinity".to_string());

        vec![
            format!("--what={}", what.join(":")),
            "--who=coffee".to_string(),
            format!("--why={}", PROCESS_MARKER),
            "--mode=block".to_string(),
            "sleep".to_string(),
            sleep_for,
        ]
    }
}

impl PlatformExecutor for LinuxExecutor {
    fn name(&self) -> &'static str {
        "Linux systemd-inhibit"
    }

    fn launch_inhibitor(
        &self,
        options: &InhibitOptions,
        duration_secs: Option<u64>,
    ) -> Result<SessionHandle> {
        let pid = spawn_detached(PROGRAM, &Self::args(options, duration_secs))?;
        Ok(SessionHandle::new(pid))
    }

    fn kill(&self, pid: u32) -> std::result::Result<(), String> {
        #[cfg(unix)]
        {
            if let Ok(group) = i32::try_from(pid) {
                // SAFETY: signals the process group we created at launch.
                #[allow(unsafe_code)]
                let rc = unsafe { libc::kill(-group, libc::SIGTERM) };
                if rc == 0 {
                    return Ok(());
                }
            }
        }
        process::terminate_pid(pid)
    }

    fn matcher(&self, _handle: &SessionHandle) -> ProcessMatcher {
        ProcessMatcher::with_marker(PROGRAM, format!("--why={}", PROCESS_MARKER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_session_sleeps_forever() {
        let args = LinuxExecutor::args(&InhibitOptions::default(), None);
        assert_eq!(
            args,
            vec![
                "--what=idle:sleep",
                "--who=coffee",
                "--why=COFFEE_CAFFEINATE",
                "--mode=block",
                "sleep",
                "infinity",
            ]
        );
    }

    #[test]
    fn system_lock_is_kept_when_nothing_selected() {
        let options = InhibitOptions {
            prevent_display: false,
            prevent_system: false,
            prevent_disk: false,
        };
        let args = LinuxExecutor::args(&options, Some(60));
        assert_eq!(args[0], "--what=sleep");
        assert_eq!(args.last().map(String::as_str), Some("60"));
    }

    #[test]
    fn matcher_finds_marked_inhibitor() {
        let matcher = LinuxExecutor.matcher(&SessionHandle::new(1));
        let cmd: Vec<String> = LinuxExecutor::args(&InhibitOptions::default(), None);
        let mut full = vec![PROGRAM.to_string()];
        full.extend(cmd);
        assert!(matcher.matches(PROGRAM, &full));
    }
}
