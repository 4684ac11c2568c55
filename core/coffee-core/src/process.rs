//! Process inspection and signalling helpers.
//!
//! Liveness uses a per-PID sysinfo refresh (O(1)) rather than a full process
//! scan. Zombies count as dead: an inhibitor we killed but nobody reaped yet
//! must not keep the session looking active.

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, System, UpdateKind};

/// A user-visible process that can be watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningApp {
    pub name: String,
    pub pid: u32,
}

pub fn is_pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let mut sys = System::new();
    let sys_pid = Pid::from_u32(pid);
    sys.refresh_process_specifics(sys_pid, ProcessRefreshKind::new());
    sys.process(sys_pid)
        .map(|process| !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
        .unwrap_or(false)
}

/// Asks `pid` to exit (SIGTERM on Unix, `taskkill /F` on Windows).
pub fn terminate_pid(pid: u32) -> Result<(), String> {
    #[cfg(unix)]
    {
        let target = i32::try_from(pid).map_err(|_| format!("PID {} out of range", pid))?;
        // SAFETY: kill(2) with SIGTERM only delivers a signal; an already
        // exited process yields ESRCH, which we treat as success.
        #[allow(unsafe_code)]
        let rc = unsafe { libc::kill(target, libc::SIGTERM) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        Err(format!("kill({}) failed: {}", pid, err))
    }
    #[cfg(windows)]
    {
        let status = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map_err(|e| format!("taskkill failed to start: {}", e))?;
        if status.success() || !is_pid_alive(pid) {
            Ok(())
        } else {
            Err(format!("taskkill exited with {}", status))
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        Err(format!("cannot signal PID {} on this platform", pid))
    }
}

/// Snapshot of all processes with their command lines.
pub fn process_table() -> Vec<(u32, String, Vec<String>)> {
    let mut sys = System::new();
    sys.refresh_processes_specifics(ProcessRefreshKind::new().with_cmd(UpdateKind::Always));
    sys.processes()
        .iter()
        .map(|(pid, process)| {
            (
                pid.as_u32(),
                process.name().to_string(),
                process.cmd().to_vec(),
            )
        })
        .collect()
}

/// Lists running processes, one entry per name (lowest PID wins), sorted by name.
pub fn running_apps() -> Vec<RunningApp> {
    let own_pid = std::process::id();
    let mut apps: Vec<RunningApp> = process_table()
        .into_iter()
        .filter(|(pid, name, _)| *pid != 0 && *pid != own_pid && !name.is_empty())
        .map(|(pid, name, _)| RunningApp { name, pid })
        .collect();
    apps.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then(a.pid.cmp(&b.pid))
    });
    apps.dedup_by(|later, earlier| later.name == earlier.name);
    apps
}

/// Resolves a user query (a PID or an app name) against `apps`.
///
/// Exact PID wins, then a case-insensitive exact name, then the first
/// case-insensitive substring match.
pub fn find_app<'a>(apps: &'a [RunningApp], query: &str) -> Option<&'a RunningApp> {
    let query = query.trim();
    if let Ok(pid) = query.parse::<u32>() {
        if let Some(app) = apps.iter().find(|app| app.pid == pid) {
            return Some(app);
        }
    }

    let lowered = query.to_lowercase();
    apps.iter()
        .find(|app| app.name.to_lowercase() == lowered)
        .or_else(|| {
            apps.iter()
                .find(|app| app.name.to_lowercase().contains(&lowered))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apps() -> Vec<RunningApp> {
        vec![
            RunningApp {
                name: "Notes".to_string(),
                pid: 4242,
            },
            RunningApp {
                name: "NotesHelper".to_string(),
                pid: 10,
            },
            RunningApp {
                name: "Xcode".to_string(),
                pid: 77,
            },
        ]
    }

    #[test]
    fn find_app_by_pid() {
        let apps = apps();
        assert_eq!(find_app(&apps, "77").map(|a| a.name.as_str()), Some("Xcode"));
    }

    #[test]
    fn find_app_prefers_exact_name() {
        let apps = apps();
        assert_eq!(find_app(&apps, "notes").map(|a| a.pid), Some(4242));
    }

    #[test]
    fn find_app_falls_back_to_substring() {
        let apps = apps();
        assert_eq!(find_app(&apps, "helper").map(|a| a.pid), Some(10));
        assert!(find_app(&apps, "safari").is_none());
    }

    #[test]
    fn own_process_is_alive() {
        assert!(is_pid_alive(std::process::id()));
    }

    #[test]
    fn pid_zero_is_never_alive() {
        assert!(!is_pid_alive(0));
    }
}
