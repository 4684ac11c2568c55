//! Platform executors: the OS-specific way to keep the machine awake.
//!
//! Each implementation launches a long-running inhibitor process and knows
//! how to recognise it again by a marker. Choosing the implementation happens
//! once, in [`detect`], and the result is injected into the session
//! controller.
//!
//! | Platform | Inhibitor |
//! |----------|-----------|
//! | macOS    | `caffeinate -d -i [-m] [-t secs]` |
//! | Linux    | `systemd-inhibit --what=idle:sleep ... sleep <secs\|infinity>` |
//! | Windows  | PowerShell script calling `SetThreadExecutionState` |

mod linux;
mod macos;
mod spawn;
mod windows;

use std::sync::Arc;

use crate::config::InhibitOptions;
use crate::error::{CoffeeError, Result};
use crate::process;
use crate::types::SessionHandle;

pub use linux::LinuxExecutor;
pub use macos::MacOsExecutor;
pub use spawn::spawn_detached;
pub use windows::WindowsExecutor;

/// Marker embedded in inhibitor command lines so they can be found by scan.
pub const PROCESS_MARKER: &str = "COFFEE_CAFFEINATE";

pub trait PlatformExecutor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Launches the inhibitor, unbounded or for `duration_secs`.
    ///
    /// Must not leave an auxiliary resource behind when it fails.
    fn launch_inhibitor(
        &self,
        options: &InhibitOptions,
        duration_secs: Option<u64>,
    ) -> Result<SessionHandle>;

    fn is_alive(&self, pid: u32) -> bool {
        process::is_pid_alive(pid)
    }

    fn kill(&self, pid: u32) -> std::result::Result<(), String> {
        process::terminate_pid(pid)
    }

    /// How to recognise this session's inhibitor without its PID.
    fn matcher(&self, handle: &SessionHandle) -> ProcessMatcher;

    fn find_matching(&self, matcher: &ProcessMatcher) -> Vec<u32> {
        process::process_table()
            .into_iter()
            .filter(|(_, name, cmd)| matcher.matches(name, cmd))
            .map(|(pid, _, _)| pid)
            .collect()
    }

    /// Returns the OS power state to normal. Runs on every stop.
    fn reset_power_state(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Identifies an inhibitor by process name and, optionally, a command-line marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMatcher {
    pub name: String,
    pub marker: Option<String>,
}

impl ProcessMatcher {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marker: None,
        }
    }

    pub fn with_marker(name: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marker: Some(marker.into()),
        }
    }

    pub fn matches(&self, process_name: &str, cmd: &[String]) -> bool {
        let normalized = process_name.to_lowercase();
        let normalized = normalized.trim_end_matches(".exe");
        if normalized != self.name.to_lowercase() {
            return false;
        }
        match &self.marker {
            Some(marker) => cmd.iter().any(|arg| arg.contains(marker.as_str())),
            None => true,
        }
    }
}

/// Picks the executor for the running OS.
pub fn detect() -> Result<Arc<dyn PlatformExecutor>> {
    if cfg!(target_os = "macos") {
        Ok(Arc::new(MacOsExecutor))
    } else if cfg!(target_os = "linux") {
        Ok(Arc::new(LinuxExecutor))
    } else if cfg!(windows) {
        Ok(Arc::new(WindowsExecutor::new()))
    } else {
        Err(CoffeeError::UnsupportedEnvironment(
            std::env::consts::OS.to_string(),
        ))
    }
}
