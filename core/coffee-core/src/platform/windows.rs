use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::Utc;
use fs_err as fs;
use tracing::warn;

use crate::config::InhibitOptions;
use crate::error::{CoffeeError, Result};
use crate::types::SessionHandle;

use super::spawn::spawn_detached;
use super::{PlatformExecutor, ProcessMatcher, PROCESS_MARKER};

const PROGRAM: &str = "powershell.exe";

// SetThreadExecutionState flags, combined with bitwise or.
const ES_CONTINUOUS: u32 = 0x8000_0000;
const ES_SYSTEM_REQUIRED: u32 = 0x0000_0001;
const ES_DISPLAY_REQUIRED: u32 = 0x0000_0002;

const POWER_UTIL_TYPE: &str = r#"Add-Type @'
using System;
using System.Runtime.InteropServices;

public class PowerUtil {
    [DllImport("kernel32.dll", CharSet = CharSet.Auto, SetLastError = true)]
    public static extern uint SetThreadExecutionState(uint esFlags);
}
'@"#;

/// Windows executor: a hidden PowerShell process that holds an execution
/// state request for as long as it runs. The script is written to the temp
/// directory and is the session's auxiliary resource.
pub struct WindowsExecutor {
    script_dir: PathBuf,
}

impl WindowsExecutor {
    pub fn new() -> Self {
        Self::with_script_dir(std::env::temp_dir())
    }

    pub fn with_script_dir(script_dir: PathBuf) -> Self {
        Self { script_dir }
    }

    pub(crate) fn execution_state(options: &InhibitOptions) -> u32 {
        let mut flags = ES_CONTINUOUS;
        if options.prevent_system {
            flags |= ES_SYSTEM_REQUIRED;
        }
        if options.prevent_display {
            flags |= ES_DISPLAY_REQUIRED;
        }
        flags
    }

    pub(crate) fn script(options: &InhibitOptions, duration_secs: Option<u64>) -> String {
        let hold = match duration_secs {
            Some(secs) => format!("Start-Sleep -Seconds {}", secs),
            None => "while ($true) { Start-Sleep -Seconds 1 }".to_string(),
        };
        format!(
            "{ty}\n\nWrite-Host \"{marker}\"\n[PowerUtil]::SetThreadExecutionState({flags})\n\n{hold}\n\n[PowerUtil]::SetThreadExecutionState({reset})\n",
            ty = POWER_UTIL_TYPE,
            marker = PROCESS_MARKER,
            flags = Self::execution_state(options),
            hold = hold,
            reset = ES_CONTINUOUS,
        )
    }

    fn script_path(&self) -> PathBuf {
        self.script_dir.join(format!(
            "coffee-caffeinate-{}-{}.ps1",
            std::process::id(),
            Utc::now().timestamp_millis()
        ))
    }
}

impl Default for WindowsExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_script(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!(error = %err, path = %path.display(), "Failed to remove inhibitor script");
        }
    }
}

impl PlatformExecutor for WindowsExecutor {
    fn name(&self) -> &'static str {
        "Windows PowerShell"
    }

    fn launch_inhibitor(
        &self,
        options: &InhibitOptions,
        duration_secs: Option<u64>,
    ) -> Result<SessionHandle> {
        let script_path = self.script_path();
        fs::write(&script_path, Self::script(options, duration_secs))
            .map_err(|e| CoffeeError::launch(PROGRAM, format!("cannot write script: {}", e)))?;

        let args = vec![
            "-ExecutionPolicy".to_string(),
            "Bypass".to_string(),
            "-NoProfile".to_string(),
            "-WindowStyle".to_string(),
            "Hidden".to_string(),
            "-File".to_string(),
            script_path.display().to_string(),
        ];

        match spawn_detached(PROGRAM, &args) {
            Ok(pid) => Ok(SessionHandle::with_resource(pid, script_path)),
            Err(err) => {
                remove_script(&script_path);
                Err(err)
            }
        }
    }

    fn matcher(&self, handle: &SessionHandle) -> ProcessMatcher {
        let marker = handle
            .auxiliary_resource
            .as_ref()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "coffee-caffeinate-".to_string());
        ProcessMatcher::with_marker("powershell", marker)
    }

    fn reset_power_state(&self) -> std::result::Result<(), String> {
        let command = format!(
            "{}\n[PowerUtil]::SetThreadExecutionState({}) | Out-Null",
            POWER_UTIL_TYPE, ES_CONTINUOUS
        );
        let status = Command::new(PROGRAM)
            .args(["-ExecutionPolicy", "Bypass", "-NoProfile", "-Command", &command])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| format!("reset failed to start: {}", e))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("reset exited with {}", status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_state_is_bitwise() {
        assert_eq!(
            WindowsExecutor::execution_state(&InhibitOptions::default()),
            0x8000_0003
        );
        let display_only = InhibitOptions {
            prevent_display: true,
            prevent_system: false,
            prevent_disk: false,
        };
        assert_eq!(WindowsExecutor::execution_state(&display_only), 2_147_483_650);
    }

    #[test]
    fn script_holds_then_resets() {
        let script = WindowsExecutor::script(&InhibitOptions::default(), Some(30));
        assert!(script.contains(PROCESS_MARKER));
        assert!(script.contains("SetThreadExecutionState(2147483651)"));
        assert!(script.contains("Start-Sleep -Seconds 30"));
        assert!(script.trim_end().ends_with("SetThreadExecutionState(2147483648)"));
    }

    #[test]
    fn unbounded_script_loops() {
        let script = WindowsExecutor::script(&InhibitOptions::default(), None);
        assert!(script.contains("while ($true)"));
    }

    #[test]
    fn matcher_uses_script_file_name() {
        let handle = SessionHandle::with_resource(
            9,
            PathBuf::from("/tmp/coffee-caffeinate-1-2.ps1"),
        );
        let matcher = WindowsExecutor::new().matcher(&handle);
        assert_eq!(matcher.marker.as_deref(), Some("coffee-caffeinate-1-2.ps1"));
    }

    #[cfg(unix)]
    #[test]
    fn failed_launch_removes_script() {
        let temp = tempfile::tempdir().unwrap();
        let executor = WindowsExecutor::with_script_dir(temp.path().to_path_buf());
        // powershell.exe is not on PATH on Unix hosts.
        let result = executor.launch_inhibitor(&InhibitOptions::default(), None);
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
