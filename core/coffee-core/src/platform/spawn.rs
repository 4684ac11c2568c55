//! Detached process launch shared by all executors.

use std::io::ErrorKind;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::error::{CoffeeError, Result};

/// How long a fresh inhibitor must survive before we call the launch good.
const LAUNCH_SETTLE: Duration = Duration::from_millis(150);

/// Spawns `program` detached from our stdio and process group, returning its PID.
/// Hosts the inhibitors and the CLI's background app monitor.
///
/// An inhibitor that exits within [`LAUNCH_SETTLE`] is a launch failure
/// (bad flags, missing service, permission problems reported at runtime).
pub fn spawn_detached(program: &str, args: &[String]) -> Result<u32> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(DETACHED_PROCESS | CREATE_NO_WINDOW);
    }

    let mut child = command.spawn().map_err(|err| {
        let reason = match err.kind() {
            ErrorKind::NotFound => "executable not found".to_string(),
            ErrorKind::PermissionDenied => "permission denied".to_string(),
            _ => err.to_string(),
        };
        CoffeeError::launch(program, reason)
    })?;

    thread::sleep(LAUNCH_SETTLE);
    match child.try_wait() {
        Ok(Some(status)) => Err(CoffeeError::launch(
            program,
            format!("exited immediately with {}", status),
        )),
        Ok(None) => {
            debug!(program, pid = child.id(), "Detached process launched");
            Ok(child.id())
        }
        Err(err) => {
            debug!(program, error = %err, "Could not poll fresh process, assuming it runs");
            Ok(child.id())
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn missing_executable_is_launch_failure() {
        let result = spawn_detached("/definitely/not/a/real/inhibitor", &[]);
        match result {
            Err(CoffeeError::LaunchFailure { reason, .. }) => {
                assert_eq!(reason, "executable not found")
            }
            other => panic!("expected launch failure, got {:?}", other),
        }
    }

    #[test]
    fn immediate_exit_is_launch_failure() {
        let result = spawn_detached("false", &[]);
        assert!(matches!(result, Err(CoffeeError::LaunchFailure { .. })));
    }
}
