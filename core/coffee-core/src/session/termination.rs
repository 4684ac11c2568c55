//! Two-step inhibitor termination.
//!
//! 1. **By PID**: signal the stored process id and wait for it to disappear.
//! 2. **By marker**: if the PID kill failed or the process lingers, scan for
//!    processes matching the platform's [`ProcessMatcher`] and signal those.
//!
//! Afterwards the auxiliary resource is removed and the platform power state
//! is reset. The reset runs even when no session was recorded.
//!
//! Nothing here is fatal. A kill that cannot be confirmed comes back as
//! [`CoffeeError::TerminationFailure`] for the caller to log.
//!
//! [`ProcessMatcher`]: crate::platform::ProcessMatcher

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use fs_err as fs;
use tracing::{debug, warn};

use crate::error::CoffeeError;
use crate::platform::PlatformExecutor;
use crate::types::SessionHandle;

/// How long to wait for a signalled inhibitor to go away.
#[derive(Debug, Clone, Copy)]
pub struct TerminationPolicy {
    pub grace: Duration,
    pub poll: Duration,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            grace: Duration::from_millis(1500),
            poll: Duration::from_millis(50),
        }
    }
}

impl TerminationPolicy {
    /// No waiting at all; liveness is checked once.
    pub fn immediate() -> Self {
        Self {
            grace: Duration::ZERO,
            poll: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminated {
    /// No handle was recorded.
    NoSession,
    /// The stored PID was already gone.
    AlreadyGone,
    ByPid,
    ByMarker { matched: usize },
}

pub fn terminate(
    executor: &dyn PlatformExecutor,
    handle: Option<&SessionHandle>,
    policy: TerminationPolicy,
) -> Result<Terminated, CoffeeError> {
    let result = match handle {
        Some(handle) => {
            let outcome = kill_inhibitor(executor, handle, policy);
            if let Some(resource) = &handle.auxiliary_resource {
                remove_resource(resource);
            }
            outcome
        }
        None => Ok(Terminated::NoSession),
    };

    if let Err(err) = executor.reset_power_state() {
        warn!(executor = executor.name(), error = %err, "Failed to reset power state");
    }

    result
}

fn kill_inhibitor(
    executor: &dyn PlatformExecutor,
    handle: &SessionHandle,
    policy: TerminationPolicy,
) -> Result<Terminated, CoffeeError> {
    let pid = handle.process_id;

    if !executor.is_alive(pid) {
        return Ok(Terminated::AlreadyGone);
    }

    match executor.kill(pid) {
        Ok(()) if wait_for_exit(executor, pid, policy) => return Ok(Terminated::ByPid),
        Ok(()) => debug!(pid, "Inhibitor still alive after signal, trying marker match"),
        Err(err) => debug!(pid, error = %err, "PID kill failed, trying marker match"),
    }

    let matcher = executor.matcher(handle);
    let candidates = executor.find_matching(&matcher);
    let mut matched = 0;
    for candidate in &candidates {
        match executor.kill(*candidate) {
            Ok(()) => matched += 1,
            Err(err) => debug!(pid = candidate, error = %err, "Marker kill failed"),
        }
    }

    if wait_for_exit(executor, pid, policy) {
        return Ok(Terminated::ByMarker { matched });
    }

    Err(CoffeeError::TerminationFailure {
        pid,
        reason: format!(
            "still alive after PID and marker kill ({} candidates for {:?})",
            candidates.len(),
            matcher
        ),
    })
}

fn wait_for_exit(executor: &dyn PlatformExecutor, pid: u32, policy: TerminationPolicy) -> bool {
    let deadline = Instant::now() + policy.grace;
    loop {
        if !executor.is_alive(pid) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(policy.poll);
    }
}

pub(crate) fn remove_resource(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed inhibitor resource"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(error = %err, path = %path.display(), "Failed to remove inhibitor resource"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeExecutor;

    #[test]
    fn no_handle_still_resets_power_state() {
        let executor = FakeExecutor::new();
        let outcome = terminate(&executor, None, TerminationPolicy::immediate()).unwrap();
        assert_eq!(outcome, Terminated::NoSession);
        assert_eq!(executor.reset_count(), 1);
    }

    #[test]
    fn dead_pid_is_already_gone() {
        let executor = FakeExecutor::new();
        let handle = SessionHandle::new(999);
        let outcome = terminate(&executor, Some(&handle), TerminationPolicy::immediate()).unwrap();
        assert_eq!(outcome, Terminated::AlreadyGone);
        assert!(executor.kills().is_empty());
    }

    #[test]
    fn pid_kill_is_primary() {
        let executor = FakeExecutor::new();
        executor.spawn_external(100);
        let handle = SessionHandle::new(100);
        let outcome = terminate(&executor, Some(&handle), TerminationPolicy::immediate()).unwrap();
        assert_eq!(outcome, Terminated::ByPid);
        assert_eq!(executor.kills(), vec![100]);
    }

    #[test]
    fn marker_match_is_fallback() {
        let executor = FakeExecutor::new();
        executor.spawn_external(100);
        executor.refuse_kill(100);
        executor.mark_matching(100);
        let handle = SessionHandle::new(100);

        let outcome = terminate(&executor, Some(&handle), TerminationPolicy::immediate()).unwrap();

        assert_eq!(outcome, Terminated::ByMarker { matched: 1 });
        assert!(!executor.is_alive(100));
    }

    #[test]
    fn unkillable_process_reports_failure() {
        let executor = FakeExecutor::new();
        executor.spawn_external(100);
        executor.make_unkillable(100);
        let handle = SessionHandle::new(100);

        let result = terminate(&executor, Some(&handle), TerminationPolicy::immediate());

        assert!(matches!(
            result,
            Err(CoffeeError::TerminationFailure { pid: 100, .. })
        ));
        assert_eq!(executor.reset_count(), 1);
    }

    #[test]
    fn auxiliary_resource_is_removed() {
        let temp = tempfile::tempdir().unwrap();
        let script = temp.path().join("coffee.ps1");
        fs::write(&script, "script").unwrap();

        let executor = FakeExecutor::new();
        executor.spawn_external(5);
        let handle = SessionHandle::with_resource(5, script.clone());
        terminate(&executor, Some(&handle), TerminationPolicy::immediate()).unwrap();

        assert!(!script.exists());
    }
}
