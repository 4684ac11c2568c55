//! Test doubles for the platform, notification and refresh seams.
//!
//! Compiled for unit tests and behind the `test-helpers` feature for
//! integration tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::InhibitOptions;
use crate::error::{CoffeeError, Result};
use crate::notify::{Notifier, NotifyLevel, StatusObserver, Surface};
use crate::platform::{PlatformExecutor, ProcessMatcher, PROCESS_MARKER};
use crate::types::SessionHandle;

#[derive(Default)]
struct FakeState {
    next_pid: u32,
    alive: BTreeSet<u32>,
    launches: Vec<Option<u64>>,
    kills: Vec<u32>,
    // PID -> remaining kill attempts that fail.
    refusals: BTreeMap<u32, usize>,
    matching: BTreeSet<u32>,
    launch_failure: Option<String>,
    resource_dir: Option<PathBuf>,
    resets: usize,
}

/// In-memory process table standing in for a real OS.
pub struct FakeExecutor {
    state: Mutex<FakeState>,
}

impl Default for FakeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_pid: 1000,
                ..FakeState::default()
            }),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut state)
    }

    /// Registers an unrelated live process (e.g. a watched app).
    pub fn spawn_external(&self, pid: u32) {
        self.with_state(|s| {
            s.alive.insert(pid);
        });
    }

    /// The process exits on its own.
    pub fn exit(&self, pid: u32) {
        self.with_state(|s| {
            s.alive.remove(&pid);
        });
    }

    /// The first kill of `pid` fails; later ones succeed.
    pub fn refuse_kill(&self, pid: u32) {
        self.with_state(|s| {
            s.refusals.insert(pid, 1);
        });
    }

    /// Every kill of `pid` fails.
    pub fn make_unkillable(&self, pid: u32) {
        self.with_state(|s| {
            s.refusals.insert(pid, usize::MAX);
            s.matching.insert(pid);
        });
    }

    /// `pid` is found by the marker scan.
    pub fn mark_matching(&self, pid: u32) {
        self.with_state(|s| {
            s.matching.insert(pid);
        });
    }

    pub fn fail_launches(&self, reason: &str) {
        self.with_state(|s| s.launch_failure = Some(reason.to_string()));
    }

    /// Launches write a script file into `dir`, like the Windows executor.
    pub fn create_resources_in(&self, dir: &Path) {
        self.with_state(|s| s.resource_dir = Some(dir.to_path_buf()));
    }

    pub fn launches(&self) -> Vec<Option<u64>> {
        self.with_state(|s| s.launches.clone())
    }

    pub fn kills(&self) -> Vec<u32> {
        self.with_state(|s| s.kills.clone())
    }

    pub fn reset_count(&self) -> usize {
        self.with_state(|s| s.resets)
    }

    pub fn alive_count(&self) -> usize {
        self.with_state(|s| s.alive.len())
    }
}

impl PlatformExecutor for FakeExecutor {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn launch_inhibitor(
        &self,
        _options: &InhibitOptions,
        duration_secs: Option<u64>,
    ) -> Result<SessionHandle> {
        self.with_state(|s| {
            if let Some(reason) = &s.launch_failure {
                return Err(CoffeeError::LaunchFailure {
                    program: "fake-inhibitor".to_string(),
                    reason: reason.clone(),
                });
            }
            let pid = s.next_pid;
            s.next_pid += 1;
            s.alive.insert(pid);
            s.launches.push(duration_secs);

            match &s.resource_dir {
                Some(dir) => {
                    let path = dir.join(format!("fake-{}.ps1", pid));
                    fs_err::write(&path, PROCESS_MARKER)
                        .map_err(|e| CoffeeError::launch("fake-inhibitor", e.to_string()))?;
                    Ok(SessionHandle::with_resource(pid, path))
                }
                None => Ok(SessionHandle::new(pid)),
            }
        })
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.with_state(|s| s.alive.contains(&pid))
    }

    fn kill(&self, pid: u32) -> std::result::Result<(), String> {
        self.with_state(|s| {
            s.kills.push(pid);
            if let Some(remaining) = s.refusals.get_mut(&pid) {
                if *remaining > 0 {
                    *remaining = remaining.saturating_sub(1);
                    return Err(format!("kill({}) refused", pid));
                }
            }
            s.alive.remove(&pid);
            Ok(())
        })
    }

    fn matcher(&self, _handle: &SessionHandle) -> ProcessMatcher {
        ProcessMatcher::with_marker("fake-inhibitor", PROCESS_MARKER)
    }

    fn find_matching(&self, _matcher: &ProcessMatcher) -> Vec<u32> {
        self.with_state(|s| s.matching.intersection(&s.alive).copied().collect())
    }

    fn reset_power_state(&self) -> std::result::Result<(), String> {
        self.with_state(|s| s.resets += 1);
        Ok(())
    }
}

/// Records every refresh request; surfaces can be marked unregistered.
#[derive(Default)]
pub struct RecordingObserver {
    calls: Mutex<Vec<(Surface, bool)>>,
    unregistered: Mutex<BTreeSet<Surface>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unregister(&self, surface: Surface) {
        self.unregistered
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(surface);
    }

    pub fn calls(&self) -> Vec<(Surface, bool)> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl StatusObserver for RecordingObserver {
    fn request_refresh(&self, surface: Surface, active: bool) -> std::result::Result<(), String> {
        if self
            .unregistered
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&surface)
        {
            return Err(format!("surface '{}' not registered", surface));
        }
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((surface, active));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, NotifyLevel)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, NotifyLevel)> {
        self.messages.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, level: NotifyLevel) {
        self.messages
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((message.to_string(), level));
    }
}
