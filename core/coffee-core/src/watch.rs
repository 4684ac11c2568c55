//! App-liveness monitor: keeps a session alive exactly as long as one app.
//!
//! The monitor is meant to run in its own detached process (`coffee monitor`),
//! so it holds no state of its own beyond the app it watches. Each tick
//! re-reads the persisted session and the `watch_monitor` bookkeeping:
//!
//! - app still running → keep polling
//! - session no longer names this app, or bookkeeping gone → exit quietly
//! - app gone → stop the session, notify once, exit
//!
//! Stopping clears the bookkeeping, so a second monitor for the same app sees
//! itself superseded and never notifies twice.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::notify::{Notifier, NotifyLevel};
use crate::session::SessionController;
use crate::store::{get_json, keys, set_json};
use crate::types::{CaffeinationIntent, SessionHandle, WatchedApp};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Persisted under `watch_monitor` while a watch is in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorRecord {
    pub app: WatchedApp,
    /// PID of the process running the poll loop, once it has been spawned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_pid: Option<u32>,
}

/// Result of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchTick {
    Alive,
    /// Someone else stopped or replaced the session.
    Superseded,
    /// The app exited; the session was stopped and the user notified.
    Ended,
}

pub struct AppLivenessMonitor<'a> {
    controller: &'a SessionController,
    notifier: &'a dyn Notifier,
    poll_interval: Duration,
    owner_pid: Option<u32>,
}

impl<'a> AppLivenessMonitor<'a> {
    pub fn new(
        controller: &'a SessionController,
        notifier: &'a dyn Notifier,
        poll_interval: Duration,
    ) -> Self {
        Self {
            controller,
            notifier,
            poll_interval,
            owner_pid: None,
        }
    }

    /// Identifies the poll loop's process. A record naming another monitor
    /// process means this one was superseded.
    pub fn with_owner_pid(mut self, pid: u32) -> Self {
        self.owner_pid = Some(pid);
        self
    }

    /// Starts the while-app session and records the watch.
    pub fn begin(&self, app: &WatchedApp) -> Result<SessionHandle> {
        let handle = self
            .controller
            .start(CaffeinationIntent::while_app(app.clone()), None)?;
        self.record(&MonitorRecord {
            app: app.clone(),
            monitor_pid: None,
        })?;
        info!(app = %app.name, app_pid = app.pid, "Watching app");
        Ok(handle)
    }

    /// Notes which process is running the poll loop for `app`.
    pub fn claim(&self, app: &WatchedApp, monitor_pid: u32) -> Result<()> {
        self.record(&MonitorRecord {
            app: app.clone(),
            monitor_pid: Some(monitor_pid),
        })
    }

    pub fn current_record(&self) -> Option<MonitorRecord> {
        match get_json(self.controller.store(), keys::WATCH_MONITOR) {
            Ok(record) => record,
            Err(err) => {
                debug!(error = %err, "Ignoring unreadable monitor record");
                None
            }
        }
    }

    fn record(&self, record: &MonitorRecord) -> Result<()> {
        set_json(self.controller.store(), keys::WATCH_MONITOR, record)
    }

    pub fn poll(&self, app: &WatchedApp) -> WatchTick {
        let Some(record) = self.current_record() else {
            debug!(app = %app.name, "Monitor record gone");
            return WatchTick::Superseded;
        };
        if record.app != *app {
            debug!(app = %app.name, current = %record.app.name, "Another app is being watched");
            return WatchTick::Superseded;
        }
        if let (Some(owner), Some(recorded)) = (self.owner_pid, record.monitor_pid) {
            if owner != recorded {
                debug!(owner, recorded, "Watch taken over by another monitor");
                return WatchTick::Superseded;
            }
        }

        let watching = self
            .controller
            .current_info()
            .is_some_and(|current| current.is_watching(app));
        if !watching {
            debug!(app = %app.name, "Session no longer tied to watched app");
            return WatchTick::Superseded;
        }

        if self.controller.executor().is_alive(app.pid) {
            return WatchTick::Alive;
        }

        info!(app = %app.name, app_pid = app.pid, "Watched app exited");
        self.controller.stop();
        self.notifier.notify(
            &format!("{} quit, your computer can sleep again", app.name),
            NotifyLevel::Info,
        );
        WatchTick::Ended
    }

    /// Polls until the app exits or the watch is superseded.
    pub fn run(&self, app: &WatchedApp) -> WatchTick {
        loop {
            match self.poll(app) {
                WatchTick::Alive => thread::sleep(self.poll_interval),
                done => {
                    debug!(app = %app.name, outcome = ?done, "Monitor finished");
                    return done;
                }
            }
        }
    }

    /// `begin` followed by `run`, in the calling thread.
    pub fn watch(&self, app: &WatchedApp) -> Result<WatchTick> {
        self.begin(app)?;
        Ok(self.run(app))
    }
}
