//! Session controller: the single caffeination session and its lifecycle.
//!
//! # State
//!
//! Everything lives in the [`KeyValueStore`], never in process memory, so a
//! CLI invocation, the detached monitor, and a later invocation all agree:
//!
//! | Key | Value |
//! |-----|-------|
//! | `caffeinate_pid` | inhibitor PID |
//! | `caffeinate_resource` | auxiliary resource path (optional) |
//! | `caffeination_info` | [`CaffeinationInfo`] JSON |
//! | `watch_monitor` | app-liveness monitor bookkeeping |
//!
//! # Liveness
//!
//! Stored state is only a hint. [`SessionController::is_active`] re-checks
//! the PID against the OS on every call and clears everything when the
//! inhibitor is gone (crash, manual kill, reboot, natural expiry).

pub mod termination;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::InhibitOptions;
use crate::error::{CoffeeError, Result};
use crate::notify::{refresh_all, StatusObserver};
use crate::platform::PlatformExecutor;
use crate::store::{get_json, keys, set_json, KeyValueStore};
use crate::types::{CaffeinationInfo, CaffeinationIntent, SessionHandle};

use termination::{remove_resource, Terminated, TerminationPolicy};

/// A bounded session still running this long past its end time is stopped.
pub const EXPIRY_GRACE_SECS: i64 = 5;

/// Snapshot for presentation: liveness plus intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<CaffeinationInfo>,
}

pub struct SessionController {
    executor: Arc<dyn PlatformExecutor>,
    store: Arc<dyn KeyValueStore>,
    observer: Arc<dyn StatusObserver>,
    options: InhibitOptions,
    termination: TerminationPolicy,
}

impl SessionController {
    pub fn new(
        executor: Arc<dyn PlatformExecutor>,
        store: Arc<dyn KeyValueStore>,
        observer: Arc<dyn StatusObserver>,
        options: InhibitOptions,
    ) -> Self {
        Self {
            executor,
            store,
            observer,
            options,
            termination: TerminationPolicy::default(),
        }
    }

    pub fn with_termination_policy(mut self, policy: TerminationPolicy) -> Self {
        self.termination = policy;
        self
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn executor(&self) -> &dyn PlatformExecutor {
        self.executor.as_ref()
    }

    /// Starts a session, replacing any session that is already running.
    pub fn start(
        &self,
        intent: CaffeinationIntent,
        duration_secs: Option<u64>,
    ) -> Result<SessionHandle> {
        self.start_at(intent, duration_secs, Utc::now())
    }

    pub fn start_at(
        &self,
        intent: CaffeinationIntent,
        duration_secs: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<SessionHandle> {
        // Later intent wins; never leave the previous inhibitor orphaned.
        self.stop_session(false);

        let handle = self
            .executor
            .launch_inhibitor(&self.options, duration_secs)
            .map_err(|err| {
                error!(executor = self.executor.name(), error = %err, "Failed to start caffeination");
                err
            })?;

        let info = intent.into_info(now, duration_secs);
        if let Err(err) = self.persist(&handle, &info) {
            warn!(
                pid = handle.process_id,
                error = %err,
                "Failed to persist session, terminating fresh inhibitor"
            );
            if let Err(kill_err) =
                termination::terminate(self.executor.as_ref(), Some(&handle), self.termination)
            {
                warn!(error = %kill_err, "Could not terminate unpersisted inhibitor");
            }
            self.clear_session_state();
            return Err(err);
        }

        info!(
            pid = handle.process_id,
            kind = ?info.kind,
            end_time = ?info.end_time,
            watched_app = ?info.watched_app.as_ref().map(|app| &app.name),
            "Caffeination started"
        );
        refresh_all(self.observer.as_ref(), true);
        Ok(handle)
    }

    /// Stops the session. Never fails: whatever happens to the OS process,
    /// local state is cleared so the user is never stuck "caffeinated".
    pub fn stop(&self) {
        self.stop_session(true);
    }

    fn stop_session(&self, refresh: bool) {
        let handle = self.stored_handle();
        match termination::terminate(self.executor.as_ref(), handle.as_ref(), self.termination) {
            Ok(Terminated::NoSession) => debug!("No recorded session to stop"),
            Ok(outcome) => info!(
                pid = handle.as_ref().map(|h| h.process_id),
                outcome = ?outcome,
                "Caffeination stopped"
            ),
            Err(err) => warn!(error = %err, "Clearing session state despite unconfirmed termination"),
        }

        self.clear_session_state();
        if refresh {
            refresh_all(self.observer.as_ref(), false);
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// Liveness check against the OS. Heals stale state as a side effect.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        let Some(handle) = self.stored_handle() else {
            if self.store.get(keys::SESSION_INFO).is_some() {
                debug!("Clearing session info recorded without an inhibitor");
                self.clear_session_state();
            }
            return false;
        };

        if !self.executor.is_alive(handle.process_id) {
            info!(
                pid = handle.process_id,
                "Inhibitor no longer running, clearing session"
            );
            self.clear_session_state();
            return false;
        }

        if let Some(end) = self.current_info().and_then(|info| info.end_time) {
            if now >= end + Duration::seconds(EXPIRY_GRACE_SECS) {
                info!(pid = handle.process_id, end_time = %end, "Session expired");
                self.stop();
                return false;
            }
        }

        true
    }

    /// Persisted session metadata. Corrupt data reads as absent.
    pub fn current_info(&self) -> Option<CaffeinationInfo> {
        match get_json(self.store.as_ref(), keys::SESSION_INFO) {
            Ok(info) => info,
            Err(err) => {
                warn!(error = %err, "Ignoring unreadable caffeination info");
                None
            }
        }
    }

    pub fn status(&self) -> SessionStatus {
        let active = self.is_active();
        SessionStatus {
            active,
            info: if active { self.current_info() } else { None },
        }
    }

    fn stored_handle(&self) -> Option<SessionHandle> {
        let raw = self.store.get(keys::SESSION_PID)?;
        let process_id = match raw.trim().parse::<u32>() {
            Ok(pid) => pid,
            Err(err) => {
                let err = CoffeeError::CorruptState {
                    key: keys::SESSION_PID.to_string(),
                    details: err.to_string(),
                };
                warn!(error = %err, "Ignoring unreadable inhibitor PID");
                return None;
            }
        };
        Some(SessionHandle {
            process_id,
            auxiliary_resource: self.store.get(keys::SESSION_RESOURCE).map(PathBuf::from),
        })
    }

    fn persist(&self, handle: &SessionHandle, info: &CaffeinationInfo) -> Result<()> {
        self.store
            .set(keys::SESSION_PID, &handle.process_id.to_string())?;
        match &handle.auxiliary_resource {
            Some(path) => self
                .store
                .set(keys::SESSION_RESOURCE, &path.display().to_string())?,
            None => self.store.remove(keys::SESSION_RESOURCE)?,
        }
        set_json(self.store.as_ref(), keys::SESSION_INFO, info)
    }

    fn clear_session_state(&self) {
        if let Some(resource) = self.store.get(keys::SESSION_RESOURCE) {
            remove_resource(&PathBuf::from(resource));
        }
        for key in [
            keys::SESSION_PID,
            keys::SESSION_RESOURCE,
            keys::SESSION_INFO,
            keys::WATCH_MONITOR,
        ] {
            if let Err(err) = self.store.remove(key) {
                warn!(key, error = %err, "Failed to clear session key");
            }
        }
    }
}
