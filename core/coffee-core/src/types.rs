//! Session types shared by the controller, the reconciler and all clients.
//!
//! `CaffeinationInfo` is persisted as JSON under the `caffeination_info` key:
//!
//! ```json
//! {
//!   "kind": "while",
//!   "start_time": "2026-03-02T09:00:00Z",
//!   "watched_app": { "name": "Notes", "pid": 4242 }
//! }
//! ```
//!
//! Optional fields are omitted when absent so that a round trip never
//! introduces defaults that were not there.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Longest bounded session we will timestamp (one year).
pub const MAX_SESSION_SECS: u64 = 365 * 24 * 60 * 60;

/// Why the current session is keeping the machine awake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaffeinationKind {
    /// Indefinite, until the user decaffeinates.
    Manual,
    /// Bounded by a duration.
    Timed,
    /// Bounded by a wall-clock end time.
    Until,
    /// Lives as long as a watched application.
    #[serde(rename = "while")]
    WhileAppRuns,
    /// Started by the schedule reconciler.
    Scheduled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedApp {
    pub name: String,
    pub pid: u32,
}

impl WatchedApp {
    pub fn new(name: impl Into<String>, pid: u32) -> Self {
        Self {
            name: name.into(),
            pid,
        }
    }
}

/// A session intent before it has been timestamped.
///
/// Constructed only through the per-kind constructors so that `watched_app`
/// is present exactly when the kind is [`CaffeinationKind::WhileAppRuns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaffeinationIntent {
    kind: CaffeinationKind,
    watched_app: Option<WatchedApp>,
}

impl CaffeinationIntent {
    pub fn manual() -> Self {
        Self::plain(CaffeinationKind::Manual)
    }

    pub fn timed() -> Self {
        Self::plain(CaffeinationKind::Timed)
    }

    pub fn until() -> Self {
        Self::plain(CaffeinationKind::Until)
    }

    pub fn scheduled() -> Self {
        Self::plain(CaffeinationKind::Scheduled)
    }

    pub fn while_app(app: WatchedApp) -> Self {
        Self {
            kind: CaffeinationKind::WhileAppRuns,
            watched_app: Some(app),
        }
    }

    fn plain(kind: CaffeinationKind) -> Self {
        Self {
            kind,
            watched_app: None,
        }
    }

    pub fn kind(&self) -> CaffeinationKind {
        self.kind
    }

    pub fn watched_app(&self) -> Option<&WatchedApp> {
        self.watched_app.as_ref()
    }

    /// Stamps the intent with a start time and, for bounded sessions, an end time.
    pub fn into_info(self, now: DateTime<Utc>, duration_secs: Option<u64>) -> CaffeinationInfo {
        let end_time =
            duration_secs.map(|secs| now + Duration::seconds(secs.min(MAX_SESSION_SECS) as i64));
        CaffeinationInfo {
            kind: self.kind,
            start_time: now,
            end_time,
            watched_app: self.watched_app,
        }
    }
}

/// Metadata describing the active session's intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaffeinationInfo {
    pub kind: CaffeinationKind,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched_app: Option<WatchedApp>,
}

impl CaffeinationInfo {
    /// Seconds until `end_time`, clamped at zero. `None` for unbounded sessions.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        self.end_time
            .map(|end| end.signed_duration_since(now).num_seconds().max(0) as u64)
    }

    /// True if this session is watching exactly `app`.
    pub fn is_watching(&self, app: &WatchedApp) -> bool {
        self.kind == CaffeinationKind::WhileAppRuns && self.watched_app.as_ref() == Some(app)
    }
}

/// Reference to the OS-level inhibitor process.
///
/// Never trust a stored handle on its own: the process may have been killed,
/// or the machine rebooted, since it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub process_id: u32,
    pub auxiliary_resource: Option<PathBuf>,
}

impl SessionHandle {
    pub fn new(process_id: u32) -> Self {
        Self {
            process_id,
            auxiliary_resource: None,
        }
    }

    pub fn with_resource(process_id: u32, resource: PathBuf) -> Self {
        Self {
            process_id,
            auxiliary_resource: Some(resource),
        }
    }
}
