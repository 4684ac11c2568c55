//! Outbound collaborator seams: user notifications and surface refreshes.
//!
//! Both are fire-and-forget. Nothing in the core waits on them for
//! correctness, and refresh failures are swallowed by the caller.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Success,
    Failure,
}

/// A UI surface that mirrors caffeination state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    #[serde(rename = "menubar")]
    MenuBar,
    Status,
}

impl Surface {
    pub const ALL: [Surface; 2] = [Surface::MenuBar, Surface::Status];

    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::MenuBar => "menubar",
            Surface::Status => "status",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, level: NotifyLevel);
}

pub trait StatusObserver: Send + Sync {
    /// Asks `surface` to redraw. An error (e.g. surface not registered) is
    /// reported back but must never affect session state.
    fn request_refresh(&self, surface: Surface, active: bool) -> Result<(), String>;
}

/// Observer for hosts without any refreshable surface.
pub struct NoSurfaces;

impl StatusObserver for NoSurfaces {
    fn request_refresh(&self, surface: Surface, _active: bool) -> Result<(), String> {
        Err(format!("surface '{}' not registered", surface))
    }
}

/// Notifier that only logs.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, level: NotifyLevel) {
        match level {
            NotifyLevel::Failure => tracing::warn!(message, "Notification"),
            NotifyLevel::Info | NotifyLevel::Success => tracing::info!(message, "Notification"),
        }
    }
}

/// Refreshes every surface, logging and discarding failures.
pub(crate) fn refresh_all(observer: &dyn StatusObserver, active: bool) {
    for surface in Surface::ALL {
        if let Err(err) = observer.request_refresh(surface, active) {
            tracing::debug!(surface = %surface, error = %err, "Surface refresh skipped");
        }
    }
}
