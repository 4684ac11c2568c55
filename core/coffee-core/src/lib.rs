//! # coffee-core
//!
//! Core library for Coffee: keeps a computer awake on demand, on a weekly
//! schedule, or for as long as some application runs.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. The inhibitor is a separate OS process
//!   and nothing here blocks on it.
//! - **Store is the truth**: Session state lives in a [`KeyValueStore`], so the
//!   CLI, the detached app monitor and later invocations all see the same session.
//! - **Self-healing**: Liveness is re-checked against the OS on every status
//!   query; a vanished inhibitor clears its own state.
//! - **Stop never fails**: Termination problems are logged, local state is
//!   always cleared.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use coffee_core::{platform, CaffeinationIntent, FileStore, NoSurfaces, SessionController};
//!
//! let controller = SessionController::new(
//!     platform::detect()?,
//!     Arc::new(FileStore::new(&storage.state_file())),
//!     Arc::new(NoSurfaces),
//!     config.inhibit.clone(),
//! );
//! controller.start(CaffeinationIntent::timed(), Some(45 * 60))?;
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod notify;
pub mod platform;
pub mod process;
pub mod schedule;
pub mod session;
pub mod storage;
pub mod store;
pub mod types;
pub mod watch;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

// Re-export commonly used items at crate root
pub use config::{load_config, CoffeeConfig, InhibitOptions, MonitorConfig, SurfaceCommands};
pub use error::{CoffeeError, Result};
pub use notify::{LogNotifier, NoSurfaces, Notifier, NotifyLevel, StatusObserver, Surface};
pub use platform::{PlatformExecutor, ProcessMatcher};
pub use process::{find_app, running_apps, RunningApp};
pub use schedule::{Day, Schedule, ScheduleReconciler, TickOutcome, TimeOfDay};
pub use session::termination::TerminationPolicy;
pub use session::{SessionController, SessionStatus};
pub use storage::StorageConfig;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::{CaffeinationInfo, CaffeinationIntent, CaffeinationKind, SessionHandle, WatchedApp};
pub use watch::{AppLivenessMonitor, MonitorRecord, WatchTick};
