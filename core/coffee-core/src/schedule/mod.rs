//! Per-weekday caffeination windows and the reconciler that enforces them.

mod reconciler;
mod types;

pub use reconciler::{apply_manual_override, ScheduleReconciler, TickOutcome};
pub use types::{Day, Schedule, TimeOfDay};
