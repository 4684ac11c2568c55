//! Weekly schedule driving real sessions over a file-backed store.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use coffee_core::testing::{FakeExecutor, RecordingObserver};
use coffee_core::{
    CaffeinationKind, Day, FileStore, InhibitOptions, Schedule, ScheduleReconciler,
    SessionController, TerminationPolicy, TickOutcome,
};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    executor: Arc<FakeExecutor>,
    controller: SessionController,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let executor = Arc::new(FakeExecutor::new());
    let controller = SessionController::new(
        executor.clone(),
        Arc::new(FileStore::new(&dir.path().join("state.json"))),
        Arc::new(RecordingObserver::new()),
        InhibitOptions::default(),
    )
    .with_termination_policy(TerminationPolicy::immediate());
    Fixture {
        _dir: dir,
        executor,
        controller,
    }
}

// 2026-03-02 is a Monday.
fn monday(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
}

fn workday(day: Day) -> Schedule {
    Schedule::new(day, "09:00".parse().unwrap(), "17:00".parse().unwrap()).expect("schedule")
}

#[test]
fn monday_window_runs_a_full_day() {
    let f = fixture();
    let reconciler = ScheduleReconciler::new(&f.controller);
    reconciler.save_schedule(&workday(Day::Monday)).expect("save");

    assert_eq!(reconciler.tick(monday(8, 59)).expect("tick"), TickOutcome::Unchanged);
    assert_eq!(reconciler.tick(monday(9, 0)).expect("tick"), TickOutcome::Started);
    assert_eq!(f.executor.launches(), vec![Some(28_800)]);

    let info = f.controller.current_info().expect("info");
    assert_eq!(info.kind, CaffeinationKind::Scheduled);
    assert_eq!(info.end_time, Some(monday(17, 0)));

    assert_eq!(reconciler.tick(monday(12, 0)).expect("tick"), TickOutcome::Unchanged);
    assert_eq!(reconciler.tick(monday(17, 0)).expect("tick"), TickOutcome::Stopped);
    assert!(!f.controller.is_active_at(monday(17, 0)));
    assert!(!reconciler.schedule_for(Day::Monday).expect("schedule").is_running);
}

#[test]
fn other_days_are_ignored() {
    let f = fixture();
    let reconciler = ScheduleReconciler::new(&f.controller);
    reconciler.save_schedule(&workday(Day::Tuesday)).expect("save");

    assert_eq!(reconciler.tick(monday(10, 0)).expect("tick"), TickOutcome::NoSchedule);
    assert!(f.executor.launches().is_empty());
}

#[test]
fn manual_decaffeination_holds_for_the_rest_of_the_window() {
    let f = fixture();
    let reconciler = ScheduleReconciler::new(&f.controller);
    reconciler.save_schedule(&workday(Day::Monday)).expect("save");
    reconciler.tick(monday(10, 0)).expect("tick");

    // A manual toggle mid-window, after which the session is stopped.
    reconciler
        .set_manual_override(true, &monday(10, 30))
        .expect("override");
    f.controller.stop();

    for minute in [31, 45, 59] {
        assert_eq!(
            reconciler.tick(monday(10, minute)).expect("tick"),
            TickOutcome::Suppressed
        );
    }
    assert_eq!(f.executor.launches().len(), 1);
    assert_eq!(f.executor.alive_count(), 0);
}

#[test]
fn caffeinating_before_the_window_does_not_disable_it() {
    let f = fixture();
    let reconciler = ScheduleReconciler::new(&f.controller);
    reconciler.save_schedule(&workday(Day::Monday)).expect("save");

    assert!(reconciler
        .set_manual_override(true, &monday(8, 0))
        .expect("override")
        .is_none());
    let next_monday = monday(10, 0) + chrono::Duration::days(7);

    assert_eq!(reconciler.tick(next_monday).expect("tick"), TickOutcome::Started);
    let saved = reconciler.schedule_for(Day::Monday).expect("schedule");
    assert!(!saved.is_manually_decaffeinated);
    assert!(saved.is_running);
}

#[test]
fn schedules_can_be_listed_and_removed() {
    let f = fixture();
    let reconciler = ScheduleReconciler::new(&f.controller);
    reconciler.save_schedule(&workday(Day::Friday)).expect("save");
    reconciler.save_schedule(&workday(Day::Monday)).expect("save");

    let days: Vec<Day> = reconciler.all_schedules().iter().map(|s| s.day).collect();
    assert_eq!(days, vec![Day::Monday, Day::Friday]);

    reconciler.remove_schedule(Day::Monday).expect("remove");
    assert!(reconciler.schedule_for(Day::Monday).is_none());
}
