use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::session::SessionController;
use crate::store::{get_json, set_json};
use crate::types::CaffeinationIntent;

use super::types::{Day, Schedule, TimeOfDay};

/// What a reconciliation tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No schedule for today.
    NoSchedule,
    /// Inside the window, but the user decaffeinated manually.
    Suppressed,
    /// Entered the window; a scheduled session was started.
    Started,
    /// Left the window; the session was stopped.
    Stopped,
    /// Nothing to do.
    Unchanged,
}

impl TickOutcome {
    /// True if this tick began scheduled caffeination.
    pub fn started(&self) -> bool {
        matches!(self, TickOutcome::Started)
    }
}

/// Drives the session controller from the weekly schedule.
///
/// Ticks are external: the host calls [`ScheduleReconciler::tick_now`]
/// whenever it refreshes status.
pub struct ScheduleReconciler<'a> {
    controller: &'a SessionController,
}

impl<'a> ScheduleReconciler<'a> {
    pub fn new(controller: &'a SessionController) -> Self {
        Self { controller }
    }

    pub fn schedule_for(&self, day: Day) -> Option<Schedule> {
        match get_json(self.controller.store(), day.key()) {
            Ok(schedule) => schedule,
            Err(err) => {
                warn!(day = %day, error = %err, "Ignoring unreadable schedule");
                None
            }
        }
    }

    pub fn todays_schedule<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<Schedule> {
        self.schedule_for(Day::from(now.weekday()))
    }

    pub fn all_schedules(&self) -> Vec<Schedule> {
        Day::ALL
            .into_iter()
            .filter_map(|day| self.schedule_for(day))
            .collect()
    }

    pub fn save_schedule(&self, schedule: &Schedule) -> Result<()> {
        set_json(self.controller.store(), schedule.day.key(), schedule)
    }

    pub fn remove_schedule(&self, day: Day) -> Result<()> {
        self.controller.store().remove(day.key())
    }

    pub fn tick_now(&self) -> Result<TickOutcome> {
        self.tick(Local::now())
    }

    /// Evaluates today's schedule against `now`'s wall-clock time.
    pub fn tick<Tz: TimeZone>(&self, now: DateTime<Tz>) -> Result<TickOutcome> {
        let Some(mut schedule) = self.todays_schedule(&now) else {
            return Ok(TickOutcome::NoSchedule);
        };

        let inside = schedule.contains(TimeOfDay::from_time(&now));

        if schedule.is_running && !inside {
            // Leaving the window always clears running state, override or not.
            self.controller.stop();
            schedule.is_running = false;
            self.save_schedule(&schedule)?;
            info!(day = %schedule.day, to = %schedule.to, "Scheduled caffeination ended");
            return Ok(TickOutcome::Stopped);
        }

        if !schedule.is_running && inside {
            if schedule.is_manually_decaffeinated {
                debug!(day = %schedule.day, "Schedule suppressed by manual decaffeination");
                return Ok(TickOutcome::Suppressed);
            }

            let duration = schedule.duration_secs();
            self.controller.start_at(
                CaffeinationIntent::scheduled(),
                Some(duration),
                now.with_timezone(&Utc),
            )?;
            schedule.is_running = true;
            self.save_schedule(&schedule)?;
            info!(
                day = %schedule.day,
                from = %schedule.from,
                to = %schedule.to,
                duration_secs = duration,
                "Scheduled caffeination started"
            );
            return Ok(TickOutcome::Started);
        }

        Ok(TickOutcome::Unchanged)
    }

    /// Records a manual toggle against today's schedule, if there is one.
    ///
    /// Returns the schedule only when it changed. Decaffeinating leaves an
    /// idle schedule for today alone, so its window still starts later.
    pub fn set_manual_override<Tz: TimeZone>(
        &self,
        decaffeinate: bool,
        now: &DateTime<Tz>,
    ) -> Result<Option<Schedule>> {
        let today = Day::from(now.weekday());
        let Some(mut schedule) = self.schedule_for(today) else {
            return Ok(None);
        };
        if !apply_manual_override(&mut schedule, decaffeinate, today) {
            debug!(day = %schedule.day, "Idle schedule left untouched by manual toggle");
            return Ok(None);
        }
        self.save_schedule(&schedule)?;
        Ok(Some(schedule))
    }

    /// Suppresses today's schedule until it is resumed, running or not.
    pub fn pause_today<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Option<Schedule>> {
        let Some(mut schedule) = self.todays_schedule(now) else {
            return Ok(None);
        };
        schedule.is_manually_decaffeinated = true;
        schedule.is_running = false;
        self.save_schedule(&schedule)?;
        Ok(Some(schedule))
    }
}

/// Applies a manual toggle to `schedule`, returning whether it changed.
///
/// Decaffeinating sets the sticky flag and forces `is_running` off, but only
/// for a running schedule or one left over from a day other than `today`.
/// Re-caffeinating always clears both flags.
pub fn apply_manual_override(schedule: &mut Schedule, decaffeinate: bool, today: Day) -> bool {
    if decaffeinate && !schedule.is_running && schedule.day == today {
        return false;
    }
    schedule.is_manually_decaffeinated = decaffeinate;
    schedule.is_running = false;
    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::FixedOffset;

    use super::*;
    use crate::config::InhibitOptions;
    use crate::session::termination::TerminationPolicy;
    use crate::store::MemoryStore;
    use crate::testing::{FakeExecutor, RecordingObserver};
    use crate::types::CaffeinationKind;

    fn controller() -> (Arc<FakeExecutor>, SessionController) {
        let executor = Arc::new(FakeExecutor::new());
        let controller = SessionController::new(
            executor.clone(),
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingObserver::new()),
            InhibitOptions::default(),
        )
        .with_termination_policy(TerminationPolicy::immediate());
        (executor, controller)
    }

    // 2026-03-02 is a Monday.
    fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
    }

    fn nine_to_five(reconciler: &ScheduleReconciler<'_>) {
        let schedule = Schedule::new(
            Day::Monday,
            "09:00".parse().unwrap(),
            "17:00".parse().unwrap(),
        )
        .unwrap();
        reconciler.save_schedule(&schedule).unwrap();
    }

    #[test]
    fn no_schedule_means_no_action() {
        let (executor, controller) = controller();
        let reconciler = ScheduleReconciler::new(&controller);
        assert_eq!(
            reconciler.tick(monday_at(10, 0)).unwrap(),
            TickOutcome::NoSchedule
        );
        assert!(executor.launches().is_empty());
    }

    #[test]
    fn entering_window_starts_for_full_window_length() {
        let (executor, controller) = controller();
        let reconciler = ScheduleReconciler::new(&controller);
        nine_to_five(&reconciler);

        let outcome = reconciler.tick(monday_at(10, 0)).unwrap();

        assert!(outcome.started());
        assert_eq!(executor.launches(), vec![Some(28_800)]);
        assert!(reconciler.schedule_for(Day::Monday).unwrap().is_running);
        assert_eq!(
            controller.current_info().map(|info| info.kind),
            Some(CaffeinationKind::Scheduled)
        );
    }

    #[test]
    fn second_tick_inside_window_is_unchanged() {
        let (executor, controller) = controller();
        let reconciler = ScheduleReconciler::new(&controller);
        nine_to_five(&reconciler);

        reconciler.tick(monday_at(10, 0)).unwrap();
        let outcome = reconciler.tick(monday_at(10, 2)).unwrap();

        assert_eq!(outcome, TickOutcome::Unchanged);
        assert_eq!(executor.launches().len(), 1);
    }

    #[test]
    fn leaving_window_stops_session() {
        let (executor, controller) = controller();
        let reconciler = ScheduleReconciler::new(&controller);
        nine_to_five(&reconciler);
        reconciler.tick(monday_at(10, 0)).unwrap();

        let outcome = reconciler.tick(monday_at(17, 0)).unwrap();

        assert_eq!(outcome, TickOutcome::Stopped);
        assert_eq!(executor.alive_count(), 0);
        assert!(controller.current_info().is_none());
        let schedule = reconciler.schedule_for(Day::Monday).unwrap();
        assert!(!schedule.is_running);
        assert!(!schedule.is_manually_decaffeinated);
    }

    #[test]
    fn leaving_window_stops_even_with_manual_flag() {
        let (_executor, controller) = controller();
        let reconciler = ScheduleReconciler::new(&controller);
        let mut schedule = Schedule::new(
            Day::Monday,
            "09:00".parse().unwrap(),
            "17:00".parse().unwrap(),
        )
        .unwrap();
        schedule.is_running = true;
        schedule.is_manually_decaffeinated = true;
        reconciler.save_schedule(&schedule).unwrap();

        assert_eq!(
            reconciler.tick(monday_at(18, 0)).unwrap(),
            TickOutcome::Stopped
        );
        let saved = reconciler.schedule_for(Day::Monday).unwrap();
        assert!(!saved.is_running);
        assert!(saved.is_manually_decaffeinated);
    }

    #[test]
    fn manual_decaffeination_before_window_keeps_schedule() {
        let (executor, controller) = controller();
        let reconciler = ScheduleReconciler::new(&controller);
        nine_to_five(&reconciler);

        assert!(reconciler
            .set_manual_override(true, &monday_at(8, 0))
            .unwrap()
            .is_none());
        assert!(!reconciler.schedule_for(Day::Monday).unwrap().is_manually_decaffeinated);

        assert_eq!(
            reconciler.tick(monday_at(10, 0)).unwrap(),
            TickOutcome::Started
        );
        assert_eq!(executor.launches().len(), 1);
    }

    #[test]
    fn manual_decaffeination_mid_window_suppresses() {
        let (executor, controller) = controller();
        let reconciler = ScheduleReconciler::new(&controller);
        nine_to_five(&reconciler);
        reconciler.tick(monday_at(10, 0)).unwrap();

        let updated = reconciler
            .set_manual_override(true, &monday_at(10, 30))
            .unwrap()
            .unwrap();
        assert!(updated.is_manually_decaffeinated);
        assert!(!updated.is_running);
        controller.stop();

        assert_eq!(
            reconciler.tick(monday_at(11, 0)).unwrap(),
            TickOutcome::Suppressed
        );
        assert_eq!(executor.launches().len(), 1);
    }

    #[test]
    fn paused_schedule_stays_suppressed() {
        let (executor, controller) = controller();
        let reconciler = ScheduleReconciler::new(&controller);
        nine_to_five(&reconciler);

        let paused = reconciler.pause_today(&monday_at(8, 0)).unwrap().unwrap();
        assert!(paused.is_manually_decaffeinated);

        assert_eq!(
            reconciler.tick(monday_at(10, 0)).unwrap(),
            TickOutcome::Suppressed
        );
        assert!(executor.launches().is_empty());
    }

    #[test]
    fn clearing_override_lets_window_start_again() {
        let (executor, controller) = controller();
        let reconciler = ScheduleReconciler::new(&controller);
        nine_to_five(&reconciler);
        reconciler.pause_today(&monday_at(8, 0)).unwrap();
        reconciler.set_manual_override(false, &monday_at(9, 30)).unwrap();

        assert!(reconciler.tick(monday_at(10, 0)).unwrap().started());
        assert_eq!(executor.launches().len(), 1);
    }

    #[test]
    fn override_without_schedule_is_none() {
        let (_executor, controller) = controller();
        let reconciler = ScheduleReconciler::new(&controller);
        assert!(reconciler
            .set_manual_override(true, &monday_at(8, 0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn override_resets_running_flag() {
        let mut schedule = Schedule::new(
            Day::Tuesday,
            "09:00".parse().unwrap(),
            "17:00".parse().unwrap(),
        )
        .unwrap();
        schedule.is_running = true;

        assert!(apply_manual_override(&mut schedule, true, Day::Tuesday));
        assert!(schedule.is_manually_decaffeinated);
        assert!(!schedule.is_running);

        assert!(apply_manual_override(&mut schedule, false, Day::Tuesday));
        assert!(!schedule.is_manually_decaffeinated);
        assert!(!schedule.is_running);
    }

    #[test]
    fn override_marks_leftover_schedule_from_another_day() {
        let mut schedule = Schedule::new(
            Day::Tuesday,
            "09:00".parse().unwrap(),
            "17:00".parse().unwrap(),
        )
        .unwrap();

        assert!(apply_manual_override(&mut schedule, true, Day::Monday));
        assert!(schedule.is_manually_decaffeinated);

        let mut idle_today = Schedule::new(
            Day::Monday,
            "09:00".parse().unwrap(),
            "17:00".parse().unwrap(),
        )
        .unwrap();
        assert!(!apply_manual_override(&mut idle_today, true, Day::Monday));
        assert!(!idle_today.is_manually_decaffeinated);
    }

    #[test]
    fn zero_length_window_never_starts() {
        let (executor, controller) = controller();
        let reconciler = ScheduleReconciler::new(&controller);
        let nine = "09:00".parse().unwrap();
        reconciler
            .save_schedule(&Schedule {
                day: Day::Monday,
                from: nine,
                to: nine,
                is_manually_decaffeinated: false,
                is_running: false,
            })
            .unwrap();

        assert_eq!(
            reconciler.tick(monday_at(9, 0)).unwrap(),
            TickOutcome::Unchanged
        );
        assert!(executor.launches().is_empty());
    }

    #[test]
    fn launch_failure_leaves_schedule_idle() {
        let (executor, controller) = controller();
        let reconciler = ScheduleReconciler::new(&controller);
        nine_to_five(&reconciler);
        executor.fail_launches("no inhibitor");

        assert!(reconciler.tick(monday_at(10, 0)).is_err());
        assert!(!reconciler.schedule_for(Day::Monday).unwrap().is_running);
    }

    #[test]
    fn weekday_follows_local_offset() {
        let (_executor, controller) = controller();
        let reconciler = ScheduleReconciler::new(&controller);
        nine_to_five(&reconciler);

        // Sunday 23:30 UTC is Monday 10:30 in UTC+11.
        let offset = FixedOffset::east_opt(11 * 3600).unwrap();
        let now = Utc
            .with_ymd_and_hms(2026, 3, 1, 23, 30, 0)
            .unwrap()
            .with_timezone(&offset);

        assert!(reconciler.tick(now).unwrap().started());
    }

    #[test]
    fn unreadable_schedule_is_ignored() {
        let (_executor, controller) = controller();
        controller.store().set("monday", "{not json").unwrap();
        let reconciler = ScheduleReconciler::new(&controller);
        assert!(reconciler.schedule_for(Day::Monday).is_none());
        assert!(reconciler.all_schedules().is_empty());
    }
}
