//! Manual and bounded sessions.

use chrono::{Local, Utc};
use coffee_core::format::{format_duration, format_end_time, parse_duration, seconds_until};
use coffee_core::{CaffeinationIntent, TimeOfDay};
use tracing::info;

use crate::context::AppContext;
use crate::error::CliError;

const CAFFEINATED: &str = "☕ Your computer is now caffeinated!";
const DECAFFEINATED: &str = "💤 Your computer is now decaffeinated";

/// Manual session. A running schedule for today is marked overridden so the
/// end of its window does not take the session back over.
pub fn caffeinate(ctx: &AppContext) -> Result<(), CliError> {
    if let Some(schedule) = ctx.reconciler().set_manual_override(true, &Local::now())? {
        info!(day = %schedule.day, "Manual caffeination overrides today's schedule");
    }
    ctx.controller.start(CaffeinationIntent::manual(), None)?;
    println!("{}", CAFFEINATED);
    Ok(())
}

pub fn decaffeinate(ctx: &AppContext) -> Result<(), CliError> {
    let running = ctx
        .reconciler()
        .todays_schedule(&Local::now())
        .is_some_and(|schedule| schedule.is_running);
    if running {
        return Err(CliError::Refused(
            "⏸️ Caffeination schedule is running - pause it to decaffeinate".to_string(),
        ));
    }
    ctx.controller.stop();
    println!("{}", DECAFFEINATED);
    Ok(())
}

pub fn toggle(ctx: &AppContext) -> Result<(), CliError> {
    if ctx.controller.is_active() {
        ctx.controller.stop();
        println!("{}", DECAFFEINATED);
    } else {
        ctx.controller.start(CaffeinationIntent::manual(), None)?;
        println!("{}", CAFFEINATED);
    }
    Ok(())
}

pub fn caffeinate_for(ctx: &AppContext, duration: &str) -> Result<(), CliError> {
    let secs = parse_duration(duration)?;
    ctx.controller
        .start(CaffeinationIntent::timed(), Some(secs))?;
    println!("☕ Caffeinated for {}", format_duration(secs));
    Ok(())
}

pub fn caffeinate_until(ctx: &AppContext, time: &str) -> Result<(), CliError> {
    let target: TimeOfDay = time.parse()?;
    let now = Local::now();
    let secs = seconds_until(target, &now);
    let handle = ctx
        .controller
        .start_at(CaffeinationIntent::until(), Some(secs), now.with_timezone(&Utc))?;
    info!(pid = handle.process_id, until = %target, "Caffeinated until time of day");
    let end = now + chrono::Duration::seconds(secs as i64);
    println!("☕ Caffeinated until {}", format_end_time(&end));
    Ok(())
}
