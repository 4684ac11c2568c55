//! `coffee schedule ...`: edit the weekly windows.

use chrono::Local;
use clap::Subcommand;
use coffee_core::{CaffeinationKind, Day, Schedule, TimeOfDay};
use tracing::info;

use crate::context::AppContext;
use crate::error::CliError;

#[derive(Subcommand)]
pub enum ScheduleCommand {
    /// Set the window for a weekday
    Set {
        /// monday..sunday (or mon..sun)
        #[arg(value_name = "DAY")]
        day: String,

        /// Start time, HH:MM
        #[arg(value_name = "FROM")]
        from: String,

        /// End time, HH:MM
        #[arg(value_name = "TO")]
        to: String,
    },

    /// Print all configured windows
    Show,

    /// Delete the window for a weekday
    Remove {
        #[arg(value_name = "DAY")]
        day: String,
    },

    /// Stop today's scheduled caffeination until `coffee schedule resume`
    Pause,

    /// Let today's schedule caffeinate again
    Resume,
}

pub fn run(ctx: &AppContext, command: ScheduleCommand) -> Result<(), CliError> {
    match command {
        ScheduleCommand::Set { day, from, to } => set(ctx, &day, &from, &to),
        ScheduleCommand::Show => show(ctx),
        ScheduleCommand::Remove { day } => remove(ctx, &day),
        ScheduleCommand::Pause => pause(ctx),
        ScheduleCommand::Resume => resume(ctx),
    }
}

fn set(ctx: &AppContext, day: &str, from: &str, to: &str) -> Result<(), CliError> {
    let day: Day = day.parse()?;
    let from: TimeOfDay = from.parse()?;
    let to: TimeOfDay = to.parse()?;
    let schedule = Schedule::new(day, from, to)?;

    let reconciler = ctx.reconciler();
    if let Some(previous) = reconciler.schedule_for(day) {
        if previous.is_running {
            // Replacing a live window: end its session, the next tick decides anew.
            ctx.controller.stop();
        }
    }
    reconciler.save_schedule(&schedule)?;
    info!(day = %day, from = %from, to = %to, "Schedule saved");
    println!("📅 {} {}-{}", capitalize(day.key()), from, to);
    Ok(())
}

fn show(ctx: &AppContext) -> Result<(), CliError> {
    let schedules = ctx.reconciler().all_schedules();
    if schedules.is_empty() {
        println!("No schedule configured");
        return Ok(());
    }
    for schedule in schedules {
        let mut flags = Vec::new();
        if schedule.is_running {
            flags.push("running");
        }
        if schedule.is_manually_decaffeinated {
            flags.push("paused");
        }
        let suffix = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        println!(
            "{:<10} {}-{}{}",
            capitalize(schedule.day.key()),
            schedule.from,
            schedule.to,
            suffix
        );
    }
    Ok(())
}

fn remove(ctx: &AppContext, day: &str) -> Result<(), CliError> {
    let day: Day = day.parse()?;
    let reconciler = ctx.reconciler();
    if reconciler
        .schedule_for(day)
        .is_some_and(|schedule| schedule.is_running)
    {
        ctx.controller.stop();
    }
    reconciler.remove_schedule(day)?;
    println!("🗑️ Removed {} schedule", capitalize(day.key()));
    Ok(())
}

fn pause(ctx: &AppContext) -> Result<(), CliError> {
    let Some(schedule) = ctx.reconciler().pause_today(&Local::now())? else {
        println!("No schedule for today");
        return Ok(());
    };
    let scheduled = ctx
        .controller
        .current_info()
        .is_some_and(|info| info.kind == CaffeinationKind::Scheduled);
    if scheduled {
        ctx.controller.stop();
    }
    println!("⏸️ {} schedule paused", capitalize(schedule.day.key()));
    Ok(())
}

fn resume(ctx: &AppContext) -> Result<(), CliError> {
    let reconciler = ctx.reconciler();
    let Some(schedule) = reconciler.set_manual_override(false, &Local::now())? else {
        println!("No schedule for today");
        return Ok(());
    };
    if reconciler.tick_now()?.started() {
        println!("☕ Scheduled caffeination resumed");
    } else {
        println!("▶️ {} schedule resumed", capitalize(schedule.day.key()));
    }
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_day_names() {
        assert_eq!(capitalize("monday"), "Monday");
        assert_eq!(capitalize(""), "");
    }
}
