//! `coffee status`: the periodic tick. Hosts such as a menu bar plugin call
//! this every few seconds.

use chrono::{Local, Utc};
use coffee_core::format::{format_end_time, icon, status_text};
use serde::Serialize;
use tracing::warn;

use crate::context::AppContext;
use crate::error::CliError;

#[derive(Serialize)]
struct StatusReport<'a> {
    text: String,
    icon: &'a str,
    #[serde(flatten)]
    session: coffee_core::SessionStatus,
}

pub fn run(ctx: &AppContext, json: bool) -> Result<(), CliError> {
    // A failed scheduled launch must not hide the current state.
    if let Err(err) = ctx.reconciler().tick_now() {
        warn!(error = %err, "Schedule tick failed");
    }

    let session = ctx.controller.status();
    let now = Utc::now();
    let report = StatusReport {
        text: status_text(session.info.as_ref(), session.active, now),
        icon: icon(&ctx.config.ui.icon, session.active),
        session,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", report.icon, report.text);
    if let Some(info) = &report.session.info {
        if let Some(end) = info.end_time {
            println!("Ends: {}", format_end_time(&end.with_timezone(&Local)));
        }
        if let Some(app) = &info.watched_app {
            println!("Watching: {} (pid {})", app.name, app.pid);
        }
    }
    Ok(())
}
