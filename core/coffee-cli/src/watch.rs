//! `coffee while` and the detached `coffee monitor` loop it spawns.

use coffee_core::platform::spawn_detached;
use coffee_core::{find_app, running_apps, CoffeeError, WatchedApp};
use tracing::{info, warn};

use crate::context::AppContext;
use crate::error::CliError;

pub fn caffeinate_while(ctx: &AppContext, query: &str) -> Result<(), CliError> {
    let apps = running_apps();
    let app = find_app(&apps, query)
        .map(|app| WatchedApp::new(app.name.clone(), app.pid))
        .ok_or_else(|| CoffeeError::AppNotFound(query.to_string()))?;

    let monitor = ctx.monitor();
    monitor.begin(&app)?;

    let exe = std::env::current_exe().map_err(CliError::CurrentExe)?;
    let args = vec![
        "monitor".to_string(),
        "--name".to_string(),
        app.name.clone(),
        "--pid".to_string(),
        app.pid.to_string(),
    ];
    match spawn_detached(&exe.to_string_lossy(), &args) {
        Ok(monitor_pid) => {
            monitor.claim(&app, monitor_pid)?;
            info!(app = %app.name, app_pid = app.pid, monitor_pid, "App monitor started");
        }
        Err(err) => {
            // Without a monitor nothing would ever end this session.
            warn!(error = %err, "App monitor failed to start, stopping session");
            ctx.controller.stop();
            return Err(err.into());
        }
    }

    println!("☕ Caffeinated while {} runs", app.name);
    Ok(())
}

pub fn monitor(ctx: &AppContext, name: &str, pid: u32) -> Result<(), CliError> {
    let app = WatchedApp::new(name, pid);
    let outcome = ctx
        .monitor()
        .with_owner_pid(std::process::id())
        .run(&app);
    info!(app = %app.name, app_pid = pid, outcome = ?outcome, "App monitor exiting");
    Ok(())
}

pub fn list_apps() -> Result<(), CliError> {
    for app in running_apps() {
        println!("{:>7}  {}", app.pid, app.name);
    }
    Ok(())
}
