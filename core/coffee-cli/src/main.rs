//! coffee: keep the computer awake from the command line.
//!
//! ## Subcommands
//!
//! - `caffeinate` / `decaffeinate` / `toggle`: manual sessions
//! - `for` / `until`: bounded sessions
//! - `while`: session tied to a running app (spawns `monitor`)
//! - `status`: runs a schedule tick, then reports the session
//! - `schedule`: edit the weekly schedule
//! - `monitor`: app-liveness loop (spawned internally)

mod caffeinate;
mod context;
mod error;
mod logging;
mod schedule;
mod status;
mod surfaces;
mod watch;

use clap::{Parser, Subcommand};
use coffee_core::StorageConfig;

use context::AppContext;
use error::CliError;

#[derive(Parser)]
#[command(name = "coffee")]
#[command(about = "Prevent your computer from sleeping")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stay awake until told otherwise
    Caffeinate,

    /// Let the computer sleep again
    Decaffeinate,

    /// Caffeinate if idle, decaffeinate if active
    Toggle,

    /// Stay awake for a duration (e.g. 45m, 1h30m, 2h; bare numbers are minutes)
    For {
        #[arg(value_name = "DURATION")]
        duration: String,
    },

    /// Stay awake until a time of day (HH:MM, 24-hour)
    Until {
        #[arg(value_name = "TIME")]
        time: String,
    },

    /// Stay awake while an application is running
    While {
        /// App name (or part of it) or PID
        #[arg(value_name = "APP")]
        app: String,
    },

    /// List running applications that can be watched
    Apps,

    /// Evaluate the schedule and print the current state
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the weekly caffeination schedule
    Schedule {
        #[command(subcommand)]
        command: schedule::ScheduleCommand,
    },

    /// App monitor loop (spawned by `while`)
    #[command(hide = true)]
    Monitor {
        #[arg(long)]
        name: String,

        #[arg(long)]
        pid: u32,
    },
}

fn main() {
    let cli = Cli::parse();
    let storage = StorageConfig::from_env();
    let _logging_guard = logging::init(storage.as_ref().ok().map(StorageConfig::logs_dir));

    let result = storage
        .map_err(CliError::from)
        .and_then(AppContext::init)
        .and_then(|ctx| run(cli.command, &ctx));

    if let Err(e) = result {
        tracing::error!(error = %e, "coffee failed");
        std::process::exit(1);
    }
}

fn run(command: Commands, ctx: &AppContext) -> Result<(), CliError> {
    match command {
        Commands::Caffeinate => caffeinate::caffeinate(ctx),
        Commands::Decaffeinate => caffeinate::decaffeinate(ctx),
        Commands::Toggle => caffeinate::toggle(ctx),
        Commands::For { duration } => caffeinate::caffeinate_for(ctx, &duration),
        Commands::Until { time } => caffeinate::caffeinate_until(ctx, &time),
        Commands::While { app } => watch::caffeinate_while(ctx, &app),
        Commands::Apps => watch::list_apps(),
        Commands::Status { json } => status::run(ctx, json),
        Commands::Schedule { command } => schedule::run(ctx, command),
        Commands::Monitor { name, pid } => watch::monitor(ctx, &name, pid),
    }
}
