//! CLI implementations of the refresh and notification seams.
//!
//! Surfaces are whatever the user wires up in `config.toml`, e.g. a SwiftBar
//! plugin refresh URL or a `pkill -RTMIN+8 waybar`. Each command runs through
//! the shell with `COFFEE_ACTIVE=1|0` and `COFFEE_SURFACE=<name>` set, and is
//! not waited on.

use std::process::{Command, Stdio};

use coffee_core::{NotifyLevel, Notifier, StatusObserver, Surface, SurfaceCommands};
use tracing::{debug, info, warn};

pub struct CommandObserver {
    commands: SurfaceCommands,
}

impl CommandObserver {
    pub fn new(commands: SurfaceCommands) -> Self {
        Self { commands }
    }
}

impl StatusObserver for CommandObserver {
    fn request_refresh(&self, surface: Surface, active: bool) -> Result<(), String> {
        let command = self
            .commands
            .command(surface)
            .ok_or_else(|| format!("surface '{}' not registered", surface))?;

        let child = shell(command)
            .env("COFFEE_ACTIVE", if active { "1" } else { "0" })
            .env("COFFEE_SURFACE", surface.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| format!("failed to run refresh for '{}': {}", surface, e))?;
        debug!(surface = %surface, pid = child.id(), "Surface refresh started");
        Ok(())
    }
}

fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

/// Posts desktop notifications (`osascript` on macOS, `notify-send` on
/// Linux). Every message is also logged.
pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, message: &str, level: NotifyLevel) {
        match level {
            NotifyLevel::Failure => warn!(message, "Notification"),
            NotifyLevel::Info | NotifyLevel::Success => info!(message, "Notification"),
        }
        if !self.enabled {
            return;
        }
        let Some(mut command) = desktop_command(message, level) else {
            return;
        };
        let result = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(err) = result {
            debug!(error = %err, "Desktop notification unavailable");
        }
    }
}

fn desktop_command(message: &str, level: NotifyLevel) -> Option<Command> {
    if cfg!(target_os = "macos") {
        let script = format!(
            "display notification \"{}\" with title \"Coffee\"",
            message.replace('\\', "\\\\").replace('"', "\\\"")
        );
        let mut cmd = Command::new("osascript");
        cmd.args(["-e", &script]);
        Some(cmd)
    } else if cfg!(target_os = "linux") {
        let urgency = match level {
            NotifyLevel::Failure => "critical",
            NotifyLevel::Info | NotifyLevel::Success => "normal",
        };
        let mut cmd = Command::new("notify-send");
        cmd.args(["--app-name=Coffee", "--urgency", urgency, "Coffee", message]);
        Some(cmd)
    } else {
        None
    }
}
