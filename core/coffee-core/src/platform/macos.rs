use crate::config::InhibitOptions;
use crate::error::Result;
use crate::types::SessionHandle;

use super::spawn::spawn_detached;
use super::{PlatformExecutor, ProcessMatcher};

const PROGRAM: &str = "caffeinate";

/// macOS executor backed by `/usr/bin/caffeinate`.
pub struct MacOsExecutor;

impl MacOsExecutor {
    pub(crate) fn args(options: &InhibitOptions, duration_secs: Option<u64>) -> Vec<String> {
        let mut args = Vec::new();
        if options.prevent_display {
            args.push("-d".to_string());
        }
        if options.prevent_system {
            args.push("-i".to_string());
        }
        if options.prevent_disk {
            args.push("-m".to_string());
        }
        if let Some(secs) = duration_secs {
            args.push("-t".to_string());
            args.push(secs.to_string());
        }
        args
    }
}

impl PlatformExecutor for MacOsExecutor {
    fn name(&self) -> &'static str {
        "macOS caffeinate"
    }

    fn launch_inhibitor(
        &self,
        options: &InhibitOptions,
        duration_secs: Option<u64>,
    ) -> Result<SessionHandle> {
        let pid = spawn_detached(PROGRAM, &Self::args(options, duration_secs))?;
        Ok(SessionHandle::new(pid))
    }

    // caffeinate takes no free-form argument, so the fallback matches by name.
    fn matcher(&self, _handle: &SessionHandle) -> ProcessMatcher {
        ProcessMatcher::named(PROGRAM)
    }
}
