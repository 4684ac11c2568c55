//! Wiring shared by every subcommand: paths, preferences, store, platform.

use std::sync::Arc;

use coffee_core::{
    load_config, platform, AppLivenessMonitor, CoffeeConfig, FileStore, ScheduleReconciler,
    SessionController, StorageConfig,
};
use tracing::warn;

use crate::error::CliError;
use crate::surfaces::{CommandObserver, DesktopNotifier};

pub struct AppContext {
    pub config: CoffeeConfig,
    pub controller: SessionController,
    pub notifier: DesktopNotifier,
}

impl AppContext {
    pub fn init(storage: StorageConfig) -> Result<Self, CliError> {
        let config = match load_config(&storage.config_file()) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "Using default configuration");
                CoffeeConfig::default()
            }
        };

        let executor = platform::detect()?;
        let store = Arc::new(FileStore::new(&storage.state_file()));
        let observer = Arc::new(CommandObserver::new(config.surfaces.clone()));
        let controller =
            SessionController::new(executor, store, observer, config.inhibit.clone());
        let notifier = DesktopNotifier::new(config.notifications.desktop);

        Ok(Self {
            config,
            controller,
            notifier,
        })
    }

    pub fn reconciler(&self) -> ScheduleReconciler<'_> {
        ScheduleReconciler::new(&self.controller)
    }

    pub fn monitor(&self) -> AppLivenessMonitor<'_> {
        AppLivenessMonitor::new(
            &self.controller,
            &self.notifier,
            self.config.monitor.poll_interval(),
        )
    }
}
