//! Storage configuration and path management for Coffee.
//!
//! All file locations are decided here:
//!
//! - `<root>/state.json`: the key-value state store
//! - `<root>/config.toml`: user preferences
//! - `<root>/logs/`: rolling log files
//!
//! Production code uses [`StorageConfig::from_env`], which honours
//! `COFFEE_HOME` and otherwise points at `~/.coffee`. Tests use
//! [`StorageConfig::with_root`] with a temp directory.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{CoffeeError, Result};

pub const HOME_ENV: &str = "COFFEE_HOME";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = env::var(HOME_ENV) {
            if !path.trim().is_empty() {
                return Ok(Self::with_root(PathBuf::from(path)));
            }
        }
        let home = dirs::home_dir().ok_or(CoffeeError::HomeDirNotFound)?;
        Ok(Self::with_root(home.join(".coffee")))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.join("state.json")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}
