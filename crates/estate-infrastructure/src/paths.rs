//! Path management for Estate configuration and log files.
//!
//! ```text
//! ~/.config/estate/            # Config directory
//! ├── config.toml              # Backend, logging and browse settings
//! └── logs/                    # Application logs
//!     └── estate.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

const APP_DIR_NAME: &str = "estate";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for estate_core::EstateError {
    fn from(err: PathError) -> Self {
        estate_core::EstateError::config(err.to_string())
    }
}

/// Unified path management for estate.
pub struct EstatePaths;

impl EstatePaths {
    /// Returns the estate configuration directory (e.g. `~/.config/estate/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the logs directory.
    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }
}
