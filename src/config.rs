use std::env;
use std::path::PathBuf;

use crate::model::{PregaoError, Result};

/// Process configuration, read once at startup. Every value is mandatory;
/// there are no embedded fallbacks.
#[derive(Debug, Clone)]
pub struct Config {
    pub sqlite_file: String,      // Path of the SQLite database file.
    pub buffer_root: PathBuf,     // Root directory of the hand-off buffer.
    pub buffer_container: String, // Container name within the buffer.
}

// Records absent variables so they can all be reported at once.
fn require(name: &str, missing: &mut Vec<String>) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => {
            missing.push(name.to_string());
            None
        }
    }
}

impl Config {
    /// Reads the configuration from the environment. A misconfigured
    /// deployment fails with one error naming every missing variable,
    /// before any pipeline stage runs.
    pub fn from_env() -> Result<Config> {
        let mut missing = Vec::new();
        let sqlite_file = require("sqlite_file", &mut missing);
        let buffer_root = require("buffer_root", &mut missing);
        let buffer_container = require("buffer_container", &mut missing);

        match (sqlite_file, buffer_root, buffer_container) {
            (Some(sqlite_file), Some(buffer_root), Some(buffer_container)) => Ok(Config {
                sqlite_file,
                buffer_root: PathBuf::from(buffer_root),
                buffer_container,
            }),
            _ => Err(PregaoError::MissingConfig(missing)),
        }
    }
}
