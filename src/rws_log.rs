// Logging setup
// The terminal belongs to the UI, so events go to a file beside the config

use anyhow::{Context, Result};
use std::env;
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Level;

use crate::rws_config::{APP_NAME, config_dir};

/// Environment variable selecting the log level (error, warn, info, debug, trace)
pub const LOG_ENV: &str = "RWSWPR_LOG";

fn level_from(value: Option<&str>) -> Level {
    value
        .and_then(|v| v.trim().parse::<Level>().ok())
        .unwrap_or(Level::INFO)
}

pub fn log_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(format!("{}.log", APP_NAME)))
}

/// Install the global subscriber; returns the log file in use, if any
pub fn init() -> Result<Option<PathBuf>> {
    let Some(path) = log_path() else {
        return Ok(None);
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let level = level_from(env::var(LOG_ENV).ok().as_deref());
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(Some(path))
}
