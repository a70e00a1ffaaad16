// User configuration and best-time records
// Persisted to disk as TOML under the platform config directory

use anyhow::{Context, Result};
use chrono::Local;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::rws_board::{BoardError, BoardParams, CascadeOdds};

pub const APP_NAME: &str = "rwswpr";

/// Best completion time for one board shape
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Record {
    pub millis: u64,  // Completion time in milliseconds
    pub date: String, // Date in ISO format (YYYY-MM-DD)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    // Board shape; mines are width * height / mine_divisor
    pub width: usize,
    pub height: usize,
    pub mine_divisor: usize,

    // Reveal cascade admits a neighbor when a roll of 0..cascade_sides is below cascade_accept
    pub cascade_sides: usize,
    pub cascade_accept: usize,

    pub flag_cooldown_ms: u64,
    pub ascii_icons: bool, // Use ASCII fallback glyphs

    // Best times keyed by BoardParams::shape_key
    pub records: BTreeMap<String, Record>,
}

impl Default for Config {
    fn default() -> Self {
        let odds = CascadeOdds::default();
        Config {
            width: 30,
            height: 16,
            mine_divisor: 5,
            cascade_sides: odds.sides,
            cascade_accept: odds.accept_below,
            flag_cooldown_ms: 200,
            ascii_icons: false,
            records: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Mine quota for the configured shape; a zero divisor asks for a full board
    /// and an overflowing shape asks for usize::MAX, both rejected by board_params
    pub fn mine_count(&self) -> usize {
        match self.width.checked_mul(self.height) {
            Some(cells) => cells.checked_div(self.mine_divisor).unwrap_or(cells),
            None => usize::MAX,
        }
    }

    pub fn board_params(&self) -> Result<BoardParams, BoardError> {
        BoardParams::new(
            self.width,
            self.height,
            self.mine_count(),
            CascadeOdds {
                sides: self.cascade_sides,
                accept_below: self.cascade_accept,
            },
        )
    }

    pub fn flag_cooldown(&self) -> Duration {
        Duration::from_millis(self.flag_cooldown_ms)
    }

    pub fn get_record(&self, params: &BoardParams) -> Option<&Record> {
        self.records.get(&params.shape_key())
    }

    /// Keep `time` if it beats the stored record; returns true when a new record was set
    pub fn set_record(&mut self, params: &BoardParams, time: Duration) -> bool {
        let millis = time.as_millis() as u64;
        let key = params.shape_key();
        if self.records.get(&key).is_some_and(|r| r.millis <= millis) {
            return false;
        }
        let date = Local::now().format("%Y-%m-%d").to_string();
        info!(shape = %key, millis, "new best time");
        self.records.insert(key, Record { millis, date });
        true
    }
}

/// Directory holding the config file and the log
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", APP_NAME, APP_NAME).map(|proj| proj.config_dir().to_path_buf())
}

/// Config file path, e.g. ~/.config/rwswpr/rwswpr.toml on Linux
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(format!("{}.toml", APP_NAME)))
}

fn read_config(path: &PathBuf) -> Result<Config> {
    let s = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parsing {}", path.display()))
}

/// Load configuration from disk, or write and return the defaults
pub fn load_or_create_config() -> Config {
    let Some(path) = config_path() else {
        warn!("no config directory, using defaults");
        return Config::default();
    };
    if path.exists() {
        match read_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => warn!("{:#}, using defaults", e),
        }
        return Config::default();
    }
    let cfg = Config::default();
    if let Err(e) = save_config(&cfg) {
        warn!("{:#}", e);
    }
    cfg
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let Some(path) = config_path() else {
        return Ok(());
    };
    let s = toml::to_string(cfg).context("serializing config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(&path, s).with_context(|| format!("writing {}", path.display()))
}
