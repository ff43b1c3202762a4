//! # Configuration Management Module
//!
//! Centralized TOML configuration for the idle RPG server: the tunable game
//! constants, where characters are stored, which lookup tables to load, and how
//! to log.
//!
//! ## Configuration Structure
//!
//! - [`GameConfig`] - Level curve, penalty limits, tick interval, map size, RNG seed
//! - [`StorageConfig`] - Character store location
//! - [`TablesConfig`] - Monster and flavor-text lookup files
//! - [`LoggingConfig`] - Log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use idlerpg::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Tick every {}s on a {}x{} map", config.game.tick_interval_secs,
//!         config.game.map_width, config.game.map_height);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [game]
//! rpbase = 600.0
//! rpstep = 1.6
//! rppenstep = 1.6
//! limitpen = 604800
//! tick_interval_secs = 3
//! map_width = 851
//! map_height = 700
//! quorum_ratio = 0.15
//!
//! [storage]
//! data_dir = "./data"
//!
//! [tables]
//! monsters_file = "data/monsters.txt"
//! events_file = "data/events.txt"
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::engine::errors::GameError;

/// Tunable simulation constants. Every field may be left out of the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Base seconds to reach level 1.
    #[serde(default = "default_rpbase")]
    pub rpbase: f64,
    /// Time to next level = rpbase * rpstep^level (up to level 60).
    #[serde(default = "default_rpstep")]
    pub rpstep: f64,
    /// Penalty growth per level.
    #[serde(default = "default_rppenstep")]
    pub rppenstep: f64,
    /// Upper bound for any single penalty, in seconds.
    #[serde(default = "default_limitpen")]
    pub limitpen: i64,
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_map_width")]
    pub map_width: u32,
    #[serde(default = "default_map_height")]
    pub map_height: u32,
    /// Fraction of registered characters that must be online for alignment events.
    #[serde(default = "default_quorum_ratio")]
    pub quorum_ratio: f64,
    /// Fixed RNG seed for reproducible runs. Entropy-seeded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_rpbase() -> f64 {
    600.0
}

fn default_rpstep() -> f64 {
    1.6
}

fn default_rppenstep() -> f64 {
    1.6
}

fn default_limitpen() -> i64 {
    604800
}

fn default_tick_interval_secs() -> u64 {
    3
}

fn default_map_width() -> u32 {
    851
}

fn default_map_height() -> u32 {
    700
}

fn default_quorum_ratio() -> f64 {
    0.15
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rpbase: default_rpbase(),
            rpstep: default_rpstep(),
            rppenstep: default_rppenstep(),
            limitpen: default_limitpen(),
            tick_interval_secs: default_tick_interval_secs(),
            map_width: default_map_width(),
            map_height: default_map_height(),
            quorum_ratio: default_quorum_ratio(),
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        if self.map_width == 0 || self.map_height == 0 {
            return Err(GameError::InvalidConfig(format!(
                "map must be at least 1x1, got {}x{}",
                self.map_width, self.map_height
            )));
        }
        if self.tick_interval_secs == 0 {
            return Err(GameError::InvalidConfig(
                "tick_interval_secs must be positive".into(),
            ));
        }
        if self.rpbase <= 0.0 {
            return Err(GameError::InvalidConfig("rpbase must be positive".into()));
        }
        if self.rpstep < 1.0 || self.rppenstep < 1.0 {
            return Err(GameError::InvalidConfig(
                "rpstep and rppenstep must be at least 1.0".into(),
            ));
        }
        if self.limitpen < 0 {
            return Err(GameError::InvalidConfig("limitpen must not be negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Override for the sled database path; defaults to `<data_dir>/characters`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

impl StorageConfig {
    pub fn character_db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.data_dir).join("characters"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    pub monsters_file: String,
    pub events_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    pub storage: StorageConfig,
    pub tables: TablesConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
        config
            .game
            .validate()
            .map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            game: GameConfig::default(),
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                db_path: None,
            },
            tables: TablesConfig {
                monsters_file: "data/monsters.txt".to_string(),
                events_file: "data/events.txt".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("idlerpg.log".to_string()),
            },
        }
    }
}
