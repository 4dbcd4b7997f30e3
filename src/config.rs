//! Configuration management
//!
//! Provides persistent settings storage with schema versioning and migrations.
//! Configuration is stored in `~/.assistant-bridge/config.json`; a missing file
//! means defaults.

use crate::volume_key::{KeyTimings, KEYCODE_VOLUME_DOWN};
use crate::widget::{OperateIdStrategy, DEFAULT_ID_SPACE};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Current config schema version
pub const CURRENT_VERSION: u32 = 1;

/// Directory name under the home directory
const APP_DIR: &str = ".assistant-bridge";

/// Global config instance for caching
static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown config version: {0}")]
    UnknownVersion(u32),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema version for migrations
    pub version: u32,
    /// Volume-key trigger settings
    pub key_timing: KeyTimingConfig,
    /// Widget snapshot settings
    pub snapshot: SnapshotConfig,
    /// Log output settings
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            key_timing: KeyTimingConfig::default(),
            snapshot: SnapshotConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Reject settings the state machine and compactor cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timing = &self.key_timing;
        for (name, value) in [
            ("long_press_ms", timing.long_press_ms),
            ("max_confirm_ms", timing.max_confirm_ms),
            ("ban_cancel_ms", timing.ban_cancel_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be non-zero", name)));
            }
        }
        if self.snapshot.id_space == 0 {
            return Err(ConfigError::Invalid("id_space must be non-zero".into()));
        }
        Ok(())
    }
}

/// Volume-key trigger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyTimingConfig {
    /// Host keycode of the monitored key (default: volume down)
    pub keycode: u32,
    /// Hold time separating a tap from a long press
    pub long_press_ms: u64,
    /// Confirm window after a long-press release
    pub max_confirm_ms: u64,
    /// Volume-adjust grace window after a tap
    pub ban_cancel_ms: u64,
    /// Delay between launching the companion screen and starting to listen
    pub start_delay_ms: u64,
    /// Haptic pulse length on long press
    pub haptic_ms: u64,
}

impl Default for KeyTimingConfig {
    fn default() -> Self {
        let timings = KeyTimings::default();
        Self {
            keycode: KEYCODE_VOLUME_DOWN,
            long_press_ms: timings.long_press_ms,
            max_confirm_ms: timings.max_confirm_ms,
            ban_cancel_ms: timings.ban_cancel_ms,
            start_delay_ms: timings.start_delay_ms,
            haptic_ms: timings.haptic_ms,
        }
    }
}

impl KeyTimingConfig {
    pub fn timings(&self) -> KeyTimings {
        KeyTimings {
            long_press_ms: self.long_press_ms,
            max_confirm_ms: self.max_confirm_ms,
            ban_cancel_ms: self.ban_cancel_ms,
            start_delay_ms: self.start_delay_ms,
            haptic_ms: self.haptic_ms,
        }
    }
}

/// Widget snapshot configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// How operate ids are drawn
    pub operate_ids: OperateIdStrategy,
    /// Upper bound (exclusive) for random operate ids
    pub id_space: u32,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            operate_ids: OperateIdStrategy::default(),
            id_space: DEFAULT_ID_SPACE,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub filter: String,
    /// Also append logs to `~/.assistant-bridge/logs/assistant-bridge.log`
    pub log_to_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            log_to_file: true,
        }
    }
}

/// Get the path to the config file (~/.assistant-bridge/config.json)
pub fn get_config_path() -> PathBuf {
    get_app_dir().join("config.json")
}

/// Get the application directory (~/.assistant-bridge)
pub fn get_app_dir() -> PathBuf {
    home_dir_or_fallback().join(APP_DIR)
}

/// Get the home directory, falling back to /tmp if unavailable
fn home_dir_or_fallback() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        tracing::error!("Could not determine home directory, using /tmp");
        PathBuf::from("/tmp")
    })
}

/// Load configuration from `path`, migrating older schemas
///
/// A missing file yields the defaults. A migrated config is written back.
pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::info!("Config file not found at {:?}, using defaults", path);
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&contents)?;

    let original_version = config.version;
    let migrated = migrate_config(config)?;
    if migrated.version != original_version {
        save_to_path(&migrated, path)?;
    }

    migrated.validate()?;
    Ok(migrated)
}

/// Save configuration to `path`, creating parent directories
pub fn save_to_path(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }

    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents)?;

    tracing::info!("Config saved to {:?}", path);
    Ok(())
}

/// Migrate configuration from older schema versions
pub fn migrate_config(mut config: Config) -> Result<Config, ConfigError> {
    let original_version = config.version;

    while config.version < CURRENT_VERSION {
        config = apply_migration(config)?;
    }
    if config.version > CURRENT_VERSION {
        return Err(ConfigError::UnknownVersion(config.version));
    }

    if config.version != original_version {
        tracing::info!(
            "Migrated config from version {} to {}",
            original_version,
            config.version
        );
    }

    Ok(config)
}

/// Apply a single migration step
fn apply_migration(config: Config) -> Result<Config, ConfigError> {
    match config.version {
        // Version 0 -> 1: pre-release files had no version field semantics
        0 => {
            let mut migrated = config;
            migrated.version = 1;
            Ok(migrated)
        }
        v => Err(ConfigError::UnknownVersion(v)),
    }
}

/// Get the global config instance
fn get_config_instance() -> &'static RwLock<Config> {
    CONFIG.get_or_init(|| {
        let config = load_from_path(&get_config_path()).unwrap_or_else(|e| {
            tracing::error!("Failed to load config, using defaults: {}", e);
            Config::default()
        });
        RwLock::new(config)
    })
}

/// Get the current configuration
///
/// The config is cached in memory and loaded from disk on first access.
pub fn get_config() -> Config {
    get_config_instance().read().clone()
}

/// Replace the configuration and persist it
pub fn set_config(mut config: Config) -> Result<(), ConfigError> {
    config.version = CURRENT_VERSION;
    config.validate()?;

    save_to_path(&config, &get_config_path())?;

    let mut cached = get_config_instance().write();
    *cached = config;

    tracing::info!("Configuration updated");
    Ok(())
}

/// Reset configuration to defaults and persist it
pub fn reset_config() -> Result<Config, ConfigError> {
    let default_config = Config::default();

    save_to_path(&default_config, &get_config_path())?;

    let mut cached = get_config_instance().write();
    *cached = default_config.clone();

    tracing::info!("Configuration reset to defaults");
    Ok(default_config)
}
