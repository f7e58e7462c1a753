//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::feature::FeatureId;

pub use cli::{CliArgs, Command, Overrides, ResolveArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "titlekeeper";
const ENV_PREFIX: &str = "TITLEKEEPER";
const DEFAULT_CACHE_CAPACITY: usize = 1024;
const DEFAULT_BATCH_WINDOW_MS: u64 = 1000;
const DEFAULT_READY_POLL_INTERVAL_MS: u64 = 200;
const DEFAULT_READY_MAX_ATTEMPTS: u32 = 25;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub batch: BatchSettings,
    pub canvas: CanvasSettings,
    pub tabs: TabSettings,
    pub features: FeatureSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub capacity: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub window: Duration,
    /// Drop every checked key after a pass instead of only the changed ones.
    pub drop_unchanged: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(DEFAULT_BATCH_WINDOW_MS),
            drop_unchanged: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CanvasSettings {
    pub ready_poll_interval: Duration,
    pub ready_max_attempts: NonZeroU32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            ready_poll_interval: Duration::from_millis(DEFAULT_READY_POLL_INTERVAL_MS),
            ready_max_attempts: NonZeroU32::new(DEFAULT_READY_MAX_ATTEMPTS)
                .unwrap_or(NonZeroU32::MIN),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TabSettings {
    /// Prefix tab titles with their 1-based position.
    pub numbered: bool,
}

#[derive(Debug, Clone)]
pub struct FeatureSettings {
    pub enabled: Vec<FeatureId>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Parse the command line and load settings for it.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    batch: RawBatchSettings,
    canvas: RawCanvasSettings,
    tabs: RawTabSettings,
    features: RawFeatureSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBatchSettings {
    window_ms: Option<u64>,
    drop_unchanged: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCanvasSettings {
    ready_poll_interval_ms: Option<u64>,
    ready_max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTabSettings {
    numbered: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFeatureSettings {
    enabled: Option<Vec<String>>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(capacity) = overrides.cache_capacity {
            self.cache.capacity = Some(capacity);
        }
        if let Some(window) = overrides.batch_window_ms {
            self.batch.window_ms = Some(window);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            cache,
            batch,
            canvas,
            tabs,
            features,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            cache: build_cache_settings(cache)?,
            batch: build_batch_settings(batch)?,
            canvas: build_canvas_settings(canvas)?,
            tabs: TabSettings {
                numbered: tabs.numbered.unwrap_or(false),
            },
            features: build_feature_settings(features)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let capacity = cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY);
    let capacity = NonZeroUsize::new(capacity)
        .ok_or_else(|| LoadError::invalid("cache.capacity", "must be greater than zero"))?;

    Ok(CacheSettings { capacity })
}

fn build_batch_settings(batch: RawBatchSettings) -> Result<BatchSettings, LoadError> {
    let window_ms = batch.window_ms.unwrap_or(DEFAULT_BATCH_WINDOW_MS);
    if window_ms == 0 {
        return Err(LoadError::invalid(
            "batch.window_ms",
            "must be greater than zero",
        ));
    }

    Ok(BatchSettings {
        window: Duration::from_millis(window_ms),
        drop_unchanged: batch.drop_unchanged.unwrap_or(false),
    })
}

fn build_canvas_settings(canvas: RawCanvasSettings) -> Result<CanvasSettings, LoadError> {
    let interval_ms = canvas
        .ready_poll_interval_ms
        .unwrap_or(DEFAULT_READY_POLL_INTERVAL_MS);
    if interval_ms == 0 {
        return Err(LoadError::invalid(
            "canvas.ready_poll_interval_ms",
            "must be greater than zero",
        ));
    }

    let attempts = canvas
        .ready_max_attempts
        .unwrap_or(DEFAULT_READY_MAX_ATTEMPTS);
    let ready_max_attempts = NonZeroU32::new(attempts).ok_or_else(|| {
        LoadError::invalid("canvas.ready_max_attempts", "must be greater than zero")
    })?;

    Ok(CanvasSettings {
        ready_poll_interval: Duration::from_millis(interval_ms),
        ready_max_attempts,
    })
}

fn build_feature_settings(features: RawFeatureSettings) -> Result<FeatureSettings, LoadError> {
    let Some(names) = features.enabled else {
        return Ok(FeatureSettings {
            enabled: FeatureId::ALL.to_vec(),
        });
    };

    let mut enabled = Vec::with_capacity(names.len());
    for name in names {
        let id = FeatureId::from_str(name.trim())
            .map_err(|reason| LoadError::invalid("features.enabled", reason))?;
        if !enabled.contains(&id) {
            enabled.push(id);
        }
    }

    Ok(FeatureSettings { enabled })
}
