//! Configuration for the wavegate daemon.
//!
//! A single `config.yaml` is loaded once at startup and read-only thereafter.
//! Discovery order:
//! 1. Explicit `--config` path
//! 2. `config.yaml` next to the installed binary
//! 3. `~/.config/wavegate/config.yaml`
//!
//! Relative path values resolve against the config file's parent directory,
//! so an install tree can be relocated as a unit.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No config file found (looked for {0})")]
    NotFound(String),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Unknown timezone: {0}")]
    Timezone(String),

    #[error("Watch directory does not exist: {0}")]
    WatchDirMissing(PathBuf),
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub watch_dir: String,
    pub queue_dir: String,
    pub output_dir: String,
    pub log_path: String,
    pub pid_path: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Seconds between polling cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Settle delay between a file being seen complete and its dispatch
    #[serde(default = "default_grace")]
    pub grace_secs: u64,

    /// File extensions to watch
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub converter: ConverterConfig,

    #[serde(default)]
    pub tags: TagConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_timezone() -> String {
    "UTC".to_string()
}
fn default_poll_interval() -> u64 {
    1
}
fn default_grace() -> u64 {
    1
}
fn default_extensions() -> Vec<String> {
    vec!["wav".to_string()]
}

/// Log line format for the daemon's log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

/// External converter settings
#[derive(Debug, Clone, Deserialize)]
pub struct ConverterConfig {
    /// Converter binary (default: "sox")
    #[serde(default = "default_converter_program")]
    pub program: String,

    /// Extension of produced output files (default: "flac")
    #[serde(default = "default_output_ext")]
    pub output_ext: String,
}

fn default_converter_program() -> String {
    "sox".to_string()
}
fn default_output_ext() -> String {
    "flac".to_string()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: default_converter_program(),
            output_ext: default_output_ext(),
        }
    }
}

/// Tag text templates. Tokens `{year}`, `{month}`, `{day}` and `{date}`
/// render from the source file's modification time.
#[derive(Debug, Clone, Deserialize)]
pub struct TagConfig {
    #[serde(default = "default_album")]
    pub album: String,

    #[serde(default = "default_comment")]
    pub comment: String,

    /// Vorbis field name for the comment. Some downstream tools expect
    /// COMMENTS rather than COMMENT, so the name is configurable.
    #[serde(default = "default_comment_field")]
    pub comment_field: String,

    #[serde(default = "default_genre")]
    pub genre: String,
}

fn default_album() -> String {
    "{year} Recordings".to_string()
}
fn default_comment() -> String {
    "Recorded on {month} {day}, {year}.".to_string()
}
fn default_comment_field() -> String {
    "COMMENTS".to_string()
}
fn default_genre() -> String {
    "Speech".to_string()
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            album: default_album(),
            comment: default_comment(),
            comment_field: default_comment_field(),
            genre: default_genre(),
        }
    }
}

/// Resolved configuration with absolute paths and a parsed timezone
#[derive(Debug, Clone)]
pub struct Config {
    pub watch_dir: PathBuf,
    pub queue_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_path: PathBuf,
    pub pid_path: PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
    pub timezone: Tz,
    pub poll_interval: Duration,
    pub grace: Duration,
    pub extensions: Vec<String>,
    pub converter: ConverterConfig,
    pub tags: TagConfig,
    /// Path the config was loaded from
    pub config_path: PathBuf,
}

impl Config {
    /// Load configuration from an explicit path, or from the default
    /// locations if none is given.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => find_config_file()?,
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let file: ConfigFile =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;

        Config::resolve(file, &path)
    }

    /// Resolve a raw config file against its on-disk location.
    pub fn resolve(file: ConfigFile, config_path: &Path) -> Result<Config, ConfigError> {
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));

        let timezone: Tz = file
            .timezone
            .parse()
            .map_err(|_| ConfigError::Timezone(file.timezone.clone()))?;

        Ok(Config {
            watch_dir: resolve_path(base, &file.watch_dir),
            queue_dir: resolve_path(base, &file.queue_dir),
            output_dir: resolve_path(base, &file.output_dir),
            log_path: resolve_path(base, &file.log_path),
            pid_path: resolve_path(base, &file.pid_path),
            log_level: file.log_level,
            log_format: file.log_format,
            timezone,
            poll_interval: Duration::from_secs(file.poll_interval_secs),
            grace: Duration::from_secs(file.grace_secs),
            extensions: file.extensions,
            converter: file.converter,
            tags: file.tags,
            config_path: config_path.to_path_buf(),
        })
    }

    /// Check preconditions the daemon cannot create for itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.watch_dir.is_dir() {
            return Err(ConfigError::WatchDirMissing(self.watch_dir.clone()));
        }
        Ok(())
    }

    /// Check whether a path carries one of the watched extensions
    pub fn is_watched_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// Find the config file in the default locations
fn find_config_file() -> Result<PathBuf, ConfigError> {
    let mut candidates = Vec::new();

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join("config.yaml"));
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("wavegate").join("config.yaml"));
    }

    for candidate in &candidates {
        if candidate.is_file() {
            return Ok(candidate.clone());
        }
    }

    let looked = candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(ConfigError::NotFound(looked))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
