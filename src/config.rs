// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Logger configuration types and parsing.
//!
//! JSON5 configuration format supporting comments and trailing commas, plus
//! the engine's compile-time sizing constants. All runtime state the logger
//! allocates is bounded by the constants in this module; there is no
//! per-message heap growth beyond the transient pool-exhaustion fallback.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::level::Level;

/// Size of each pooled format buffer in bytes
pub const BUFFER_SIZE: usize = 256;

/// Number of buffers in the pool
pub const POOL_SIZE: usize = 8;

/// Maximum number of tag-specific level overrides
pub const MAX_TAGS: usize = 32;

/// Maximum tag length in bytes (longer tags are truncated)
pub const MAX_TAG_LEN: usize = 32;

/// Maximum number of registered subscriber callbacks
pub const MAX_SUBSCRIBERS: usize = 4;

/// Depth of the async subscriber notification queue
pub const SUBSCRIBER_QUEUE_DEPTH: usize = 16;

/// Maximum message length in a queued subscriber notification
pub const SUBSCRIBER_MSG_SIZE: usize = 200;

/// Rate limit window duration
pub const RATE_LIMIT_WINDOW_MS: u32 = 1000;

/// Default cap on accepted logs per window (0 = unlimited)
pub const DEFAULT_MAX_LOGS_PER_SECOND: u32 = 100;

/// Lock bound for quick operations (tag table, subscriber registry, flush)
pub const MUTEX_SHORT_TIMEOUT: Duration = Duration::from_millis(10);

/// Lock bound for rate limit checks
pub const MUTEX_MEDIUM_TIMEOUT: Duration = Duration::from_millis(50);

/// Lock bound for backend fan-out and synchronized writes
pub const MUTEX_STANDARD_TIMEOUT: Duration = Duration::from_millis(100);

/// Non-blocking backends drop the whole message below this much free space
pub const MIN_WRITE_SPACE: usize = 20;

/// Marker appended when a message is written short of its full length
pub const TRUNCATION_MARKER: &[u8] = b"...\r\n";

/// Grace period for the subscriber worker to exit after a stop request
pub const WORKER_STOP_GRACE: Duration = Duration::from_millis(500);

/// Backend selection for [`LoggerConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Direct blocking writes (may stall the caller)
    Blocking,
    /// Mutex-serialized blocking writes (no interleaving; may stall)
    Synchronized,
    /// Drops rather than waits (recommended)
    #[default]
    NonBlocking,
    /// Caller installs its own backend separately
    Custom,
}

/// A (tag, level) override applied at configuration time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagLevelConfig {
    pub tag: String,
    pub level: Level,
}

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Global severity threshold
    #[serde(default = "default_level")]
    pub default_level: Level,

    /// Master enable flag
    #[serde(default = "default_enabled")]
    pub enable_logging: bool,

    /// Max accepted logs per second, 0 = unlimited
    #[serde(default = "default_rate")]
    pub max_logs_per_second: u32,

    /// Which backend to install
    #[serde(default)]
    pub backend: BackendKind,

    /// Per-tag level overrides; entries beyond [`MAX_TAGS`] are ignored
    #[serde(default)]
    pub tag_levels: Vec<TagLevelConfig>,
}

fn default_level() -> Level {
    Level::Info
}

fn default_enabled() -> bool {
    true
}

fn default_rate() -> u32 {
    DEFAULT_MAX_LOGS_PER_SECOND
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            default_level: default_level(),
            enable_logging: true,
            max_logs_per_second: default_rate(),
            backend: BackendKind::default(),
            tag_levels: Vec::new(),
        }
    }
}

impl LoggerConfig {
    /// Load configuration from a JSON5 file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to a JSON5-compatible string
    pub fn to_json5(&self) -> String {
        // json5 is a superset of JSON, so pretty serde_json output round-trips
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json5())
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))
    }

    /// Add a tag override, bounded by [`MAX_TAGS`]
    pub fn add_tag_level(&mut self, tag: &str, level: Level) -> bool {
        if self.tag_levels.len() >= MAX_TAGS || tag.is_empty() {
            return false;
        }
        self.tag_levels.push(TagLevelConfig {
            tag: tag.to_string(),
            level,
        });
        true
    }

    /// Conservative preset: warnings only, tight rate cap
    pub fn minimal() -> Self {
        Self {
            default_level: Level::Warn,
            max_logs_per_second: 50,
            ..Self::default()
        }
    }

    /// Development preset: informational, unlimited rate
    pub fn development() -> Self {
        Self {
            default_level: Level::Info,
            max_logs_per_second: 0,
            ..Self::default()
        }
    }

    /// Production preset: warnings only, default rate cap
    pub fn production() -> Self {
        Self {
            default_level: Level::Warn,
            max_logs_per_second: DEFAULT_MAX_LOGS_PER_SECOND,
            ..Self::default()
        }
    }
}

/// Configuration loading/parsing errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {0}: {1}")]
    Io(PathBuf, String),

    #[error("invalid configuration: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::default();
        assert_eq!(config.default_level, Level::Info);
        assert!(config.enable_logging);
        assert_eq!(config.max_logs_per_second, DEFAULT_MAX_LOGS_PER_SECOND);
        assert_eq!(config.backend, BackendKind::NonBlocking);
        assert!(config.tag_levels.is_empty());
    }

    #[test]
    fn test_parse_json5_with_comments() {
        let config = LoggerConfig::parse(
            r#"{
                // warnings only in the field
                default_level: "warn",
                max_logs_per_second: 25,
                backend: "synchronized",
                tag_levels: [
                    { tag: "wifi", level: "debug" },
                ],
            }"#,
        )
        .unwrap();

        assert_eq!(config.default_level, Level::Warn);
        assert_eq!(config.max_logs_per_second, 25);
        assert_eq!(config.backend, BackendKind::Synchronized);
        assert_eq!(config.tag_levels.len(), 1);
        assert_eq!(config.tag_levels[0].tag, "wifi");
        assert_eq!(config.tag_levels[0].level, Level::Debug);
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = LoggerConfig::parse("{}").unwrap();
        assert_eq!(config, LoggerConfig::default());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            LoggerConfig::parse("{ default_level: 42 }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_roundtrip() {
        let mut config = LoggerConfig::production();
        config.add_tag_level("modbus", Level::Verbose);
        let text = config.to_json5();
        let back = LoggerConfig::parse(&text).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_add_tag_level_bounded() {
        let mut config = LoggerConfig::default();
        for i in 0..MAX_TAGS {
            assert!(config.add_tag_level(&format!("tag{i}"), Level::Debug));
        }
        assert!(!config.add_tag_level("overflow", Level::Debug));
        assert!(!config.add_tag_level("", Level::Debug));
        assert_eq!(config.tag_levels.len(), MAX_TAGS);
    }

    #[test]
    fn test_presets() {
        assert_eq!(LoggerConfig::minimal().default_level, Level::Warn);
        assert_eq!(LoggerConfig::minimal().max_logs_per_second, 50);
        assert_eq!(LoggerConfig::development().max_logs_per_second, 0);
        assert_eq!(LoggerConfig::production().backend, BackendKind::NonBlocking);
    }

    #[test]
    fn test_load_missing_file() {
        let err = LoggerConfig::load_from_file(Path::new("/nonexistent/taglog.json5"));
        assert!(matches!(err, Err(ConfigError::Io(_, _))));
    }
}
