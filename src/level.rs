// SPDX-License-Identifier: Apache-2.0 OR MIT
// Log severity levels, ordered NONE < ERROR < WARN < INFO < DEBUG < VERBOSE

use serde::{Deserialize, Serialize};

/// Log severity level (0-5, lower is more severe).
///
/// `None` disables output entirely and is never emitted as a record level.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// No logging
    None = 0,
    /// Error conditions
    Error = 1,
    /// Warning conditions
    Warn = 2,
    /// Informational messages
    Info = 3,
    /// Debug-level messages
    Debug = 4,
    /// Maximum verbosity
    Verbose = 5,
}

impl Level {
    /// Get level as u8 (0-5)
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Single-character marker used in composed log records
    pub const fn as_char(self) -> char {
        match self {
            Level::None => 'N',
            Level::Error => 'E',
            Level::Warn => 'W',
            Level::Info => 'I',
            Level::Debug => 'D',
            Level::Verbose => 'V',
        }
    }

    /// Get level name as static string
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::None => "NONE",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Verbose => "VERBOSE",
        }
    }

    /// Create from u8 value (returns None if invalid)
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Level::None),
            1 => Some(Level::Error),
            2 => Some(Level::Warn),
            3 => Some(Level::Info),
            4 => Some(Level::Debug),
            5 => Some(Level::Verbose),
            _ => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
