// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Logging convenience macros.
//!
//! Each takes a logger expression, a tag and format arguments:
//!
//! ```
//! use taglog::{log_info, Logger};
//! let logger = Logger::new();
//! log_info!(logger, "wifi", "connected to {} in {}ms", "ap-1", 230);
//! ```

/// Log at [`Error`](crate::Level::Error)
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $tag:expr, $($arg:tt)*) => {
        $logger.log($crate::Level::Error, $tag, format_args!($($arg)*))
    };
}

/// Log at [`Warn`](crate::Level::Warn)
#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $tag:expr, $($arg:tt)*) => {
        $logger.log($crate::Level::Warn, $tag, format_args!($($arg)*))
    };
}

/// Log at [`Info`](crate::Level::Info)
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $tag:expr, $($arg:tt)*) => {
        $logger.log($crate::Level::Info, $tag, format_args!($($arg)*))
    };
}

/// Log at [`Debug`](crate::Level::Debug)
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $tag:expr, $($arg:tt)*) => {
        $logger.log($crate::Level::Debug, $tag, format_args!($($arg)*))
    };
}

/// Log at [`Verbose`](crate::Level::Verbose)
#[macro_export]
macro_rules! log_verbose {
    ($logger:expr, $tag:expr, $($arg:tt)*) => {
        $logger.log($crate::Level::Verbose, $tag, format_args!($($arg)*))
    };
}

/// Emit raw continuation text with no record header or newline
#[macro_export]
macro_rules! log_inline {
    ($logger:expr, $($arg:tt)*) => {
        $logger.log_inline(&format!($($arg)*))
    };
}
