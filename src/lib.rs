// SPDX-License-Identifier: Apache-2.0 OR MIT
//! taglog: a concurrency-safe tagged logging engine.
//!
//! Built for programs where many threads log at once and a stalled console
//! must never stall the caller: every lock on the logging path has a bounded
//! wait, message buffers come from a fixed pool, and the default backend
//! drops rather than blocks when its transport is congested.
//!
//! # Quick start
//!
//! ```
//! use taglog::{log_info, Level};
//!
//! let logger = taglog::global();
//! logger.set_level(Level::Debug);
//! log_info!(logger, "wifi", "connected in {}ms", 230);
//! ```
//!
//! Multiple independent [`Logger`] instances work too; [`global()`] is just
//! a lazily created default.

pub mod backend;
pub mod clock;
pub mod config;
pub mod level;
pub mod logger;
pub mod macros;
pub mod pool;
pub mod rate;
pub mod subscriber;
pub mod tags;
pub mod transport;

pub use backend::{
    BlockingBackend, LogBackend, NonBlockingBackend, NonBlockingStats, SynchronizedBackend,
    ThreadSafeNonBlockingBackend,
};
pub use config::{
    BackendKind, ConfigError, LoggerConfig, TagLevelConfig, BUFFER_SIZE, MAX_SUBSCRIBERS,
    MAX_TAGS, MAX_TAG_LEN, POOL_SIZE,
};
pub use level::Level;
pub use logger::{global, format_into, Logger, LoggerStats};
pub use pool::{BufferPool, PooledBuf};
pub use rate::RateLimiter;
pub use subscriber::{SubscriberFn, SubscriberNotifier};
pub use tags::TagLevelTable;
pub use transport::{MemTransport, StdoutTransport, Transport};
