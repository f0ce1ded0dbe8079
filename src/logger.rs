// SPDX-License-Identifier: Apache-2.0 OR MIT
//! The logging engine: filtering, rate limiting, record composition and
//! backend fan-out.
//!
//! A [`Logger`] owns a buffer pool, a rate limiter, a tag override table, a
//! subscriber notifier and a set of backends. Each log call runs the
//! admission pipeline (enabled, level filter, rate limit), formats the
//! message into a pooled buffer, notifies subscribers, composes the full
//! record and fans it out to every backend. Locks on the hot path are
//! bounded; on timeout the message is dropped and counted, never queued.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::backend::{LogBackend, NonBlockingBackend};
use crate::clock::now_millis;
use crate::config::{
    BackendKind, LoggerConfig, DEFAULT_MAX_LOGS_PER_SECOND, MUTEX_SHORT_TIMEOUT,
    MUTEX_STANDARD_TIMEOUT,
};
use crate::level::Level;
use crate::pool::BufferPool;
use crate::rate::RateLimiter;
use crate::subscriber::{SubscriberFn, SubscriberNotifier};
use crate::tags::TagLevelTable;

thread_local! {
    // Set for the duration of a log call on this thread. A call arriving
    // with the flag up came from inside the engine itself, typically a
    // subscriber or backend logging back in, and is dropped to break the
    // cycle.
    static IN_LOG_CALL: Cell<bool> = const { Cell::new(false) };
}

struct ReentrancyGuard;

impl ReentrancyGuard {
    fn enter() -> Option<Self> {
        IN_LOG_CALL.with(|flag| {
            if flag.get() {
                None
            } else {
                flag.set(true);
                Some(ReentrancyGuard)
            }
        })
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        IN_LOG_CALL.with(|flag| flag.set(false));
    }
}

/// Aggregate health counters for a [`Logger`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggerStats {
    /// Messages rejected by the rate limiter
    pub rate_dropped: u32,
    /// Lock timeouts across rate limiter, tag table and backend fan-out
    pub lock_timeouts: u32,
    /// Messages dropped by the reentrancy guard
    pub reentrancy_drops: u32,
    /// Pool exhaustion events that fell back to the heap
    pub heap_fallbacks: u64,
}

/// Concurrency-safe tagged logger
pub struct Logger {
    enabled: AtomicBool,
    global_level: AtomicU8,
    configured: AtomicBool,
    backends: Mutex<Vec<Arc<dyn LogBackend>>>,
    pool: Arc<BufferPool>,
    rate: RateLimiter,
    tags: TagLevelTable,
    notifier: SubscriberNotifier,
    backend_lock_timeouts: AtomicU32,
    reentrancy_drops: AtomicU32,
}

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Process-wide default logger, created on first use with a non-blocking
/// stdout backend.
pub fn global() -> &'static Logger {
    GLOBAL.get_or_init(Logger::new)
}

impl Logger {
    /// Logger with a non-blocking stdout backend and default settings
    pub fn new() -> Self {
        Self::with_backend(Arc::new(NonBlockingBackend::stdout()))
    }

    /// Logger writing through the given backend
    pub fn with_backend(backend: Arc<dyn LogBackend>) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            global_level: AtomicU8::new(Level::Info.as_u8()),
            configured: AtomicBool::new(false),
            backends: Mutex::new(vec![backend]),
            pool: BufferPool::new(),
            rate: RateLimiter::new(DEFAULT_MAX_LOGS_PER_SECOND),
            tags: TagLevelTable::new(),
            notifier: SubscriberNotifier::new(),
            backend_lock_timeouts: AtomicU32::new(0),
            reentrancy_drops: AtomicU32::new(0),
        }
    }

    /// Apply a configuration: level, enable flag, rate cap, tag overrides
    /// and, unless the backend kind is `Custom`, the backend itself.
    pub fn configure(&self, config: &LoggerConfig) {
        self.set_level(config.default_level);
        self.set_enabled(config.enable_logging);
        self.rate.set_max(config.max_logs_per_second);

        self.tags.clear();
        for entry in &config.tag_levels {
            self.tags.set_level(&entry.tag, entry.level);
        }

        match config.backend {
            BackendKind::Blocking => {
                self.set_backend(Arc::new(crate::backend::BlockingBackend::stdout()))
            }
            BackendKind::Synchronized => {
                self.set_backend(Arc::new(crate::backend::SynchronizedBackend::stdout()))
            }
            BackendKind::NonBlocking => {
                self.set_backend(Arc::new(NonBlockingBackend::stdout()))
            }
            BackendKind::Custom => {}
        }

        self.configured.store(true, Ordering::Release);
    }

    /// True once [`configure`](Self::configure) has run
    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Set the global severity threshold
    pub fn set_level(&self, level: Level) {
        self.global_level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn level(&self) -> Level {
        // Stored value always originates from a valid Level
        Level::from_u8(self.global_level.load(Ordering::Relaxed)).unwrap_or(Level::Info)
    }

    /// Set a per-tag override; see [`TagLevelTable::set_level`]
    pub fn set_tag_level(&self, tag: &str, level: Level) -> bool {
        self.tags.set_level(tag, level)
    }

    /// Effective threshold for `tag`
    pub fn tag_level(&self, tag: &str) -> Level {
        self.tags.level_for(tag, self.level())
    }

    pub fn clear_tag_levels(&self) -> bool {
        self.tags.clear()
    }

    /// Whether a message at `level` under `tag` would pass filtering.
    ///
    /// Checks enabled state and level threshold only; the rate limiter is
    /// consulted separately so probing this does not consume quota.
    pub fn is_enabled_for(&self, level: Level, tag: &str) -> bool {
        if !self.is_enabled() || level == Level::None {
            return false;
        }
        level <= self.tag_level(tag)
    }

    /// Log a formatted message, appending CRLF
    pub fn log(&self, level: Level, tag: &str, args: fmt::Arguments<'_>) {
        self.log_with_newline(level, tag, args, true);
    }

    /// Log a formatted message without the trailing CRLF
    pub fn log_no_newline(&self, level: Level, tag: &str, args: fmt::Arguments<'_>) {
        self.log_with_newline(level, tag, args, false);
    }

    fn log_with_newline(&self, level: Level, tag: &str, args: fmt::Arguments<'_>, newline: bool) {
        let Some(_guard) = ReentrancyGuard::enter() else {
            self.reentrancy_drops.fetch_add(1, Ordering::Relaxed);
            return;
        };
        if !self.is_enabled_for(level, tag) {
            return;
        }
        if !self.rate.admit() {
            return;
        }
        self.emit(level, tag, args, newline);
    }

    /// Log raw text with no record header and no newline, subject to the
    /// enable flag and rate limit but not level filtering. Intended for
    /// continuation output such as progress dots.
    pub fn log_inline(&self, text: &str) {
        let Some(_guard) = ReentrancyGuard::enter() else {
            self.reentrancy_drops.fetch_add(1, Ordering::Relaxed);
            return;
        };
        if !self.is_enabled() {
            return;
        }
        if !self.rate.admit() {
            return;
        }

        self.notifier.notify(Level::Info, "INL", text);
        self.write_to_backends(text.as_bytes());
    }

    /// Log a formatted message bypassing the rate limiter. Level filtering
    /// still applies. For messages that must not be lost to a rate window,
    /// such as shutdown diagnostics.
    pub fn log_direct(&self, level: Level, tag: &str, args: fmt::Arguments<'_>) {
        let Some(_guard) = ReentrancyGuard::enter() else {
            self.reentrancy_drops.fetch_add(1, Ordering::Relaxed);
            return;
        };
        if !self.is_enabled_for(level, tag) {
            return;
        }
        self.emit(level, tag, args, true);
    }

    fn emit(&self, level: Level, tag: &str, args: fmt::Arguments<'_>, newline: bool) {
        // Format the message body into a pooled buffer; oversize output is
        // cut at a character boundary by the buffer writer.
        let mut msg_buf = self.pool.acquire();
        let msg_len = format_into(&mut msg_buf, args);
        // The writer only commits complete UTF-8 fragments
        let msg = std::str::from_utf8(&msg_buf[..msg_len]).unwrap_or("");

        self.notifier.notify(level, tag, msg);

        // Compose the record around the message in a second pooled buffer:
        // [millis][thread][L] tag: message\r\n
        let mut rec_buf = self.pool.acquire();
        let thread = std::thread::current();
        let rec_len = format_record(
            &mut rec_buf,
            now_millis(),
            thread.name().unwrap_or("?"),
            level.as_char(),
            tag,
            msg,
            newline,
        );

        self.write_to_backends(&rec_buf[..rec_len]);
    }

    fn write_to_backends(&self, data: &[u8]) {
        let backends = match self.backends.try_lock_for(MUTEX_STANDARD_TIMEOUT) {
            Some(guard) => guard,
            None => {
                self.backend_lock_timeouts.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        for backend in backends.iter() {
            backend.write(data);
        }
    }

    /// Flush every backend, with a bounded wait for the backend list lock
    pub fn flush(&self) {
        let Some(_guard) = ReentrancyGuard::enter() else {
            self.reentrancy_drops.fetch_add(1, Ordering::Relaxed);
            return;
        };
        let backends = match self.backends.try_lock_for(MUTEX_SHORT_TIMEOUT) {
            Some(guard) => guard,
            None => {
                self.backend_lock_timeouts.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        for backend in backends.iter() {
            backend.flush();
        }
    }

    /// Replace all backends with one
    pub fn set_backend(&self, backend: Arc<dyn LogBackend>) {
        let mut backends = self.backends.lock();
        backends.clear();
        backends.push(backend);
    }

    /// Add a backend alongside the existing ones
    pub fn add_backend(&self, backend: Arc<dyn LogBackend>) {
        self.backends.lock().push(backend);
    }

    /// Remove a backend by identity
    pub fn remove_backend(&self, backend: &Arc<dyn LogBackend>) -> bool {
        let mut backends = self.backends.lock();
        let before = backends.len();
        backends.retain(|b| !Arc::ptr_eq(b, backend));
        backends.len() != before
    }

    /// Drop every backend; records are discarded until one is installed
    pub fn clear_backends(&self) {
        self.backends.lock().clear();
    }

    pub fn backend_count(&self) -> usize {
        self.backends.lock().len()
    }

    // Subscriber passthroughs

    pub fn add_subscriber(&self, callback: SubscriberFn) -> bool {
        self.notifier.add(callback)
    }

    pub fn remove_subscriber(&self, callback: SubscriberFn) -> bool {
        self.notifier.remove(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.notifier.count()
    }

    /// Start asynchronous subscriber delivery
    pub fn start_subscriber_worker(&self) -> bool {
        self.notifier.start()
    }

    /// Stop asynchronous delivery; callbacks revert to the caller's thread
    pub fn stop_subscriber_worker(&self) {
        self.notifier.stop()
    }

    /// Change the rate cap; 0 disables rate limiting
    pub fn set_max_logs_per_second(&self, max: u32) {
        self.rate.set_max(max);
    }

    pub fn max_logs_per_second(&self) -> u32 {
        self.rate.max()
    }

    // Metrics, individually resettable

    pub fn dropped_logs(&self) -> u32 {
        self.rate.dropped()
    }

    pub fn reset_dropped_logs(&self) {
        self.rate.reset_dropped();
    }

    pub fn lock_timeouts(&self) -> u32 {
        self.rate.lock_timeouts()
            + self.tags.lock_timeouts()
            + self.backend_lock_timeouts.load(Ordering::Relaxed)
    }

    pub fn reset_lock_timeouts(&self) {
        self.rate.reset_lock_timeouts();
        self.tags.reset_lock_timeouts();
        self.backend_lock_timeouts.store(0, Ordering::Relaxed);
    }

    pub fn reentrancy_drops(&self) -> u32 {
        self.reentrancy_drops.load(Ordering::Relaxed)
    }

    pub fn reset_reentrancy_drops(&self) {
        self.reentrancy_drops.store(0, Ordering::Relaxed);
    }

    pub fn heap_fallbacks(&self) -> u64 {
        self.pool.heap_fallbacks()
    }

    pub fn reset_heap_fallbacks(&self) {
        self.pool.reset_heap_fallbacks();
    }

    /// All counters in one read
    pub fn stats(&self) -> LoggerStats {
        LoggerStats {
            rate_dropped: self.dropped_logs(),
            lock_timeouts: self.lock_timeouts(),
            reentrancy_drops: self.reentrancy_drops(),
            heap_fallbacks: self.heap_fallbacks(),
        }
    }

    pub fn reset_stats(&self) {
        self.reset_dropped_logs();
        self.reset_lock_timeouts();
        self.reset_reentrancy_drops();
        self.reset_heap_fallbacks();
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// fmt::Write adapter over a fixed byte buffer that never splits a UTF-8
/// character: a fragment that does not fit is cut back to the last boundary
/// and the write reports full.
struct BufWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl fmt::Write for BufWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.buf.len() - self.len;
        if s.len() <= room {
            self.buf[self.len..self.len + s.len()].copy_from_slice(s.as_bytes());
            self.len += s.len();
            return Ok(());
        }
        let mut end = room;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        self.buf[self.len..self.len + end].copy_from_slice(&s.as_bytes()[..end]);
        self.len += end;
        Err(fmt::Error)
    }
}

/// Format `args` into `buf`, returning the number of bytes written.
///
/// Output beyond the buffer is discarded at a character boundary.
pub fn format_into(buf: &mut [u8], args: fmt::Arguments<'_>) -> usize {
    use fmt::Write;
    let mut writer = BufWriter { buf, len: 0 };
    let _ = writer.write_fmt(args);
    writer.len
}

fn format_record(
    buf: &mut [u8],
    millis: u32,
    thread: &str,
    level_char: char,
    tag: &str,
    msg: &str,
    newline: bool,
) -> usize {
    if newline {
        format_into(
            buf,
            format_args!("[{millis}][{thread}][{level_char}] {tag}: {msg}\r\n"),
        )
    } else {
        format_into(
            buf,
            format_args!("[{millis}][{thread}][{level_char}] {tag}: {msg}"),
        )
    }
}
