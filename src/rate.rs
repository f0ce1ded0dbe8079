// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Fixed-window rate limiter for log admission.
//!
//! Counts accepted messages per wall-clock window. The window state sits
//! behind a bounded-wait mutex; if the lock cannot be taken within
//! [`MUTEX_MEDIUM_TIMEOUT`](crate::config::MUTEX_MEDIUM_TIMEOUT) the message
//! is rejected (fail closed) and a timeout counter is bumped.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::clock::now_millis;
use crate::config::{MUTEX_MEDIUM_TIMEOUT, RATE_LIMIT_WINDOW_MS};

struct Window {
    start_ms: u32,
    accepted: u32,
}

/// Fixed-window message rate limiter
pub struct RateLimiter {
    max_per_window: AtomicU32,
    window_ms: u32,
    window: Mutex<Window>,
    dropped: AtomicU32,
    lock_timeouts: AtomicU32,
}

impl RateLimiter {
    /// Limiter with the default one-second window. `max` of 0 disables limiting.
    pub fn new(max: u32) -> Self {
        Self::with_window(max, RATE_LIMIT_WINDOW_MS)
    }

    pub fn with_window(max: u32, window_ms: u32) -> Self {
        Self {
            max_per_window: AtomicU32::new(max),
            window_ms,
            window: Mutex::new(Window {
                start_ms: now_millis(),
                accepted: 0,
            }),
            dropped: AtomicU32::new(0),
            lock_timeouts: AtomicU32::new(0),
        }
    }

    /// Decide whether one message may pass right now.
    ///
    /// Rejects when the window quota is spent or when the window lock cannot
    /// be acquired in bounded time.
    pub fn admit(&self) -> bool {
        let max = self.max_per_window.load(Ordering::Relaxed);
        if max == 0 {
            return true;
        }

        let mut window = match self.window.try_lock_for(MUTEX_MEDIUM_TIMEOUT) {
            Some(guard) => guard,
            None => {
                self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };

        let now = now_millis();
        // wrapping_sub keeps elapsed positive across the ~49 day clock wrap
        if now.wrapping_sub(window.start_ms) >= self.window_ms {
            window.start_ms = now;
            window.accepted = 1;
            return true;
        }

        if window.accepted < max {
            window.accepted += 1;
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Change the per-window cap; takes effect on the next admit call
    pub fn set_max(&self, max: u32) {
        self.max_per_window.store(max, Ordering::Relaxed);
    }

    pub fn max(&self) -> u32 {
        self.max_per_window.load(Ordering::Relaxed)
    }

    /// Messages rejected because the window quota was spent
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// Messages rejected because the window lock timed out
    pub fn lock_timeouts(&self) -> u32 {
        self.lock_timeouts.load(Ordering::Relaxed)
    }

    pub fn reset_lock_timeouts(&self) {
        self.lock_timeouts.store(0, Ordering::Relaxed);
    }
}
