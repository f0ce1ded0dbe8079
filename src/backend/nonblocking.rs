// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Non-blocking backends: never wait on a congested transport.
//!
//! These trade completeness for latency. A record that does not fit is cut
//! short with a visible marker or dropped whole, and counters record exactly
//! what was lost so congestion shows up in metrics instead of stalls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::config::{MIN_WRITE_SPACE, TRUNCATION_MARKER};
use crate::transport::{StdoutTransport, Transport};

use super::LogBackend;

/// Loss counters for the non-blocking backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NonBlockingStats {
    /// Records dropped entirely
    pub dropped_messages: u64,
    /// Bytes requested but never written
    pub dropped_bytes: u64,
    /// Records written short with a truncation marker
    pub partial_writes: u64,
}

/// Single-caller non-blocking backend.
///
/// A record either fits in the transport's free space, is truncated with a
/// `...` marker when at least [`MIN_WRITE_SPACE`] bytes are free, or is
/// dropped whole. The write itself is not serialized against other callers;
/// use [`ThreadSafeNonBlockingBackend`] when several threads share one
/// backend directly.
pub struct NonBlockingBackend<T: Transport = StdoutTransport> {
    transport: Arc<T>,
    dropped_messages: AtomicU64,
    dropped_bytes: AtomicU64,
    partial_writes: AtomicU64,
}

impl NonBlockingBackend<StdoutTransport> {
    pub fn stdout() -> Self {
        Self::new(Arc::new(StdoutTransport))
    }
}

impl<T: Transport> NonBlockingBackend<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            dropped_messages: AtomicU64::new(0),
            dropped_bytes: AtomicU64::new(0),
            partial_writes: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> NonBlockingStats {
        NonBlockingStats {
            dropped_messages: self.dropped_messages.load(Ordering::Relaxed),
            dropped_bytes: self.dropped_bytes.load(Ordering::Relaxed),
            partial_writes: self.partial_writes.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.dropped_messages.store(0, Ordering::Relaxed);
        self.dropped_bytes.store(0, Ordering::Relaxed);
        self.partial_writes.store(0, Ordering::Relaxed);
    }

    /// True when the transport has too little space for even a marker
    pub fn is_congested(&self) -> bool {
        self.transport.writable() < MIN_WRITE_SPACE
    }
}

impl<T: Transport> LogBackend for NonBlockingBackend<T> {
    fn write(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let available = self.transport.writable();

        if available < MIN_WRITE_SPACE {
            self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            self.dropped_bytes
                .fetch_add(data.len() as u64, Ordering::Relaxed);
            return;
        }

        if available >= data.len() {
            let written = self.transport.write(data);
            if written < data.len() {
                // Transport shrank between the check and the write
                self.dropped_bytes
                    .fetch_add((data.len() - written) as u64, Ordering::Relaxed);
            }
            return;
        }

        // Partial fit: keep a prefix and end the line with a marker so the
        // reader can see the cut
        let keep = available - TRUNCATION_MARKER.len();
        let written = self.transport.write(&data[..keep]);
        self.transport.write(TRUNCATION_MARKER);
        self.partial_writes.fetch_add(1, Ordering::Relaxed);
        self.dropped_bytes
            .fetch_add((data.len() - written) as u64, Ordering::Relaxed);
    }

    // Flushing could block on a congested sink, so it is a deliberate no-op
    fn flush(&self) {}
}

// Shared by every ThreadSafeNonBlockingBackend instance
static TS_WRITE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn ts_write_lock() -> &'static Mutex<()> {
    TS_WRITE_LOCK.get_or_init(|| Mutex::new(()))
}

const LOCAL_BUFFER_SIZE: usize = 128;

/// Non-blocking backend safe for direct use from many threads.
///
/// The record is copied to a small stack buffer up front, then written under
/// a zero-wait mutex try: contention or congestion drops the record and bumps
/// a counter. Nothing in the write path waits.
pub struct ThreadSafeNonBlockingBackend<T: Transport = StdoutTransport> {
    transport: Arc<T>,
    dropped_messages: AtomicU64,
    dropped_bytes: AtomicU64,
    lock_contention: AtomicU64,
    transport_full: AtomicU64,
}

impl ThreadSafeNonBlockingBackend<StdoutTransport> {
    pub fn stdout() -> Self {
        Self::new(Arc::new(StdoutTransport))
    }
}

impl<T: Transport> ThreadSafeNonBlockingBackend<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            dropped_messages: AtomicU64::new(0),
            dropped_bytes: AtomicU64::new(0),
            lock_contention: AtomicU64::new(0),
            transport_full: AtomicU64::new(0),
        }
    }

    /// Records dropped for any reason
    pub fn dropped_messages(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    pub fn dropped_bytes(&self) -> u64 {
        self.dropped_bytes.load(Ordering::Relaxed)
    }

    /// Records dropped because another thread held the write lock
    pub fn lock_contention(&self) -> u64 {
        self.lock_contention.load(Ordering::Relaxed)
    }

    /// Records dropped because the transport had no room
    pub fn transport_full(&self) -> u64 {
        self.transport_full.load(Ordering::Relaxed)
    }

    pub fn reset_stats(&self) {
        self.dropped_messages.store(0, Ordering::Relaxed);
        self.dropped_bytes.store(0, Ordering::Relaxed);
        self.lock_contention.store(0, Ordering::Relaxed);
        self.transport_full.store(0, Ordering::Relaxed);
    }

    fn drop_record(&self, len: usize) {
        self.dropped_messages.fetch_add(1, Ordering::Relaxed);
        self.dropped_bytes.fetch_add(len as u64, Ordering::Relaxed);
    }
}

impl<T: Transport> LogBackend for ThreadSafeNonBlockingBackend<T> {
    fn write(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        // Bounded stack copy keeps the critical section free of caller memory
        let copy_len = data.len().min(LOCAL_BUFFER_SIZE);
        let mut local = [0u8; LOCAL_BUFFER_SIZE];
        local[..copy_len].copy_from_slice(&data[..copy_len]);

        let guard = match ts_write_lock().try_lock() {
            Some(guard) => guard,
            None => {
                self.lock_contention.fetch_add(1, Ordering::Relaxed);
                self.drop_record(data.len());
                return;
            }
        };

        let available = self.transport.writable();
        if available < MIN_WRITE_SPACE {
            self.transport_full.fetch_add(1, Ordering::Relaxed);
            self.drop_record(data.len());
            return;
        }

        let to_write = copy_len.min(available);
        let written = self.transport.write(&local[..to_write]);
        drop(guard);

        if written < data.len() {
            self.dropped_bytes
                .fetch_add((data.len() - written) as u64, Ordering::Relaxed);
        }
    }

    fn flush(&self) {}
}
