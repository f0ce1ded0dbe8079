// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Blocking backends: complete every write, at the cost of caller stalls.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::config::{MUTEX_SHORT_TIMEOUT, MUTEX_STANDARD_TIMEOUT};
use crate::transport::{StdoutTransport, Transport};

use super::LogBackend;

/// Writes every record in full, looping on partial transport writes.
///
/// Calls stall while the transport is congested, so this backend is only
/// suitable where an interleaved or dropped record is worse than a pause.
pub struct BlockingBackend<T: Transport = StdoutTransport> {
    transport: Arc<T>,
}

impl BlockingBackend<StdoutTransport> {
    pub fn stdout() -> Self {
        Self::new(Arc::new(StdoutTransport))
    }
}

impl<T: Transport> BlockingBackend<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

impl<T: Transport> LogBackend for BlockingBackend<T> {
    fn write(&self, data: &[u8]) {
        let mut remaining = data;
        while !remaining.is_empty() {
            let written = self.transport.write(remaining);
            if written == 0 {
                // Transport refuses bytes outright; give up on the record
                return;
            }
            remaining = &remaining[written..];
        }
    }

    fn flush(&self) {
        self.transport.flush();
    }
}

// Process-wide writer lock shared by every SynchronizedBackend instance, so
// records from different loggers never interleave on the same console.
static WRITE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn write_lock() -> &'static Mutex<()> {
    WRITE_LOCK.get_or_init(|| Mutex::new(()))
}

/// Blocking backend that serializes whole records under a process-wide mutex.
///
/// Each record is written and flushed while holding the lock, so concurrent
/// writers see clean line boundaries. A writer that cannot take the lock
/// within [`MUTEX_STANDARD_TIMEOUT`] skips the record instead of queueing.
pub struct SynchronizedBackend<T: Transport = StdoutTransport> {
    transport: Arc<T>,
}

impl SynchronizedBackend<StdoutTransport> {
    pub fn stdout() -> Self {
        Self::new(Arc::new(StdoutTransport))
    }
}

impl<T: Transport> SynchronizedBackend<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

impl<T: Transport> LogBackend for SynchronizedBackend<T> {
    fn write(&self, data: &[u8]) {
        let guard = match write_lock().try_lock_for(MUTEX_STANDARD_TIMEOUT) {
            Some(guard) => guard,
            None => return,
        };

        let mut remaining = data;
        while !remaining.is_empty() {
            let written = self.transport.write(remaining);
            if written == 0 {
                break;
            }
            remaining = &remaining[written..];
        }
        // Flush inside the lock so the record reaches the console atomically
        self.transport.flush();
        drop(guard);
    }

    fn flush(&self) {
        if let Some(_guard) = write_lock().try_lock_for(MUTEX_SHORT_TIMEOUT) {
            self.transport.flush();
        }
    }
}
