// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Byte-stream transports backends write into.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Destination for composed log bytes.
///
/// A transport reports how much it can take right now and accepts partial
/// writes; backends decide what to do when space runs short.
pub trait Transport: Send + Sync {
    /// Bytes the transport can accept without blocking.
    ///
    /// `usize::MAX` means effectively unbounded.
    fn writable(&self) -> usize;

    /// Write up to `data.len()` bytes, returning how many were taken.
    fn write(&self, data: &[u8]) -> usize;

    /// Push buffered bytes toward the final destination.
    fn flush(&self);
}

/// Transport over process stdout
pub struct StdoutTransport;

impl Transport for StdoutTransport {
    fn writable(&self) -> usize {
        usize::MAX
    }

    fn write(&self, data: &[u8]) -> usize {
        let mut out = std::io::stdout().lock();
        match out.write_all(data) {
            Ok(()) => data.len(),
            Err(_) => 0,
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().lock().flush();
    }
}

/// In-memory transport with an adjustable capacity, for tests and capture.
///
/// With a finite capacity it models a congested sink: `writable` shrinks as
/// bytes accumulate and `write` takes only what fits.
pub struct MemTransport {
    inner: Mutex<Vec<u8>>,
    capacity: AtomicUsize,
}

impl MemTransport {
    /// Capture transport that never reports congestion
    pub fn unbounded() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Vec::new()),
            capacity: AtomicUsize::new(usize::MAX),
        })
    }

    /// Transport that accepts at most `capacity` bytes until drained
    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Vec::new()),
            capacity: AtomicUsize::new(capacity),
        })
    }

    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
    }

    /// Copy of everything written so far
    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().clone()
    }

    /// Drain the captured bytes, freeing capacity
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.inner.lock())
    }

    /// Captured bytes as lossy UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for MemTransport {
    fn writable(&self) -> usize {
        let cap = self.capacity.load(Ordering::Relaxed);
        if cap == usize::MAX {
            return usize::MAX;
        }
        cap.saturating_sub(self.inner.lock().len())
    }

    fn write(&self, data: &[u8]) -> usize {
        let cap = self.capacity.load(Ordering::Relaxed);
        let mut inner = self.inner.lock();
        let room = if cap == usize::MAX {
            data.len()
        } else {
            cap.saturating_sub(inner.len()).min(data.len())
        };
        inner.extend_from_slice(&data[..room]);
        room
    }

    fn flush(&self) {}
}
