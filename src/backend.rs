// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Output backends: strategies for pushing composed records to a transport.

pub mod blocking;
pub mod nonblocking;

pub use blocking::{BlockingBackend, SynchronizedBackend};
pub use nonblocking::{NonBlockingBackend, NonBlockingStats, ThreadSafeNonBlockingBackend};

/// A log output backend.
///
/// Backends receive fully composed records and decide how to hand them to
/// their transport: block until written, serialize under a mutex, or drop
/// when the transport is congested.
pub trait LogBackend: Send + Sync {
    /// Write one composed record
    fn write(&self, data: &[u8]);

    /// Convenience for string records
    fn write_str(&self, data: &str) {
        self.write(data.as_bytes());
    }

    /// Push pending output toward its destination
    fn flush(&self);
}
