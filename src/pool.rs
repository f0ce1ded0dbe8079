// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Fixed pool of format buffers with lock-free acquisition.
//!
//! The pool holds [`POOL_SIZE`] slots of [`BUFFER_SIZE`] bytes each. Acquiring
//! a buffer is a linear CAS scan over the slot flags; no lock is taken on the
//! hot path. When every slot is busy the pool falls back to a heap allocation
//! so callers never observe acquisition failure, and a counter records how
//! often that happened so the pool can be resized.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::{BUFFER_SIZE, POOL_SIZE};

struct Slot {
    data: UnsafeCell<[u8; BUFFER_SIZE]>,
    in_use: AtomicBool,
}

// Safety: the data cell of a slot is only reachable through a PooledBuf, and
// the CAS on in_use grants exclusive access to exactly one holder at a time.
unsafe impl Sync for Slot {}

impl Slot {
    fn new() -> Self {
        Self {
            data: UnsafeCell::new([0u8; BUFFER_SIZE]),
            in_use: AtomicBool::new(false),
        }
    }
}

/// Pool of reusable format buffers
pub struct BufferPool {
    slots: Box<[Slot]>,
    heap_fallbacks: AtomicU64,
}

impl BufferPool {
    /// Create a pool with the default [`POOL_SIZE`] slots
    pub fn new() -> Arc<Self> {
        Self::with_capacity(POOL_SIZE)
    }

    /// Create a pool with `capacity` slots
    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        let slots = (0..capacity).map(|_| Slot::new()).collect();
        Arc::new(Self {
            slots,
            heap_fallbacks: AtomicU64::new(0),
        })
    }

    /// Acquire a buffer, preferring a pooled slot.
    ///
    /// Falls back to a one-off heap allocation when the pool is exhausted.
    /// The buffer returns to the pool (or is freed) on drop.
    pub fn acquire(self: &Arc<Self>) -> PooledBuf {
        for (idx, slot) in self.slots.iter().enumerate() {
            if slot
                .in_use
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return PooledBuf {
                    pool: Arc::clone(self),
                    kind: BufKind::Slot(idx),
                };
            }
        }
        self.heap_fallbacks.fetch_add(1, Ordering::Relaxed);
        PooledBuf {
            pool: Arc::clone(self),
            kind: BufKind::Heap(Box::new([0u8; BUFFER_SIZE])),
        }
    }

    /// Number of slots in the pool
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently checked out
    pub fn in_use(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.in_use.load(Ordering::Relaxed))
            .count()
    }

    /// How many times acquisition fell back to the heap
    pub fn heap_fallbacks(&self) -> u64 {
        self.heap_fallbacks.load(Ordering::Relaxed)
    }

    pub fn reset_heap_fallbacks(&self) {
        self.heap_fallbacks.store(0, Ordering::Relaxed);
    }
}

enum BufKind {
    Slot(usize),
    Heap(Box<[u8; BUFFER_SIZE]>),
}

/// A buffer checked out from a [`BufferPool`], released on drop
pub struct PooledBuf {
    pool: Arc<BufferPool>,
    kind: BufKind,
}

impl PooledBuf {
    /// True if this buffer came from the heap fallback path
    pub fn is_heap(&self) -> bool {
        matches!(self.kind, BufKind::Heap(_))
    }
}

impl std::ops::Deref for PooledBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match &self.kind {
            // Safety: the CAS in acquire() made us the sole holder of this slot
            BufKind::Slot(idx) => unsafe { &*self.pool.slots[*idx].data.get() },
            BufKind::Heap(data) => &data[..],
        }
    }
}

impl std::ops::DerefMut for PooledBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        match &mut self.kind {
            // Safety: as above, exclusive access is held until drop
            BufKind::Slot(idx) => unsafe { &mut *self.pool.slots[*idx].data.get() },
            BufKind::Heap(data) => &mut data[..],
        }
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        if let BufKind::Slot(idx) = self.kind {
            self.pool.slots[idx].in_use.store(false, Ordering::Release);
        }
    }
}
