// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Per-tag severity override table.
//!
//! Fixed array of up to [`MAX_TAGS`] entries with inline tag storage, scanned
//! linearly. Lookups that fail to take the table lock within
//! [`MUTEX_SHORT_TIMEOUT`](crate::config::MUTEX_SHORT_TIMEOUT) fall back to
//! the global level rather than block the logging caller.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::config::{MAX_TAGS, MAX_TAG_LEN, MUTEX_SHORT_TIMEOUT};
use crate::level::Level;

#[derive(Clone, Copy)]
struct Entry {
    tag: [u8; MAX_TAG_LEN],
    len: u8,
    level: Level,
}

impl Entry {
    fn matches(&self, tag: &[u8]) -> bool {
        &self.tag[..self.len as usize] == tag
    }
}

struct Table {
    entries: [Option<Entry>; MAX_TAGS],
    count: usize,
}

/// Tag-to-level override table
pub struct TagLevelTable {
    table: Mutex<Table>,
    lock_timeouts: AtomicU32,
}

/// Clamp a tag to its stored form: at most MAX_TAG_LEN bytes, cut back to a
/// character boundary so the stored prefix stays valid UTF-8.
fn clamp_tag(tag: &str) -> &[u8] {
    if tag.len() <= MAX_TAG_LEN {
        return tag.as_bytes();
    }
    let mut end = MAX_TAG_LEN;
    while end > 0 && !tag.is_char_boundary(end) {
        end -= 1;
    }
    &tag.as_bytes()[..end]
}

impl TagLevelTable {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table {
                entries: [None; MAX_TAGS],
                count: 0,
            }),
            lock_timeouts: AtomicU32::new(0),
        }
    }

    /// Set or update the override for `tag`.
    ///
    /// Returns false when the tag is empty, the table is full, or the lock
    /// timed out. Existing entries are updated in place; there is no eviction.
    pub fn set_level(&self, tag: &str, level: Level) -> bool {
        if tag.is_empty() {
            return false;
        }
        let clamped = clamp_tag(tag);

        let mut table = match self.table.try_lock_for(MUTEX_SHORT_TIMEOUT) {
            Some(guard) => guard,
            None => {
                self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };

        for entry in table.entries.iter_mut().flatten() {
            if entry.matches(clamped) {
                entry.level = level;
                return true;
            }
        }

        if table.count >= MAX_TAGS {
            return false;
        }
        let mut stored = [0u8; MAX_TAG_LEN];
        stored[..clamped.len()].copy_from_slice(clamped);
        let slot = table.count;
        table.entries[slot] = Some(Entry {
            tag: stored,
            len: clamped.len() as u8,
            level,
        });
        table.count += 1;
        true
    }

    /// Effective level for `tag`: its override if present, else `global`.
    pub fn level_for(&self, tag: &str, global: Level) -> Level {
        let clamped = clamp_tag(tag);

        let table = match self.table.try_lock_for(MUTEX_SHORT_TIMEOUT) {
            Some(guard) => guard,
            None => {
                self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
                return global;
            }
        };

        for entry in table.entries.iter().flatten() {
            if entry.matches(clamped) {
                return entry.level;
            }
        }
        global
    }

    /// Remove every override
    pub fn clear(&self) -> bool {
        let mut table = match self.table.try_lock_for(MUTEX_SHORT_TIMEOUT) {
            Some(guard) => guard,
            None => {
                self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };
        table.entries = [None; MAX_TAGS];
        table.count = 0;
        true
    }

    /// Number of overrides currently stored
    pub fn len(&self) -> usize {
        match self.table.try_lock_for(MUTEX_SHORT_TIMEOUT) {
            Some(table) => table.count,
            None => {
                self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lock_timeouts(&self) -> u32 {
        self.lock_timeouts.load(Ordering::Relaxed)
    }

    pub fn reset_lock_timeouts(&self) {
        self.lock_timeouts.store(0, Ordering::Relaxed);
    }
}

impl Default for TagLevelTable {
    fn default() -> Self {
        Self::new()
    }
}
