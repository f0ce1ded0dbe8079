// Monotonic millisecond clock for record timestamps and rate windows

use std::sync::OnceLock;
use std::time::Instant;

static START: OnceLock<Instant> = OnceLock::new();

/// Milliseconds since the process clock was first read, truncated to u32.
///
/// Wraps after ~49 days; callers compare timestamps with `wrapping_sub` so a
/// wrapped counter still yields a positive elapsed duration.
#[inline]
pub fn now_millis() -> u32 {
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_millis() as u32
}
