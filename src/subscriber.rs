// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Asynchronous subscriber fan-out.
//!
//! Subscribers are plain function pointers kept in a small fixed registry.
//! Notifications are queued to a dedicated worker thread through a bounded
//! channel so a slow subscriber never stalls a logging caller; when the
//! worker is not running, callbacks run synchronously on the caller instead.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};

use crate::config::{
    MAX_SUBSCRIBERS, MAX_TAG_LEN, MUTEX_SHORT_TIMEOUT, SUBSCRIBER_MSG_SIZE,
    SUBSCRIBER_QUEUE_DEPTH, WORKER_STOP_GRACE,
};
use crate::level::Level;

/// Subscriber callback: (level, tag, message)
pub type SubscriberFn = fn(Level, &str, &str);

/// A notification copied into fixed storage for the worker queue.
///
/// Tag and message are clamped to their fixed sizes at a character boundary.
struct QueuedNotification {
    level: Level,
    tag: [u8; MAX_TAG_LEN],
    tag_len: u8,
    msg: [u8; SUBSCRIBER_MSG_SIZE],
    msg_len: u8,
}

fn clamp_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

impl QueuedNotification {
    fn new(level: Level, tag: &str, msg: &str) -> Self {
        let tag = clamp_to_boundary(tag, MAX_TAG_LEN);
        let msg = clamp_to_boundary(msg, SUBSCRIBER_MSG_SIZE);

        let mut tag_buf = [0u8; MAX_TAG_LEN];
        tag_buf[..tag.len()].copy_from_slice(tag.as_bytes());
        let mut msg_buf = [0u8; SUBSCRIBER_MSG_SIZE];
        msg_buf[..msg.len()].copy_from_slice(msg.as_bytes());

        Self {
            level,
            tag: tag_buf,
            tag_len: tag.len() as u8,
            msg: msg_buf,
            msg_len: msg.len() as u8,
        }
    }

    fn tag(&self) -> &str {
        // Stored bytes are a char-boundary prefix of a valid &str
        std::str::from_utf8(&self.tag[..self.tag_len as usize]).unwrap_or("")
    }

    fn msg(&self) -> &str {
        std::str::from_utf8(&self.msg[..self.msg_len as usize]).unwrap_or("")
    }
}

enum WorkerMessage {
    Notify(QueuedNotification),
    Shutdown,
}

struct Shared {
    registry: Mutex<[Option<SubscriberFn>; MAX_SUBSCRIBERS]>,
    count: AtomicU8,
    running: AtomicBool,
    worker_exited: AtomicBool,
}

impl Shared {
    /// Copy the registry out under a short-bounded lock; callbacks are then
    /// invoked without holding it, so a subscriber may add or remove
    /// subscribers from inside its own callback.
    fn snapshot(&self) -> [Option<SubscriberFn>; MAX_SUBSCRIBERS] {
        match self.registry.try_lock_for(MUTEX_SHORT_TIMEOUT) {
            Some(registry) => *registry,
            None => [None; MAX_SUBSCRIBERS],
        }
    }

    fn invoke_all(&self, level: Level, tag: &str, msg: &str) {
        for callback in self.snapshot().into_iter().flatten() {
            callback(level, tag, msg);
        }
    }
}

/// Registry plus optional worker thread delivering notifications
pub struct SubscriberNotifier {
    shared: Arc<Shared>,
    queue: RwLock<Option<Sender<WorkerMessage>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriberNotifier {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new([None; MAX_SUBSCRIBERS]),
                count: AtomicU8::new(0),
                running: AtomicBool::new(false),
                worker_exited: AtomicBool::new(true),
            }),
            queue: RwLock::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Register a callback. Duplicates and a full registry are rejected.
    pub fn add(&self, callback: SubscriberFn) -> bool {
        let mut registry = match self.shared.registry.try_lock_for(MUTEX_SHORT_TIMEOUT) {
            Some(guard) => guard,
            None => return false,
        };
        if registry.iter().flatten().any(|&cb| cb == callback) {
            return false;
        }
        for slot in registry.iter_mut() {
            if slot.is_none() {
                *slot = Some(callback);
                self.shared.count.fetch_add(1, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    /// Unregister a callback, compacting the registry
    pub fn remove(&self, callback: SubscriberFn) -> bool {
        let mut registry = match self.shared.registry.try_lock_for(MUTEX_SHORT_TIMEOUT) {
            Some(guard) => guard,
            None => return false,
        };
        let Some(pos) = registry.iter().position(|&cb| cb == Some(callback)) else {
            return false;
        };
        for i in pos..MAX_SUBSCRIBERS - 1 {
            registry[i] = registry[i + 1];
        }
        registry[MAX_SUBSCRIBERS - 1] = None;
        self.shared.count.fetch_sub(1, Ordering::Relaxed);
        true
    }

    /// Number of registered callbacks
    pub fn count(&self) -> usize {
        self.shared.count.load(Ordering::Relaxed) as usize
    }

    /// True while the worker thread is accepting queued notifications
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }

    /// Start the worker thread. Returns false if already running or the
    /// thread could not be spawned.
    pub fn start(&self) -> bool {
        let mut worker = self.worker.lock();
        if self.shared.running.load(Ordering::Relaxed) {
            return false;
        }

        let (tx, rx) = bounded::<WorkerMessage>(SUBSCRIBER_QUEUE_DEPTH);
        let shared = Arc::clone(&self.shared);
        shared.running.store(true, Ordering::Relaxed);
        shared.worker_exited.store(false, Ordering::Relaxed);

        let spawned = std::thread::Builder::new()
            .name("log-sub".to_string())
            .spawn(move || {
                loop {
                    match rx.recv_timeout(Duration::from_millis(100)) {
                        Ok(WorkerMessage::Notify(n)) => {
                            shared.invoke_all(n.level, n.tag(), n.msg());
                        }
                        Ok(WorkerMessage::Shutdown) => break,
                        Err(_) => {
                            // Timeout or disconnect; re-check the run flag
                            if !shared.running.load(Ordering::Relaxed) {
                                break;
                            }
                        }
                    }
                }
                shared.worker_exited.store(true, Ordering::Relaxed);
            });

        match spawned {
            Ok(handle) => {
                *self.queue.write() = Some(tx);
                *worker = Some(handle);
                true
            }
            Err(_) => {
                self.shared.running.store(false, Ordering::Relaxed);
                self.shared.worker_exited.store(true, Ordering::Relaxed);
                false
            }
        }
    }

    /// Stop the worker thread, waiting up to the grace period for it to
    /// drain. A worker that does not exit in time is abandoned.
    pub fn stop(&self) {
        let mut worker = self.worker.lock();
        if worker.is_none() {
            return;
        }

        self.shared.running.store(false, Ordering::Relaxed);
        if let Some(tx) = self.queue.write().take() {
            // Wake the worker if it is parked in recv_timeout
            let _ = tx.try_send(WorkerMessage::Shutdown);
        }

        let deadline = std::time::Instant::now() + WORKER_STOP_GRACE;
        while !self.shared.worker_exited.load(Ordering::Relaxed)
            && std::time::Instant::now() < deadline
        {
            std::thread::sleep(Duration::from_millis(10));
        }

        let handle = worker.take();
        if self.shared.worker_exited.load(Ordering::Relaxed) {
            if let Some(handle) = handle {
                let _ = handle.join();
            }
        }
        // Otherwise the handle is dropped and the thread detaches; it will
        // observe the cleared run flag on its next timeout tick.
    }

    /// Deliver a notification to all subscribers.
    ///
    /// With the worker running the notification is queued; a full queue drops
    /// it silently. Without a worker the callbacks run on the caller.
    pub fn notify(&self, level: Level, tag: &str, msg: &str) {
        if self.shared.count.load(Ordering::Relaxed) == 0 {
            return;
        }

        let queue = self.queue.read();
        match queue.as_ref() {
            Some(tx) => {
                let n = QueuedNotification::new(level, tag, msg);
                match tx.try_send(WorkerMessage::Notify(n)) {
                    Ok(()) | Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {}
                }
            }
            None => {
                drop(queue);
                self.shared.invoke_all(
                    level,
                    clamp_to_boundary(tag, MAX_TAG_LEN),
                    clamp_to_boundary(msg, SUBSCRIBER_MSG_SIZE),
                );
            }
        }
    }
}

impl Default for SubscriberNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SubscriberNotifier {
    fn drop(&mut self) {
        self.stop();
    }
}
