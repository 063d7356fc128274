#![forbid(unsafe_code)]

//! Cancellable periodic tasks.
//!
//! A [`Pacer`] runs a closure on a background thread at a fixed interval
//! until stopped. It stands in for the platform's per-frame callback
//! (FPS monitor) and timer primitive (registry sweep).
//!
//! # Invariants
//!
//! 1. After [`Pacer::stop`] returns, the closure is not running and will not
//!    run again (unless `stop` was called from the pacer's own thread, in
//!    which case the current invocation finishes and the loop then exits).
//! 2. Stopping is idempotent.
//! 3. Dropping a pacer stops it without joining.

use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Signal checked by a running pacer loop.
#[derive(Clone)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    /// Create a linked (signal, trigger) pair.
    pub(crate) fn new() -> (Self, StopTrigger) {
        let inner = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = Self {
            inner: Arc::clone(&inner),
        };
        (signal, StopTrigger { inner })
    }

    /// Whether the trigger has fired.
    pub fn is_stopped(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Block until stopped or `duration` elapses.
    ///
    /// Returns `true` if stopped, `false` on timeout.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock();
        let deadline = Instant::now() + duration;
        while !*stopped {
            if cvar.wait_until(&mut stopped, deadline).timed_out() {
                return *stopped;
            }
        }
        true
    }
}

pub(crate) struct StopTrigger {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopTrigger {
    pub(crate) fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock() = true;
        cvar.notify_all();
    }
}

/// A running periodic task.
pub struct Pacer {
    name: &'static str,
    trigger: StopTrigger,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("name", &self.name)
            .field("running", &self.thread.is_some())
            .finish()
    }
}

impl Pacer {
    /// Spawn `tick` to run every `interval` until stopped.
    ///
    /// The first invocation happens one interval after spawning.
    pub fn spawn<F>(name: &'static str, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (signal, trigger) = StopSignal::new();
        let thread = thread::Builder::new()
            .name(format!("glassbite-{name}"))
            .spawn(move || {
                let mut ticks: u64 = 0;
                while !signal.wait_timeout(interval) {
                    tick();
                    ticks += 1;
                }
                tracing::trace!(pacer = name, ticks, "pacer loop exited");
            });

        let (thread, thread_id) = match thread {
            Ok(handle) => {
                let id = handle.thread().id();
                (Some(handle), id)
            }
            Err(err) => {
                tracing::error!(pacer = name, error = %err, "failed to spawn pacer thread");
                (None, thread::current().id())
            }
        };
        tracing::debug!(pacer = name, interval_ms = interval.as_millis() as u64, "pacer started");

        Self {
            name,
            trigger,
            thread,
            thread_id,
        }
    }

    /// Stop the loop and wait for it to exit.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.trigger.stop();
        if let Some(handle) = self.thread.take() {
            // Joining our own thread would deadlock; the loop exits on its own.
            if thread::current().id() != self.thread_id {
                let _ = handle.join();
            }
            tracing::debug!(pacer = self.name, "pacer stopped");
        }
    }
}

impl Drop for Pacer {
    fn drop(&mut self) {
        self.trigger.stop();
    }
}
