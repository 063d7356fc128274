#![forbid(unsafe_code)]

//! Table of in-flight decorative animations.
//!
//! Screens register an animation when it starts and unregister it when it
//! finishes. The optimizer reads [`AnimationRegistry::active_count`] to
//! decide whether a new animation may start and sweeps stale entries as a
//! leak backstop.
//!
//! # Invariants
//!
//! 1. **One handle per id**: registering an id that is already present
//!    cancels the previous handle before the new one is stored.
//! 2. **Cancel before forget**: `unregister`, `sweep_stale` and `clear`
//!    invoke each removed handle's cancel callback exactly once.
//! 3. **Re-entrancy**: cancel callbacks run with the table unlocked, so a
//!    callback may call back into the registry (typically `unregister` on
//!    its own id, which is then a no-op).
//!
//! # Failure Modes
//!
//! | Mode | Condition | Behavior |
//! |------|-----------|----------|
//! | Unknown id | `unregister`/`complete` of an absent id | No-op |
//! | Orphaned handle | Caller never unregisters | Removed by the next sweep past its age |

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::{SharedClock, SystemClock};
use crate::fps_monitor::LoadGauge;

/// Age after which an entry is considered stale by default.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);

/// Callback that stops the underlying animation.
pub type CancelFn = Box<dyn FnOnce() + Send + 'static>;

/// One registered animation.
pub struct AnimationHandle {
    pub id: String,
    /// Free-form tag such as `"fade"` or `"scale"`.
    pub kind: String,
    pub started_at: Instant,
    cancel: Option<CancelFn>,
}

impl fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("started_at", &self.started_at)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

impl AnimationHandle {
    fn run_cancel(self) {
        if let Some(cancel) = self.cancel {
            cancel();
        }
    }

    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}

/// Registry of active animation handles.
pub struct AnimationRegistry {
    clock: SharedClock,
    entries: Mutex<HashMap<String, AnimationHandle>>,
}

impl fmt::Debug for AnimationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationRegistry")
            .field("active", &self.active_count())
            .finish_non_exhaustive()
    }
}

impl Default for AnimationRegistry {
    fn default() -> Self {
        Self::new(SystemClock::shared())
    }
}

impl AnimationRegistry {
    #[must_use]
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register an animation under `id`.
    ///
    /// Any handle already registered under `id` is cancelled first and then
    /// replaced.
    pub fn register(
        &self,
        id: impl Into<String>,
        kind: impl Into<String>,
        on_cancel: Option<CancelFn>,
    ) {
        let mut handle = AnimationHandle {
            id: id.into(),
            kind: kind.into(),
            started_at: self.clock.now(),
            cancel: on_cancel,
        };
        loop {
            let mut entries = self.entries.lock();
            match entries.remove(&handle.id) {
                Some(previous) => {
                    drop(entries);
                    tracing::debug!(
                        id = %previous.id,
                        kind = %previous.kind,
                        "replacing active animation"
                    );
                    previous.run_cancel();
                }
                None => {
                    handle.started_at = self.clock.now();
                    tracing::trace!(
                        id = %handle.id,
                        kind = %handle.kind,
                        active = entries.len() + 1,
                        "animation registered"
                    );
                    entries.insert(handle.id.clone(), handle);
                    break;
                }
            }
        }
    }

    /// Cancel and remove `id`. Absent ids are ignored.
    pub fn unregister(&self, id: &str) {
        let removed = self.entries.lock().remove(id);
        if let Some(handle) = removed {
            tracing::trace!(id = %handle.id, "animation unregistered");
            handle.run_cancel();
        }
    }

    /// Remove `id` without cancelling it, for animations that ran to completion.
    ///
    /// Returns whether an entry was removed.
    pub fn complete(&self, id: &str) -> bool {
        self.entries.lock().remove(id).is_some()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_active(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Ids of all active animations, sorted.
    #[must_use]
    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of active animations tagged `kind`.
    #[must_use]
    pub fn count_by_kind(&self, kind: &str) -> usize {
        self.entries.lock().values().filter(|h| h.kind == kind).count()
    }

    /// Cancel and remove every entry whose age is at least `max_age`.
    ///
    /// Returns the number of entries removed. `sweep_stale(Duration::ZERO)`
    /// empties the registry.
    pub fn sweep_stale(&self, max_age: Duration) -> usize {
        let now = self.clock.now();
        let stale: Vec<AnimationHandle> = {
            let mut entries = self.entries.lock();
            let ids: Vec<String> = entries
                .values()
                .filter(|h| h.age(now) >= max_age)
                .map(|h| h.id.clone())
                .collect();
            ids.iter().filter_map(|id| entries.remove(id)).collect()
        };

        let swept = stale.len();
        if swept > 0 {
            tracing::debug!(
                swept,
                max_age_ms = max_age.as_millis() as u64,
                "swept stale animations"
            );
        }
        for handle in stale {
            handle.run_cancel();
        }
        swept
    }

    /// [`sweep_stale`](Self::sweep_stale) with [`DEFAULT_STALE_AFTER`].
    pub fn sweep_stale_default(&self) -> usize {
        self.sweep_stale(DEFAULT_STALE_AFTER)
    }

    /// Cancel and remove everything.
    pub fn clear(&self) {
        let drained: Vec<AnimationHandle> = self.entries.lock().drain().map(|(_, h)| h).collect();
        if !drained.is_empty() {
            tracing::debug!(cleared = drained.len(), "animation registry cleared");
        }
        for handle in drained {
            handle.run_cancel();
        }
    }
}

impl LoadGauge for AnimationRegistry {
    fn active_animations(&self) -> usize {
        self.active_count()
    }
}
