#![forbid(unsafe_code)]

//! Frame-rate sampling.
//!
//! [`FpsMonitor`] counts rendered frames and, once per one-second window
//! measured on the wall clock, publishes a [`PerformanceSample`] to every
//! registered listener.
//!
//! # How it works
//!
//! 1. Each frame calls [`FrameCounter::on_frame`] with the current instant.
//! 2. When at least one window length has elapsed since the window opened,
//!    the counter converts `frames / elapsed` to an integer FPS, pushes it
//!    into a bounded history, and opens the next window.
//! 3. The monitor enriches the result with the load gauge's active animation
//!    count and a synthetic memory estimate, then fans it out to listeners
//!    in registration order.
//!
//! Frames come from a [`FrameSource`]: either a pacer thread standing in for
//! the platform's per-frame callback, or the caller's own render loop via
//! [`FpsMonitor::record_frame`].
//!
//! # Invariants
//!
//! 1. History never holds more than `history_len` entries (oldest dropped).
//! 2. The low-frame counter only grows, except through [`FpsMonitor::reset`].
//! 3. No listener is invoked after [`FpsMonitor::stop`] returns.
//! 4. The memory figure is `base_memory_mb + 2 * active_animations`. It is an
//!    approximation, not a measurement.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::{SharedClock, SystemClock};
use crate::pacer::Pacer;

/// Anything that can report how many animations are currently running.
pub trait LoadGauge: Send + Sync {
    fn active_animations(&self) -> usize;
}

/// Metrics for one completed sampling window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceSample {
    pub instantaneous_fps: u32,
    /// Mean of the retained history, rounded.
    pub rolling_average_fps: u32,
    /// Cumulative count of windows below the low-frame threshold.
    pub low_frame_sample_count: u64,
    pub estimated_memory_mb: f64,
    pub active_animation_count: usize,
    pub timestamp: Instant,
}

/// Where frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSource {
    /// A background pacer produces one frame per interval.
    Paced(Duration),
    /// The caller reports frames through [`FpsMonitor::record_frame`].
    External,
}

impl Default for FrameSource {
    fn default() -> Self {
        Self::Paced(Duration::from_micros(16_667))
    }
}

/// FPS monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub frame_source: FrameSource,
    /// Length of one sampling window.
    pub window: Duration,
    /// Maximum retained samples.
    pub history_len: usize,
    /// Windows strictly below this FPS count as frame drops.
    pub low_fps_threshold: u32,
    /// Baseline of the synthetic memory estimate.
    pub base_memory_mb: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            frame_source: FrameSource::default(),
            window: Duration::from_secs(1),
            history_len: 30,
            low_fps_threshold: 55,
            base_memory_mb: 50.0,
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub fn with_frame_source(mut self, source: FrameSource) -> Self {
        self.frame_source = source;
        self
    }

    #[must_use]
    pub fn with_history_len(mut self, len: usize) -> Self {
        self.history_len = len.max(1);
        self
    }

    #[must_use]
    pub fn with_base_memory_mb(mut self, mb: f64) -> Self {
        self.base_memory_mb = mb;
        self
    }
}

/// Result of closing a sampling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStats {
    pub fps: u32,
    pub rolling_average: u32,
    pub low_frame_samples: u64,
}

/// The windowing algorithm, independent of threads and listeners.
#[derive(Debug, Clone)]
pub struct FrameCounter {
    window: Duration,
    history_len: usize,
    low_fps_threshold: u32,
    window_start: Option<Instant>,
    frames: u32,
    history: VecDeque<u32>,
    low_frame_samples: u64,
}

impl FrameCounter {
    #[must_use]
    pub fn new(window: Duration, history_len: usize, low_fps_threshold: u32) -> Self {
        let history_len = history_len.max(1);
        Self {
            window: if window.is_zero() {
                Duration::from_millis(1)
            } else {
                window
            },
            history_len,
            low_fps_threshold,
            window_start: None,
            frames: 0,
            history: VecDeque::with_capacity(history_len),
            low_frame_samples: 0,
        }
    }

    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.window, config.history_len, config.low_fps_threshold)
    }

    /// Open a fresh window at `now`, discarding any partial count.
    pub fn begin_window(&mut self, now: Instant) {
        self.window_start = Some(now);
        self.frames = 0;
    }

    /// Record one frame. Returns stats when this frame closes a window.
    ///
    /// The first frame after construction or [`reset`](Self::reset) only
    /// opens a window.
    pub fn on_frame(&mut self, now: Instant) -> Option<WindowStats> {
        let Some(start) = self.window_start else {
            self.begin_window(now);
            return None;
        };
        self.frames = self.frames.saturating_add(1);

        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.window {
            return None;
        }

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let fps = (f64::from(self.frames) * 1000.0 / elapsed_ms).round() as u32;
        if self.history.len() >= self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(fps);
        if fps < self.low_fps_threshold {
            self.low_frame_samples += 1;
        }
        self.begin_window(now);

        Some(WindowStats {
            fps,
            rolling_average: self.rolling_average(),
            low_frame_samples: self.low_frame_samples,
        })
    }

    /// Rounded mean of the retained history; zero when empty.
    #[must_use]
    pub fn rolling_average(&self) -> u32 {
        if self.history.is_empty() {
            return 0;
        }
        let sum: u64 = self.history.iter().map(|&f| u64::from(f)).sum();
        (sum as f64 / self.history.len() as f64).round() as u32
    }

    #[must_use]
    pub fn history(&self) -> &VecDeque<u32> {
        &self.history
    }

    #[must_use]
    pub fn low_frame_samples(&self) -> u64 {
        self.low_frame_samples
    }

    /// Clear history and counters. The next frame opens a new window.
    pub fn reset(&mut self) {
        self.window_start = None;
        self.frames = 0;
        self.history.clear();
        self.low_frame_samples = 0;
    }
}

type Listener = Arc<dyn Fn(&PerformanceSample) + Send + Sync>;

struct Shared {
    config: MonitorConfig,
    clock: SharedClock,
    gauge: Option<Arc<dyn LoadGauge>>,
    running: AtomicBool,
    counter: Mutex<FrameCounter>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener: AtomicU64,
    latest: Mutex<Option<PerformanceSample>>,
}

impl Shared {
    fn frame(&self) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        let now = self.clock.now();
        let Some(stats) = self.counter.lock().on_frame(now) else {
            return;
        };

        let active = self.gauge.as_ref().map_or(0, |g| g.active_animations());
        let sample = PerformanceSample {
            instantaneous_fps: stats.fps,
            rolling_average_fps: stats.rolling_average,
            low_frame_sample_count: stats.low_frame_samples,
            estimated_memory_mb: self.config.base_memory_mb + 2.0 * active as f64,
            active_animation_count: active,
            timestamp: now,
        };
        *self.latest.lock() = Some(sample);
        tracing::trace!(
            fps = sample.instantaneous_fps,
            rolling = sample.rolling_average_fps,
            drops = sample.low_frame_sample_count,
            active = sample.active_animation_count,
            "fps sample"
        );

        // Snapshot so listeners may (un)subscribe while being notified.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&sample);
        }
    }
}

/// Frame-rate monitor with subscriber fan-out.
pub struct FpsMonitor {
    shared: Arc<Shared>,
    pacer: Mutex<Option<Pacer>>,
}

impl fmt::Debug for FpsMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FpsMonitor")
            .field("running", &self.is_running())
            .field("frame_source", &self.shared.config.frame_source)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Default for FpsMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default(), SystemClock::shared(), None)
    }
}

impl FpsMonitor {
    #[must_use]
    pub fn new(
        config: MonitorConfig,
        clock: SharedClock,
        gauge: Option<Arc<dyn LoadGauge>>,
    ) -> Self {
        let counter = FrameCounter::from_config(&config);
        Self {
            shared: Arc::new(Shared {
                config,
                clock,
                gauge,
                running: AtomicBool::new(false),
                counter: Mutex::new(counter),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                latest: Mutex::new(None),
            }),
            pacer: Mutex::new(None),
        }
    }

    /// Begin sampling. Calling while already running is a no-op.
    pub fn start(&self) {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.counter.lock().begin_window(self.shared.clock.now());

        if let FrameSource::Paced(interval) = self.shared.config.frame_source {
            let shared = Arc::clone(&self.shared);
            let pacer = Pacer::spawn("fps-monitor", interval, move || shared.frame());
            *self.pacer.lock() = Some(pacer);
        }
        tracing::debug!(source = ?self.shared.config.frame_source, "fps monitor started");
    }

    /// Stop sampling and wait for the frame loop to exit. Idempotent.
    pub fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let pacer = self.pacer.lock().take();
        if let Some(pacer) = pacer {
            pacer.stop();
        }
        tracing::debug!("fps monitor stopped");
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Report one rendered frame. Ignored while stopped.
    pub fn record_frame(&self) {
        self.shared.frame();
    }

    /// Register a listener for completed windows.
    ///
    /// The returned guard unsubscribes exactly this registration when
    /// dropped or when [`MetricsSubscription::unsubscribe`] is called.
    pub fn on_metrics_update(
        &self,
        listener: impl Fn(&PerformanceSample) + Send + Sync + 'static,
    ) -> MetricsSubscription {
        let id = self.shared.next_listener.fetch_add(1, Ordering::Relaxed);
        self.shared.listeners.lock().push((id, Arc::new(listener)));
        MetricsSubscription {
            shared: Arc::downgrade(&self.shared),
            id,
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.shared.listeners.lock().len()
    }

    /// Clear rolling history and counters without stopping.
    pub fn reset(&self) {
        let mut counter = self.shared.counter.lock();
        counter.reset();
        if self.is_running() {
            counter.begin_window(self.shared.clock.now());
        }
        *self.shared.latest.lock() = None;
    }

    /// Retained FPS history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<u32> {
        self.shared.counter.lock().history().iter().copied().collect()
    }

    /// Most recently published sample.
    #[must_use]
    pub fn latest(&self) -> Option<PerformanceSample> {
        *self.shared.latest.lock()
    }

    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }
}

impl Drop for FpsMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Guard for one metrics listener.
#[must_use = "dropping the subscription removes the listener"]
pub struct MetricsSubscription {
    shared: Weak<Shared>,
    id: u64,
}

impl fmt::Debug for MetricsSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsSubscription").field("id", &self.id).finish()
    }
}

impl MetricsSubscription {
    /// Remove the listener now.
    pub fn unsubscribe(self) {}
}

impl Drop for MetricsSubscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}
