#![forbid(unsafe_code)]

//! Adaptive animation budgeting.
//!
//! [`PerformanceOptimizer`] ties the capability profile, the FPS monitor and
//! the animation registry together. Screens ask it two questions before
//! starting decorative motion: "should I skip this?" and "what spring
//! parameters should I use?".
//!
//! # Monitoring lifecycle
//!
//! ```text
//!            start_monitoring()
//!   ┌──────┐ ─────────────────▶ ┌────────────┐
//!   │ Idle │                    │ Monitoring │
//!   └──────┘ ◀───────────────── └────────────┘
//!            stop_monitoring()
//! ```
//!
//! Entering `Monitoring` starts the FPS monitor and arms a periodic registry
//! sweep; leaving it stops both. Repeating a transition is a no-op.
//!
//! # Auto-optimization
//!
//! While enabled, every sample is checked against two rules:
//!
//! | Condition | Reaction |
//! |-----------|----------|
//! | rolling FPS < 45 and active animations > 3 | [`OptimizationEvent::Degraded`] |
//! | estimated memory > 200 MB | 15 s sweep, then [`OptimizationEvent::MemoryPressure`] |
//!
//! Events go to hooks registered with [`PerformanceOptimizer::add_hook`] and
//! are logged at `warn`.
//!
//! Each reaction runs while holding the subscription's gate, and
//! [`PerformanceOptimizer::disable_auto_optimization`] closes the gate under
//! the same lock. Once `disable` returns, no sweep or hook from that
//! subscription runs again. The gate is reentrant so a hook may disable
//! auto-optimization from inside a reaction; the rest of that reaction is
//! then skipped.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};

use crate::animation_registry::{AnimationRegistry, CancelFn, DEFAULT_STALE_AFTER};
use crate::capability::{CapabilityDetector, CapabilityProfile, DeviceFactsProvider};
use crate::clock::SharedClock;
use crate::fps_monitor::{
    FpsMonitor, LoadGauge, MetricsSubscription, MonitorConfig, PerformanceSample,
};
use crate::pacer::Pacer;

/// Spring animation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationConfig {
    pub duration_ms: f64,
    pub damping: f64,
    pub stiffness: f64,
}

impl AnimationConfig {
    #[must_use]
    pub const fn new(duration_ms: f64, damping: f64, stiffness: f64) -> Self {
        Self {
            duration_ms,
            damping,
            stiffness,
        }
    }

    /// Cheaper variant for low-end devices: shorter, more damped, softer.
    #[must_use]
    pub fn reduced(self) -> Self {
        Self {
            duration_ms: (self.duration_ms * 0.7).min(200.0),
            damping: (self.damping * 1.5).max(20.0),
            stiffness: (self.stiffness * 0.8).min(150.0),
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self::new(300.0, 15.0, 200.0)
    }
}

/// Monitoring lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringState {
    Idle,
    Monitoring,
}

/// Signal published by auto-optimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizationEvent {
    /// Frame rate is low while many animations run.
    Degraded {
        rolling_average_fps: u32,
        active_animations: usize,
    },
    /// Estimated memory crossed the pressure line; an aggressive sweep ran.
    MemoryPressure {
        estimated_memory_mb: f64,
        swept: usize,
    },
}

/// Optimizer thresholds and timings.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Period of the registry sweep while monitoring.
    pub sweep_interval: Duration,
    /// Age limit for the periodic sweep.
    pub stale_after: Duration,
    /// Age limit for the memory-pressure sweep.
    pub aggressive_stale_after: Duration,
    /// Rolling FPS strictly below this may trigger degradation.
    pub degrade_below_fps: u32,
    /// Active animations strictly above this may trigger degradation.
    pub degrade_above_animations: usize,
    /// Estimated memory strictly above this triggers an aggressive sweep.
    pub memory_pressure_mb: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
            stale_after: DEFAULT_STALE_AFTER,
            aggressive_stale_after: Duration::from_secs(15),
            degrade_below_fps: 45,
            degrade_above_animations: 3,
            memory_pressure_mb: 200.0,
        }
    }
}

impl OptimizerConfig {
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    #[must_use]
    pub fn with_memory_pressure_mb(mut self, mb: f64) -> Self {
        self.memory_pressure_mb = mb;
        self
    }
}

type Hook = Arc<dyn Fn(&OptimizationEvent) + Send + Sync>;
type Hooks = Arc<Mutex<Vec<(u64, Hook)>>>;

/// Open while the subscription may react. Held for the whole reaction.
type Gate = Arc<ReentrantMutex<Cell<bool>>>;

struct AutoOptimization {
    gate: Gate,
    _subscription: MetricsSubscription,
}

/// Coordinates monitoring, sweeping and animation budgeting.
pub struct PerformanceOptimizer {
    config: OptimizerConfig,
    detector: Arc<CapabilityDetector>,
    monitor: Arc<FpsMonitor>,
    registry: Arc<AnimationRegistry>,
    state: Mutex<MonitoringState>,
    sweeper: Mutex<Option<Pacer>>,
    auto: Mutex<Option<AutoOptimization>>,
    hooks: Hooks,
    next_hook: AtomicU64,
}

impl fmt::Debug for PerformanceOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceOptimizer")
            .field("state", &self.state())
            .field("auto_optimization", &self.is_auto_optimizing())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PerformanceOptimizer {
    #[must_use]
    pub fn new(
        config: OptimizerConfig,
        detector: Arc<CapabilityDetector>,
        monitor: Arc<FpsMonitor>,
        registry: Arc<AnimationRegistry>,
    ) -> Self {
        Self {
            config,
            detector,
            monitor,
            registry,
            state: Mutex::new(MonitoringState::Idle),
            sweeper: Mutex::new(None),
            auto: Mutex::new(None),
            hooks: Arc::new(Mutex::new(Vec::new())),
            next_hook: AtomicU64::new(0),
        }
    }

    /// Wire a complete pipeline for a device: detector, registry, and a
    /// monitor that reads the registry's load.
    #[must_use]
    pub fn for_device(
        provider: Arc<dyn DeviceFactsProvider>,
        monitor_config: MonitorConfig,
        config: OptimizerConfig,
        clock: SharedClock,
    ) -> Self {
        let registry = Arc::new(AnimationRegistry::new(Arc::clone(&clock)));
        let gauge: Arc<dyn LoadGauge> = registry.clone();
        let monitor = Arc::new(FpsMonitor::new(monitor_config, clock, Some(gauge)));
        let detector = Arc::new(CapabilityDetector::new(provider));
        Self::new(config, detector, monitor, registry)
    }

    #[must_use]
    pub fn state(&self) -> MonitoringState {
        *self.state.lock()
    }

    /// Start the FPS monitor and arm the periodic sweep.
    pub fn start_monitoring(&self) {
        let mut state = self.state.lock();
        if *state == MonitoringState::Monitoring {
            return;
        }
        self.monitor.start();

        let registry = Arc::clone(&self.registry);
        let max_age = self.config.stale_after;
        let sweeper = Pacer::spawn("registry-sweep", self.config.sweep_interval, move || {
            registry.sweep_stale(max_age);
        });
        *self.sweeper.lock() = Some(sweeper);
        *state = MonitoringState::Monitoring;
        tracing::info!(
            sweep_interval_ms = self.config.sweep_interval.as_millis() as u64,
            "performance monitoring started"
        );
    }

    /// Stop the FPS monitor and disarm the sweep.
    pub fn stop_monitoring(&self) {
        let mut state = self.state.lock();
        if *state == MonitoringState::Idle {
            return;
        }
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop();
        }
        self.monitor.stop();
        *state = MonitoringState::Idle;
        tracing::info!("performance monitoring stopped");
    }

    /// React to monitor samples. Enabling twice is a no-op.
    pub fn enable_auto_optimization(&self) {
        let mut auto = self.auto.lock();
        if auto.is_some() {
            return;
        }

        let gate: Gate = Arc::new(ReentrantMutex::new(Cell::new(true)));
        let listener_gate = Arc::clone(&gate);
        let registry = Arc::clone(&self.registry);
        let hooks = Arc::clone(&self.hooks);
        let config = self.config.clone();
        let subscription = self.monitor.on_metrics_update(move |sample| {
            let open = listener_gate.lock();
            react_to_sample(&config, &registry, &hooks, sample, &open);
        });

        *auto = Some(AutoOptimization {
            gate,
            _subscription: subscription,
        });
        tracing::debug!("auto-optimization enabled");
    }

    /// Remove the monitor subscription. No-op when not enabled.
    ///
    /// Waits for a reaction in flight on another thread to finish, so no
    /// auto-optimization side effect happens after this returns.
    pub fn disable_auto_optimization(&self) {
        let taken = self.auto.lock().take();
        if let Some(auto) = taken {
            auto.gate.lock().set(false);
            drop(auto);
            tracing::debug!("auto-optimization disabled");
        }
    }

    #[must_use]
    pub fn is_auto_optimizing(&self) -> bool {
        self.auto.lock().is_some()
    }

    /// Register a hook for optimization events. Returns an id for
    /// [`remove_hook`](Self::remove_hook).
    pub fn add_hook(&self, hook: impl Fn(&OptimizationEvent) + Send + Sync + 'static) -> u64 {
        let id = self.next_hook.fetch_add(1, Ordering::Relaxed);
        self.hooks.lock().push((id, Arc::new(hook)));
        id
    }

    pub fn remove_hook(&self, id: u64) -> bool {
        let mut hooks = self.hooks.lock();
        let before = hooks.len();
        hooks.retain(|(hid, _)| *hid != id);
        hooks.len() != before
    }

    /// Animation parameters adjusted for the device tier.
    ///
    /// Low-end devices get [`AnimationConfig::reduced`]; others get `base`
    /// unchanged.
    #[must_use]
    pub fn optimized_animation_config(&self, base: AnimationConfig) -> AnimationConfig {
        if self.detector.capabilities().is_low_end {
            base.reduced()
        } else {
            base
        }
    }

    /// Whether the concurrent animation budget is already spent.
    #[must_use]
    pub fn should_skip_animation(&self) -> bool {
        self.registry.active_count() >= self.detector.capabilities().max_concurrent_animations
    }

    /// Register an animation unless the budget is spent.
    ///
    /// Returns whether the animation was registered.
    pub fn try_begin_animation(
        &self,
        id: impl Into<String>,
        kind: impl Into<String>,
        on_cancel: Option<CancelFn>,
    ) -> bool {
        if self.should_skip_animation() {
            let id = id.into();
            tracing::debug!(%id, "animation skipped, budget exhausted");
            return false;
        }
        self.registry.register(id, kind, on_cancel);
        true
    }

    #[must_use]
    pub fn capabilities(&self) -> CapabilityProfile {
        self.detector.capabilities()
    }

    #[must_use]
    pub fn monitor(&self) -> &Arc<FpsMonitor> {
        &self.monitor
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<AnimationRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn detector(&self) -> &Arc<CapabilityDetector> {
        &self.detector
    }

    #[must_use]
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

impl Drop for PerformanceOptimizer {
    fn drop(&mut self) {
        self.disable_auto_optimization();
        self.stop_monitoring();
    }
}

/// Apply the auto-optimization rules to one sample. `open` is rechecked
/// before every side effect since a hook may close it mid-reaction.
fn react_to_sample(
    config: &OptimizerConfig,
    registry: &AnimationRegistry,
    hooks: &Hooks,
    sample: &PerformanceSample,
    open: &Cell<bool>,
) {
    if !open.get() {
        return;
    }
    let mut events = Vec::with_capacity(2);

    if sample.rolling_average_fps < config.degrade_below_fps
        && sample.active_animation_count > config.degrade_above_animations
    {
        tracing::warn!(
            rolling_fps = sample.rolling_average_fps,
            active = sample.active_animation_count,
            "frame rate degraded under animation load"
        );
        events.push(OptimizationEvent::Degraded {
            rolling_average_fps: sample.rolling_average_fps,
            active_animations: sample.active_animation_count,
        });
    }

    if sample.estimated_memory_mb > config.memory_pressure_mb {
        let swept = registry.sweep_stale(config.aggressive_stale_after);
        tracing::warn!(
            estimated_mb = sample.estimated_memory_mb,
            swept,
            "memory pressure, aggressive sweep"
        );
        events.push(OptimizationEvent::MemoryPressure {
            estimated_memory_mb: sample.estimated_memory_mb,
            swept,
        });
    }

    if events.is_empty() {
        return;
    }
    let hooks: Vec<Hook> = hooks.lock().iter().map(|(_, h)| Arc::clone(h)).collect();
    for event in &events {
        for hook in &hooks {
            if !open.get() {
                return;
            }
            hook(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::StaticDeviceFacts;
    use crate::clock::ManualClock;
    use crate::fps_monitor::FrameSource;

    fn optimizer(profile: CapabilityProfile, clock: &ManualClock) -> PerformanceOptimizer {
        let registry = Arc::new(AnimationRegistry::new(clock.shared()));
        let gauge: Arc<dyn LoadGauge> = registry.clone();
        let monitor = Arc::new(FpsMonitor::new(
            MonitorConfig::default().with_frame_source(FrameSource::External),
            clock.shared(),
            Some(gauge),
        ));
        PerformanceOptimizer::new(
            OptimizerConfig::default(),
            Arc::new(CapabilityDetector::fixed(profile)),
            monitor,
            registry,
        )
    }

    #[test]
    fn reduced_config_on_low_end() {
        let clock = ManualClock::new();
        let opt = optimizer(CapabilityProfile::low_end(), &clock);
        let tuned = opt.optimized_animation_config(AnimationConfig::new(300.0, 15.0, 200.0));
        assert!(tuned.duration_ms <= 200.0);
        assert!(tuned.damping >= 20.0);
        assert!(tuned.stiffness <= 150.0);
    }

    #[test]
    fn unchanged_config_elsewhere() {
        let clock = ManualClock::new();
        let base = AnimationConfig::new(300.0, 15.0, 200.0);
        for profile in [CapabilityProfile::phone(), CapabilityProfile::tablet()] {
            let opt = optimizer(profile, &clock);
            assert_eq!(opt.optimized_animation_config(base), base);
        }
    }

    #[test]
    fn reduced_formulas() {
        let r = AnimationConfig::new(200.0, 10.0, 100.0).reduced();
        assert!((r.duration_ms - 140.0).abs() < 1e-9);
        assert!((r.damping - 20.0).abs() < 1e-9);
        assert!((r.stiffness - 80.0).abs() < 1e-9);
    }

    #[test]
    fn skip_at_budget_boundary() {
        let clock = ManualClock::new();
        let opt = optimizer(CapabilityProfile::phone(), &clock);
        let max = opt.capabilities().max_concurrent_animations;
        for i in 0..max - 1 {
            opt.registry().register(format!("a{i}"), "fade", None);
        }
        assert!(!opt.should_skip_animation());
        opt.registry().register("last", "fade", None);
        assert!(opt.should_skip_animation());
        assert!(!opt.try_begin_animation("extra", "fade", None));
        assert_eq!(opt.registry().active_count(), max);
    }

    #[test]
    fn monitoring_transitions_are_idempotent() {
        let clock = ManualClock::new();
        let opt = optimizer(CapabilityProfile::phone(), &clock);
        assert_eq!(opt.state(), MonitoringState::Idle);
        opt.stop_monitoring();
        opt.start_monitoring();
        opt.start_monitoring();
        assert_eq!(opt.state(), MonitoringState::Monitoring);
        assert!(opt.monitor().is_running());
        opt.stop_monitoring();
        opt.stop_monitoring();
        assert_eq!(opt.state(), MonitoringState::Idle);
        assert!(!opt.monitor().is_running());
    }

    #[test]
    fn auto_optimization_subscribes_once() {
        let clock = ManualClock::new();
        let opt = optimizer(CapabilityProfile::phone(), &clock);
        opt.disable_auto_optimization();
        opt.enable_auto_optimization();
        opt.enable_auto_optimization();
        assert_eq!(opt.monitor().listener_count(), 1);
        opt.disable_auto_optimization();
        assert_eq!(opt.monitor().listener_count(), 0);
        assert!(!opt.is_auto_optimizing());
    }

    #[test]
    fn degradation_requires_low_fps_and_load() {
        let config = OptimizerConfig::default();
        let registry = AnimationRegistry::default();
        let hooks: Hooks = Arc::new(Mutex::new(Vec::new()));
        let open = Cell::new(true);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        hooks.lock().push((0, Arc::new(move |e: &OptimizationEvent| sink.lock().push(*e))));

        let clock = ManualClock::new();
        let base = PerformanceSample {
            instantaneous_fps: 30,
            rolling_average_fps: 30,
            low_frame_sample_count: 1,
            estimated_memory_mb: 60.0,
            active_animation_count: 3,
            timestamp: crate::clock::Clock::now(&clock),
        };
        react_to_sample(&config, &registry, &hooks, &base, &open);
        assert!(seen.lock().is_empty(), "three animations is not enough");

        let loaded = PerformanceSample {
            active_animation_count: 4,
            ..base
        };
        react_to_sample(&config, &registry, &hooks, &loaded, &open);
        assert_eq!(
            *seen.lock(),
            vec![OptimizationEvent::Degraded {
                rolling_average_fps: 30,
                active_animations: 4
            }]
        );

        let smooth = PerformanceSample {
            rolling_average_fps: 58,
            ..loaded
        };
        react_to_sample(&config, &registry, &hooks, &smooth, &open);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn memory_pressure_sweeps_aggressively() {
        let clock = ManualClock::new();
        let opt = optimizer(CapabilityProfile::tablet(), &clock);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        opt.add_hook(move |e| sink.lock().push(*e));

        opt.registry().register("old", "pulse", None);
        clock.advance(Duration::from_secs(20));
        opt.registry().register("new", "pulse", None);

        let sample = PerformanceSample {
            instantaneous_fps: 60,
            rolling_average_fps: 60,
            low_frame_sample_count: 0,
            estimated_memory_mb: 250.0,
            active_animation_count: 2,
            timestamp: crate::clock::Clock::now(&clock),
        };
        let open = Cell::new(true);
        react_to_sample(&opt.config, &opt.registry, &opt.hooks, &sample, &open);

        assert_eq!(opt.registry().active_ids(), vec!["new".to_string()]);
        assert!(matches!(
            events.lock().as_slice(),
            [OptimizationEvent::MemoryPressure { swept: 1, .. }]
        ));
    }

    #[test]
    fn hooks_can_be_removed() {
        let clock = ManualClock::new();
        let opt = optimizer(CapabilityProfile::phone(), &clock);
        let id = opt.add_hook(|_| {});
        assert!(opt.remove_hook(id));
        assert!(!opt.remove_hook(id));
    }

    #[test]
    fn for_device_wires_registry_into_monitor() {
        let clock = ManualClock::new();
        let opt = PerformanceOptimizer::for_device(
            Arc::new(StaticDeviceFacts::unavailable()),
            MonitorConfig::default().with_frame_source(FrameSource::External),
            OptimizerConfig::default(),
            clock.shared(),
        );
        assert!(opt.capabilities().is_low_end);

        let samples = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&samples);
        let _sub = opt.monitor().on_metrics_update(move |s| sink.lock().push(*s));
        opt.registry().register("a", "fade", None);
        opt.start_monitoring();
        clock.advance(Duration::from_secs(1));
        opt.monitor().record_frame();
        opt.stop_monitoring();

        assert_eq!(samples.lock()[0].active_animation_count, 1);
    }
}
