#![forbid(unsafe_code)]

//! Performance layer: device capability tiers, frame-rate sampling, the
//! animation registry, and the optimizer that budgets animations from them.

pub mod animation_registry;
pub mod capability;
pub mod clock;
pub mod fps_monitor;
pub mod optimizer;
pub mod pacer;

pub use animation_registry::{AnimationHandle, AnimationRegistry, CancelFn, DEFAULT_STALE_AFTER};
pub use capability::{
    CapabilityDetector, CapabilityProfile, DetectorThresholds, DeviceClass, DeviceFacts,
    DeviceFactsProvider, FrameRate, MemoryTier, Platform, ScreenSize, StaticDeviceFacts,
};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use fps_monitor::{
    FpsMonitor, FrameCounter, FrameSource, LoadGauge, MetricsSubscription, MonitorConfig,
    PerformanceSample, WindowStats,
};
pub use optimizer::{
    AnimationConfig, MonitoringState, OptimizationEvent, OptimizerConfig, PerformanceOptimizer,
};
pub use pacer::{Pacer, StopSignal};
