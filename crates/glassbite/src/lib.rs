#![forbid(unsafe_code)]

//! glassbite public facade.
//!
//! Re-exports the session stores, the performance pipeline and the mock
//! services, and adds the pieces an app shell needs on top: a combined
//! [`Error`], tracing setup, and [`AppContext`] wiring.

pub mod context;
pub mod logging;

use thiserror::Error;

// --- State re-exports -------------------------------------------------------

pub use glassbite_state::{
    Address, AppAction, AppState, CartAction, CartLine, CartState, ChatMessage, ChatRole,
    Coordinates, Customizations, LineKey, Location, MenuItem, Money, Order, OrderAction,
    OrderState, OrderStatus, PaymentMethod, Reducer, Restaurant, Session, Store,
    StoreSubscription, Theme, TrackingSnapshot, User, UserAction, UserState,
};

// --- Performance re-exports -------------------------------------------------

pub use glassbite_perf::{
    AnimationConfig, AnimationRegistry, CapabilityDetector, CapabilityProfile, DeviceClass,
    DeviceFacts, DeviceFactsProvider, FpsMonitor, MetricsSubscription, MonitoringState,
    OptimizationEvent, PerformanceOptimizer, PerformanceSample, Platform, ScreenSize,
    StaticDeviceFacts,
};

// --- Service re-exports -----------------------------------------------------

pub use glassbite_mock::{
    CannedResponder, ChatResponder, DataProvider, FixedLocationProvider, LocationProvider,
    MockDataProvider, ResponderConfig,
};

pub use context::AppContext;
pub use logging::{LogConfig, LogFormat, init_tracing};

// --- Errors -----------------------------------------------------------------

/// Top-level error for glassbite apps.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fixture(#[from] glassbite_mock::FixtureError),
    #[error(transparent)]
    Chat(#[from] glassbite_mock::ChatError),
    #[error(transparent)]
    Location(#[from] glassbite_mock::LocationError),
    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Standard result type for glassbite APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude ----------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        AnimationConfig, AppContext, CartState, ChatResponder, DataProvider, Error,
        LocationProvider, Money, OrderStatus, PerformanceOptimizer, Reducer, Result, Session,
        Store, Theme,
    };

    pub use crate::{mock, perf, state};
}

pub use glassbite_mock as mock;
pub use glassbite_perf as perf;
pub use glassbite_state as state;
