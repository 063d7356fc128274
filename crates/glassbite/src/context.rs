#![forbid(unsafe_code)]

//! Application wiring: one session, one performance pipeline, one catalog.
//!
//! [`AppContext`] is what a shell builds at startup and tears down on exit.
//! It owns the paired start/stop of the performance pipeline so screens
//! never have to.
//!
//! # Lifecycle
//!
//! ```text
//! bootstrap ──▶ start ──▶ (screens run) ──▶ shutdown
//!                 ▲                            │
//!                 └────────── reset ◀──────────┘
//! ```

use std::sync::Arc;

use glassbite_mock::{DataProvider, MockDataProvider};
use glassbite_perf::{
    DeviceFactsProvider, MonitorConfig, OptimizerConfig, PerformanceOptimizer, SystemClock,
};
use glassbite_state::Session;

use crate::Result;

/// Everything a running app shares.
pub struct AppContext {
    pub session: Session,
    pub catalog: MockDataProvider,
    perf: Arc<PerformanceOptimizer>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("perf", &self.perf)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Load the embedded catalog, seed the signed-in user and their order
    /// history, and build the performance pipeline for `device`.
    pub fn bootstrap(device: Arc<dyn DeviceFactsProvider>) -> Result<Self> {
        let catalog = MockDataProvider::embedded()?;
        let perf = PerformanceOptimizer::for_device(
            device,
            MonitorConfig::default(),
            OptimizerConfig::default(),
            SystemClock::shared(),
        );
        Ok(Self::from_parts(Session::new(), catalog, Arc::new(perf)))
    }

    /// Assemble from prebuilt parts and seed the session from `catalog`.
    #[must_use]
    pub fn from_parts(
        session: Session,
        catalog: MockDataProvider,
        perf: Arc<PerformanceOptimizer>,
    ) -> Self {
        let ctx = Self {
            session,
            catalog,
            perf,
        };
        ctx.seed_session();
        ctx
    }

    fn seed_session(&self) {
        if let Some(user) = self.catalog.user() {
            self.session.orders.load_history(self.catalog.orders_for_user(&user.id));
            self.session.app.set_user(Some(user.clone()));
            self.session.user.set_user(user);
        }
        let caps = self.perf.capabilities();
        tracing::info!(
            class = caps.device_class().as_str(),
            max_animations = caps.max_concurrent_animations,
            "app context ready"
        );
    }

    #[must_use]
    pub fn perf(&self) -> &Arc<PerformanceOptimizer> {
        &self.perf
    }

    /// Start monitoring with auto-optimization.
    pub fn start(&self) {
        self.perf.start_monitoring();
        self.perf.enable_auto_optimization();
    }

    /// Stop everything [`start`](Self::start) started.
    pub fn shutdown(&self) {
        self.perf.disable_auto_optimization();
        self.perf.stop_monitoring();
        self.perf.registry().clear();
    }

    /// Back to a freshly bootstrapped state: stores re-seeded, animation
    /// table emptied, device profile re-detected, frame history cleared.
    pub fn reset(&self) {
        self.session.reset();
        self.perf.registry().clear();
        self.perf.detector().reset();
        self.perf.monitor().reset();
        self.seed_session();
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
