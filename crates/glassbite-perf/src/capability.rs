#![forbid(unsafe_code)]

//! Device capability detection.
//!
//! Classifies the running device into a coarse tier used to scale animation
//! cost. Detection is heuristic: screen area and OS version are the only
//! signals, and both thresholds live in [`DetectorThresholds`] so callers
//! can tune them.
//!
//! # Predefined Profiles
//!
//! | Profile | Concurrent animations | Frame rate | Memory tier |
//! |---------|----------------------|------------|-------------|
//! | [`CapabilityProfile::low_end()`] | 3 | 30 Hz | low |
//! | [`CapabilityProfile::phone()`] | 5 | 60 Hz | medium |
//! | [`CapabilityProfile::tablet()`] | 6 | 60 Hz | high |
//!
//! # Invariants
//!
//! 1. **Memoized**: [`CapabilityDetector::capabilities`] computes once and
//!    returns the cached profile until [`CapabilityDetector::reset`].
//! 2. **Total**: detection never fails. Missing device facts produce the
//!    conservative low-end profile.
//! 3. **Positive budget**: `max_concurrent_animations` is always > 0.
//!
//! # Decision Rules
//!
//! ```text
//! IF facts unavailable                              THEN low-end
//! ELSE IF android AND os major < android_min_major  THEN low-end
//! ELSE IF physical pixel area < min_pixel_area      THEN low-end
//! ELSE IF shortest side >= tablet_min_side_dp       THEN tablet
//! ELSE                                              phone
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Ios,
    Android,
    Web,
    Other,
}

impl Platform {
    /// Platform name as reported in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Web => "web",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical screen size with its pixel density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSize {
    /// Width in density-independent points.
    pub width: f64,
    /// Height in density-independent points.
    pub height: f64,
    /// Physical pixels per point.
    pub pixel_ratio: f64,
}

impl ScreenSize {
    #[must_use]
    pub const fn new(width: f64, height: f64, pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    /// Area in physical pixels.
    #[must_use]
    pub fn physical_area(&self) -> f64 {
        self.width * self.height * self.pixel_ratio * self.pixel_ratio
    }

    /// Shorter of the two logical dimensions.
    #[must_use]
    pub fn shortest_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// Read-only platform facts consumed by the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceFacts {
    pub platform: Platform,
    /// Version string as reported by the OS, e.g. `"17.4"` or `"28"`.
    pub os_version: String,
    pub screen: ScreenSize,
}

impl DeviceFacts {
    /// Leading integer component of the OS version, if any.
    #[must_use]
    pub fn os_major(&self) -> Option<u32> {
        parse_major(&self.os_version)
    }
}

fn parse_major(version: &str) -> Option<u32> {
    let digits: String = version
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Source of [`DeviceFacts`].
///
/// Returns `None` when the platform cannot report its facts.
pub trait DeviceFactsProvider: Send + Sync {
    fn device_facts(&self) -> Option<DeviceFacts>;
}

/// Provider returning a fixed set of facts.
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceFacts {
    facts: Option<DeviceFacts>,
}

impl StaticDeviceFacts {
    #[must_use]
    pub fn new(facts: DeviceFacts) -> Self {
        Self { facts: Some(facts) }
    }

    /// A provider that reports nothing.
    #[must_use]
    pub fn unavailable() -> Self {
        Self { facts: None }
    }
}

impl DeviceFactsProvider for StaticDeviceFacts {
    fn device_facts(&self) -> Option<DeviceFacts> {
        self.facts.clone()
    }
}

/// Memory headroom tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryTier {
    Low,
    Medium,
    High,
}

/// Preferred animation frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameRate {
    Hz30,
    Hz60,
}

impl FrameRate {
    #[must_use]
    pub const fn hz(self) -> u32 {
        match self {
            Self::Hz30 => 30,
            Self::Hz60 => 60,
        }
    }
}

/// Coarse device classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    LowEnd,
    Phone,
    Tablet,
}

impl DeviceClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LowEnd => "low-end",
            Self::Phone => "phone",
            Self::Tablet => "tablet",
        }
    }
}

/// Derived rendering capabilities of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityProfile {
    class: DeviceClass,
    /// Whether the device should get the reduced animation budget.
    pub is_low_end: bool,
    /// Whether backdrop blur is affordable.
    pub supports_blur: bool,
    /// Maximum decorative animations allowed to run at once. Always > 0.
    pub max_concurrent_animations: usize,
    pub preferred_frame_rate: FrameRate,
    pub memory_tier: MemoryTier,
}

impl CapabilityProfile {
    /// Budget for devices classified as low-end.
    #[must_use]
    pub const fn low_end() -> Self {
        Self {
            class: DeviceClass::LowEnd,
            is_low_end: true,
            supports_blur: false,
            max_concurrent_animations: 3,
            preferred_frame_rate: FrameRate::Hz30,
            memory_tier: MemoryTier::Low,
        }
    }

    /// Budget for an ordinary phone.
    #[must_use]
    pub const fn phone() -> Self {
        Self {
            class: DeviceClass::Phone,
            is_low_end: false,
            supports_blur: true,
            max_concurrent_animations: 5,
            preferred_frame_rate: FrameRate::Hz60,
            memory_tier: MemoryTier::Medium,
        }
    }

    /// Budget for tablet-class screens.
    #[must_use]
    pub const fn tablet() -> Self {
        Self {
            class: DeviceClass::Tablet,
            is_low_end: false,
            supports_blur: true,
            max_concurrent_animations: 6,
            preferred_frame_rate: FrameRate::Hz60,
            memory_tier: MemoryTier::High,
        }
    }

    /// Profile used when platform facts are unavailable.
    #[must_use]
    pub const fn conservative() -> Self {
        Self::low_end()
    }

    #[must_use]
    pub const fn from_class(class: DeviceClass) -> Self {
        match class {
            DeviceClass::LowEnd => Self::low_end(),
            DeviceClass::Phone => Self::phone(),
            DeviceClass::Tablet => Self::tablet(),
        }
    }

    #[must_use]
    pub const fn device_class(&self) -> DeviceClass {
        self.class
    }
}

impl Default for CapabilityProfile {
    fn default() -> Self {
        Self::conservative()
    }
}

/// Tunable classification thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorThresholds {
    /// Devices with fewer physical pixels than this are low-end.
    pub min_pixel_area: f64,
    /// Android releases below this major version are low-end.
    pub android_min_major: u32,
    /// Shortest logical side at or above which a device counts as a tablet.
    pub tablet_min_side_dp: f64,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            min_pixel_area: 800_000.0,
            android_min_major: 9,
            tablet_min_side_dp: 600.0,
        }
    }
}

impl DetectorThresholds {
    /// Low-end heuristic over raw facts.
    ///
    /// True when the platform is Android on an old release, or when the
    /// screen is small in physical pixels. An unparsable Android version is
    /// treated as old.
    #[must_use]
    pub fn is_low_end_heuristic(
        &self,
        screen: ScreenSize,
        platform: Platform,
        os_version: &str,
    ) -> bool {
        let old_android = platform == Platform::Android
            && parse_major(os_version).is_none_or(|major| major < self.android_min_major);
        old_android || screen.physical_area() < self.min_pixel_area
    }

    /// Classify a device.
    #[must_use]
    pub fn classify(&self, facts: &DeviceFacts) -> DeviceClass {
        if self.is_low_end_heuristic(facts.screen, facts.platform, &facts.os_version) {
            DeviceClass::LowEnd
        } else if facts.screen.shortest_side() >= self.tablet_min_side_dp {
            DeviceClass::Tablet
        } else {
            DeviceClass::Phone
        }
    }
}

/// Memoizing capability detector.
///
/// One instance is shared by the optimizer and anything else that needs the
/// device tier. Construct a fresh one per test, or call [`reset`](Self::reset).
pub struct CapabilityDetector {
    provider: Arc<dyn DeviceFactsProvider>,
    thresholds: DetectorThresholds,
    pinned: Option<CapabilityProfile>,
    cached: Mutex<Option<CapabilityProfile>>,
}

impl fmt::Debug for CapabilityDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityDetector")
            .field("thresholds", &self.thresholds)
            .field("cached", &*self.cached.lock())
            .finish_non_exhaustive()
    }
}

impl CapabilityDetector {
    #[must_use]
    pub fn new(provider: Arc<dyn DeviceFactsProvider>) -> Self {
        Self::with_thresholds(provider, DetectorThresholds::default())
    }

    #[must_use]
    pub fn with_thresholds(
        provider: Arc<dyn DeviceFactsProvider>,
        thresholds: DetectorThresholds,
    ) -> Self {
        Self {
            provider,
            thresholds,
            pinned: None,
            cached: Mutex::new(None),
        }
    }

    /// Detector that always reports `profile`, bypassing heuristics.
    /// The profile survives [`reset`](Self::reset).
    #[must_use]
    pub fn fixed(profile: CapabilityProfile) -> Self {
        let mut detector = Self::new(Arc::new(StaticDeviceFacts::unavailable()));
        detector.pinned = Some(profile);
        detector
    }

    /// The device's capability profile, computed on first call.
    pub fn capabilities(&self) -> CapabilityProfile {
        let mut cached = self.cached.lock();
        if let Some(profile) = *cached {
            return profile;
        }
        let profile = self.detect();
        *cached = Some(profile);
        profile
    }

    /// Drop the memoized profile so the next call re-detects.
    pub fn reset(&self) {
        *self.cached.lock() = None;
        tracing::debug!("capability profile reset");
    }

    /// Whether a profile has been computed and cached.
    pub fn is_cached(&self) -> bool {
        self.cached.lock().is_some()
    }

    #[must_use]
    pub fn thresholds(&self) -> &DetectorThresholds {
        &self.thresholds
    }

    fn detect(&self) -> CapabilityProfile {
        if let Some(profile) = self.pinned {
            return profile;
        }
        let Some(facts) = self.provider.device_facts() else {
            tracing::warn!("device facts unavailable, assuming low-end profile");
            return CapabilityProfile::conservative();
        };
        let class = self.thresholds.classify(&facts);
        tracing::debug!(
            platform = %facts.platform,
            os_version = %facts.os_version,
            pixel_area = facts.screen.physical_area(),
            class = class.as_str(),
            "device capabilities detected"
        );
        CapabilityProfile::from_class(class)
    }
}
