#![forbid(unsafe_code)]

//! Stand-ins for the services around the session core: a fixture-backed
//! catalog, canned chat replies, and a scripted location source.

pub mod chat;
pub mod data;
pub mod error;
pub mod location;

pub use chat::{CannedResponder, ChatResponder, FailurePolicy, ResponderConfig, converse};
pub use data::{DataProvider, MockDataProvider};
pub use error::{ChatError, FixtureError, LocationError};
pub use location::{EARTH_RADIUS_KM, FixedLocationProvider, LocationProvider, haversine_km, locate};
