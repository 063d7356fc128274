#![forbid(unsafe_code)]

//! Collaborator failures.

use thiserror::Error;

/// Fixture loading or validation failure.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("fixture is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("menu item {item} points at unknown restaurant {restaurant}")]
    UnknownRestaurant { item: String, restaurant: String },
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: String },
}

/// Canned chat failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("simulated network failure: {0}")]
    Network(String),
}

/// Location lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    Unavailable(String),
}
