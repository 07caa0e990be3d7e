//! Error types shared across the engine.

use thiserror::Error;

/// Rejected at the mutation boundary; the engine only ever reads values
/// that passed these checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("denominator must not be zero")]
    ZeroDenominator,

    #[error("quantity must not be negative")]
    NegativeQuantity,

    #[error("unparsable quantity: {0:?}")]
    UnparsableQuantity(String),

    #[error("drug name must not be empty")]
    EmptyName,
}

/// Data-access failures are fatal to the in-flight operation and are not
/// retried; retrying a misbehaving storage layer on a timer risks a crash
/// loop.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A dose-time window table that can never produce a sane schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{slot} window is inverted or out of range")]
    InvalidWindow { slot: &'static str },

    #[error("{first} and {second} windows overlap")]
    OverlappingWindows {
        first: &'static str,
        second: &'static str,
    },

    #[error("no dose-time window will ever become active")]
    NoUpcomingWindow,
}

/// Anything that can abort a scheduling cycle.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
