//! Error types for pin-forge.
//!
//! Only [`ConfigError`] is allowed to abort a run, and it is raised before any
//! worker exists. Per-request [`TransportError`]s are absorbed by the attempt
//! executor and turned into outcome values; [`PoolError`] covers misuse of the
//! worker pool lifecycle.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while validating a search configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Thread count must be at least 1, got {0}")]
    InvalidThreadCount(usize),

    #[error("Invalid target URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported URL scheme '{0}': must be 'http' or 'https'")]
    UnsupportedScheme(String),

    #[error("Port must be in 1..=65535, got {0}")]
    InvalidPort(u16),

    #[error("Host must not be empty")]
    EmptyHost,

    #[error("PIN parameter name must not be empty")]
    EmptyParam,

    #[error("Timeout must be greater than zero, got {0:?}")]
    InvalidTimeout(Duration),

    #[error("Jitter must be within [0, 1], got {0}")]
    InvalidJitter(f64),

    #[error("Invalid proxy URL '{0}'")]
    InvalidProxy(String),

    #[error("Unsupported HTTP method '{0}': must be GET or POST")]
    UnsupportedMethod(String),
}

/// Errors from a single HTTP exchange. Every variant is transient.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
}
