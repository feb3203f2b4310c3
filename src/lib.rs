//! pin-forge: concurrent 4-digit PIN search against a single HTTP(S) endpoint.
//!
//! Intended for authorized security testing (CTF challenges, owned services)
//! of one credential-check endpoint.

pub mod cli;
pub mod config;
pub mod error;
pub mod search;

pub use config::{HttpMethod, SearchConfig, Target};
pub use error::{ConfigError, TransportError};
