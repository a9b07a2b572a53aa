//! fleetcheck-core — shared types and configuration for fleetcheck.
//!
//! Holds the discovery [`Announcement`] record, the [`Severity`] scale used
//! by every check result, and the validated [`CheckConfig`] that the
//! command-line layer hands to the health engine.
//!
//! # Severity order
//!
//! ```text
//! Ok < Unknown < Warn < Crit
//! ```
//!
//! The worst severity of a run is the maximum under this order, so the
//! result never depends on the order in which outcomes arrive.

pub mod config;
pub mod error;
pub mod types;

pub use config::{CheckConfig, Header, Settings, Thresholds, append_headers, parse_headers};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
