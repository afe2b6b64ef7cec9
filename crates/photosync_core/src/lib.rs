//! Core domain library for photosync (config, models, reconciliation).

/// Configuration loading and defaults.
pub mod config;
/// Shared constants (ports, timings, wire names).
pub mod constants;
/// Domain and validation error types.
pub mod error;
/// Edit parameters, folder snapshots, jobs and wire bodies.
pub mod models;
/// Scan-to-gallery reconciliation.
pub mod reconcile;

pub use config::Config;
pub use constants::*;
pub use error::AppError;
pub use reconcile::{reconcile, ReconcileCause, Reconciliation};
