//! driftwatch - model drift monitoring core
//!
//! Watches a deployed prediction service over time: streams a dataset in
//! fixed-size batches, sends each batch to the model endpoint, tests the
//! incoming feature distributions and predictive performance against a
//! frozen reference baseline, and records every outcome in append-only
//! evidence logs with a read-only status dashboard.
//!
//! # Modules
//!
//! - [`stream`] - Batch iteration over the monitored dataset
//! - [`client`] - HTTP client for the deployed prediction endpoint
//! - [`profile`] - Frozen reference baseline (feature stats + metrics)
//! - [`drift`] - Feature and concept drift detection
//! - [`alert`] - Append-only JSONL evidence logs
//! - [`dashboard`] - Read-only HTTP status surface
//! - [`monitor`] - Per-batch orchestration loop
//! - [`config`] - Session configuration
//! - [`cli`] - Command-line interface

pub mod error;

pub mod alert;
pub mod cli;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod drift;
pub mod monitor;
pub mod profile;
pub mod stream;

pub use error::{DriftwatchError, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::alert::{AlertLog, MonitorEvent, RemediationEvent};
    pub use crate::client::{ModelClient, Predictor};
    pub use crate::config::MonitorConfig;
    pub use crate::drift::{DriftDetector, DriftReport};
    pub use crate::error::{DriftwatchError, Result};
    pub use crate::monitor::{MonitorLoop, MonitorSummary};
    pub use crate::profile::{FeatureStat, ReferenceProfile};
    pub use crate::stream::{Batch, BatchStream};
}
