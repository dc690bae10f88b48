//! Metrics collection and export for emojilike.
//!
//! Thin wrapper over the `metrics` crate facade: metric names live in
//! [`arbiter`], histogram buckets in [`buckets`]. With the `prometheus`
//! feature, [`init_metrics`] installs a Prometheus recorder whose handle
//! renders the text exposition format.
//!
//! ```rust,ignore
//! use emojilike_metrics::{arbiter, counter};
//!
//! counter!(arbiter::ATTEMPTS_TOTAL, "variant" => "full").increment(1);
//! ```

mod definitions;
mod error;
mod recorder;

pub use {
    definitions::*,
    error::{Error, Result},
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
