//! HTTP server for geofenced attendance.
//!
//! Exposes the admission engine from `geo_presence` over axum, with
//! configuration, structured logging and Prometheus metrics.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
