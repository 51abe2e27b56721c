//! Metrics Adapter
//!
//! Prometheus registry fed from feed client snapshots. The text
//! exposition is served by the dashboard server on `/metrics`.

pub mod prometheus;

pub use prometheus::MetricsRegistry;
