//! Adapters Layer - External System Integrations
//!
//! Concrete implementations of port traits and outward surfaces.
//!
//! Adapters:
//! - `hermes`: Pyth Hermes REST client (`PriceSource`)
//! - `dashboard`: axum JSON API, probes and metrics endpoint
//! - `metrics`: Prometheus registry fed from client snapshots

pub mod dashboard;
pub mod hermes;
pub mod metrics;
