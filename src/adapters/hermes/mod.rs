//! Pyth Hermes REST Adapter
//!
//! Implements the `PriceSource` port against Hermes'
//! `/api/latest_price_feeds` endpoint.
//!
//! Sub-modules:
//! - `client`: HTTP client with outbound rate limiting
//! - `types`: strict response type definitions

pub mod client;
pub mod types;

pub use client::{HermesClient, HermesClientConfig};
