//! Configuration Module - TOML-based Monitor Configuration
//!
//! Loads and validates configuration from `config.toml` with an
//! environment variable override for the oracle URL (`HERMES_URL`,
//! also read from `.env`). Feed definitions and thresholds live
//! here - nothing is hardcoded in the domain layer.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

use crate::domain::feed::{FeedConfig, demo_feeds};
use crate::domain::validation::ValidationThresholds;

/// Top-level monitor configuration.
///
/// Every section has defaults, so an empty file yields the demo
/// setup against the public Hermes endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  #[serde(default)]
  pub service: ServiceConfig,
  /// Remote oracle endpoint.
  #[serde(default)]
  pub oracle: OracleConfig,
  /// Polling and validation parameters.
  #[serde(default)]
  pub polling: PollingSettings,
  /// Dashboard HTTP server.
  #[serde(default)]
  pub server: ServerConfig,
  /// Tracked feeds, keyed by feed id.
  #[serde(default = "demo_feeds")]
  pub feeds: Vec<FeedConfig>,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Oracle endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
  /// Hermes REST base URL (overridden by `HERMES_URL`).
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Request timeout in milliseconds.
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Outbound request budget toward the oracle.
  #[serde(default = "default_max_rps")]
  pub max_requests_per_second: u32,
}

/// Polling lifecycle and validation thresholds.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct PollingSettings {
  /// Fixed polling period when real-time updates are enabled.
  #[serde(default = "default_refresh_interval")]
  pub refresh_interval_ms: u64,
  /// Primary staleness boundary (exclusive).
  #[serde(default = "default_staleness")]
  pub staleness_threshold_seconds: u64,
  /// Primary confidence boundary as a ratio (0..1].
  #[serde(default = "default_confidence")]
  pub confidence_threshold_ratio: f64,
  /// Cap on consecutive backoff retries.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// When false only manual refreshes trigger polls.
  #[serde(default = "default_true")]
  pub enable_real_time_updates: bool,
}

impl PollingSettings {
  pub fn refresh_interval(&self) -> Duration {
    Duration::from_millis(self.refresh_interval_ms)
  }

  pub fn thresholds(&self) -> ValidationThresholds {
    ValidationThresholds {
      staleness_threshold_secs: self.staleness_threshold_seconds,
      confidence_threshold_ratio: self.confidence_threshold_ratio,
    }
  }
}

/// Dashboard server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Bind address for dashboard, health and metrics routes.
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
  /// Expose Prometheus metrics on /metrics.
  #[serde(default = "default_true")]
  pub metrics_enabled: bool,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
    }
  }
}

impl Default for OracleConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_ms: default_timeout_ms(),
      max_requests_per_second: default_max_rps(),
    }
  }
}

impl Default for PollingSettings {
  fn default() -> Self {
    Self {
      refresh_interval_ms: default_refresh_interval(),
      staleness_threshold_seconds: default_staleness(),
      confidence_threshold_ratio: default_confidence(),
      max_retries: default_max_retries(),
      enable_real_time_updates: true,
    }
  }
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind_address: default_bind_address(),
      metrics_enabled: true,
    }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "oracle-price-monitor".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_base_url() -> String {
  "https://hermes.pyth.network".to_string()
}

fn default_timeout_ms() -> u64 {
  10_000
}

fn default_max_rps() -> u32 {
  5
}

fn default_refresh_interval() -> u64 {
  5_000
}

fn default_staleness() -> u64 {
  60
}

fn default_confidence() -> f64 {
  0.1
}

fn default_max_retries() -> u32 {
  3
}

fn default_true() -> bool {
  true
}

fn default_bind_address() -> String {
  "0.0.0.0:8080".to_string()
}
