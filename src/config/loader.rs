//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, applying environment overrides,
//! validating all parameters, and providing clear error messages
//! for misconfiguration.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Environment variable overriding `oracle.base_url`.
pub const BASE_URL_ENV: &str = "HERMES_URL";

/// Load and validate configuration from a TOML file.
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails (including malformed feed ids)
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let mut config = parse_config(&content)?;

  if let Ok(url) = std::env::var(BASE_URL_ENV) {
    if !url.trim().is_empty() {
      config.oracle.base_url = url;
    }
  }

  validate_config(&config)?;

  info!(
    feeds = config.feeds.len(),
    base_url = %config.oracle.base_url,
    refresh_interval_ms = config.polling.refresh_interval_ms,
    real_time = config.polling.enable_real_time_updates,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse configuration text without touching the environment.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  toml::from_str(content).with_context(|| "Failed to parse config.toml")
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - A usable http(s) oracle URL
/// - Positive intervals, timeouts and thresholds
/// - Confidence ratio in (0, 1]
/// - Non-empty, uniquely keyed feed definitions
pub fn validate_config(config: &AppConfig) -> Result<()> {
  // Oracle validation
  let base_url = config.oracle.base_url.trim();
  anyhow::ensure!(!base_url.is_empty(), "Oracle base_url must not be empty");
  anyhow::ensure!(
    base_url.starts_with("http://") || base_url.starts_with("https://"),
    "Oracle base_url must be an http(s) URL, got {base_url}"
  );
  anyhow::ensure!(
    config.oracle.timeout_ms > 0,
    "Oracle timeout_ms must be positive"
  );
  anyhow::ensure!(
    config.oracle.max_requests_per_second > 0,
    "Oracle max_requests_per_second must be positive"
  );

  // Polling validation
  let polling = &config.polling;
  anyhow::ensure!(
    polling.refresh_interval_ms > 0,
    "refresh_interval_ms must be positive"
  );
  anyhow::ensure!(
    polling.staleness_threshold_seconds > 0,
    "staleness_threshold_seconds must be positive"
  );
  anyhow::ensure!(
    polling.confidence_threshold_ratio > 0.0 && polling.confidence_threshold_ratio <= 1.0,
    "confidence_threshold_ratio must be in (0, 1], got {}",
    polling.confidence_threshold_ratio
  );

  // Feed validation
  anyhow::ensure!(
    !config.feeds.is_empty(),
    "At least one feed must be configured"
  );

  let mut seen = HashSet::new();
  for (i, feed) in config.feeds.iter().enumerate() {
    anyhow::ensure!(
      !feed.symbol.trim().is_empty(),
      "Feed {} ({}) has empty symbol",
      i,
      feed.feed_id
    );
    anyhow::ensure!(
      seen.insert(feed.feed_id.clone()),
      "Feed {} ({}) duplicates feed id {}",
      i,
      feed.symbol,
      feed.feed_id
    );
  }

  // Server validation
  anyhow::ensure!(
    !config.server.bind_address.is_empty(),
    "Server bind_address must not be empty"
  );

  Ok(())
}
