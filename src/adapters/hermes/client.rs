//! Hermes HTTP Client - Rate-limited Price Feed Fetcher
//!
//! Wraps reqwest with an outbound request budget for the Pyth
//! Hermes REST API. Retries are not done here: the feed client owns
//! the backoff schedule, so every failure is returned classified.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::types::PriceFeedResponse;
use crate::config::OracleConfig;
use crate::domain::feed::FeedId;
use crate::domain::price::RawReading;
use crate::ports::price_source::{PriceSource, SourceError};

/// Configuration for the Hermes HTTP client.
#[derive(Debug, Clone)]
pub struct HermesClientConfig {
  /// Base URL for the Hermes API.
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Outbound requests allowed per second.
  pub max_requests_per_second: u32,
}

impl Default for HermesClientConfig {
  fn default() -> Self {
    Self {
      base_url: "https://hermes.pyth.network".to_string(),
      timeout: Duration::from_secs(10),
      max_requests_per_second: 5,
    }
  }
}

impl From<&OracleConfig> for HermesClientConfig {
  fn from(config: &OracleConfig) -> Self {
    Self {
      base_url: config.base_url.clone(),
      timeout: Duration::from_millis(config.timeout_ms),
      max_requests_per_second: config.max_requests_per_second,
    }
  }
}

/// Rate-limited HTTP client for the Hermes latest price feeds API.
pub struct HermesClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: HermesClientConfig,
  /// Outbound request budget.
  limiter: DefaultDirectRateLimiter,
}

impl HermesClient {
  /// Create a new Hermes client.
  pub fn new(config: HermesClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(2)
      .build()
      .context("Failed to build HTTP client")?;

    let per_second = NonZeroU32::new(config.max_requests_per_second).unwrap_or(NonZeroU32::MIN);
    let limiter = RateLimiter::direct(Quota::per_second(per_second));

    Ok(Self {
      http,
      config,
      limiter,
    })
  }

  /// Build the batched request URL: `ids[]=` repeated per feed.
  pub fn latest_price_feeds_url(&self, feed_ids: &[FeedId]) -> String {
    let query = feed_ids
      .iter()
      .map(|id| format!("ids[]={id}"))
      .collect::<Vec<_>>()
      .join("&");
    format!(
      "{}/api/latest_price_feeds?{}",
      self.config.base_url.trim_end_matches('/'),
      query
    )
  }
}

#[async_trait]
impl PriceSource for HermesClient {
  async fn latest_readings(&self, feed_ids: &[FeedId]) -> Result<Vec<RawReading>, SourceError> {
    if self.limiter.check().is_err() {
      warn!("Outbound request budget exhausted, skipping Hermes request");
      return Err(SourceError::RateLimited(
        "outbound request budget exhausted".to_string(),
      ));
    }

    let url = self.latest_price_feeds_url(feed_ids);
    debug!(url = %url, feeds = feed_ids.len(), "Requesting latest price feeds");

    let response = self
      .http
      .get(&url)
      .send()
      .await
      .map_err(|e| SourceError::Transport(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
      return Err(SourceError::RateLimited(format!("HTTP {}", status.as_u16())));
    }
    if !status.is_success() {
      return Err(SourceError::Status {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
      });
    }

    let body = response
      .bytes()
      .await
      .map_err(|e| SourceError::Transport(e.to_string()))?;

    let feeds: Vec<PriceFeedResponse> =
      serde_json::from_slice(&body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    if feeds.is_empty() {
      return Err(SourceError::Empty);
    }

    Ok(feeds.into_iter().map(RawReading::from).collect())
  }

  fn name(&self) -> &'static str {
    "hermes"
  }
}
