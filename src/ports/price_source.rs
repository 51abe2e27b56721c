//! Price Source Port - Batched Oracle Snapshot Interface
//!
//! Defines the trait the feed client uses to fetch the latest raw
//! readings for a set of feeds. The Hermes REST adapter implements
//! it; tests substitute mocks.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::error::FeedErrorKind;
use crate::domain::feed::FeedId;
use crate::domain::price::RawReading;

/// Failure while fetching a batch of readings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
  /// Connection, DNS, TLS or timeout failure.
  #[error("request failed: {0}")]
  Transport(String),
  /// Non-success HTTP status.
  #[error("HTTP {status}: {reason}")]
  Status { status: u16, reason: String },
  /// Oracle answered 429 or the local limiter refused the request.
  #[error("rate limited: {0}")]
  RateLimited(String),
  /// Body is not the expected JSON shape.
  #[error("malformed response: {0}")]
  Malformed(String),
  /// Body is a valid but empty array.
  #[error("No price data received")]
  Empty,
}

impl SourceError {
  /// Map onto the error taxonomy shown to observers.
  pub fn kind(&self) -> FeedErrorKind {
    match self {
      Self::Transport(_) | Self::Status { .. } => FeedErrorKind::NetworkError,
      Self::RateLimited(_) => FeedErrorKind::RateLimited,
      Self::Malformed(_) | Self::Empty => FeedErrorKind::ParsingError,
    }
  }
}

/// Trait for oracle price providers.
///
/// One call fetches every requested feed in a single batched
/// request. Readings for ids that were not requested may be
/// returned; the caller filters them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync + 'static {
  /// Fetch the latest readings for `feed_ids`.
  ///
  /// Returns at least one reading on success.
  async fn latest_readings(&self, feed_ids: &[FeedId]) -> Result<Vec<RawReading>, SourceError>;

  /// Short name used in logs.
  fn name(&self) -> &'static str;
}
