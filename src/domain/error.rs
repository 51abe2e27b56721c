//! Classified feed errors surfaced to observers.
//!
//! Polling only produces `NetworkError`, `ParsingError` and
//! `RateLimited`. The remaining kinds are part of the public
//! vocabulary so validation-driven flows can report through the
//! same banner.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::feed::FeedId;

/// Error taxonomy shown in the status banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedErrorKind {
    /// Transport failure or non-success HTTP status.
    NetworkError,
    /// Body malformed, missing fields or undecodable numbers.
    ParsingError,
    /// Oracle answered 429 or the outbound limiter refused.
    RateLimited,
    StalePrice,
    LowConfidence,
    InvalidFeedId,
}

impl fmt::Display for FeedErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NetworkError => "NETWORK_ERROR",
            Self::ParsingError => "PARSING_ERROR",
            Self::RateLimited => "RATE_LIMITED",
            Self::StalePrice => "STALE_PRICE",
            Self::LowConfidence => "LOW_CONFIDENCE",
            Self::InvalidFeedId => "INVALID_FEED_ID",
        };
        f.write_str(label)
    }
}

/// A classified error with the context the dashboard needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct FeedError {
    pub kind: FeedErrorKind,
    pub message: String,
    /// Feed the error relates to, when it is feed-specific.
    pub feed_id: Option<FeedId>,
    pub timestamp: DateTime<Utc>,
    /// Whether a backoff retry may be scheduled.
    pub retryable: bool,
}

impl FeedError {
    /// Error produced by a failed poll. Always retryable.
    pub fn polling(kind: FeedErrorKind, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            message: message.into(),
            feed_id: None,
            timestamp: at,
            retryable: true,
        }
    }

    pub fn with_feed(mut self, feed_id: FeedId) -> Self {
        self.feed_id = Some(feed_id);
        self
    }
}
