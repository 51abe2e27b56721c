//! Domain layer - Core price-feed logic and models.
//!
//! Pure decoding, validation and backoff rules for oracle readings.
//! No I/O here (hexagonal architecture inner ring); everything is
//! testable in isolation with explicit `now` values.

pub mod backoff;
pub mod error;
pub mod feed;
pub mod price;
pub mod validation;

// Re-export core types for convenience
pub use backoff::BackoffPolicy;
pub use error::{FeedError, FeedErrorKind};
pub use feed::{AssetType, FeedConfig, FeedId, FeedIdError};
pub use price::{DecodeError, FormattedReading, PreviousPrices, RawPrice, RawReading};
pub use validation::{
    ConfidenceLevel, Staleness, ValidationResult, ValidationThresholds, validate_reading,
};
