//! Hermes API Response Types
//!
//! Strict serialization types for `/api/latest_price_feeds`. Every
//! field the client relies on is required and typed; anything else
//! in the payload (`vaa`, `metadata`) is ignored. A body that does
//! not match fails deserialization instead of leaking partial data.

use serde::Deserialize;

use crate::domain::price::{RawPrice, RawReading};

/// One fixed-point price object.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceResponse {
  /// Mantissa as a decimal integer string.
  pub price: String,
  /// Confidence mantissa as a decimal integer string.
  pub conf: String,
  /// Power-of-ten exponent.
  pub expo: i32,
  /// Publish time (Unix seconds).
  pub publish_time: i64,
}

/// One entry of the latest price feeds array.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceFeedResponse {
  /// Feed id, usually without `0x`.
  pub id: String,
  /// Aggregate price.
  pub price: PriceResponse,
  /// Exponentially-weighted moving average price.
  pub ema_price: PriceResponse,
}

impl From<PriceResponse> for RawPrice {
  fn from(p: PriceResponse) -> Self {
    Self {
      mantissa: p.price,
      confidence: p.conf,
      exponent: p.expo,
      publish_time: p.publish_time,
    }
  }
}

impl From<PriceFeedResponse> for RawReading {
  fn from(feed: PriceFeedResponse) -> Self {
    Self {
      id: feed.id,
      price: feed.price.into(),
      ema_price: feed.ema_price.into(),
    }
  }
}
