//! Fixed-point price decoding and derived reading metrics.
//!
//! Oracle prices arrive as `mantissa × 10^exponent` with the mantissa
//! and confidence encoded as decimal integer strings. Decoding goes
//! through `rust_decimal` so the wire value is scaled exactly; the
//! conversion to f64 happens once, on the already-scaled value.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::feed::{FeedConfig, FeedId};

/// Why a raw reading could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{field} {value:?} is not a decimal integer")]
    InvalidInteger { field: &'static str, value: String },
    #[error("confidence {0:?} is negative")]
    NegativeConfidence(String),
    #[error("exponent {0} is outside the supported range")]
    ExponentOutOfRange(i32),
    #[error("{field} cannot be represented as f64")]
    NotRepresentable { field: &'static str },
    #[error("publish time {0} is outside the representable range")]
    InvalidPublishTime(i64),
}

/// One fixed-point price variant as received from the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPrice {
    /// Decimal integer string.
    pub mantissa: String,
    /// Decimal integer string, non-negative.
    pub confidence: String,
    pub exponent: i32,
    pub publish_time: i64,
}

/// One asset's unprocessed snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReading {
    /// Oracle feed id as received (may carry a `0x` prefix).
    pub id: String,
    pub price: RawPrice,
    pub ema_price: RawPrice,
}

/// A decoded price variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedPrice {
    pub price: f64,
    pub confidence: f64,
    pub publish_time: DateTime<Utc>,
}

fn parse_integer(field: &'static str, raw: &str) -> Result<Decimal, DecodeError> {
    let invalid = || DecodeError::InvalidInteger {
        field,
        value: raw.to_string(),
    };
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    Decimal::from_str_exact(raw).map_err(|_| invalid())
}

/// Scale an integer-valued decimal by `10^exponent`.
pub fn scale_by_exponent(value: Decimal, exponent: i32) -> Result<Decimal, DecodeError> {
    let mut scaled = value;
    if exponent < 0 {
        let scale = scaled.scale() + exponent.unsigned_abs();
        scaled
            .set_scale(scale)
            .map_err(|_| DecodeError::ExponentOutOfRange(exponent))?;
    } else {
        for _ in 0..exponent {
            scaled = scaled
                .checked_mul(Decimal::TEN)
                .ok_or(DecodeError::ExponentOutOfRange(exponent))?;
        }
    }
    Ok(scaled)
}

/// Decode `mantissa × 10^exponent` exactly.
pub fn decode_fixed_point(
    field: &'static str,
    mantissa: &str,
    exponent: i32,
) -> Result<Decimal, DecodeError> {
    let value = parse_integer(field, mantissa)?;
    scale_by_exponent(value, exponent)
}

fn to_f64(field: &'static str, value: Decimal) -> Result<f64, DecodeError> {
    value
        .to_f64()
        .filter(|v| v.is_finite())
        .ok_or(DecodeError::NotRepresentable { field })
}

impl RawPrice {
    /// Decode price, confidence and publish time.
    pub fn decode(&self) -> Result<DecodedPrice, DecodeError> {
        let price = decode_fixed_point("price", &self.mantissa, self.exponent)?;
        let confidence = decode_fixed_point("conf", &self.confidence, self.exponent)?;
        if confidence.is_sign_negative() && !confidence.is_zero() {
            return Err(DecodeError::NegativeConfidence(self.confidence.clone()));
        }
        let publish_time = DateTime::from_timestamp(self.publish_time, 0)
            .ok_or(DecodeError::InvalidPublishTime(self.publish_time))?;

        Ok(DecodedPrice {
            price: to_f64("price", price)?,
            confidence: to_f64("conf", confidence)?,
            publish_time,
        })
    }
}

/// Last successfully decoded price per feed.
///
/// Only feeds `price_change`; updated on every decode regardless of
/// validation outcome.
#[derive(Debug, Clone, Default)]
pub struct PreviousPrices {
    prices: HashMap<FeedId, f64>,
}

impl PreviousPrices {
    pub fn get(&self, feed_id: &FeedId) -> Option<f64> {
        self.prices.get(feed_id).copied()
    }

    /// Record `price` and return the value it replaced.
    pub fn record(&mut self, feed_id: &FeedId, price: f64) -> Option<f64> {
        self.prices.insert(feed_id.clone(), price)
    }
}

/// Derived, display-ready reading for one feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedReading {
    pub symbol: String,
    pub feed_id: FeedId,
    pub price: f64,
    /// Absolute confidence interval (same unit as price).
    pub confidence: f64,
    /// confidence / |price|; infinite when price is zero.
    pub confidence_ratio: f64,
    pub publish_time: DateTime<Utc>,
    /// Seconds between publish time and decode time.
    pub age_seconds: f64,
    pub is_stale: bool,
    /// Absent when there is no usable prior reading.
    pub price_change: Option<f64>,
    pub price_change_percent: Option<f64>,
    pub ema_price: f64,
    pub ema_confidence: f64,
}

impl FormattedReading {
    /// Decode a raw reading and derive age, staleness, confidence ratio
    /// and the delta against `previous_price`.
    pub fn from_raw(
        raw: &RawReading,
        feed: &FeedConfig,
        previous_price: Option<f64>,
        now: DateTime<Utc>,
        staleness_threshold_secs: u64,
    ) -> Result<Self, DecodeError> {
        let current = raw.price.decode()?;
        let ema = raw.ema_price.decode()?;

        let age_seconds = age_seconds(current.publish_time, now);
        let (price_change, price_change_percent) = price_delta(previous_price, current.price);

        Ok(Self {
            symbol: feed.symbol.clone(),
            feed_id: feed.feed_id.clone(),
            price: current.price,
            confidence: current.confidence,
            confidence_ratio: confidence_ratio(current.confidence, current.price),
            publish_time: current.publish_time,
            age_seconds,
            is_stale: age_seconds > staleness_threshold_secs as f64,
            price_change,
            price_change_percent,
            ema_price: ema.price,
            ema_confidence: ema.confidence,
        })
    }

    /// Copy with the stale flag forced on; values untouched.
    pub fn marked_stale(&self) -> Self {
        Self {
            is_stale: true,
            ..self.clone()
        }
    }
}

/// Relative uncertainty of a reading.
pub fn confidence_ratio(confidence: f64, price: f64) -> f64 {
    if price == 0.0 {
        return f64::INFINITY;
    }
    confidence / price.abs()
}

/// Elapsed seconds (millisecond resolution) since `publish_time`.
pub fn age_seconds(publish_time: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - publish_time).num_milliseconds() as f64 / 1000.0
}

/// (absolute, percent) change against the previous price.
pub fn price_delta(previous: Option<f64>, current: f64) -> (Option<f64>, Option<f64>) {
    match previous {
        Some(prev) if prev != 0.0 => {
            let change = current - prev;
            (Some(change), Some(change / prev * 100.0))
        }
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use crate::domain::feed::demo_feeds;

    fn raw_price(mantissa: &str, conf: &str, expo: i32, publish_time: i64) -> RawPrice {
        RawPrice {
            mantissa: mantissa.to_string(),
            confidence: conf.to_string(),
            exponent: expo,
            publish_time,
        }
    }

    #[test]
    fn test_decode_negative_exponent() {
        assert_eq!(decode_fixed_point("price", "6543210", -5).unwrap(), dec!(65.43210));
        assert_eq!(decode_fixed_point("price", "10000000", -2).unwrap(), dec!(100000.00));
    }

    #[test]
    fn test_decode_positive_exponent() {
        assert_eq!(decode_fixed_point("price", "42", 3).unwrap(), dec!(42000));
    }

    #[test]
    fn test_decode_rejects_non_integers() {
        for bad in ["", "-", "1.5", "1e5", " 12", "abc", "+3"] {
            assert!(
                matches!(
                    decode_fixed_point("price", bad, -2),
                    Err(DecodeError::InvalidInteger { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_decode_exponent_out_of_range() {
        assert_eq!(
            decode_fixed_point("price", "1", -40),
            Err(DecodeError::ExponentOutOfRange(-40))
        );
        assert_eq!(
            decode_fixed_point("price", "1", 40),
            Err(DecodeError::ExponentOutOfRange(40))
        );
    }

    #[test]
    fn test_negative_confidence_rejected() {
        let raw = raw_price("100", "-1", -2, 1_700_000_000);
        assert_eq!(
            raw.decode(),
            Err(DecodeError::NegativeConfidence("-1".to_string()))
        );
    }

    #[test]
    fn test_formatted_reading_metrics() {
        let feed = &demo_feeds()[0];
        let publish = 1_700_000_000;
        let now = DateTime::from_timestamp(publish, 0).unwrap() + Duration::seconds(12);
        let raw = RawReading {
            id: format!("0x{}", feed.feed_id),
            price: raw_price("6543210", "654321", -5, publish),
            ema_price: raw_price("6500000", "65000", -5, publish),
        };

        let reading = FormattedReading::from_raw(&raw, feed, None, now, 60).unwrap();
        assert!((reading.price - 65.4321).abs() < 1e-9);
        assert!((reading.confidence - 6.54321).abs() < 1e-9);
        assert!((reading.confidence_ratio - 0.1).abs() < 1e-9);
        assert!((reading.age_seconds - 12.0).abs() < 1e-9);
        assert!(!reading.is_stale);
        assert!(reading.price_change.is_none());
        assert!((reading.ema_price - 65.0).abs() < 1e-9);
        assert_eq!(reading.symbol, "SOL/USD");
    }

    #[test]
    fn test_staleness_boundary_is_exclusive() {
        let feed = &demo_feeds()[1];
        let publish = 1_700_000_000;
        let raw = RawReading {
            id: feed.feed_id.to_string(),
            price: raw_price("100", "1", 0, publish),
            ema_price: raw_price("100", "1", 0, publish),
        };
        let base = DateTime::from_timestamp(publish, 0).unwrap();

        let at = FormattedReading::from_raw(&raw, feed, None, base + Duration::seconds(60), 60)
            .unwrap();
        assert!(!at.is_stale);

        let past = FormattedReading::from_raw(&raw, feed, None, base + Duration::seconds(61), 60)
            .unwrap();
        assert!(past.is_stale);
    }

    #[test]
    fn test_price_delta() {
        assert_eq!(price_delta(Some(100.0), 105.0), (Some(5.0), Some(5.0)));
        assert_eq!(price_delta(Some(100.0), 100.0), (Some(0.0), Some(0.0)));
        assert_eq!(price_delta(None, 100.0), (None, None));
        assert_eq!(price_delta(Some(0.0), 100.0), (None, None));
    }

    #[test]
    fn test_zero_price_ratio_is_infinite() {
        assert!(confidence_ratio(1.0, 0.0).is_infinite());
        assert!((confidence_ratio(2.0, -20.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_previous_prices_record_returns_prior() {
        let feed = &demo_feeds()[2];
        let mut memo = PreviousPrices::default();
        assert_eq!(memo.get(&feed.feed_id), None);
        assert_eq!(memo.record(&feed.feed_id, 10.0), None);
        assert_eq!(memo.record(&feed.feed_id, 11.0), Some(10.0));
        assert_eq!(memo.get(&feed.feed_id), Some(11.0));
        assert_eq!(memo.get(&demo_feeds()[0].feed_id), None);
    }

    #[test]
    fn test_marked_stale_keeps_values() {
        let feed = &demo_feeds()[0];
        let raw = RawReading {
            id: feed.feed_id.to_string(),
            price: raw_price("250", "5", -1, 1_700_000_000),
            ema_price: raw_price("250", "5", -1, 1_700_000_000),
        };
        let now = DateTime::from_timestamp(1_700_000_001, 0).unwrap();
        let reading = FormattedReading::from_raw(&raw, feed, None, now, 60).unwrap();
        let stale = reading.marked_stale();
        assert!(stale.is_stale);
        assert_eq!(stale.price, reading.price);
        assert_eq!(stale.confidence, reading.confidence);
    }
}
