//! Property-Based Tests — Domain Layer Invariants
//!
//! Uses `proptest` to verify decoding, backoff and validation
//! invariants across random inputs.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use oracle_price_monitor::domain::backoff::BackoffPolicy;
use oracle_price_monitor::domain::feed::demo_feeds;
use oracle_price_monitor::domain::price::{RawPrice, RawReading, FormattedReading};
use oracle_price_monitor::domain::validation::{
    ConfidenceLevel, Staleness, ValidationThresholds, validate_reading,
};

fn raw(mantissa: i64, conf: u32, expo: i32, publish_time: i64) -> RawReading {
    let price = RawPrice {
        mantissa: mantissa.to_string(),
        confidence: conf.to_string(),
        exponent: expo,
        publish_time,
    };
    RawReading {
        id: demo_feeds()[0].feed_id.to_string(),
        price: price.clone(),
        ema_price: price,
    }
}

// ── Decoding Properties ─────────────────────────────────────

proptest! {
    /// price == mantissa × 10^expo, up to f64 rounding.
    #[test]
    fn decoded_price_matches_scaled_mantissa(
        mantissa in -1_000_000_000_000i64..1_000_000_000_000,
        expo in -12i32..=4,
    ) {
        let decoded = raw(mantissa, 0, expo, 1_700_000_000).price.decode().unwrap();
        let expected = mantissa as f64 * 10f64.powi(expo);
        let tolerance = expected.abs() * 1e-12 + f64::EPSILON;
        prop_assert!(
            (decoded.price - expected).abs() <= tolerance,
            "decoded {} expected {expected}", decoded.price
        );
    }

    /// Confidence ratio is confidence / |price| for non-zero prices.
    #[test]
    fn confidence_ratio_is_relative_to_abs_price(
        mantissa in prop_oneof![-1_000_000_000i64..-1, 1i64..1_000_000_000],
        conf in 0u32..1_000_000,
        expo in -8i32..=0,
    ) {
        let feed = &demo_feeds()[0];
        let now = Utc.timestamp_opt(1_700_000_010, 0).unwrap();
        let reading =
            FormattedReading::from_raw(&raw(mantissa, conf, expo, 1_700_000_000), feed, None, now, 60)
                .unwrap();
        let expected = reading.confidence / reading.price.abs();
        prop_assert!((reading.confidence_ratio - expected).abs() <= expected * 1e-12);
        prop_assert!(reading.confidence_ratio >= 0.0);
    }
}

// ── Backoff Properties ──────────────────────────────────────

proptest! {
    /// Delays never decrease and never exceed the 10s cap.
    #[test]
    fn backoff_monotonic_and_capped(attempt in 0u32..64) {
        let policy = BackoffPolicy::new(u32::MAX);
        let current = policy.delay(attempt);
        let next = policy.delay(attempt + 1);
        prop_assert!(next >= current);
        prop_assert!(current <= std::time::Duration::from_secs(10));
        prop_assert!(current >= std::time::Duration::from_secs(1));
    }

    /// A retry is offered exactly while attempt < max_retries.
    #[test]
    fn backoff_respects_retry_budget(max_retries in 0u32..10, attempt in 0u32..20) {
        let policy = BackoffPolicy::new(max_retries);
        prop_assert_eq!(policy.next_delay(attempt).is_some(), attempt < max_retries);
    }
}

// ── Validation Properties ───────────────────────────────────

proptest! {
    /// Validation is a pure function of reading and thresholds.
    #[test]
    fn validation_is_pure(
        mantissa in -1_000_000i64..1_000_000,
        conf in 0u32..500_000,
        age in 0i64..600,
        threshold in 1u64..300,
    ) {
        let feed = &demo_feeds()[0];
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let reading = FormattedReading::from_raw(
            &raw(mantissa, conf, -2, 1_700_000_000 - age),
            feed,
            Some(100.0),
            now,
            threshold,
        )
        .unwrap();
        let thresholds = ValidationThresholds {
            staleness_threshold_secs: threshold,
            confidence_threshold_ratio: 0.1,
        };
        let first = validate_reading(&reading, &thresholds);
        let second = validate_reading(&reading, &thresholds);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.is_valid, first.errors.is_empty());
    }

    /// Age equal to the threshold is fresh; one second more is stale.
    #[test]
    fn staleness_boundary_is_exclusive(threshold in 1u64..3600) {
        let feed = &demo_feeds()[0];
        let publish = 1_700_000_000i64;
        let at = |age: u64| Utc.timestamp_opt(publish, 0).unwrap() + Duration::seconds(age as i64);
        let thresholds = ValidationThresholds {
            staleness_threshold_secs: threshold,
            confidence_threshold_ratio: 0.1,
        };

        let boundary =
            FormattedReading::from_raw(&raw(10_000, 1, -2, publish), feed, None, at(threshold), threshold)
                .unwrap();
        prop_assert!(!boundary.is_stale);
        prop_assert_eq!(validate_reading(&boundary, &thresholds).staleness, Staleness::Fresh);

        let past =
            FormattedReading::from_raw(&raw(10_000, 1, -2, publish), feed, None, at(threshold + 1), threshold)
                .unwrap();
        prop_assert!(past.is_stale);
        prop_assert_ne!(validate_reading(&past, &thresholds).staleness, Staleness::Fresh);
    }

    /// Confidence at or below the threshold never warns or errors.
    #[test]
    fn confidence_within_threshold_is_high(price in 1i64..1_000_000, permille in 0i64..=100) {
        let feed = &demo_feeds()[0];
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let conf = u32::try_from(price * permille / 1000).unwrap();
        let reading =
            FormattedReading::from_raw(&raw(price, conf, 0, 1_700_000_000), feed, None, now, 60)
                .unwrap();
        let result = validate_reading(&reading, &ValidationThresholds::default());
        prop_assert_eq!(result.confidence, ConfidenceLevel::High);
        prop_assert!(result.is_valid);
        prop_assert!(result.warnings.is_empty());
    }
}
