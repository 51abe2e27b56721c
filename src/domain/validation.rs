//! Risk classification of a single reading.
//!
//! Checks run in a fixed order (staleness, confidence, sign, movement)
//! and the order of the resulting messages is part of the contract.
//! Large movements only ever warn.

use serde::{Deserialize, Serialize};

use super::price::FormattedReading;

/// Absolute price-change percentage above which a movement is flagged.
pub const LARGE_MOVEMENT_PERCENT: f64 = 20.0;

/// Thresholds a reading is validated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationThresholds {
    /// Primary staleness boundary in seconds.
    pub staleness_threshold_secs: u64,
    /// Primary confidence boundary as a ratio (0..1).
    pub confidence_threshold_ratio: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            staleness_threshold_secs: 60,
            confidence_threshold_ratio: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Staleness {
    Fresh,
    Stale,
    VeryStale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

/// Outcome of validating one reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Blocking conditions, in check order.
    pub errors: Vec<String>,
    /// Non-blocking conditions, in check order.
    pub warnings: Vec<String>,
    pub staleness: Staleness,
    pub confidence: ConfidenceLevel,
}

/// Classify a reading against the thresholds.
pub fn validate_reading(
    reading: &FormattedReading,
    thresholds: &ValidationThresholds,
) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let stale_limit = thresholds.staleness_threshold_secs as f64;
    let staleness = if reading.age_seconds > stale_limit {
        errors.push(format!(
            "Price is {}s old (threshold: {}s)",
            reading.age_seconds.round(),
            thresholds.staleness_threshold_secs
        ));
        if reading.age_seconds > stale_limit * 2.0 {
            Staleness::VeryStale
        } else {
            Staleness::Stale
        }
    } else {
        Staleness::Fresh
    };

    let conf_limit = thresholds.confidence_threshold_ratio;
    let confidence = if reading.confidence_ratio > conf_limit {
        let conf_percent = reading.confidence_ratio * 100.0;
        let threshold_percent = conf_limit * 100.0;
        if reading.confidence_ratio > conf_limit * 2.0 {
            errors.push(format!(
                "Low confidence: ±{conf_percent:.2}% (threshold: {threshold_percent:.1}%)"
            ));
            ConfidenceLevel::Low
        } else {
            warnings.push(format!(
                "Medium confidence: ±{conf_percent:.2}% (threshold: {threshold_percent:.1}%)"
            ));
            ConfidenceLevel::Medium
        }
    } else {
        ConfidenceLevel::High
    };

    if reading.price <= 0.0 {
        errors.push("Invalid price: must be positive".to_string());
    }

    if let Some(pct) = reading.price_change_percent {
        if pct.abs() > LARGE_MOVEMENT_PERCENT {
            warnings.push(format!("Large price movement: {pct:.2}%"));
        }
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        staleness,
        confidence,
    }
}
