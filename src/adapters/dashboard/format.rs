//! Display formatting for price cards and the status panel.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::error::FeedErrorKind;
use crate::domain::validation::ValidationResult;

/// `$1,234.57` at or above 1000, `$12.3456` below.
pub fn format_price(price: f64) -> String {
    if price >= 1000.0 {
        format!("${}", group_thousands(&format!("{price:.2}")))
    } else {
        format!("${price:.4}")
    }
}

/// `±$0.0123`
pub fn format_confidence(confidence: f64) -> String {
    format!("±${confidence:.4}")
}

/// Whole seconds, minutes or hours: `42s ago`, `3m ago`, `2h ago`.
pub fn format_age(age_seconds: f64) -> String {
    let secs = age_seconds.max(0.0).floor() as u64;
    if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

/// Relative time of the last successful poll, `Never` when none.
pub fn format_last_update(last_update: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match last_update {
        Some(at) => format_age((now - at).num_milliseconds() as f64 / 1000.0),
        None => "Never".to_string(),
    }
}

/// `5.00%`
pub fn format_change_percent(percent: Option<f64>) -> Option<String> {
    percent.map(|p| format!("{p:.2}%"))
}

/// `NETWORK_ERROR` → `NETWORK ERROR`
pub fn error_label(kind: FeedErrorKind) -> String {
    kind.to_string().replace('_', " ")
}

fn group_thousands(fixed: &str) -> String {
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}

/// Colour band of the confidence bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn of(confidence_ratio: f64) -> Self {
        if confidence_ratio <= 0.05 {
            Self::High
        } else if confidence_ratio <= 0.10 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDirection {
    Up,
    Down,
    Flat,
}

impl ChangeDirection {
    /// Missing or zero change is flat.
    pub fn of(change: Option<f64>) -> Self {
        match change {
            Some(c) if c > 0.0 => Self::Up,
            Some(c) if c < 0.0 => Self::Down,
            _ => Self::Flat,
        }
    }
}

/// Badge shown on a price card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Loading,
    Invalid,
    Warning,
    Valid,
}

impl CardStatus {
    pub fn of(validation: Option<&ValidationResult>) -> Self {
        match validation {
            None => Self::Loading,
            Some(v) if !v.is_valid => Self::Invalid,
            Some(v) if !v.warnings.is_empty() => Self::Warning,
            Some(_) => Self::Valid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Loading => "Loading",
            Self::Invalid => "Invalid",
            Self::Warning | Self::Valid => "Valid",
        }
    }
}

/// Headline of the status panel. An error wins over disconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Error,
    Disconnected,
    Connected,
}

impl ConnectionStatus {
    pub fn of(has_error: bool, is_connected: bool) -> Self {
        if has_error {
            Self::Error
        } else if !is_connected {
            Self::Disconnected
        } else {
            Self::Connected
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Disconnected => "Disconnected",
            Self::Connected => "Connected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::{ConfidenceLevel, Staleness};
    use chrono::Duration;

    #[test]
    fn test_format_price_switches_at_one_thousand() {
        assert_eq!(format_price(1234.5678), "$1,234.57");
        assert_eq!(format_price(65432.1), "$65,432.10");
        assert_eq!(format_price(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_price(999.99999), "$1000.0000");
        assert_eq!(format_price(12.345_67), "$12.3457");
        assert_eq!(format_price(0.0), "$0.0000");
    }

    #[test]
    fn test_group_thousands_keeps_sign() {
        assert_eq!(group_thousands("-1234567.89"), "-1,234,567.89");
        assert_eq!(group_thousands("123"), "123");
    }

    #[test]
    fn test_format_confidence() {
        assert_eq!(format_confidence(0.081234), "±$0.0812");
    }

    #[test]
    fn test_format_age_units() {
        assert_eq!(format_age(0.4), "0s ago");
        assert_eq!(format_age(59.9), "59s ago");
        assert_eq!(format_age(60.0), "1m ago");
        assert_eq!(format_age(3599.0), "59m ago");
        assert_eq!(format_age(7200.0), "2h ago");
        assert_eq!(format_age(-3.0), "0s ago");
    }

    #[test]
    fn test_format_last_update() {
        let now = Utc::now();
        assert_eq!(format_last_update(None, now), "Never");
        assert_eq!(
            format_last_update(Some(now - Duration::seconds(125)), now),
            "2m ago"
        );
    }

    #[test]
    fn test_bands_and_directions() {
        assert_eq!(ConfidenceBand::of(0.05), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::of(0.07), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::of(0.10), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::of(0.11), ConfidenceBand::Low);
        assert_eq!(ChangeDirection::of(Some(1.5)), ChangeDirection::Up);
        assert_eq!(ChangeDirection::of(Some(-0.1)), ChangeDirection::Down);
        assert_eq!(ChangeDirection::of(Some(0.0)), ChangeDirection::Flat);
        assert_eq!(ChangeDirection::of(None), ChangeDirection::Flat);
    }

    #[test]
    fn test_card_status() {
        let mut v = ValidationResult {
            is_valid: true,
            errors: vec![],
            warnings: vec![],
            staleness: Staleness::Fresh,
            confidence: ConfidenceLevel::High,
        };
        assert_eq!(CardStatus::of(None), CardStatus::Loading);
        assert_eq!(CardStatus::of(Some(&v)), CardStatus::Valid);
        v.warnings.push("Large price movement: 25.00%".into());
        assert_eq!(CardStatus::of(Some(&v)), CardStatus::Warning);
        v.is_valid = false;
        assert_eq!(CardStatus::of(Some(&v)), CardStatus::Invalid);
        assert_eq!(CardStatus::Invalid.label(), "Invalid");
    }

    #[test]
    fn test_connection_status_precedence() {
        assert_eq!(ConnectionStatus::of(true, true), ConnectionStatus::Error);
        assert_eq!(ConnectionStatus::of(false, false), ConnectionStatus::Disconnected);
        assert_eq!(ConnectionStatus::of(false, true), ConnectionStatus::Connected);
        assert_eq!(error_label(FeedErrorKind::RateLimited), "RATE LIMITED");
    }
}
