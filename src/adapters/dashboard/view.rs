//! Dashboard View Models - Price Cards and Status Panel
//!
//! Pure projections of a `ClientSnapshot` into what the dashboard
//! renders. Every configured feed gets a card in configuration order;
//! feeds without a reading yet get a loading placeholder.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::format::{
    CardStatus, ChangeDirection, ConfidenceBand, ConnectionStatus, error_label, format_age,
    format_change_percent, format_confidence, format_last_update, format_price,
};
use crate::domain::feed::{AssetType, FeedConfig, FeedId};
use crate::domain::price::FormattedReading;
use crate::domain::validation::{ValidationResult, ValidationThresholds, validate_reading};
use crate::usecases::feed_client::ClientSnapshot;

/// One price card. Reading-derived fields are `None` on a loading
/// placeholder.
#[derive(Debug, Clone, Serialize)]
pub struct PriceCardView {
    pub symbol: String,
    pub feed_id: FeedId,
    /// `first8...last6` form of the feed id.
    pub short_id: String,
    pub description: String,
    pub asset_type: AssetType,
    pub price: Option<f64>,
    pub price_display: Option<String>,
    pub confidence_display: Option<String>,
    pub ema_price_display: Option<String>,
    pub confidence_ratio: Option<f64>,
    pub confidence_band: Option<ConfidenceBand>,
    pub age_display: Option<String>,
    pub is_stale: bool,
    pub change_direction: Option<ChangeDirection>,
    pub change_percent_display: Option<String>,
    pub status: CardStatus,
    pub status_label: &'static str,
    pub validation: Option<ValidationResult>,
    pub legacy_address: Option<String>,
}

impl PriceCardView {
    pub fn build(
        feed: &FeedConfig,
        reading: &FormattedReading,
        thresholds: &ValidationThresholds,
    ) -> Self {
        let validation = validate_reading(reading, thresholds);
        let status = CardStatus::of(Some(&validation));

        Self {
            symbol: feed.symbol.clone(),
            feed_id: feed.feed_id.clone(),
            short_id: feed.feed_id.short(),
            description: feed.description.clone(),
            asset_type: feed.asset_type,
            price: Some(reading.price),
            price_display: Some(format_price(reading.price)),
            confidence_display: Some(format_confidence(reading.confidence)),
            ema_price_display: Some(format_price(reading.ema_price)),
            confidence_ratio: Some(reading.confidence_ratio),
            confidence_band: Some(ConfidenceBand::of(reading.confidence_ratio)),
            age_display: Some(format_age(reading.age_seconds)),
            is_stale: reading.is_stale,
            change_direction: Some(ChangeDirection::of(reading.price_change)),
            change_percent_display: format_change_percent(reading.price_change_percent),
            status,
            status_label: status.label(),
            validation: Some(validation),
            legacy_address: feed.legacy_address.clone(),
        }
    }

    /// Placeholder for a feed that has no reading yet.
    pub fn loading(feed: &FeedConfig) -> Self {
        let status = CardStatus::of(None);

        Self {
            symbol: feed.symbol.clone(),
            feed_id: feed.feed_id.clone(),
            short_id: feed.feed_id.short(),
            description: feed.description.clone(),
            asset_type: feed.asset_type,
            price: None,
            price_display: None,
            confidence_display: None,
            ema_price_display: None,
            confidence_ratio: None,
            confidence_band: None,
            age_display: None,
            is_stale: false,
            change_direction: None,
            change_percent_display: None,
            status,
            status_label: status.label(),
            validation: None,
            legacy_address: feed.legacy_address.clone(),
        }
    }
}

/// Error banner under the status headline.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBanner {
    /// Kind with underscores spaced out, e.g. `NETWORK ERROR`.
    pub label: String,
    pub message: String,
    /// Shown only after at least one failure.
    pub retry_attempt: Option<u32>,
}

/// Oracle status panel.
#[derive(Debug, Clone, Serialize)]
pub struct StatusPanelView {
    pub status: ConnectionStatus,
    pub status_label: &'static str,
    pub last_update_display: String,
    pub loading: bool,
    pub error: Option<ErrorBanner>,
    pub retry_count: u32,
    /// Connected with no error.
    pub real_time_active: bool,
    pub polls_total: u64,
    pub polls_failed: u64,
    pub success_rate: Option<f64>,
}

impl StatusPanelView {
    pub fn build(snapshot: &ClientSnapshot, now: DateTime<Utc>) -> Self {
        let status = ConnectionStatus::of(snapshot.error.is_some(), snapshot.is_connected);
        let error = snapshot.error.as_ref().map(|e| ErrorBanner {
            label: error_label(e.kind),
            message: e.message.clone(),
            retry_attempt: (snapshot.retry_count > 0).then_some(snapshot.retry_count),
        });

        Self {
            status,
            status_label: status.label(),
            last_update_display: format_last_update(snapshot.last_update, now),
            loading: snapshot.loading,
            error,
            retry_count: snapshot.retry_count,
            real_time_active: snapshot.is_connected && snapshot.error.is_none(),
            polls_total: snapshot.stats.total,
            polls_failed: snapshot.stats.failed,
            success_rate: snapshot.stats.success_rate(),
        }
    }
}

/// Everything `/api/prices` returns.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub status: StatusPanelView,
    pub cards: Vec<PriceCardView>,
}

impl DashboardView {
    pub fn build(
        snapshot: &ClientSnapshot,
        feeds: &[FeedConfig],
        thresholds: &ValidationThresholds,
        now: DateTime<Utc>,
    ) -> Self {
        let cards = feeds
            .iter()
            .map(|feed| match snapshot.readings.get(&feed.feed_id) {
                Some(reading) => PriceCardView::build(feed, reading, thresholds),
                None => PriceCardView::loading(feed),
            })
            .collect();

        Self {
            status: StatusPanelView::build(snapshot, now),
            cards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::{FeedError, FeedErrorKind};
    use crate::domain::feed::demo_feeds;
    use crate::usecases::feed_client::{PollPhase, PollStats};
    use std::collections::HashMap;

    fn reading(feed: &FeedConfig, price: f64, change_pct: Option<f64>) -> FormattedReading {
        FormattedReading {
            symbol: feed.symbol.clone(),
            feed_id: feed.feed_id.clone(),
            price,
            confidence: price * 0.001,
            confidence_ratio: 0.001,
            publish_time: Utc::now(),
            age_seconds: 3.2,
            is_stale: false,
            price_change: change_pct.map(|p| price * p / 100.0),
            price_change_percent: change_pct,
            ema_price: price,
            ema_confidence: price * 0.001,
        }
    }

    fn snapshot(readings: Vec<FormattedReading>) -> ClientSnapshot {
        ClientSnapshot {
            readings: readings
                .into_iter()
                .map(|r| (r.feed_id.clone(), r))
                .collect::<HashMap<_, _>>(),
            loading: false,
            error: None,
            last_update: Some(Utc::now()),
            is_connected: true,
            retry_count: 0,
            phase: PollPhase::Succeeded,
            stats: PollStats { total: 4, failed: 1 },
        }
    }

    #[test]
    fn test_cards_follow_config_order_with_loading_placeholder() {
        let feeds = demo_feeds();
        let snap = snapshot(vec![
            reading(&feeds[2], 3500.0, None),
            reading(&feeds[0], 150.0, Some(1.0)),
        ]);
        let view = DashboardView::build(&snap, &feeds, &ValidationThresholds::default(), Utc::now());

        let symbols: Vec<_> = view.cards.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["SOL/USD", "BTC/USD", "ETH/USD"]);
        assert_eq!(view.cards[0].price_display.as_deref(), Some("$150.0000"));
        assert_eq!(view.cards[0].change_direction, Some(ChangeDirection::Up));
        assert_eq!(view.cards[0].change_percent_display.as_deref(), Some("1.00%"));
        assert_eq!(view.cards[0].status, CardStatus::Valid);

        let pending = &view.cards[1];
        assert_eq!(pending.status, CardStatus::Loading);
        assert_eq!(pending.status_label, "Loading");
        assert!(pending.validation.is_none());
        assert!(pending.price.is_none());
        assert!(pending.price_display.is_none());
        assert!(!pending.is_stale);
        assert_eq!(pending.feed_id, feeds[1].feed_id);

        assert_eq!(view.cards[2].price_display.as_deref(), Some("$3,500.00"));
        assert_eq!(view.cards[2].short_id, "ff61491a...fd0ace");
        assert_eq!(view.status.status, ConnectionStatus::Connected);
        assert!(view.status.real_time_active);
        assert_eq!(view.status.success_rate, Some(0.75));
    }

    #[test]
    fn test_large_move_card_is_warning() {
        let feeds = demo_feeds();
        let card = PriceCardView::build(
            &feeds[0],
            &reading(&feeds[0], 150.0, Some(-25.0)),
            &ValidationThresholds::default(),
        );
        assert_eq!(card.status, CardStatus::Warning);
        assert_eq!(card.status_label, "Valid");
        assert_eq!(card.change_direction, Some(ChangeDirection::Down));
    }

    #[test]
    fn test_empty_snapshot_renders_every_feed_loading() {
        let feeds = demo_feeds();
        let mut snap = snapshot(vec![]);
        snap.loading = true;
        snap.last_update = None;
        let view = DashboardView::build(&snap, &feeds, &ValidationThresholds::default(), Utc::now());

        assert_eq!(view.cards.len(), feeds.len());
        assert!(view.cards.iter().all(|c| c.status == CardStatus::Loading));
        assert!(view.cards.iter().all(|c| c.validation.is_none()));
    }

    #[test]
    fn test_error_banner_shows_retry_attempt() {
        let mut snap = snapshot(vec![]);
        snap.is_connected = false;
        snap.retry_count = 2;
        snap.error = Some(FeedError::polling(
            FeedErrorKind::NetworkError,
            "HTTP 503: Service Unavailable",
            Utc::now(),
        ));
        let panel = StatusPanelView::build(&snap, Utc::now());
        assert_eq!(panel.status, ConnectionStatus::Error);
        let banner = panel.error.unwrap();
        assert_eq!(banner.label, "NETWORK ERROR");
        assert_eq!(banner.retry_attempt, Some(2));
        assert!(!panel.real_time_active);
    }

    #[test]
    fn test_never_updated_panel() {
        let mut snap = snapshot(vec![]);
        snap.last_update = None;
        snap.is_connected = false;
        let panel = StatusPanelView::build(&snap, Utc::now());
        assert_eq!(panel.last_update_display, "Never");
        assert_eq!(panel.status_label, "Disconnected");
    }
}
