//! Prometheus Metrics Registry - Oracle Feed Observability
//!
//! Mirrors feed client snapshots into Prometheus metrics: poll
//! outcomes, connection state, the retry counter, and per-feed price,
//! confidence ratio, age and staleness. Rendered by the dashboard
//! server on `/metrics`.

use parking_lot::Mutex;
use prometheus::{Encoder, Gauge, GaugeVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument};

use crate::usecases::feed_client::{ClientSnapshot, PollStats};

/// Centralized Prometheus metrics for the price monitor.
///
/// All metrics follow the naming convention `oracle_monitor_*`;
/// per-feed series carry a `symbol` label.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Applied polls by outcome (`succeeded` / `failed`).
    pub polls: IntCounterVec,
    /// Oracle connection status (1 = connected, 0 = disconnected).
    pub connected: Gauge,
    /// Consecutive failed polls.
    pub retry_count: IntGauge,
    /// Latest decoded price per feed.
    pub feed_price: GaugeVec,
    /// Latest confidence ratio per feed.
    pub feed_confidence_ratio: GaugeVec,
    /// Reading age at poll time, in seconds.
    pub feed_age_seconds: GaugeVec,
    /// Whether the reading is flagged stale (1 = stale).
    pub feed_stale: GaugeVec,
    /// Poll counters already exported.
    exported: Mutex<PollStats>,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let polls = IntCounterVec::new(
            Opts::new("oracle_monitor_polls_total", "Applied oracle polls by outcome"),
            &["outcome"],
        )?;

        let connected = Gauge::new(
            "oracle_monitor_connected",
            "Oracle connection status (1=connected, 0=disconnected)",
        )?;

        let retry_count = IntGauge::new(
            "oracle_monitor_retry_count",
            "Consecutive failed polls",
        )?;

        let feed_price = GaugeVec::new(
            Opts::new("oracle_monitor_feed_price", "Latest decoded price"),
            &["symbol"],
        )?;

        let feed_confidence_ratio = GaugeVec::new(
            Opts::new(
                "oracle_monitor_feed_confidence_ratio",
                "Confidence interval relative to price",
            ),
            &["symbol"],
        )?;

        let feed_age_seconds = GaugeVec::new(
            Opts::new(
                "oracle_monitor_feed_age_seconds",
                "Seconds since publish at poll time",
            ),
            &["symbol"],
        )?;

        let feed_stale = GaugeVec::new(
            Opts::new(
                "oracle_monitor_feed_stale",
                "Whether the reading is stale (1=yes, 0=no)",
            ),
            &["symbol"],
        )?;

        registry.register(Box::new(polls.clone()))?;
        registry.register(Box::new(connected.clone()))?;
        registry.register(Box::new(retry_count.clone()))?;
        registry.register(Box::new(feed_price.clone()))?;
        registry.register(Box::new(feed_confidence_ratio.clone()))?;
        registry.register(Box::new(feed_age_seconds.clone()))?;
        registry.register(Box::new(feed_stale.clone()))?;

        Ok(Self {
            registry,
            polls,
            connected,
            retry_count,
            feed_price,
            feed_confidence_ratio,
            feed_age_seconds,
            feed_stale,
            exported: Mutex::new(PollStats::default()),
        })
    }

    /// Bring every metric in line with `snapshot`.
    ///
    /// Counters advance by the difference against the last observed
    /// stats, so observing the same snapshot twice is a no-op for them.
    pub fn observe(&self, snapshot: &ClientSnapshot) {
        {
            let mut exported = self.exported.lock();
            let stats = snapshot.stats;
            let succeeded = stats.succeeded().saturating_sub(exported.succeeded());
            let failed = stats.failed.saturating_sub(exported.failed);
            if succeeded > 0 {
                self.polls.with_label_values(&["succeeded"]).inc_by(succeeded);
            }
            if failed > 0 {
                self.polls.with_label_values(&["failed"]).inc_by(failed);
            }
            *exported = stats;
        }

        self.connected
            .set(if snapshot.is_connected { 1.0 } else { 0.0 });
        self.retry_count.set(i64::from(snapshot.retry_count));

        for reading in snapshot.readings.values() {
            let symbol = reading.symbol.as_str();
            self.feed_price.with_label_values(&[symbol]).set(reading.price);
            self.feed_confidence_ratio
                .with_label_values(&[symbol])
                .set(reading.confidence_ratio);
            self.feed_age_seconds
                .with_label_values(&[symbol])
                .set(reading.age_seconds);
            self.feed_stale
                .with_label_values(&[symbol])
                .set(if reading.is_stale { 1.0 } else { 0.0 });
        }
    }

    /// Encode the registry in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Follow client snapshots until shutdown or until the client
    /// is dropped.
    #[instrument(skip_all, name = "metrics_exporter")]
    pub async fn follow(
        &self,
        mut snapshots: watch::Receiver<ClientSnapshot>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        info!("Metrics exporter started");
        self.observe(&snapshots.borrow_and_update());

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Metrics exporter shutting down");
                    break;
                }
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        debug!("Feed client dropped, metrics exporter exiting");
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    self.observe(&snapshot);
                }
            }
        }
    }
}
