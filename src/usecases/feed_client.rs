//! Feed Client - Polling Lifecycle for Oracle Price Feeds
//!
//! Owns the client state for one polling session:
//! 1. Fetches all configured feeds in one batched request
//! 2. Decodes and derives readings (age, confidence ratio, delta)
//! 3. Publishes snapshots to observers through a watch channel
//! 4. Retries failures with bounded exponential backoff
//!
//! A single driver task owns the fixed-period timer and the backoff
//! sleep and runs polls one at a time. `poll()` stays callable from
//! outside; every poll takes a sequence number and only results newer
//! than the last applied one are written, so a slow response never
//! overwrites a fresher one.

use std::collections::HashMap;
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, instrument, warn};

use crate::config::PollingSettings;
use crate::domain::backoff::BackoffPolicy;
use crate::domain::error::{FeedError, FeedErrorKind};
use crate::domain::feed::{FeedConfig, FeedId};
use crate::domain::price::{FormattedReading, PreviousPrices, RawReading};
use crate::domain::validation::{ValidationResult, ValidationThresholds, validate_reading};
use crate::ports::price_source::PriceSource;

/// Where the client is in its poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPhase {
  Idle,
  Polling,
  Succeeded,
  Failed,
}

/// Cumulative poll counters for the status panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
  /// Polls whose result was applied.
  pub total: u64,
  /// Applied polls that failed.
  pub failed: u64,
}

impl PollStats {
  pub fn succeeded(&self) -> u64 {
    self.total - self.failed
  }

  /// Fraction of applied polls that succeeded, if any ran.
  pub fn success_rate(&self) -> Option<f64> {
    (self.total > 0).then(|| self.succeeded() as f64 / self.total as f64)
  }
}

/// Read-only view of the client state handed to observers.
#[derive(Debug, Clone, Serialize)]
pub struct ClientSnapshot {
  /// Current readings keyed by canonical feed id.
  pub readings: HashMap<FeedId, FormattedReading>,
  /// Initial poll pending or a manual refresh in flight.
  pub loading: bool,
  /// Error from the latest applied poll, cleared on success.
  pub error: Option<FeedError>,
  /// Time of the last successful poll.
  pub last_update: Option<DateTime<Utc>>,
  pub is_connected: bool,
  /// Consecutive failed polls.
  pub retry_count: u32,
  pub phase: PollPhase,
  pub stats: PollStats,
}

impl ClientSnapshot {
  fn initial(loading: bool) -> Self {
    Self {
      readings: HashMap::new(),
      loading,
      error: None,
      last_update: None,
      is_connected: false,
      retry_count: 0,
      phase: PollPhase::Idle,
      stats: PollStats::default(),
    }
  }

  pub fn reading(&self, feed_id: &FeedId) -> Option<&FormattedReading> {
    self.readings.get(feed_id)
  }
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
  /// Reading map replaced.
  Updated { readings: usize },
  /// Poll failed; `attempt` is the retry count before this failure.
  Failed { error: FeedError, attempt: u32 },
  /// A newer poll was applied first; this result was discarded.
  Superseded,
  /// The driver has shut down; nothing was fetched or applied.
  Stopped,
}

/// The driver task is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("feed client is stopped")]
pub struct ClientStopped;

enum Command {
  Refresh(oneshot::Sender<PollOutcome>),
}

/// Previous prices, the sequence of the last applied poll and the
/// shutdown latch.
#[derive(Default)]
struct PollBook {
  previous: PreviousPrices,
  last_applied: u64,
  stopped: bool,
}

/// Polling client for a fixed set of oracle feeds.
pub struct FeedClient {
  /// Oracle adapter.
  source: Arc<dyn PriceSource>,
  /// Tracked feeds in configuration order.
  feeds: Vec<FeedConfig>,
  /// Canonical id → index into `feeds`.
  index: HashMap<FeedId, usize>,
  /// Ids requested on every poll.
  feed_ids: Vec<FeedId>,
  settings: PollingSettings,
  backoff: BackoffPolicy,
  /// Current state; receivers are the observers.
  state_tx: watch::Sender<ClientSnapshot>,
  book: Mutex<PollBook>,
  next_seq: AtomicU64,
}

impl FeedClient {
  /// Create a client for `feeds`. Feed ids are expected to be unique.
  pub fn new(
    source: Arc<dyn PriceSource>,
    feeds: Vec<FeedConfig>,
    settings: PollingSettings,
  ) -> Self {
    let index = feeds
      .iter()
      .enumerate()
      .map(|(i, feed)| (feed.feed_id.clone(), i))
      .collect();
    let feed_ids = feeds.iter().map(|feed| feed.feed_id.clone()).collect();
    let (state_tx, _) = watch::channel(ClientSnapshot::initial(settings.enable_real_time_updates));

    Self {
      source,
      feeds,
      index,
      feed_ids,
      settings,
      backoff: BackoffPolicy::new(settings.max_retries),
      state_tx,
      book: Mutex::new(PollBook::default()),
      next_seq: AtomicU64::new(0),
    }
  }

  pub fn feeds(&self) -> &[FeedConfig] {
    &self.feeds
  }

  /// Thresholds used by `validate` and by anything rendering readings.
  pub fn thresholds(&self) -> ValidationThresholds {
    self.settings.thresholds()
  }

  /// Clone of the current state.
  pub fn snapshot(&self) -> ClientSnapshot {
    self.state_tx.borrow().clone()
  }

  /// Receiver notified after every state change.
  pub fn subscribe(&self) -> watch::Receiver<ClientSnapshot> {
    self.state_tx.subscribe()
  }

  /// Validate the current reading for `feed_id` against the configured
  /// thresholds. `None` when there is no reading for that feed.
  pub fn validate(&self, feed_id: &FeedId) -> Option<ValidationResult> {
    let thresholds = self.thresholds();
    self
      .state_tx
      .borrow()
      .readings
      .get(feed_id)
      .map(|reading| validate_reading(reading, &thresholds))
  }

  /// Fetch, decode and apply one batch of readings.
  ///
  /// Once the driver has shut down this returns `Stopped` without
  /// fetching, and a fetch still in flight at shutdown is discarded.
  #[instrument(skip(self), fields(source = self.source.name()))]
  pub async fn poll(&self) -> PollOutcome {
    if self.book.lock().stopped {
      debug!("Poll requested after shutdown");
      return PollOutcome::Stopped;
    }
    let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
    self.state_tx.send_modify(|s| s.phase = PollPhase::Polling);

    let fetched = self.source.latest_readings(&self.feed_ids).await;
    let now = Utc::now();

    let mut book = self.book.lock();
    if book.stopped {
      debug!(seq, "Discarding poll result received after shutdown");
      return PollOutcome::Stopped;
    }
    if seq < book.last_applied {
      debug!(seq, last_applied = book.last_applied, "Discarding superseded poll result");
      return PollOutcome::Superseded;
    }
    book.last_applied = seq;

    let decoded = fetched
      .map_err(|e| FeedError::polling(e.kind(), e.to_string(), now))
      .and_then(|raw| self.decode_batch(&raw, &mut book.previous, now));

    match decoded {
      Ok(readings) => self.apply_success(readings, now),
      Err(error) => self.apply_failure(error),
    }
  }

  /// Decode every reading for a configured feed; unknown ids are dropped.
  ///
  /// Fails closed: one undecodable reading fails the whole batch and
  /// leaves the previous-price memo untouched.
  fn decode_batch(
    &self,
    raw: &[RawReading],
    previous: &mut PreviousPrices,
    now: DateTime<Utc>,
  ) -> Result<HashMap<FeedId, FormattedReading>, FeedError> {
    let threshold = self.settings.staleness_threshold_seconds;
    let mut readings = HashMap::with_capacity(self.feeds.len());

    for entry in raw {
      let feed_id = FeedId::from_remote(&entry.id);
      let Some(feed) = self.index.get(&feed_id).map(|&i| &self.feeds[i]) else {
        debug!(feed_id = %feed_id, "Dropping reading for unconfigured feed");
        continue;
      };

      let reading = FormattedReading::from_raw(entry, feed, previous.get(&feed_id), now, threshold)
        .map_err(|e| {
          FeedError::polling(
            FeedErrorKind::ParsingError,
            format!("{}: {e}", feed.symbol),
            now,
          )
          .with_feed(feed_id.clone())
        })?;
      readings.insert(feed_id, reading);
    }

    for reading in readings.values() {
      previous.record(&reading.feed_id, reading.price);
    }

    Ok(readings)
  }

  fn apply_success(
    &self,
    readings: HashMap<FeedId, FormattedReading>,
    now: DateTime<Utc>,
  ) -> PollOutcome {
    let count = readings.len();
    if count == 0 {
      warn!("Oracle response contained no configured feeds");
    }

    self.state_tx.send_modify(|s| {
      s.readings = readings;
      s.last_update = Some(now);
      s.is_connected = true;
      s.retry_count = 0;
      s.error = None;
      s.loading = false;
      s.phase = PollPhase::Succeeded;
      s.stats.total += 1;
    });

    debug!(readings = count, "Price poll applied");
    PollOutcome::Updated { readings: count }
  }

  fn apply_failure(&self, error: FeedError) -> PollOutcome {
    let mut attempt = 0;
    self.state_tx.send_modify(|s| {
      attempt = s.retry_count;
      for reading in s.readings.values_mut() {
        *reading = reading.marked_stale();
      }
      s.is_connected = false;
      s.error = Some(error.clone());
      s.retry_count = s.retry_count.saturating_add(1);
      s.loading = false;
      s.phase = PollPhase::Failed;
      s.stats.total += 1;
      s.stats.failed += 1;
    });

    warn!(
      kind = %error.kind,
      error = %error.message,
      retry_count = attempt + 1,
      "Price poll failed, keeping last known readings"
    );
    PollOutcome::Failed { error, attempt }
  }

  fn mark_loading(&self) {
    self.state_tx.send_modify(|s| s.loading = true);
  }

  /// Spawn the driver task.
  ///
  /// Returns a cloneable handle for observers and the task guard used
  /// to stop polling.
  pub fn start(self: Arc<Self>) -> (FeedClientHandle, PollingTask) {
    let (command_tx, command_rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let driver = Arc::clone(&self);
    let join = tokio::spawn(async move {
      driver.run(command_rx, shutdown_rx).await;
    });

    let handle = FeedClientHandle {
      client: self,
      commands: command_tx,
    };
    (handle, PollingTask { shutdown_tx, join })
  }

  /// Driver loop: fixed-period ticks, backoff retries and manual
  /// refreshes, one poll at a time, until shutdown.
  #[instrument(skip_all, name = "feed_client_loop")]
  async fn run(
    self: Arc<Self>,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown_rx: broadcast::Receiver<()>,
  ) {
    let mut ticker = self.settings.enable_real_time_updates.then(|| {
      let mut interval = tokio::time::interval(self.settings.refresh_interval());
      interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
      interval
    });
    let mut backoff: Option<Pin<Box<Sleep>>> = None;
    let mut commands_open = true;

    info!(
      feeds = self.feeds.len(),
      real_time = self.settings.enable_real_time_updates,
      refresh_interval_ms = self.settings.refresh_interval_ms,
      max_retries = self.settings.max_retries,
      "Feed client started"
    );

    loop {
      let outcome = tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Feed client shutting down");
          self.book.lock().stopped = true;
          break;
        }
        command = commands.recv(), if commands_open => match command {
          Some(Command::Refresh(reply)) => {
            self.mark_loading();
            let outcome = self.poll().await;
            let _ = reply.send(outcome.clone());
            Some(outcome)
          }
          None => {
            debug!("All client handles dropped, refresh disabled");
            commands_open = false;
            None
          }
        },
        () = backoff_elapsed(&mut backoff) => {
          backoff = None;
          debug!("Backoff retry firing");
          Some(self.poll().await)
        }
        () = next_tick(&mut ticker) => Some(self.poll().await),
      };

      if let Some(outcome) = outcome {
        self.schedule_backoff(&outcome, &mut backoff);
      }
    }
  }

  /// Arm or clear the backoff sleep after a poll.
  ///
  /// A pending retry is left alone by later failures; success clears it.
  fn schedule_backoff(&self, outcome: &PollOutcome, backoff: &mut Option<Pin<Box<Sleep>>>) {
    match outcome {
      PollOutcome::Updated { .. } => *backoff = None,
      PollOutcome::Failed { error, attempt } if error.retryable && backoff.is_none() => {
        match self.backoff.next_delay(*attempt) {
          Some(delay) => {
            info!(
              attempt = attempt + 1,
              delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
              "Scheduling backoff retry"
            );
            *backoff = Some(Box::pin(tokio::time::sleep(delay)));
          }
          None => warn!(
            max_retries = self.backoff.max_retries(),
            "Retry budget exhausted, waiting for scheduled polls"
          ),
        }
      }
      PollOutcome::Failed { .. } | PollOutcome::Superseded | PollOutcome::Stopped => {}
    }
  }
}

async fn next_tick(ticker: &mut Option<Interval>) {
  match ticker {
    Some(interval) => {
      interval.tick().await;
    }
    None => pending().await,
  }
}

async fn backoff_elapsed(backoff: &mut Option<Pin<Box<Sleep>>>) {
  match backoff {
    Some(sleep) => sleep.as_mut().await,
    None => pending().await,
  }
}

/// Cloneable access to a running client for observers.
#[derive(Clone)]
pub struct FeedClientHandle {
  client: Arc<FeedClient>,
  commands: mpsc::Sender<Command>,
}

impl FeedClientHandle {
  /// Poll immediately, bypassing the timer and any pending backoff.
  pub async fn refresh(&self) -> Result<PollOutcome, ClientStopped> {
    let (reply_tx, reply_rx) = oneshot::channel();
    self
      .commands
      .send(Command::Refresh(reply_tx))
      .await
      .map_err(|_| ClientStopped)?;
    reply_rx.await.map_err(|_| ClientStopped)
  }

  pub fn snapshot(&self) -> ClientSnapshot {
    self.client.snapshot()
  }

  pub fn subscribe(&self) -> watch::Receiver<ClientSnapshot> {
    self.client.subscribe()
  }

  pub fn validate(&self, feed_id: &FeedId) -> Option<ValidationResult> {
    self.client.validate(feed_id)
  }

  pub fn feeds(&self) -> &[FeedConfig] {
    self.client.feeds()
  }

  pub fn thresholds(&self) -> ValidationThresholds {
    self.client.thresholds()
  }
}

/// Guard for the driver task.
pub struct PollingTask {
  shutdown_tx: broadcast::Sender<()>,
  join: JoinHandle<()>,
}

impl PollingTask {
  /// Cancel both timers and wait for the driver to exit.
  pub async fn stop(self) {
    let _ = self.shutdown_tx.send(());
    if let Err(e) = self.join.await {
      warn!(error = %e, "Feed client task ended abnormally");
    }
  }
}
