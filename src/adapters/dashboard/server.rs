//! Dashboard Server - JSON API, Probes and Metrics
//!
//! Serves the dashboard view, manual refresh, per-feed validation,
//! liveness/readiness probes and the Prometheus exposition via axum 0.7.
//! Readiness follows the oracle connection flag.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};

use super::view::DashboardView;
use crate::adapters::metrics::MetricsRegistry;
use crate::domain::error::FeedErrorKind;
use crate::domain::feed::FeedId;
use crate::usecases::feed_client::FeedClientHandle;

/// State shared by every handler.
#[derive(Clone)]
pub struct DashboardState {
    /// Running feed client; also the source of the validation thresholds.
    pub client: FeedClientHandle,
    /// Present when metrics are enabled.
    pub metrics: Option<Arc<MetricsRegistry>>,
}

impl DashboardState {
    fn view(&self) -> DashboardView {
        DashboardView::build(
            &self.client.snapshot(),
            self.client.feeds(),
            &self.client.thresholds(),
            Utc::now(),
        )
    }
}

/// Build the dashboard router.
pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/api/prices", get(prices))
        .route("/api/refresh", post(refresh))
        .route("/api/validate/:feed_id", get(validate))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Axum-based dashboard HTTP server.
pub struct DashboardServer {
    state: DashboardState,
    /// Listen address, e.g. `0.0.0.0:8080`.
    bind_address: String,
}

impl DashboardServer {
    pub fn new(state: DashboardState, bind_address: impl Into<String>) -> Self {
        Self {
            state,
            bind_address: bind_address.into(),
        }
    }

    /// Bind the configured address and serve until shutdown.
    #[instrument(skip(self, shutdown_rx), fields(address = %self.bind_address))]
    pub async fn run(self, shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.bind_address).await?;
        self.serve(listener, shutdown_rx).await
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        info!(address = %listener.local_addr()?, "Dashboard server started");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        info!("Dashboard server stopped");
        Ok(())
    }
}

async fn prices(State(state): State<DashboardState>) -> Json<DashboardView> {
    Json(state.view())
}

/// Poll now and return the refreshed view.
async fn refresh(State(state): State<DashboardState>) -> Response {
    match state.client.refresh().await {
        Ok(_) => Json(state.view()).into_response(),
        Err(e) => {
            warn!(error = %e, "Manual refresh rejected");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn validate(State(state): State<DashboardState>, Path(raw_id): Path<String>) -> Response {
    let feed_id = match FeedId::parse(&raw_id) {
        Ok(id) => id,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "kind": FeedErrorKind::InvalidFeedId,
                    "error": e.to_string(),
                })),
            )
                .into_response();
        }
    };

    match state.client.validate(&feed_id) {
        Some(result) => Json(result).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no reading for feed {feed_id}") })),
        )
            .into_response(),
    }
}

/// Always 200 while the process runs.
async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// 200 only while the last applied poll succeeded.
async fn readiness(State(state): State<DashboardState>) -> impl IntoResponse {
    if state.client.snapshot().is_connected {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics(State(state): State<DashboardState>) -> Response {
    let Some(registry) = state.metrics else {
        return (StatusCode::NOT_FOUND, "metrics disabled").into_response();
    };
    match registry.render() {
        Ok(body) => body.into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
