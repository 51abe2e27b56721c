//! Dashboard Adapter
//!
//! HTTP presentation of the feed client state.
//!
//! Sub-modules:
//! - `format`: display rules for prices, ages and status badges
//! - `view`: price card and status panel projections
//! - `server`: axum routes, probes and `/metrics`

pub mod format;
pub mod server;
pub mod view;

pub use server::{DashboardServer, DashboardState, router};
pub use view::{DashboardView, PriceCardView, StatusPanelView};
