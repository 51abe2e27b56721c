//! Use Cases Layer - Application Workflows
//!
//! Orchestrates domain logic with the `PriceSource` port.
//!
//! Use cases:
//! - `FeedClient`: polling lifecycle, backoff and observable state

pub mod feed_client;

pub use feed_client::{
  ClientSnapshot, ClientStopped, FeedClient, FeedClientHandle, PollOutcome, PollPhase, PollStats,
  PollingTask,
};
