//! Reconnecting WebSocket client for the vehicle telemetry feed.
//!
//! Provides [`FeedConnector`], a handle over one logical live-data
//! subscription (fleet-wide or scoped to a single vehicle) that survives
//! transport failures via a bounded fixed-delay retry policy and delivers
//! parsed frames, connection, and error events through registered
//! callbacks.

pub mod connector;
mod endpoint;
pub(crate) mod pumps;
pub(crate) mod reconnection;
pub mod socket;
pub mod types;

pub use connector::FeedConnector;
pub use socket::FeedError;
pub use types::{ConnectionState, FeedConfig, RetryPolicy};
