//! Public types for the feed connector.

use std::time::Duration;

use crate::socket::FeedError;

/// Connection state for a feed handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handle created, `connect` never called.
    Idle,
    /// Transport handshake in progress (first attempt or retry).
    Connecting,
    /// Connected, frames flowing.
    Open,
    /// Explicit disconnect in progress.
    Closing,
    /// Not connected. Either an unexpected close (a retry may be
    /// pending), retry exhaustion, or a completed explicit disconnect.
    Closed,
}

/// Endpoint configuration for a feed.
///
/// The credential token is injected here, never compiled in.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Feed base URL, e.g. `ws://ops.example.net/feed/vehicles`.
    pub base_url: String,
    /// Token appended as the `api_key` query parameter.
    pub api_key: String,
}

impl FeedConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

/// Bounded fixed-delay reconnection policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Consecutive failed attempts allowed before the handle stays closed.
    pub max_retries: u32,
    /// Delay between an unexpected close and the next attempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_millis(3000),
        }
    }
}

/// Callback invoked with each parsed feed frame.
pub type MessageCallback<T> = Box<dyn Fn(T) + Send + Sync>;

/// Callback invoked when the transport opens.
pub type ConnectCallback = Box<dyn Fn() + Send + Sync>;

/// Callback invoked on a transport-level error.
pub type ErrorCallback = Box<dyn Fn(FeedError) + Send + Sync>;
