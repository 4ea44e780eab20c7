//! Consumer-facing feed handle.

use std::sync::atomic::Ordering;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::reconnection::{FeedContext, cancel_any_retry, establish};
use crate::socket::FeedError;
use crate::types::{ConnectionState, FeedConfig, RetryPolicy};

/// A reconnecting live-data subscription to the vehicle feed.
///
/// One handle owns at most one physical WebSocket at a time and cycles
/// through transports across retries. The payload type `T` is whatever
/// one feed frame deserializes into: [`FleetSnapshot`] for the
/// fleet-wide feed, [`VehicleRecord`] for the per-vehicle detail feed.
/// Fleet and detail subscriptions are independent instances and may run
/// concurrently.
///
/// Callback registration is single-slot: the last registration wins.
/// This is the documented contract; the dashboard has exactly one
/// consumer per handle.
///
/// All methods are non-blocking and never fail synchronously; connect
/// outcomes arrive through the registered callbacks. Methods must be
/// called from within a tokio runtime.
///
/// [`FleetSnapshot`]: gsefeed_telemetry_types::FleetSnapshot
/// [`VehicleRecord`]: gsefeed_telemetry_types::VehicleRecord
pub struct FeedConnector<T> {
    ctx: FeedContext<T>,
}

impl<T: DeserializeOwned + 'static> FeedConnector<T> {
    /// Creates a handle with the default retry policy (5 attempts, 3 s
    /// apart).
    pub fn new(config: FeedConfig) -> Self {
        Self::with_retry(config, RetryPolicy::default())
    }

    pub fn with_retry(config: FeedConfig, policy: RetryPolicy) -> Self {
        Self {
            ctx: FeedContext::new(config, policy),
        }
    }

    /// Opens the subscription, scoped to one vehicle when `target` is
    /// given. An existing socket is closed first, so at most one
    /// physical connection is active per handle. Calling this after
    /// retry exhaustion resets the retry budget.
    ///
    /// Returns immediately; success or failure is signalled through the
    /// registered callbacks.
    pub fn connect(&self, target: Option<&str>) {
        let ctx = self.ctx.clone();
        let target = target.map(str::to_string);
        ctx.set_state(ConnectionState::Connecting);
        debug!(
            vehicle = target.as_deref().unwrap_or("<fleet>"),
            "feed connect requested"
        );

        tokio::spawn(async move {
            // Tear down whatever is live without triggering the retry
            // path: pending timer first, then the socket. The flag and
            // the epoch bump make any in-flight close notification from
            // the old socket a no-op.
            cancel_any_retry(&ctx.retry_cancel);
            ctx.manual_disconnect.store(true, Ordering::Relaxed);
            ctx.epoch.fetch_add(1, Ordering::SeqCst);
            if let Some(old) = ctx.socket.lock().await.take() {
                old.close().await;
            }

            if let Ok(mut guard) = ctx.target.lock() {
                *guard = target;
            }
            ctx.retry_count.store(0, Ordering::Relaxed);
            ctx.manual_disconnect.store(false, Ordering::Relaxed);

            establish(ctx).await;
        });
    }

    /// Explicit teardown. Cancels any pending retry timer, closes the
    /// socket if open, and clears the target. Afterwards the handle is
    /// inert until the next [`connect`](Self::connect). Idempotent and
    /// safe to call from any state.
    pub async fn disconnect(&self) {
        let ctx = &self.ctx;
        ctx.manual_disconnect.store(true, Ordering::Relaxed);
        cancel_any_retry(&ctx.retry_cancel);
        ctx.epoch.fetch_add(1, Ordering::SeqCst);

        if let Some(socket) = ctx.socket.lock().await.take() {
            ctx.set_state(ConnectionState::Closing);
            socket.close().await;
            ctx.set_state(ConnectionState::Closed);
            debug!("feed disconnected");
        }

        if let Ok(mut guard) = ctx.target.lock() {
            *guard = None;
        }
    }

    /// Registers the frame callback. Single-slot: replaces any earlier
    /// registration.
    pub fn set_message_callback(&self, cb: impl Fn(T) + Send + Sync + 'static) {
        if let Ok(mut guard) = self.ctx.on_message.lock() {
            *guard = Some(Box::new(cb));
        }
    }

    /// Registers the connection-established callback. Single-slot.
    pub fn set_connect_callback(&self, cb: impl Fn() + Send + Sync + 'static) {
        if let Ok(mut guard) = self.ctx.on_connect.lock() {
            *guard = Some(Box::new(cb));
        }
    }

    /// Registers the transport-error callback. Single-slot. Errors are
    /// non-fatal by themselves; only a resulting close drives the
    /// lifecycle.
    pub fn set_error_callback(&self, cb: impl Fn(FeedError) + Send + Sync + 'static) {
        if let Ok(mut guard) = self.ctx.on_error.lock() {
            *guard = Some(Box::new(cb));
        }
    }

    /// True iff the transport is currently open.
    pub fn is_connected(&self) -> bool {
        self.ctx.current_state() == ConnectionState::Open
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.ctx.current_state()
    }

    /// The vehicle this handle is scoped to, or `None` for the
    /// fleet-wide feed or after a disconnect.
    pub fn target_id(&self) -> Option<String> {
        self.ctx.target.lock().ok().and_then(|guard| guard.clone())
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn retry_count(&self) -> u32 {
        self.ctx.retry_count.load(Ordering::Relaxed)
    }
}

impl<T> std::fmt::Debug for FeedConnector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedConnector")
            .field("state", &self.ctx.current_state())
            .finish_non_exhaustive()
    }
}
