//! Feed reconnection logic with a bounded fixed-delay retry policy.
//!
//! Contains the shared [`FeedContext`], cancellation helpers, socket
//! establishment, and the retry task. The consumer-facing handle in
//! [`connector`](crate::connector) is a thin wrapper over these.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::endpoint::feed_url;
use crate::socket::{CloseHandler, FeedSocket, FrameHandler, TransportErrorHandler};
use crate::types::{
    ConnectCallback, ConnectionState, ErrorCallback, FeedConfig, MessageCallback, RetryPolicy,
};

/// Shared state behind a feed handle, passed to the free functions that
/// establish sockets and run retries. Cloning is cheap; every physical
/// socket and timer task holds one.
pub(crate) struct FeedContext<T> {
    pub(crate) config: FeedConfig,
    pub(crate) policy: RetryPolicy,
    pub(crate) state: Arc<std::sync::RwLock<ConnectionState>>,
    /// Consecutive failed attempts since the last successful open.
    pub(crate) retry_count: Arc<AtomicU32>,
    /// Socket generation counter. Each physical socket records the epoch
    /// value at establishment; teardown paths bump the epoch, so a close
    /// notification from a superseded socket is recognised as stale.
    pub(crate) epoch: Arc<AtomicU64>,
    /// Set for the duration of an explicit disconnect. Guards reconnect
    /// scheduling against the in-flight close notification the transport
    /// may still deliver.
    pub(crate) manual_disconnect: Arc<AtomicBool>,
    pub(crate) target: Arc<std::sync::Mutex<Option<String>>>,
    pub(crate) socket: Arc<tokio::sync::Mutex<Option<FeedSocket>>>,
    /// Cancel token for the pending retry timer, if any.
    pub(crate) retry_cancel: Arc<std::sync::Mutex<Option<CancellationToken>>>,
    pub(crate) on_message: Arc<std::sync::Mutex<Option<MessageCallback<T>>>>,
    pub(crate) on_connect: Arc<std::sync::Mutex<Option<ConnectCallback>>>,
    pub(crate) on_error: Arc<std::sync::Mutex<Option<ErrorCallback>>>,
}

// Manual impl: `T` only appears inside callback boxes, so no `T: Clone`
// bound is wanted.
impl<T> Clone for FeedContext<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            policy: self.policy,
            state: self.state.clone(),
            retry_count: self.retry_count.clone(),
            epoch: self.epoch.clone(),
            manual_disconnect: self.manual_disconnect.clone(),
            target: self.target.clone(),
            socket: self.socket.clone(),
            retry_cancel: self.retry_cancel.clone(),
            on_message: self.on_message.clone(),
            on_connect: self.on_connect.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<T> FeedContext<T> {
    pub(crate) fn new(config: FeedConfig, policy: RetryPolicy) -> Self {
        Self {
            config,
            policy,
            state: Arc::new(std::sync::RwLock::new(ConnectionState::Idle)),
            retry_count: Arc::new(AtomicU32::new(0)),
            epoch: Arc::new(AtomicU64::new(0)),
            manual_disconnect: Arc::new(AtomicBool::new(false)),
            target: Arc::new(std::sync::Mutex::new(None)),
            socket: Arc::new(tokio::sync::Mutex::new(None)),
            retry_cancel: Arc::new(std::sync::Mutex::new(None)),
            on_message: Arc::new(std::sync::Mutex::new(None)),
            on_connect: Arc::new(std::sync::Mutex::new(None)),
            on_error: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        if let Ok(mut guard) = self.state.write() {
            *guard = state;
        }
    }

    pub(crate) fn current_state(&self) -> ConnectionState {
        self.state
            .read()
            .map(|guard| *guard)
            .unwrap_or(ConnectionState::Closed)
    }
}

/// Cancels the pending retry timer, if any.
pub(crate) fn cancel_any_retry(retry_cancel: &std::sync::Mutex<Option<CancellationToken>>) {
    if let Ok(mut guard) = retry_cancel.lock()
        && let Some(token) = guard.take()
    {
        token.cancel();
    }
}

/// Opens a socket against the current target and wires its handlers.
///
/// On success: retry count resets, state goes `Open`, the connect
/// callback fires. On construction failure: logged and routed through
/// the same retry evaluation as an unexpected close.
pub(crate) async fn establish<T: DeserializeOwned + 'static>(ctx: FeedContext<T>) {
    let target = ctx.target.lock().ok().and_then(|guard| guard.clone());
    let url = feed_url(&ctx.config, target.as_deref());
    ctx.set_state(ConnectionState::Connecting);

    // Claim a fresh generation; this also supersedes any socket still
    // being established concurrently, keeping one physical connection
    // per handle.
    let generation = ctx.epoch.fetch_add(1, Ordering::SeqCst) + 1;
    debug!(url = %url, generation, "opening feed socket");

    let on_frame: FrameHandler = {
        let slot = ctx.on_message.clone();
        Box::new(move |text| match serde_json::from_str::<T>(text.as_str()) {
            Ok(payload) => {
                if let Ok(guard) = slot.lock()
                    && let Some(cb) = guard.as_ref()
                {
                    cb(payload);
                }
            }
            // Malformed frames are dropped here and never reach the
            // consumer or the lifecycle.
            Err(e) => warn!(error = %e, "dropping malformed feed frame"),
        })
    };

    let on_error: TransportErrorHandler = {
        let slot = ctx.on_error.clone();
        Box::new(move |err| {
            if let Ok(guard) = slot.lock()
                && let Some(cb) = guard.as_ref()
            {
                cb(err);
            }
        })
    };

    let on_close: CloseHandler = {
        let ctx = ctx.clone();
        Box::new(move || {
            tokio::spawn(handle_socket_closed(ctx.clone(), generation));
        })
    };

    match FeedSocket::open(&url, on_frame, on_error, on_close).await {
        Ok(socket) => {
            if ctx.manual_disconnect.load(Ordering::Relaxed)
                || ctx.epoch.load(Ordering::SeqCst) != generation
            {
                // Disconnected or superseded while the handshake was in
                // flight; this socket must not win.
                socket.close().await;
                return;
            }
            *ctx.socket.lock().await = Some(socket);
            ctx.retry_count.store(0, Ordering::Relaxed);
            ctx.set_state(ConnectionState::Open);
            info!(url = %url, "feed connected");
            if let Ok(guard) = ctx.on_connect.lock()
                && let Some(cb) = guard.as_ref()
            {
                cb();
            }
        }
        Err(e) => {
            warn!(url = %url, error = %e, "feed connect failed");
            ctx.set_state(ConnectionState::Closed);
            schedule_retry(&ctx);
        }
    }
}

/// Runs when a socket's read pump exits. Stale notifications (explicit
/// disconnect, superseded generation) are no-ops; a genuine unexpected
/// close drops the dead transport and evaluates the retry policy.
pub(crate) async fn handle_socket_closed<T: DeserializeOwned + 'static>(
    ctx: FeedContext<T>,
    generation: u64,
) {
    if ctx.manual_disconnect.load(Ordering::Relaxed)
        || ctx.epoch.load(Ordering::SeqCst) != generation
    {
        trace!(generation, "ignoring close from a superseded feed socket");
        return;
    }

    // A pending retry timer and an open socket are mutually exclusive;
    // drop the dead transport before scheduling.
    ctx.socket.lock().await.take();
    ctx.set_state(ConnectionState::Closed);
    debug!(generation, "feed socket closed unexpectedly");
    schedule_retry(&ctx);
}

/// Evaluates the retry policy after an unexpected close or a failed
/// connect. Exhaustion is terminal until the consumer calls connect
/// again, and is surfaced through logging only.
pub(crate) fn schedule_retry<T: DeserializeOwned + 'static>(ctx: &FeedContext<T>) {
    let attempt = ctx.retry_count.load(Ordering::Relaxed);
    if attempt >= ctx.policy.max_retries {
        warn!(
            attempts = attempt,
            "feed retry budget exhausted, staying closed until the consumer reconnects"
        );
        return;
    }
    // Arm the timer slot before publishing the new count, so a
    // disconnect racing with this scheduling always finds a token to
    // cancel.
    cancel_any_retry(&ctx.retry_cancel);
    let cancel = CancellationToken::new();
    if let Ok(mut guard) = ctx.retry_cancel.lock() {
        *guard = Some(cancel.clone());
    }
    ctx.retry_count.store(attempt + 1, Ordering::Relaxed);

    info!(
        attempt = attempt + 1,
        max_retries = ctx.policy.max_retries,
        delay_ms = ctx.policy.delay.as_millis() as u64,
        "scheduling feed reconnect"
    );
    tokio::spawn(retry_task(ctx.clone(), cancel));
}

/// Waits out the retry delay, then re-runs the connect path with the
/// same target.
///
/// Returns a boxed future to break the type cycle with [`establish`]
/// (whose close handler eventually schedules this task again).
pub(crate) fn retry_task<T: DeserializeOwned + 'static>(
    ctx: FeedContext<T>,
    cancel: CancellationToken,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("feed reconnect cancelled");
                return;
            }
            _ = tokio::time::sleep(ctx.policy.delay) => {}
        }

        // Release the timer slot; any newer scheduling or an explicit
        // disconnect would have cancelled this token first.
        if let Ok(mut guard) = ctx.retry_cancel.lock() {
            guard.take();
        }
        if cancel.is_cancelled() || ctx.manual_disconnect.load(Ordering::Relaxed) {
            return;
        }

        establish(ctx).await;
    })
}
