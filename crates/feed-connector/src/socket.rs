//! One physical WebSocket connection to the feed.
//!
//! A [`FeedSocket`] is created per connection attempt and cycled by the
//! reconnection layer; the consumer-visible handle is
//! [`FeedConnector`](crate::FeedConnector).

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;

use gsefeed_telemetry_types::constants::FEED_MAX_FRAME_SIZE;

/// Errors from the feed transport.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection closed")]
    Closed,
}

/// Handler for a raw inbound text frame.
pub(crate) type FrameHandler = Box<dyn Fn(tungstenite::Utf8Bytes) + Send + Sync>;

/// Handler for a transport-level error.
pub(crate) type TransportErrorHandler = Box<dyn Fn(FeedError) + Send + Sync>;

/// Handler invoked exactly once, when the read pump exits.
pub(crate) type CloseHandler = Box<dyn Fn() + Send + Sync>;

/// A single physical connection: split stream, read/write pump tasks,
/// and a cancellation token tying their lifetimes together.
pub(crate) struct FeedSocket {
    cancel: tokio_util::sync::CancellationToken,
    _read_handle: tokio::task::JoinHandle<()>,
    _write_handle: tokio::task::JoinHandle<()>,
}

impl FeedSocket {
    /// Opens the WebSocket and starts the pumps.
    ///
    /// The handlers are fixed for the lifetime of this socket; the
    /// close handler fires when the read pump exits for any reason,
    /// including cancellation.
    pub(crate) async fn open(
        url: &str,
        on_frame: FrameHandler,
        on_error: TransportErrorHandler,
        on_close: CloseHandler,
    ) -> Result<Self, FeedError> {
        let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(FEED_MAX_FRAME_SIZE);
        ws_config.max_frame_size = Some(FEED_MAX_FRAME_SIZE);
        let (ws_stream, _) =
            tokio_tungstenite::connect_async_with_config(url, Some(ws_config), false).await?;
        let (write, read) = ws_stream.split();

        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(64);
        let cancel = tokio_util::sync::CancellationToken::new();

        let write_handle = {
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::write::write_pump(write, write_rx, cancel))
        };

        let read_handle = {
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::read::read_pump(
                read, on_frame, on_error, on_close, write_tx, cancel,
            ))
        };

        Ok(Self {
            cancel,
            _read_handle: read_handle,
            _write_handle: write_handle,
        })
    }

    /// Requests closure. The write pump sends the close frame on its way
    /// out; the read pump exits on the cancellation and fires the close
    /// handler.
    pub(crate) async fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for FeedSocket {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
