//! Feed read pump: dispatches inbound frames.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::socket::{CloseHandler, FeedError, FrameHandler, TransportErrorHandler};

/// Reads frames from the WebSocket and dispatches them.
///
/// Exits on cancellation, a close frame, a read error, or stream end.
/// Whatever the exit path, `on_close` fires exactly once at the end; the
/// reconnection layer decides there whether the closure was expected.
pub(crate) async fn read_pump<S>(
    mut read: S,
    on_frame: FrameHandler,
    on_error: TransportErrorHandler,
    on_close: CloseHandler,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            msg = read.next() => {
                match msg {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        on_frame(text);
                    }
                    Some(Ok(tungstenite::Message::Ping(data))) => {
                        trace!("received ping, sending pong");
                        let _ = write_tx.send(tungstenite::Message::Pong(data)).await;
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        debug!(?frame, "received close frame");
                        break;
                    }
                    Some(Ok(_)) => {} // Binary/pong, the feed frames text only
                    Some(Err(e)) => {
                        warn!("feed read error: {e}");
                        on_error(FeedError::Ws(e));
                        break;
                    }
                    None => {
                        debug!("feed stream ended");
                        break;
                    }
                }
            }
        }
    }

    on_close();
}
