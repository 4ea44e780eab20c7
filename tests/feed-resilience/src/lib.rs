//! In-process WebSocket feed server for resilience tests.
//!
//! Each accepted connection is handed to the test as a [`Session`], so
//! the test scripts sends, clean closes, and abrupt drops explicitly.
//! The server counts TCP accepts and records upgrade-request paths,
//! which is how the tests observe connect attempts and endpoint
//! construction.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite;

/// One established feed session, driven by the test.
pub struct Session {
    ws: WebSocketStream<TcpStream>,
}

impl Session {
    /// Sends one text frame to the connected client.
    pub async fn send_text(&mut self, text: &str) {
        self.ws
            .send(tungstenite::Message::Text(text.into()))
            .await
            .expect("send to client");
    }

    /// Drops the connection without a close handshake, so the client sees
    /// an unexpected close.
    pub fn abort(self) {
        drop(self);
    }

    /// Blocks until the client closes the connection from its side.
    pub async fn wait_peer_close(&mut self) {
        while let Some(msg) = self.ws.next().await {
            match msg {
                Ok(tungstenite::Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
    }
}

/// Local feed server. Dropping it stops the accept loop.
pub struct FeedServer {
    addr: SocketAddr,
    accepts: Arc<AtomicUsize>,
    paths: Arc<std::sync::Mutex<Vec<String>>>,
    sessions: mpsc::UnboundedReceiver<Session>,
    accept_task: tokio::task::JoinHandle<()>,
}

impl FeedServer {
    /// Completes WebSocket handshakes and hands each session to the
    /// test.
    pub async fn spawn() -> Self {
        Self::spawn_inner(true).await
    }

    /// Accepts TCP and immediately drops it, so every client connect
    /// attempt fails. Accepts are still counted, which lets tests count
    /// attempts.
    pub async fn spawn_refusing() -> Self {
        Self::spawn_inner(false).await
    }

    async fn spawn_inner(handshake: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let accepts = Arc::new(AtomicUsize::new(0));
        let paths = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (session_tx, sessions) = mpsc::unbounded_channel();

        let accepts_loop = accepts.clone();
        let paths_loop = paths.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                accepts_loop.fetch_add(1, Ordering::SeqCst);
                if !handshake {
                    drop(stream);
                    continue;
                }

                let paths_cb = paths_loop.clone();
                let callback = move |req: &tungstenite::handshake::server::Request,
                                     resp: tungstenite::handshake::server::Response| {
                    paths_cb.lock().unwrap().push(req.uri().to_string());
                    Ok(resp)
                };
                if let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await {
                    let _ = session_tx.send(Session { ws });
                }
            }
        });

        Self {
            addr,
            accepts,
            paths,
            sessions,
            accept_task,
        }
    }

    /// Feed base URL for this server.
    pub fn url(&self) -> String {
        format!("ws://{}/feed/vehicles", self.addr)
    }

    /// TCP accepts so far, one per client connect attempt.
    pub fn accept_count(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }

    /// Upgrade-request paths in arrival order.
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    /// Waits for the next established session.
    pub async fn next_session(&mut self) -> Session {
        tokio::time::timeout(Duration::from_secs(5), self.sessions.recv())
            .await
            .expect("timed out waiting for a session")
            .expect("server stopped")
    }

    /// Asserts no session is established within `dur`.
    pub async fn assert_no_session_for(&mut self, dur: Duration) {
        assert!(
            tokio::time::timeout(dur, self.sessions.recv()).await.is_err(),
            "unexpected session established"
        );
    }
}

impl Drop for FeedServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// Polls `cond` every 10 ms, panicking after 5 s.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s: {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
