//! Shared utilities for integration testing.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use relay_ingest::ingest::BodySource;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

/// What the mock upstream does with one connection.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum UpstreamReply {
    /// Write the body, then close.
    Body(Vec<u8>),
    /// Wait, then write the body and close.
    Delayed(Duration, Vec<u8>),
    /// Keep the connection open without writing.
    Stall,
}

/// Start a mock upstream on an ephemeral port.
///
/// `reply` runs once per accepted connection.
pub async fn start_programmable_upstream<F, Fut>(reply: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = UpstreamReply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let reply = Arc::new(reply);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let reply = reply.clone();
                    tokio::spawn(async move {
                        match reply().await {
                            UpstreamReply::Body(body) => {
                                let _ = socket.write_all(&body).await;
                            }
                            UpstreamReply::Delayed(delay, body) => {
                                tokio::time::sleep(delay).await;
                                let _ = socket.write_all(&body).await;
                            }
                            UpstreamReply::Stall => {
                                tokio::time::sleep(Duration::from_secs(60)).await;
                            }
                        }
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock upstream that always sends the same reply.
#[allow(dead_code)]
pub async fn start_mock_upstream(reply: UpstreamReply) -> SocketAddr {
    start_programmable_upstream(move || {
        let reply = reply.clone();
        async move { reply }
    })
    .await
}

/// Body source that opens a new TCP connection per attempt.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct TcpSource {
    addr: SocketAddr,
    label: String,
    opens: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl TcpSource {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            label: format!("tcp://{}", addr),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of connections opened so far.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl BodySource for TcpSource {
    type Reader = TcpStream;

    fn open(&self) -> impl Future<Output = io::Result<Self::Reader>> + Send {
        self.opens.fetch_add(1, Ordering::SeqCst);
        TcpStream::connect(self.addr)
    }

    fn label(&self) -> &str {
        &self.label
    }
}
