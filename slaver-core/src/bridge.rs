//! Duplex byte pump between a master-side and a target-side socket.
//!
//! Each pair gets two independent unidirectional pumps. When one pump's read side hits EOF
//! or an error, it half-closes the write side of the *other* socket so the counterpart pump
//! can drain whatever is still in flight and exit on its own terms. Once both pumps are
//! done, both sockets are closed (idempotently) and the completion callback fires exactly
//! once.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Chunk size used for each individual copy, matching a single kernel-sized read.
const BUFFER_SIZE: usize = 16 * 1024;

/// Splices two connected TCP sockets together.
///
/// There is no per-instance state to start ahead of time; each call to [`add_conn_pair`]
/// spawns its own pair of tasks. The type exists to give the bridge a name at the call site
/// and to mirror the "start, then add pairs" shape of the original design.
pub struct SocketBridge;

impl SocketBridge {
    pub fn new() -> SocketBridge {
        SocketBridge
    }

    /// Splices `a` and `b` together and invokes `on_done` exactly once, after both sockets
    /// have been closed. Returns immediately; the bridge owns both sockets from this point.
    pub fn add_conn_pair<F>(&self, a: TcpStream, b: TcpStream, on_done: F)
    where
        F: FnOnce() + Send + 'static,
    {
        tokio::spawn(async move {
            let (a_read, a_write) = a.into_split();
            let (b_read, b_write) = b.into_split();

            let a_to_b = tokio::spawn(pump(a_read, b_write));
            let b_to_a = tokio::spawn(pump(b_read, a_write));

            let _ = tokio::join!(a_to_b, b_to_a);
            on_done();
        });
    }
}

impl Default for SocketBridge {
    fn default() -> Self {
        SocketBridge::new()
    }
}

/// Copies bytes from `read` to `write` until EOF or error, then half-closes `write`'s peer
/// by shutting down `write` itself so the counterpart pump observes the close.
async fn pump(
    mut read: tokio::net::tcp::OwnedReadHalf,
    mut write: tokio::net::tcp::OwnedWriteHalf,
) {
    let mut buf = [0u8; BUFFER_SIZE];

    loop {
        let n = match read.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };

        if write.write_all(&buf[..n]).await.is_err() {
            break;
        }
    }

    let _ = write.shutdown().await;
}
