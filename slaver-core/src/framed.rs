//! Read exactly N bytes from an async socket within a deadline, or fail distinctly.

use std::fmt;
use std::io;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::codec::PACKAGE_SIZE;

#[derive(Debug)]
pub enum FramedReadError {
    /// The deadline elapsed before `PACKAGE_SIZE` bytes were accumulated.
    Timeout,
    /// The peer closed the connection before a full frame arrived.
    Closed,
    /// Any other transport-level failure.
    Io(io::Error),
}

impl fmt::Display for FramedReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramedReadError::Timeout => write!(f, "timed out reading a control frame"),
            FramedReadError::Closed => write!(f, "peer closed before a full frame arrived"),
            FramedReadError::Io(e) => write!(f, "transport error reading a control frame: {e}"),
        }
    }
}

impl std::error::Error for FramedReadError {}

/// Reads exactly [`PACKAGE_SIZE`] bytes from `stream` within `timeout`, accumulating across
/// partial reads. Never consumes more than `PACKAGE_SIZE` bytes from the stream.
pub async fn read_exact(
    stream: &mut TcpStream,
    timeout: Duration,
) -> Result<[u8; PACKAGE_SIZE], FramedReadError> {
    let mut buf = [0u8; PACKAGE_SIZE];

    match tokio::time::timeout(timeout, stream.read_exact(&mut buf)).await {
        Err(_) => Err(FramedReadError::Timeout),
        Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FramedReadError::Closed),
        Ok(Err(e)) => Err(FramedReadError::Io(e)),
        Ok(Ok(_)) => Ok(buf),
    }
}
