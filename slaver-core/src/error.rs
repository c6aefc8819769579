use std::fmt;
use std::io;

/// Errors produced over a standby connection's lifetime, from handshake through activation.
#[derive(Debug)]
pub enum SessionError {
    /// `read_exact` did not complete within `spareSlaverTTL`.
    Timeout,
    /// Dial, read or write failed at the transport layer.
    Transport(io::Error),
    /// A frame failed integrity verification, or carried a reserved `pkg_type`.
    Protocol,
    /// Dialing `targetAddr` failed after a successful handshake; the activation is wasted.
    TargetUnreachable(io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Timeout => write!(f, "handshake timed out"),
            SessionError::Transport(e) => write!(f, "transport error: {e}"),
            SessionError::Protocol => write!(f, "protocol error: bad or unexpected control frame"),
            SessionError::TargetUnreachable(e) => write!(f, "target unreachable: {e}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Transport(e) | SessionError::TargetUnreachable(e) => Some(e),
            SessionError::Timeout | SessionError::Protocol => None,
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        SessionError::Transport(e)
    }
}

/// Errors produced while the pool controller attempts to dial the master and stand up a session.
#[derive(Debug)]
pub enum ControllerError {
    /// Dialing the master failed.
    DialMaster(io::Error),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::DialMaster(e) => write!(f, "unable to connect to master: {e}"),
        }
    }
}

impl std::error::Error for ControllerError {}
