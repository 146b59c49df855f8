//! Websocket protocol errors: malformed or out-of-order client frames.
//!
//! Transport failures (socket drop, send error) aren't protocol violations —
//! [`super::handler`] just ends the connection task for those, no variant
//! needed here.

use std::fmt;

/// What went wrong decoding a client frame, before the run itself starts.
#[derive(Debug, Clone)]
pub enum WsError {
    /// The frame wasn't valid JSON, or didn't match the `invoke` shape.
    InvalidMessage(String),
    /// The socket closed before an `invoke` frame ever arrived.
    NoInvokeReceived,
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WsError::InvalidMessage(msg) => write!(f, "invalid message: {msg}"),
            WsError::NoInvokeReceived => write!(f, "connection closed before an invoke message arrived"),
        }
    }
}

impl std::error::Error for WsError {}

pub type WsResult<T> = Result<T, WsError>;
