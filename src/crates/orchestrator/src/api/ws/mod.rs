//! Websocket surface: one endpoint, bidirectional — a client sends a single
//! `invoke` frame and receives a stream of [`crate::streaming::StreamEvent`]
//! frames back until `complete`.

pub mod error;
pub mod handler;

pub use error::{WsError, WsResult};
pub use handler::ws_handler;
