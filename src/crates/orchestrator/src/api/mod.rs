//! HTTP/websocket surface for the orchestration engine.
//!
//! Two ways in: a synchronous `POST /invoke` for callers that just want the
//! terminal state, and a `GET /ws` upgrade for callers that want the
//! intermediate [`crate::streaming::StreamEvent`]s as a run progresses.

pub mod error;
pub mod response;
pub mod routes;
pub mod ws;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use response::{ErrorResponse, SuccessResponse};
pub use routes::create_router;
