//! HTTP/websocket route table.

use std::sync::Arc;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::api::{error::ApiResult, response, ws};
use crate::facade::{Facade, InvokeRequest};

/// Shared application state: the one long-lived [`Facade`] every request goes through.
#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<Facade>,
}

/// Build the complete API router.
pub fn create_router(facade: Arc<Facade>) -> Router {
    let state = AppState { facade };

    Router::new()
        .route("/health", get(health))
        .route("/invoke", post(invoke))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    response::ok(json!({ "status": "ok" }))
}

/// Synchronous request/response invoke — runs one request to completion with
/// no streaming subscriber and returns the terminal state.
async fn invoke(State(state): State<AppState>, Json(request): Json<InvokeRequest>) -> ApiResult<impl IntoResponse> {
    let result = state.facade.invoke(request, None).await?;
    Ok(response::ok(result))
}
