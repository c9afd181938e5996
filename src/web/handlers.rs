//! HTTP handlers for the pull endpoints.

use crate::metrics::format::now_millis;
use crate::web::messages::ServerMessage;
use crate::web::AppState;
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{error, info};

/// Current static snapshot, wrapped as a `static` message.
pub async fn get_static(State(state): State<AppState>) -> Response {
    let source = state.source.clone();

    match tokio::task::spawn_blocking(move || source.static_snapshot()).await {
        Ok(data) => {
            info!("Static data served via HTTP");
            Json(ServerMessage::Static {
                data,
                timestamp: now_millis(),
            })
            .into_response()
        }
        Err(e) => {
            error!("Error serving static data: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve static data",
            )
        }
    }
}

/// Health check endpoint. Reports liveness only; collectors are not probed.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": now_millis(),
        "services": {
            "http": "running",
            "websocket": "running"
        }
    }))
}

/// Unknown path or method.
pub async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

/// Fallback for every unmatched request; preflights get an empty 200.
pub async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        not_found().await
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": message,
            "timestamp": now_millis()
        })),
    )
        .into_response()
}
