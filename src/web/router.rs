//! Web application router and middleware setup.

use crate::web::config::WebConfig;
use crate::web::{handlers, websocket, AppState};
use axum::{
    http::{header, HeaderName, Method},
    routing::get,
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the axum application with all routes and middleware.
///
/// The push channel is served on `/` so clients only need host and port;
/// `/ws` is kept as an alias.
pub fn create_app(config: &WebConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route(
            "/api/static",
            get(handlers::get_static).fallback(handlers::fallback),
        )
        .route(
            "/api/health",
            get(handlers::health_check).fallback(handlers::fallback),
        )
        .route(
            "/",
            get(websocket::websocket_handler).fallback(handlers::fallback),
        )
        .route(
            "/ws",
            get(websocket::websocket_handler).fallback(handlers::fallback),
        )
        .fallback(handlers::fallback)
        .with_state(state);

    if config.enable_cors {
        app = app.layer(cors_layer());
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Any origin, the usual methods and headers, preflights cached for a day.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .max_age(Duration::from_secs(86_400))
}
