//! Axum router construction.
//!
//! Builds the application router with the picture routes, the health check,
//! and the middleware layers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use pv_core::config::CorsConfig;

use crate::context::AppContext;
use crate::middleware::request_id::{request_id_middleware, X_REQUEST_ID};
use crate::routes;
use crate::routes::pictures::X_SESSION_ID;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = cors_layer(&ctx.config.cors);

    let api = Router::new()
        .route("/upload", post(routes::pictures::upload))
        .route(
            "/pictures",
            get(routes::pictures::get_latest).delete(routes::pictures::delete_latest),
        )
        .route(
            "/pictures/{id}",
            get(routes::pictures::get_picture).delete(routes::pictures::delete_picture),
        )
        .route("/gallery", get(routes::pictures::list_gallery));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {origin:?}");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, X_SESSION_ID.clone()])
        .expose_headers([X_SESSION_ID.clone(), X_REQUEST_ID.clone()])
}
