//! REST API server module
//!
//! Exposes the ping fan-out over HTTP, the Atom feed WebSub hubs fetch, and
//! a few operational endpoints.

use crate::dispatcher::panic_message;
use crate::error::ApiError;
use crate::{Config, PingDispatcher, Result};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// - `POST /ping` - Fan a list of URLs out to every configured service
/// - `GET /feed?urls=...` - Atom feed announced to WebSub hubs
/// - `GET /health` - Health check
/// - `GET /services` - Configured services
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(dispatcher: Arc<PingDispatcher>, config: Arc<Config>) -> Router {
    let state = AppState::new(dispatcher, config.clone());

    let ping_routes = Router::new().route(
        "/ping",
        post(routes::ping).fallback(routes::ping_method_not_allowed),
    );

    // Only /ping is rate limited
    let ping_routes = if config.api.rate_limit.enabled {
        let limiter = Arc::new(rate_limit::RateLimiter::new(config.api.rate_limit.clone()));
        ping_routes.route_layer(middleware::from_fn_with_state(
            limiter,
            rate_limit::rate_limit_middleware,
        ))
    } else {
        ping_routes
    };

    let router = Router::new()
        .merge(ping_routes)
        .route("/feed", get(routes::get_feed))
        .route("/health", get(routes::health_check))
        .route("/services", get(routes::list_services))
        .route("/openapi.json", get(routes::openapi_spec));

    // SwaggerUi serves its own copy of the OpenAPI document under a separate path
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.api.max_body_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Turn a handler panic into a generic 500 JSON response
fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!(panic = %panic_message(payload.as_ref()), "request handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::internal("An internal error occurred")),
    )
        .into_response()
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until SIGTERM/SIGINT (Ctrl+C elsewhere), then stops accepting
/// connections and lets in-flight requests finish.
///
/// # Example
///
/// ```no_run
/// use pingcast::{Config, PingDispatcher};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let dispatcher = Arc::new(PingDispatcher::new(&config)?);
///
/// // Blocks until shutdown
/// pingcast::api::start_api_server(dispatcher, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(dispatcher: Arc<PingDispatcher>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(dispatcher, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(bind_address),
        "API server listening"
    );

    // ConnectInfo<SocketAddr> is needed by the rate limiting middleware
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(crate::wait_for_signal())
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
