//! OpenAPI documentation and schema generation
//!
//! Uses utoipa for compile-time OpenAPI generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the pingcast REST API
///
/// The document can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "pingcast REST API",
        version = "0.1.0",
        description = "Notify WebSub hubs and XML-RPC blog ping services about updated pages",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://127.0.0.1:8787", description = "Local development server")
    ),
    paths(
        // Ping
        crate::api::routes::ping,

        // Feed
        crate::api::routes::get_feed,

        // System
        crate::api::routes::health_check,
        crate::api::routes::list_services,
        crate::api::routes::openapi_spec,
    ),
    components(
        schemas(
            crate::api::routes::PingRequest,
            crate::types::PingReport,
            crate::types::ServiceReport,
            crate::types::ServiceInfo,
            crate::types::PingMethod,
            crate::error::ApiError,
            crate::error::ErrorDetail,
        )
    ),
    tags(
        (name = "ping", description = "Fan-out to WebSub hubs and XML-RPC ping services"),
        (name = "feed", description = "Atom feed announced to WebSub hubs"),
        (name = "system", description = "Health, configured services and API documentation")
    )
)]
pub struct ApiDoc;
