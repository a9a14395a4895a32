//! Ping fan-out handler.

use super::PingRequest;
use crate::api::AppState;
use crate::api::error_response::invalid_json;
use crate::error::Error;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};

/// POST /ping - Notify every configured service about updated URLs
#[utoipa::path(
    post,
    path = "/ping",
    tag = "ping",
    request_body = PingRequest,
    responses(
        (status = 200, description = "Per-service results", body = crate::types::PingReport),
        (status = 400, description = "Invalid URLs or malformed JSON", body = crate::error::ApiError),
        (status = 405, description = "Method other than POST", body = crate::error::ApiError),
        (status = 413, description = "Request body too large", body = crate::error::ApiError),
        (status = 429, description = "Rate limit exceeded", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn ping(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PingRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Error::PayloadTooLarge {
                limit: state.config.api.max_body_bytes,
            }
            .into_response();
        }
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected ping body");
            return invalid_json(rejection.body_text());
        }
    };

    match state
        .dispatcher
        .ping(&request.urls, request.services.as_deref())
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            tracing::info!(error = %e, "ping request rejected");
            e.into_response()
        }
    }
}

/// Any method other than POST on /ping
pub async fn ping_method_not_allowed(method: Method) -> Response {
    Error::MethodNotAllowed {
        method: method.to_string(),
    }
    .into_response()
}
