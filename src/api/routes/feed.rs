//! Atom feed handler.

use super::FeedQuery;
use crate::api::AppState;
use crate::feed::split_urls;
use crate::validation::validate_urls;
use axum::{
    extract::{Query, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};

/// GET /feed - Atom feed listing the given URLs
///
/// This is the document WebSub hubs fetch after a publish notification.
#[utoipa::path(
    get,
    path = "/feed",
    tag = "feed",
    params(FeedQuery),
    responses(
        (status = 200, description = "Atom 1.0 feed", content_type = "application/atom+xml"),
        (status = 400, description = "Missing or invalid URLs", body = crate::error::ApiError)
    )
)]
pub async fn get_feed(State(state): State<AppState>, Query(query): Query<FeedQuery>) -> Response {
    let raw = split_urls(query.urls.as_deref().unwrap_or_default());

    let urls = match validate_urls(&raw, state.dispatcher.max_urls()) {
        Ok(urls) => urls,
        Err(e) => return crate::error::Error::from(e).into_response(),
    };

    match state.dispatcher.feed().render(&urls) {
        Ok(xml) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "application/atom+xml; charset=utf-8")],
            xml,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
