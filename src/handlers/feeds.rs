use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method},
    response::Response,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::instrument;

use crate::{
    entities::feed_config,
    errors::ApiError,
    services::feeds::GeneratedFeed,
    AppState,
};

/// Routes serving generated feed documents to advertising-platform
/// crawlers. Crawlers fetch cross-origin, so GET/OPTIONS are open to any
/// origin.
pub fn feed_routes() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/{slug}", get(get_feed))
        .layer(cors)
}

#[instrument(skip(state))]
async fn get_feed(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    // A slug that cannot exist is a 404 before any lookup; it also never
    // leaves an audit row, same as an unknown slug.
    if !feed_config::is_valid_slug(&slug) {
        return Err(ApiError::NotFound(format!("feed '{slug}' not found")));
    }

    let feed = state.services.feeds.generate_by_slug(&slug).await?;

    Ok(into_feed_response(feed))
}

fn into_feed_response(feed: GeneratedFeed) -> Response {
    let mut response = Response::new(feed.body.into());

    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(feed.content_type),
    );

    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", feed.cache_seconds)) {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, value);
    }

    // Exposed for the external "test feed" health check.
    if let Ok(value) = HeaderValue::from_str(&feed.product_count.to_string()) {
        response.headers_mut().insert("X-Feed-Product-Count", value);
    }
    if let Ok(value) = HeaderValue::from_str(&feed.generation_time_ms.to_string()) {
        response
            .headers_mut()
            .insert("X-Feed-Generation-Time-Ms", value);
    }

    response
}
