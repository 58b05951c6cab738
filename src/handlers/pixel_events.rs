use axum::{
    extract::{Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::tracked_event::TrackedEventType,
    errors::ApiError,
    handlers::common::{accepted_response, success_response},
    services::tracking::IncomingEvent,
    AppState,
};

/// Routes for the behavioral-event ingestion pipeline.
pub fn pixel_event_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_events))
        .route("/", get(list_events))
}

/// The endpoint accepts a single event object or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventSubmission {
    One(IncomingEvent),
    Many(Vec<IncomingEvent>),
}

impl EventSubmission {
    fn into_events(self) -> Vec<IncomingEvent> {
        match self {
            EventSubmission::One(event) => vec![event],
            EventSubmission::Many(events) => events,
        }
    }
}

#[instrument(skip(state, submission))]
async fn submit_events(
    State(state): State<AppState>,
    Json(submission): Json<EventSubmission>,
) -> Result<Response, ApiError> {
    let events = submission.into_events();
    if events.is_empty() {
        return Err(ApiError::BadRequest {
            message: "event batch is empty".to_string(),
        });
    }

    let validated = state
        .services
        .events
        .validate(&events)
        .map_err(ApiError::Validation)?;

    let outcome = state.services.events.ingest(validated).await;

    Ok(accepted_response(json!({
        "queued": outcome.queued,
        "deduplicated": outcome.deduplicated,
        "queue_size": outcome.queue_size,
    })))
}

#[derive(Debug, Deserialize)]
struct ListEventsQuery {
    limit: Option<u64>,
    offset: Option<u64>,
    platform_id: Option<Uuid>,
    event_type: Option<String>,
}

#[instrument(skip(state))]
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Response, ApiError> {
    let limit = query
        .limit
        .unwrap_or(state.config.events_default_page_size)
        .min(state.config.events_max_page_size);
    let offset = query.offset.unwrap_or(0);

    let event_type = match query.event_type.as_deref() {
        Some(raw) => Some(TrackedEventType::from_str(raw).map_err(|_| ApiError::BadRequest {
            message: format!("unknown event type: {raw}"),
        })?),
        None => None,
    };

    let events = state
        .services
        .events
        .list(limit, offset, query.platform_id, event_type)
        .await?;

    Ok(success_response(json!({
        "events": events,
        "limit": limit,
        "offset": offset,
    })))
}
