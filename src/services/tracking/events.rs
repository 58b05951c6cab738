use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::entities::tracked_event::{self, TrackedEventType};
use crate::errors::{FieldError, ServiceError};
use crate::services::tracking::dedup::DedupGuard;
use crate::services::tracking::queue::{EventQueue, NewTrackedEvent};

/// Add-to-cart call sites tolerate a shorter suppression window than the
/// guard default.
const ADD_TO_CART_TTL: Duration = Duration::from_millis(3000);

/// Raw event payload as submitted by the storefront UI.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IncomingEvent {
    pub pixel_platform_id: Option<Uuid>,
    pub event_type: Option<String>,
    pub value: Option<Decimal>,
    pub currency: Option<String>,
    pub product_id: Option<String>,
    pub order_id: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Result of one ingestion call, echoed back to the producer.
#[derive(Debug, Clone, Copy)]
pub struct IngestOutcome {
    /// Events that passed the dedup guard and entered the queue
    pub queued: usize,
    /// Events suppressed as duplicates (still a success for the producer)
    pub deduplicated: usize,
    /// Buffer length after the last accepted event
    pub queue_size: usize,
}

/// Accepts behavioral events: validates, deduplicates, and hands survivors
/// to the ingestion queue. Tracking never throws past this boundary; a
/// broken pixel must not break the storefront flow around it.
pub struct EventService {
    db: Arc<DatabaseConnection>,
    queue: EventQueue,
    guard: Mutex<DedupGuard>,
    default_currency: String,
}

impl EventService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        queue: EventQueue,
        dedup_ttl: Duration,
        default_currency: String,
    ) -> Self {
        Self {
            db,
            queue,
            guard: Mutex::new(DedupGuard::new(dedup_ttl)),
            default_currency,
        }
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Validate a submitted batch. All field errors across all events are
    /// collected so the producer can fix everything in one round trip.
    pub fn validate(&self, events: &[IncomingEvent]) -> Result<Vec<NewTrackedEvent>, Vec<FieldError>> {
        let mut validated = Vec::with_capacity(events.len());
        let mut errors = Vec::new();

        for (index, event) in events.iter().enumerate() {
            let mut push_error = |field: &str, message: &str| {
                errors.push(FieldError {
                    index,
                    field: field.to_string(),
                    message: message.to_string(),
                });
            };

            let platform_id = match event.pixel_platform_id {
                Some(id) => Some(id),
                None => {
                    push_error("pixel_platform_id", "pixel_platform_id is required");
                    None
                }
            };

            let event_type = match event.event_type.as_deref() {
                Some(raw) => match TrackedEventType::from_str(raw) {
                    Ok(parsed) => Some(parsed),
                    Err(_) => {
                        push_error("event_type", "unknown event type");
                        None
                    }
                },
                None => {
                    push_error("event_type", "event_type is required");
                    None
                }
            };

            if event_type == Some(TrackedEventType::Purchase)
                && event
                    .order_id
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default()
                    .is_empty()
            {
                push_error("order_id", "order_id is required for purchase events");
            }

            let (Some(platform_id), Some(event_type)) = (platform_id, event_type) else {
                continue;
            };

            validated.push(NewTrackedEvent {
                pixel_platform_id: platform_id,
                event_type,
                value: event.value,
                currency: event
                    .currency
                    .clone()
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| self.default_currency.clone()),
                product_id: event.product_id.clone(),
                order_id: event.order_id.clone(),
                user_id: event.user_id.clone(),
                session_id: event.session_id.clone(),
                metadata: event.metadata.clone().unwrap_or_else(|| json!({})),
                created_at: Utc::now(),
            });
        }

        if errors.is_empty() {
            Ok(validated)
        } else {
            Err(errors)
        }
    }

    /// Run validated events through the dedup guard and enqueue survivors.
    pub async fn ingest(&self, events: Vec<NewTrackedEvent>) -> IngestOutcome {
        let mut queued = 0;
        let mut deduplicated = 0;
        let mut queue_size = self.queue.len();

        for event in events {
            if !self.passes_dedup(&event) {
                deduplicated += 1;
                debug!(event_type = %event.event_type, "suppressed duplicate event");
                continue;
            }

            queue_size = self.queue.enqueue(event).await;
            queued += 1;
        }

        IngestOutcome {
            queued,
            deduplicated,
            queue_size,
        }
    }

    fn passes_dedup(&self, event: &NewTrackedEvent) -> bool {
        let mut guard = self.guard.lock().expect("dedup guard lock poisoned");

        if event.event_type == TrackedEventType::Purchase {
            // order_id presence was enforced during validation
            let order_id = event.order_id.as_deref().unwrap_or_default();
            return guard.track_purchase(event.pixel_platform_id, order_id);
        }

        let identity = json!({
            "platform": event.pixel_platform_id,
            "session": event.session_id,
            "product": event.product_id,
            "value": event.value,
        });

        if event.event_type == TrackedEventType::AddToCart {
            guard.with_ttl(ADD_TO_CART_TTL, |g| {
                g.should_track(TrackedEventType::AddToCart, &identity)
            })
        } else {
            guard.should_track(event.event_type, &identity)
        }
    }

    /// Newest-first listing with optional platform and event-type filters.
    pub async fn list(
        &self,
        limit: u64,
        offset: u64,
        platform_id: Option<Uuid>,
        event_type: Option<TrackedEventType>,
    ) -> Result<Vec<tracked_event::Model>, ServiceError> {
        let mut query = tracked_event::Entity::find()
            .order_by_desc(tracked_event::Column::CreatedAt)
            .limit(limit)
            .offset(offset);

        if let Some(platform_id) = platform_id {
            query = query.filter(tracked_event::Column::PixelPlatformId.eq(platform_id));
        }
        if let Some(event_type) = event_type {
            query = query.filter(tracked_event::Column::EventType.eq(event_type));
        }

        Ok(query.all(&*self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::tracking::queue::EventSink;
    use async_trait::async_trait;

    struct NullSink;

    #[async_trait]
    impl EventSink for NullSink {
        async fn write_batch(&self, _events: Vec<NewTrackedEvent>) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    fn service() -> EventService {
        let queue = EventQueue::new(Arc::new(NullSink), 50, Duration::from_secs(60));
        EventService::new(
            Arc::new(DatabaseConnection::Disconnected),
            queue,
            Duration::from_millis(5000),
            "USD".to_string(),
        )
    }

    fn incoming(event_type: &str) -> IncomingEvent {
        IncomingEvent {
            pixel_platform_id: Some(Uuid::new_v4()),
            event_type: Some(event_type.to_string()),
            session_id: Some("sess-1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_required_fields_report_per_field_errors() {
        let svc = service();
        let errors = svc
            .validate(&[IncomingEvent::default()])
            .unwrap_err();

        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"pixel_platform_id"));
        assert!(fields.contains(&"event_type"));
    }

    #[test]
    fn purchase_without_order_id_is_rejected() {
        let svc = service();
        let errors = svc.validate(&[incoming("purchase")]).unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "order_id");
        assert_eq!(errors[0].index, 0);
    }

    #[test]
    fn batch_errors_carry_the_event_index() {
        let svc = service();
        let mut bad = incoming("view_content");
        bad.event_type = Some("bogus".to_string());
        let errors = svc.validate(&[incoming("page_view"), bad]).unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].index, 1);
        assert_eq!(errors[0].field, "event_type");
    }

    #[test]
    fn currency_defaults_when_omitted() {
        let svc = service();
        let validated = svc.validate(&[incoming("page_view")]).unwrap();
        assert_eq!(validated[0].currency, "USD");

        let mut with_currency = incoming("page_view");
        with_currency.currency = Some("PKR".to_string());
        let validated = svc.validate(&[with_currency]).unwrap();
        assert_eq!(validated[0].currency, "PKR");
    }

    #[tokio::test]
    async fn duplicate_events_are_suppressed_before_the_queue() {
        let svc = service();
        let mut event = incoming("view_content");
        event.product_id = Some("ASH-100".to_string());

        let validated = svc.validate(&[event.clone(), event]).unwrap();
        let outcome = svc.ingest(validated).await;

        assert_eq!(outcome.queued, 1);
        assert_eq!(outcome.deduplicated, 1);
        assert_eq!(outcome.queue_size, 1);
    }

    #[tokio::test]
    async fn repeated_purchase_for_one_order_is_dropped() {
        let svc = service();
        let platform = Uuid::new_v4();
        let mut purchase = incoming("purchase");
        purchase.pixel_platform_id = Some(platform);
        purchase.order_id = Some("ORDER-77".to_string());

        let first = svc.validate(&[purchase.clone()]).unwrap();
        let outcome = svc.ingest(first).await;
        assert_eq!(outcome.queued, 1);

        let second = svc.validate(&[purchase]).unwrap();
        let outcome = svc.ingest(second).await;
        assert_eq!(outcome.queued, 0);
        assert_eq!(outcome.deduplicated, 1);
    }
}
