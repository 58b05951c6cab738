pub mod common;
pub mod feeds;
pub mod pixel_events;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::services::feeds::FeedGenerationService;
use crate::services::tracking::{DbEventSink, EventQueue, EventService};

/// Aggregated services used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub feeds: Arc<FeedGenerationService>,
    pub events: Arc<EventService>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, config: &AppConfig) -> Self {
        let sink = Arc::new(DbEventSink::new(db.clone()));
        let queue = EventQueue::new(sink, config.event_batch_size, config.flush_interval());

        let events = Arc::new(EventService::new(
            db.clone(),
            queue,
            config.dedup_ttl(),
            config.default_currency.clone(),
        ));

        let feeds = Arc::new(FeedGenerationService::new(
            db,
            config.store_base_url.clone(),
        ));

        Self { feeds, events }
    }

    /// The ingestion queue, exposed for the shutdown hook.
    pub fn event_queue(&self) -> &EventQueue {
        self.events.queue()
    }
}
