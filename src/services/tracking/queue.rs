use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::tracked_event::{self, TrackedEventType};
use crate::errors::ServiceError;

/// Buffer size that triggers an immediate flush.
pub const BATCH_SIZE: usize = 50;

/// A validated event waiting for its durable write.
#[derive(Clone, Debug, PartialEq)]
pub struct NewTrackedEvent {
    pub pixel_platform_id: Uuid,
    pub event_type: TrackedEventType,
    pub value: Option<Decimal>,
    pub currency: String,
    pub product_id: Option<String>,
    pub order_id: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl NewTrackedEvent {
    fn into_active_model(self) -> tracked_event::ActiveModel {
        tracked_event::ActiveModel {
            id: Set(Uuid::new_v4()),
            pixel_platform_id: Set(self.pixel_platform_id),
            event_type: Set(self.event_type),
            value: Set(self.value),
            currency: Set(self.currency),
            product_id: Set(self.product_id),
            order_id: Set(self.order_id),
            user_id: Set(self.user_id),
            session_id: Set(self.session_id),
            metadata: Set(self.metadata),
            created_at: Set(self.created_at),
        }
    }
}

/// The durable write the queue performs. Injected so tests can observe or
/// fail batches, and so no ambient SDK handle leaks into the queue.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn write_batch(&self, events: Vec<NewTrackedEvent>) -> Result<(), ServiceError>;
}

/// Production sink: batched insert into `tracked_events`. The single-row
/// case takes the plain insert path, multi-row batches go through one
/// `insert_many` statement.
pub struct DbEventSink {
    db: Arc<DatabaseConnection>,
}

impl DbEventSink {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventSink for DbEventSink {
    async fn write_batch(&self, events: Vec<NewTrackedEvent>) -> Result<(), ServiceError> {
        match events.len() {
            0 => Ok(()),
            1 => {
                let event = events.into_iter().next().unwrap();
                event.into_active_model().insert(&*self.db).await?;
                Ok(())
            }
            _ => {
                let models = events.into_iter().map(NewTrackedEvent::into_active_model);
                tracked_event::Entity::insert_many(models)
                    .exec(&*self.db)
                    .await?;
                Ok(())
            }
        }
    }
}

struct QueueState {
    buffer: Vec<NewTrackedEvent>,
    timer: Option<JoinHandle<()>>,
}

struct QueueInner {
    state: Mutex<QueueState>,
    sink: Arc<dyn EventSink>,
    batch_size: usize,
    flush_interval: Duration,
}

/// Server-side ingestion buffer: accepts events from concurrent producers,
/// flushes by size or timer, and re-queues on a failed write.
///
/// Within one queue instance events flush in FIFO arrival order. Delivery
/// is at-least-once: a write failure puts the snapshot back at the front of
/// the buffer, so duplicates are possible across a crash/retry boundary.
#[derive(Clone)]
pub struct EventQueue {
    inner: Arc<QueueInner>,
}

impl EventQueue {
    pub fn new(sink: Arc<dyn EventSink>, batch_size: usize, flush_interval: Duration) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    buffer: Vec::new(),
                    timer: None,
                }),
                sink,
                batch_size: batch_size.max(1),
                flush_interval,
            }),
        }
    }

    /// Append one event. Returns the buffer length right after the append,
    /// before any flush this call triggers.
    pub async fn enqueue(&self, event: NewTrackedEvent) -> usize {
        let (queued_len, flush_now) = {
            let mut state = self.inner.state.lock().expect("queue lock poisoned");
            state.buffer.push(event);
            let len = state.buffer.len();

            // Every enqueue cancels the pending timer; either the size
            // threshold flushes right now or a fresh single-shot timer covers
            // the at-most-FLUSH_INTERVAL guarantee.
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }

            if len >= self.inner.batch_size {
                (len, true)
            } else {
                state.timer = Some(self.spawn_timer());
                (len, false)
            }
        };

        if flush_now {
            self.flush().await;
        }

        queued_len
    }

    /// Drain the buffer and perform one durable batched write. The buffer is
    /// swapped out *before* the write so concurrent enqueues build a fresh
    /// buffer instead of racing on the in-flight one. Failures re-queue the
    /// snapshot at the front and are not raised.
    pub async fn flush(&self) {
        let snapshot = {
            let mut state = self.inner.state.lock().expect("queue lock poisoned");
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            std::mem::take(&mut state.buffer)
        };

        if snapshot.is_empty() {
            return;
        }

        let count = snapshot.len();
        match self.inner.sink.write_batch(snapshot.clone()).await {
            Ok(()) => {
                debug!(count, "flushed tracked events");
            }
            Err(err) => {
                warn!(count, error = %err, "event flush failed; re-queueing batch");
                let mut state = self.inner.state.lock().expect("queue lock poisoned");
                // Arrival order: the failed snapshot goes back in front of
                // anything enqueued during the write.
                let newer = std::mem::take(&mut state.buffer);
                let mut restored = snapshot;
                restored.extend(newer);
                state.buffer = restored;

                if state.timer.is_none() {
                    state.timer = Some(self.spawn_timer());
                }
            }
        }
    }

    /// Final flush attempt for process shutdown. Best-effort: there is no
    /// guarantee the write completes before exit.
    pub async fn shutdown(&self) {
        self.flush().await;
    }

    /// Current number of buffered (unflushed) events.
    pub fn len(&self) -> usize {
        self.inner
            .state
            .lock()
            .expect("queue lock poisoned")
            .buffer
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spawn_timer(&self) -> JoinHandle<()> {
        let queue = self.clone();
        let interval = self.inner.flush_interval;
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            queue.flush().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Recording sink that can be told to fail the next N writes.
    struct RecordingSink {
        batches: Mutex<Vec<Vec<NewTrackedEvent>>>,
        failures_remaining: Mutex<usize>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                batches: Mutex::new(Vec::new()),
                failures_remaining: Mutex::new(0),
            })
        }

        fn failing(times: usize) -> Arc<Self> {
            let sink = Self::new();
            *sink.failures_remaining.lock().unwrap() = times;
            sink
        }

        fn batches(&self) -> Vec<Vec<NewTrackedEvent>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn write_batch(&self, events: Vec<NewTrackedEvent>) -> Result<(), ServiceError> {
            {
                let mut failures = self.failures_remaining.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    return Err(ServiceError::QueueError("simulated write failure".into()));
                }
            }
            self.batches.lock().unwrap().push(events);
            Ok(())
        }
    }

    fn event(product: &str) -> NewTrackedEvent {
        NewTrackedEvent {
            pixel_platform_id: Uuid::new_v4(),
            event_type: TrackedEventType::ViewContent,
            value: Some(dec!(1200)),
            currency: "PKR".to_string(),
            product_id: Some(product.to_string()),
            order_id: None,
            user_id: None,
            session_id: Some("sess-1".to_string()),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn batch_size_triggers_exactly_one_full_flush() {
        let sink = RecordingSink::new();
        let queue = EventQueue::new(sink.clone(), BATCH_SIZE, Duration::from_secs(60));

        for i in 0..BATCH_SIZE {
            queue.enqueue(event(&format!("P-{i}"))).await;
        }

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), BATCH_SIZE);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn below_threshold_nothing_flushes_until_the_timer_fires() {
        let sink = RecordingSink::new();
        let queue = EventQueue::new(sink.clone(), BATCH_SIZE, Duration::from_millis(30));

        queue.enqueue(event("P-1")).await;
        queue.enqueue(event("P-2")).await;
        assert_eq!(queue.len(), 2);
        assert!(sink.batches().is_empty());

        tokio::time::sleep(Duration::from_millis(80)).await;

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn failed_write_requeues_in_fifo_order() {
        let sink = RecordingSink::failing(1);
        let queue = EventQueue::new(sink.clone(), BATCH_SIZE, Duration::from_secs(60));

        queue.enqueue(event("P-1")).await;
        queue.enqueue(event("P-2")).await;
        queue.flush().await;

        // Write failed; everything is back in the buffer, oldest first.
        assert_eq!(queue.len(), 2);
        assert!(sink.batches().is_empty());

        queue.enqueue(event("P-3")).await;
        queue.flush().await;

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        let products: Vec<_> = batches[0]
            .iter()
            .map(|e| e.product_id.clone().unwrap())
            .collect();
        assert_eq!(products, vec!["P-1", "P-2", "P-3"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn enqueue_during_failed_write_lands_behind_the_snapshot() {
        let sink = RecordingSink::failing(1);
        let queue = EventQueue::new(sink.clone(), 2, Duration::from_secs(60));

        // Two events size-trigger a flush that fails and re-queues.
        queue.enqueue(event("P-1")).await;
        queue.enqueue(event("P-2")).await;
        assert_eq!(queue.len(), 2);

        queue.enqueue(event("P-3")).await;
        // The enqueue above size-triggered a second flush (3 >= 2) that
        // succeeded with all three events in arrival order.
        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        let products: Vec<_> = batches[0]
            .iter()
            .map(|e| e.product_id.clone().unwrap())
            .collect();
        assert_eq!(products, vec!["P-1", "P-2", "P-3"]);
    }

    #[tokio::test]
    async fn shutdown_flushes_whatever_is_buffered() {
        let sink = RecordingSink::new();
        let queue = EventQueue::new(sink.clone(), BATCH_SIZE, Duration::from_secs(60));

        queue.enqueue(event("P-1")).await;
        queue.shutdown().await;

        assert_eq!(sink.batches().len(), 1);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn flush_on_empty_buffer_is_a_no_op() {
        let sink = RecordingSink::new();
        let queue = EventQueue::new(sink.clone(), BATCH_SIZE, Duration::from_secs(60));

        queue.flush().await;
        assert!(sink.batches().is_empty());
    }
}
