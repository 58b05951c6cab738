pub mod dedup;
pub mod events;
pub mod queue;

pub use dedup::DedupGuard;
pub use events::{EventService, IncomingEvent, IngestOutcome};
pub use queue::{DbEventSink, EventQueue, EventSink, NewTrackedEvent, BATCH_SIZE};
