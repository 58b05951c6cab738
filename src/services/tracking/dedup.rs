use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::entities::tracked_event::TrackedEventType;

/// Suppresses semantically duplicate behavioral events inside a sliding
/// time window, with a separate permanent guard for purchase transactions.
///
/// State is session-local and single-threaded; callers needing shared
/// access wrap the guard in a mutex. No cross-process coordination exists
/// or is promised.
#[derive(Debug)]
pub struct DedupGuard {
    default_ttl: Duration,
    ttl: Duration,
    seen: HashMap<String, Instant>,
    tracked_orders: HashSet<String>,
}

impl DedupGuard {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            ttl: default_ttl,
            seen: HashMap::new(),
            tracked_orders: HashSet::new(),
        }
    }

    /// Returns false without refreshing state when an identical event was
    /// seen within the TTL; returns true and stamps the event otherwise.
    pub fn should_track(
        &mut self,
        event_type: TrackedEventType,
        payload: &serde_json::Value,
    ) -> bool {
        self.should_track_at(event_type, payload, Instant::now())
    }

    fn should_track_at(
        &mut self,
        event_type: TrackedEventType,
        payload: &serde_json::Value,
        now: Instant,
    ) -> bool {
        self.prune(now);

        let key = event_key(event_type, payload);
        if let Some(last_seen) = self.seen.get(&key) {
            if now.duration_since(*last_seen) < self.ttl {
                return false;
            }
        }

        self.seen.insert(key, now);
        true
    }

    /// Permanent per-session purchase guard. Only the first call for a given
    /// `(platform, order_id)` pair returns true, no matter how much time has
    /// passed since.
    pub fn track_purchase(&mut self, platform_id: Uuid, order_id: &str) -> bool {
        self.tracked_orders
            .insert(format!("{platform_id}:{order_id}"))
    }

    /// Run `f` with a temporarily lowered (or raised) TTL, restoring the
    /// default afterwards. Used by add-to-cart call sites that tolerate a
    /// shorter suppression window.
    pub fn with_ttl<R>(&mut self, ttl: Duration, f: impl FnOnce(&mut Self) -> R) -> R {
        self.ttl = ttl;
        let result = f(self);
        self.ttl = self.default_ttl;
        result
    }

    /// Drop entries older than the TTL so the map does not grow without
    /// bound over a long session.
    fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.seen
            .retain(|_, last_seen| now.duration_since(*last_seen) < ttl);
    }
}

/// Composed suppression key: event type plus a stable hash of the event's
/// identifying fields.
fn event_key(event_type: TrackedEventType, payload: &serde_json::Value) -> String {
    let mut hasher = DefaultHasher::new();
    payload.to_string().hash(&mut hasher);
    format!("{}:{:x}", event_type, hasher.finish())
}
