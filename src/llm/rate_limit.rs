use super::models::ModelTier;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Who is calling which tier. Spacing and counters are tracked per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallKey {
    pub tier: ModelTier,
    pub context: String,
}

impl CallKey {
    pub fn new(tier: ModelTier, context: impl Into<String>) -> Self {
        Self {
            tier,
            context: context.into(),
        }
    }
}

impl std::fmt::Display for CallKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tier, self.context)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    last_dispatch: Option<Instant>,
    last_completion: Option<Instant>,
}

/// Last-call timestamps and call counters per [`CallKey`].
///
/// A dispatch may start once both `last_dispatch + min_interval` and
/// `last_completion + pacing` have passed. Reserving a slot moves
/// `last_dispatch` forward immediately, so callers that reserve concurrently
/// queue up behind each other instead of all waking at once.
#[derive(Debug, Default)]
pub struct RateLimitState {
    slots: HashMap<CallKey, Slot>,
    calls: HashMap<CallKey, u32>,
}

impl RateLimitState {
    /// Reserve the next dispatch for `key` and return how long to wait first.
    pub fn reserve(
        &mut self,
        key: &CallKey,
        now: Instant,
        min_interval: Duration,
        pacing: Duration,
    ) -> Duration {
        let slot = self.slots.entry(key.clone()).or_default();
        let mut ready = now;
        if let Some(last) = slot.last_dispatch {
            ready = ready.max(last + min_interval);
        }
        if let Some(done) = slot.last_completion {
            ready = ready.max(done + pacing);
        }
        slot.last_dispatch = Some(ready);
        ready.saturating_duration_since(now)
    }

    /// Mark the end of a dispatch (successful or not).
    pub fn complete(&mut self, key: &CallKey, now: Instant) {
        self.slots.entry(key.clone()).or_default().last_completion = Some(now);
    }

    pub fn record_call(&mut self, key: &CallKey) {
        let count = self.calls.entry(key.clone()).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Successful calls per key, keyed as `tier:context`
    pub fn call_counts(&self) -> HashMap<String, u32> {
        self.calls
            .iter()
            .map(|(key, count)| (key.to_string(), *count))
            .collect()
    }

    pub fn reset(&mut self) {
        self.slots.clear();
        self.calls.clear();
    }
}
