//! The event sink contract produced by the civilization layer.
//!
//! Every notable transition (tribe formed, structure destroyed, tech
//! advancement, ...) is reported as a [`CivEvent`] to an [`EventSink`]. The
//! sink is optional: [`NullSink`] and `None` both discard every event, so the
//! core behaves identically with or without a listener.

use civitas_types::CivEvent;

/// Receiver of structured civilization events.
pub trait EventSink {
    /// Accept one event.
    fn record(&mut self, event: CivEvent);
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&mut self, _event: CivEvent) {}
}

/// Collects events in memory, in emission order.
impl EventSink for Vec<CivEvent> {
    fn record(&mut self, event: CivEvent) {
        self.push(event);
    }
}

/// An absent sink is a no-op.
impl<S: EventSink> EventSink for Option<S> {
    fn record(&mut self, event: CivEvent) {
        if let Some(sink) = self {
            sink.record(event);
        }
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn record(&mut self, event: CivEvent) {
        (**self).record(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn record(&mut self, event: CivEvent) {
        (**self).record(event);
    }
}

/// Forwards every event to `tracing` at `INFO` level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&mut self, event: CivEvent) {
        let metadata = serde_json::to_string(&event.metadata).unwrap_or_default();
        tracing::info!(
            tick = event.tick,
            kind = %event.kind,
            category = %event.category,
            source = %event.source,
            position = ?event.position,
            meta = %metadata,
            "{}",
            event.message
        );
    }
}

/// Counts events per kind while forwarding them to an inner sink.
#[derive(Debug, Clone, Default)]
pub struct CountingSink<S> {
    inner: S,
    counts: std::collections::BTreeMap<civitas_types::CivEventKind, u64>,
}

impl<S> CountingSink<S> {
    /// Wrap a sink.
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            counts: std::collections::BTreeMap::new(),
        }
    }

    /// Number of events of the given kind seen so far.
    pub fn count(&self, kind: civitas_types::CivEventKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Total number of events seen so far.
    pub fn total(&self) -> u64 {
        self.counts.values().copied().fold(0_u64, u64::saturating_add)
    }

    /// Borrow the wrapped sink.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap the inner sink, discarding the counts.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: EventSink> EventSink for CountingSink<S> {
    fn record(&mut self, event: CivEvent) {
        let slot = self.counts.entry(event.kind).or_insert(0);
        *slot = slot.saturating_add(1);
        self.inner.record(event);
    }
}
