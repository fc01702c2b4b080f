use chrono::{DateTime, Utc};

/// A domain event emitted by an aggregate decision.
///
/// Events are immutable facts; the escalation history is derived from them.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "escalation.status_changed").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
