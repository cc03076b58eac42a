use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a tracking event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    /// A visitor has seen their variant.
    Ping,
    /// A visitor has converted.
    Act,
}

/// A usage event reported by a client. Write-once, fire-and-forget; there are
/// no update semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    /// Kind of event.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Project the event belongs to.
    pub project_id: String,
    /// Test the visitor was assigned in.
    pub test_name: String,
    /// The variant the visitor saw.
    pub selected_variant: String,
    /// When the event was accepted. Stamped at intake: the wire shape carries
    /// no timestamp, and a client-supplied one is ignored — quota counting
    /// keys off this field, so trusting the client would let a backdated
    /// event escape the current period's counter.
    #[serde(default = "Utc::now", skip_deserializing)]
    pub timestamp: DateTime<Utc>,
}
