//! Asynchronous event ingestion.
//!
//! Accepted tracking events are enqueued and acknowledged immediately; a
//! bounded pool of workers persists them to the analytics sink and bumps the
//! project's usage counter. Persistence is fully decoupled from the request
//! path and can never slow down the synchronous assignment path.
mod event;
mod pipeline;
mod sink;

pub use event::{EventType, TrackingEvent};
pub use pipeline::{EventPipeline, EventPipelineConfig};
pub use sink::{EventSink, HttpEventSink, LogEventSink, MemoryEventSink};
