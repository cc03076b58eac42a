use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Error, Result};

use super::TrackingEvent;

/// The analytics sink events are persisted to.
///
/// Long-term analytics storage is an external concern; the pipeline treats it
/// as opaque and only cares whether a write succeeded.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persist one event. A returned error makes the worker retry.
    async fn persist(&self, event: &TrackingEvent) -> Result<()>;
}

/// Sink that logs events instead of storing them. The default when no
/// ingestion endpoint is configured.
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn persist(&self, event: &TrackingEvent) -> Result<()> {
        log::info!(target: "abby",
            "event {:?} project={} test={} variant={}",
            event.event_type, event.project_id, event.test_name, event.selected_variant);
        Ok(())
    }
}

/// Sink delivering events to an HTTP ingestion endpoint.
pub struct HttpEventSink {
    // Client holds a connection pool internally, so we're reusing the client
    // between requests.
    client: reqwest::Client,
    ingestion_url: String,
}

impl HttpEventSink {
    /// Create a sink posting to the given ingestion URL.
    pub fn new(ingestion_url: String) -> HttpEventSink {
        HttpEventSink {
            client: reqwest::Client::new(),
            ingestion_url,
        }
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn persist(&self, event: &TrackingEvent) -> Result<()> {
        let response = self
            .client
            .post(&self.ingestion_url)
            .json(event)
            .send()
            .await?;
        response.error_for_status()?;
        Ok(())
    }
}

/// In-memory sink for tests and embedded use.
///
/// Can be told to fail the next N writes, which the pipeline tests use to
/// exercise the retry path.
#[derive(Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<TrackingEvent>>,
    fail_next: AtomicUsize,
}

impl MemoryEventSink {
    /// Create an empty sink.
    pub fn new() -> MemoryEventSink {
        MemoryEventSink::default()
    }

    /// Fail the next `n` persist calls.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Snapshot of everything persisted so far.
    pub fn events(&self) -> Vec<TrackingEvent> {
        self.events
            .lock()
            .expect("thread holding sink lock should not panic")
            .clone()
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn persist(&self, event: &TrackingEvent) -> Result<()> {
        let remaining = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if remaining {
            return Err(Error::SinkFailure("injected failure".to_owned()));
        }

        self.events
            .lock()
            .expect("thread holding sink lock should not panic")
            .push(event.clone());
        Ok(())
    }
}
