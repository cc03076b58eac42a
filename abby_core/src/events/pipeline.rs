use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::quota::{period_key, QuotaEnforcer};
use crate::{Error, Result};

use super::{EventSink, TrackingEvent};

/// Tuning for [`EventPipeline`].
#[derive(Debug, Clone)]
pub struct EventPipelineConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Queue capacity; intake fails fast once it's reached.
    pub queue_capacity: usize,
    /// Total persist attempts per event, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    pub retry_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_retry_delay: Duration,
}

impl Default for EventPipelineConfig {
    fn default() -> EventPipelineConfig {
        EventPipelineConfig {
            workers: 4,
            queue_capacity: 1024,
            max_attempts: 3,
            retry_delay: Duration::from_millis(200),
            max_retry_delay: Duration::from_secs(5),
        }
    }
}

/// Queued asynchronous event processing.
///
/// [`EventPipeline::track`] enqueues and returns immediately; a fixed pool of
/// workers drains the queue, persisting each event to the sink and bumping the
/// project's quota counter. A failing event is retried with bounded
/// exponential backoff and dropped (with a logged reason) after the attempt
/// budget — losing a usage event is an accepted degradation, blocking the
/// queue is not. Delivery is at-least-once: a crash between persist and
/// acknowledgment may duplicate a count, which is a bounded, non-critical
/// error for usage analytics.
pub struct EventPipeline {
    sender: mpsc::Sender<TrackingEvent>,
    workers: Vec<JoinHandle<()>>,
}

impl EventPipeline {
    /// Start the worker pool.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(
        config: EventPipelineConfig,
        sink: Arc<dyn EventSink>,
        quota: Arc<QuotaEnforcer>,
    ) -> EventPipeline {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..config.workers.max(1))
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                let sink = Arc::clone(&sink);
                let quota = Arc::clone(&quota);
                let config = config.clone();
                tokio::spawn(async move {
                    loop {
                        // The receiver lock is held only while waiting for a
                        // job; processing happens with the lock released.
                        let event = { receiver.lock().await.recv().await };
                        let Some(event) = event else { break };
                        process_event(&config, &*sink, &quota, event).await;
                    }
                })
            })
            .collect();

        EventPipeline { sender, workers }
    }

    /// Enqueue an accepted event. Returns immediately; persistence happens in
    /// the background.
    ///
    /// Fails fast with [`Error::QueueFull`] at capacity and
    /// [`Error::QueueClosed`] after shutdown — never blocks the caller.
    pub fn track(&self, event: TrackingEvent) -> Result<()> {
        self.sender.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => Error::QueueFull,
            mpsc::error::TrySendError::Closed(_) => Error::QueueClosed,
        })
    }

    /// Close intake and wait for the workers to drain the queue.
    pub async fn shutdown(self) {
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

async fn process_event(
    config: &EventPipelineConfig,
    sink: &dyn EventSink,
    quota: &QuotaEnforcer,
    event: TrackingEvent,
) {
    let mut delay = config.retry_delay;
    let mut attempt = 1;
    loop {
        match sink.persist(&event).await {
            Ok(()) => {
                let period = period_key(event.timestamp);
                let count = quota.increment(&event.project_id, &period);
                log::debug!(target: "abby",
                    "persisted {:?} event for project {} (count {count} in {period})",
                    event.event_type, event.project_id);
                return;
            }
            Err(err) if attempt < config.max_attempts => {
                log::debug!(target: "abby",
                    "persisting event for project {} failed (attempt {attempt}): {err}, retrying",
                    event.project_id);
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(config.max_retry_delay);
                attempt += 1;
            }
            Err(err) => {
                log::warn!(target: "abby",
                    "dropping event for project {} after {attempt} attempts: {err}",
                    event.project_id);
                return;
            }
        }
    }
}
