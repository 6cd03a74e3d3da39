//! Bounded event queue drained by a fixed pool of workers.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::pipeline::{InboundEvent, ThreadProcessor, Trigger};

/// One queued webhook event.
#[derive(Debug, Clone)]
pub struct WebhookJob {
    pub id: Uuid,
    pub event: InboundEvent,
}

/// Why an event was not queued.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Event queue is full")]
    QueueFull,
    #[error("Event queue is closed")]
    Closed,
}

/// Cheap handle for enqueueing events. Clone it into route state.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<WebhookJob>,
}

impl Dispatcher {
    /// A dispatcher and the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<WebhookJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue and start `worker_count` workers calling `processor`.
    pub fn spawn(
        processor: Arc<ThreadProcessor>,
        worker_count: usize,
        capacity: usize,
    ) -> (Self, WorkerPool) {
        let (dispatcher, rx) = Self::channel(capacity);
        let pool = WorkerPool::spawn(rx, processor, worker_count);
        (dispatcher, pool)
    }

    /// Enqueue without waiting. A full queue drops the event.
    pub fn submit(&self, event: InboundEvent) -> Result<Uuid, DispatchError> {
        let id = Uuid::new_v4();
        match self.tx.try_send(WebhookJob { id, event }) {
            Ok(()) => Ok(id),
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(
                    job_id = %job.id,
                    thread_id = job.event.thread_id.as_deref().unwrap_or("-"),
                    "Event queue full; dropping event"
                );
                Err(DispatchError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DispatchError::Closed),
        }
    }
}

/// Workers draining the queue. They exit once every `Dispatcher` is dropped
/// and the queue is empty.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        rx: mpsc::Receiver<WebhookJob>,
        processor: Arc<ThreadProcessor>,
        worker_count: usize,
    ) -> Self {
        let rx = Arc::new(Mutex::new(rx));
        let handles = (0..worker_count.max(1))
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let processor = Arc::clone(&processor);
                tokio::spawn(async move {
                    loop {
                        let job = rx.lock().await.recv().await;
                        let Some(job) = job else { break };
                        run_job(worker, &processor, job).await;
                    }
                })
            })
            .collect();
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to finish.
    pub async fn join(self) {
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                error!(error = %e, "Worker task panicked");
            }
        }
    }
}

async fn run_job(worker: usize, processor: &ThreadProcessor, job: WebhookJob) {
    let thread_id = job.event.thread_id.clone().unwrap_or_default();
    match processor.handle(Trigger::Event(job.event)).await {
        Ok(sent) => info!(
            worker,
            job_id = %job.id,
            thread_id = %sent.reply.thread_id,
            message_id = %sent.reply.message_id,
            "Webhook event answered"
        ),
        Err(e) if e.is_noop() => info!(
            worker,
            job_id = %job.id,
            thread_id = %thread_id,
            reason = e.label(),
            "Webhook event skipped"
        ),
        Err(e) => error!(
            worker,
            job_id = %job.id,
            thread_id = %thread_id,
            kind = e.label(),
            error = %e,
            "Webhook event failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(thread: &str) -> InboundEvent {
        InboundEvent {
            thread_id: Some(thread.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn full_queue_drops_event() {
        let (dispatcher, mut rx) = Dispatcher::channel(1);
        assert!(dispatcher.submit(event("a")).is_ok());
        assert!(matches!(
            dispatcher.submit(event("b")),
            Err(DispatchError::QueueFull)
        ));
        let job = rx.recv().await.unwrap();
        assert_eq!(job.event.thread_id.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn closed_queue_rejects() {
        let (dispatcher, rx) = Dispatcher::channel(4);
        drop(rx);
        assert!(matches!(
            dispatcher.submit(event("a")),
            Err(DispatchError::Closed)
        ));
    }
}
