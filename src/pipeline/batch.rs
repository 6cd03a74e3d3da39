//! Batch scanner: answer every thread not yet replied to.
//!
//! Threads are handled one at a time; a failure on one thread is counted
//! and the scan moves on.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::MailboxError;
use crate::mailbox::MailboxService;
use crate::pipeline::processor::ThreadProcessor;
use crate::pipeline::types::Trigger;

/// Label the provider puts on threads the inbox has replied in.
pub const SENT_LABEL: &str = "sent";

/// Counts from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Threads returned by the listing.
    pub listed: usize,
    /// Threads without the sent label, handed to the processor.
    pub attempted: usize,
    /// Replies sent.
    pub processed: usize,
    /// No-op outcomes: no external message, duplicate, no thread id.
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} threads listed, {} unreplied: {} processed, {} skipped, {} errors",
            self.listed, self.attempted, self.processed, self.skipped, self.errors
        )
    }
}

pub struct BatchScanner {
    mailbox: Arc<dyn MailboxService>,
    processor: Arc<ThreadProcessor>,
    skip_label: String,
}

impl BatchScanner {
    pub fn new(mailbox: Arc<dyn MailboxService>, processor: Arc<ThreadProcessor>) -> Self {
        Self {
            mailbox,
            processor,
            skip_label: SENT_LABEL.to_string(),
        }
    }

    /// Scan the inbox once. Only a failed listing aborts the run.
    pub async fn run(&self) -> Result<BatchSummary, MailboxError> {
        let inbox_id = self.processor.inbox_id();
        let threads = self.mailbox.list_threads(inbox_id, &[]).await?;

        let mut summary = BatchSummary {
            listed: threads.len(),
            ..Default::default()
        };
        let unreplied: Vec<_> = threads
            .into_iter()
            .filter(|t| !t.has_label(&self.skip_label))
            .collect();
        summary.attempted = unreplied.len();

        info!(
            inbox_id,
            listed = summary.listed,
            unreplied = summary.attempted,
            "Starting batch scan"
        );

        for thread in unreplied {
            let thread_id = thread.thread_id.clone();
            match self.processor.handle(Trigger::Poll(thread)).await {
                Ok(_) => summary.processed += 1,
                Err(e) if e.is_noop() => {
                    warn!(thread_id = %thread_id, reason = e.label(), "Skipped thread");
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!(thread_id = %thread_id, kind = e.label(), error = %e, "Thread failed");
                    summary.errors += 1;
                }
            }
        }

        info!(%summary, "Batch scan finished");
        Ok(summary)
    }
}
