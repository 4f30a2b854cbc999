/// Append-only security event log
///
/// `record` is fire-and-forget: events ride a channel to a background
/// writer task so no request ever waits on log durability. A write that
/// fails is dropped after logging it and bumping a counter; it never
/// aborts the operation that produced the event.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::db::AuditLogRepo;
use crate::error::Result;
use crate::metrics;
use crate::models::audit_log::{AuditEvent, AuditLogFilter};
use crate::models::{AuditLog, Page};

enum AuditMessage {
    Record(AuditEvent),
    /// Acknowledged once every previously enqueued event has been written
    /// (or dropped). Used on shutdown to drain the queue.
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct AuditTrail {
    tx: mpsc::UnboundedSender<AuditMessage>,
    repo: Arc<dyn AuditLogRepo>,
}

impl AuditTrail {
    /// Start the background writer and return a handle to it.
    pub fn spawn(repo: Arc<dyn AuditLogRepo>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let writer_repo = repo.clone();

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    AuditMessage::Record(event) => {
                        if let Err(err) = writer_repo.insert(event).await {
                            metrics::inc_audit_write_failures();
                            tracing::warn!("failed to write audit log entry: {err}");
                        }
                    }
                    AuditMessage::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });

        Self { tx, repo }
    }

    /// Enqueue one event. Never fails from the caller's point of view.
    pub fn record(&self, event: AuditEvent) {
        if self.tx.send(AuditMessage::Record(event)).is_err() {
            metrics::inc_audit_write_failures();
            tracing::warn!("audit writer is gone; dropping audit event");
        }
    }

    /// Wait until everything recorded so far has been handed to the store.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(AuditMessage::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Filtered page of entries, newest first.
    pub async fn find(&self, filter: &AuditLogFilter) -> Result<Page<AuditLog>> {
        self.repo.find(filter).await
    }

    /// Retention sweep; returns the number of entries removed.
    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.repo.delete_older_than(cutoff).await
    }
}
