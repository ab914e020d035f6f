//! Fire-and-forget hand-off of audit records.

use tokio::sync::mpsc;
use tracing::warn;

use super::HistoryRecord;

/// Sending half of the audit channel. Cheap to clone.
#[derive(Clone, Debug)]
pub struct HistoryLogger {
    tx: mpsc::UnboundedSender<HistoryRecord>,
}

impl HistoryLogger {
    /// Creates a logger and the receiver a writer task should drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<HistoryRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues `record` without waiting. A closed channel drops the record.
    pub fn log(&self, record: HistoryRecord) {
        if let Err(err) = self.tx.send(record) {
            warn!(endpoint = %err.0.endpoint, "History writer gone, dropping audit record");
        }
    }
}
