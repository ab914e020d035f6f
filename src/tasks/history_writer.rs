//! History Writer Task
//!
//! Drains the audit channel into a [`HistoryRepository`].

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::audit::{HistoryRecord, HistoryRepository};

/// Spawns the consumer of the audit channel.
///
/// The task ends once every [`HistoryLogger`](crate::audit::HistoryLogger)
/// has been dropped and the channel is empty. A failed save is logged and
/// the record discarded.
pub fn spawn_history_writer(
    mut records: UnboundedReceiver<HistoryRecord>,
    repository: Arc<dyn HistoryRepository>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting history writer task");

        while let Some(record) = records.recv().await {
            let endpoint = record.endpoint.clone();
            match repository.save(record).await {
                Ok(()) => debug!(endpoint = %endpoint, "History record saved"),
                Err(err) => error!(endpoint = %endpoint, error = %err, "Failed to save history record"),
            }
        }

        info!("History channel closed, writer stopping");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{HistoryLogger, InMemoryHistory, Page};
    use crate::cache::StoreResult;
    use crate::error::StoreError;
    use async_trait::async_trait;

    struct FailingRepository;

    #[async_trait]
    impl HistoryRepository for FailingRepository {
        async fn save(&self, _record: HistoryRecord) -> StoreResult<()> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }

        async fn find_page(&self, page: usize, size: usize) -> StoreResult<Page<HistoryRecord>> {
            Ok(Page::new(Vec::new(), page, size, 0))
        }
    }

    #[tokio::test]
    async fn test_writer_persists_until_channel_closes() {
        let repo = Arc::new(InMemoryHistory::new());
        let (logger, rx) = HistoryLogger::channel();
        let handle = spawn_history_writer(rx, repo.clone());

        logger.log(HistoryRecord::new("/api/a", "{}", "{}", 200, None));
        logger.log(HistoryRecord::new("/api/b", "{}", "{}", 503, None));
        drop(logger);

        handle.await.unwrap();
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn test_writer_survives_save_failures() {
        let (logger, rx) = HistoryLogger::channel();
        let handle = spawn_history_writer(rx, Arc::new(FailingRepository));

        logger.log(HistoryRecord::new("/api/a", "{}", "{}", 200, None));
        logger.log(HistoryRecord::new("/api/b", "{}", "{}", 200, None));
        drop(logger);

        assert!(handle.await.is_ok());
    }
}
