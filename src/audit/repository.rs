//! History persistence.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use super::HistoryRecord;
use crate::cache::StoreResult;

// == Page ==
/// One page of a larger, ordered result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    /// Zero-based page index
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, page: usize, size: usize, total_elements: usize) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            total_elements.div_ceil(size)
        };
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
        }
    }
}

// == History Repository ==
/// Storage for audit records.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn save(&self, record: HistoryRecord) -> StoreResult<()>;

    /// Records ordered by timestamp, oldest first.
    async fn find_page(&self, page: usize, size: usize) -> StoreResult<Page<HistoryRecord>>;
}

/// Records kept when no retention limit is given
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

/// Keeps the most recent records in memory, sorted by timestamp.
///
/// Once `max_records` is reached, each save drops the oldest record.
pub struct InMemoryHistory {
    records: RwLock<VecDeque<HistoryRecord>>,
    max_records: usize,
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::with_max_records(DEFAULT_MAX_RECORDS)
    }
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Arguments
    /// * `max_records` - Retention limit, at least 1
    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            max_records: max_records.max(1),
        }
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistory {
    async fn save(&self, record: HistoryRecord) -> StoreResult<()> {
        let mut records = self.records.write().await;
        let in_order = records
            .back()
            .map_or(true, |last| last.timestamp <= record.timestamp);
        if in_order {
            records.push_back(record);
        } else {
            // Equal timestamps keep arrival order.
            let at = records.partition_point(|r| r.timestamp <= record.timestamp);
            records.insert(at, record);
        }

        while records.len() > self.max_records {
            records.pop_front();
        }
        Ok(())
    }

    async fn find_page(&self, page: usize, size: usize) -> StoreResult<Page<HistoryRecord>> {
        let records = self.records.read().await;
        let total = records.len();
        let content = records
            .iter()
            .skip(page.saturating_mul(size))
            .take(size)
            .cloned()
            .collect();
        Ok(Page::new(content, page, size, total))
    }
}
