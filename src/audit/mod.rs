//! Audit Module
//!
//! Request history: records, the channel they travel over, where they are
//! stored, and the middleware that produces them.
//!
//! # Data Flow
//! ```text
//! audit_middleware → HistoryLogger::log → mpsc → history writer task → HistoryRepository
//! ```

mod logger;
mod middleware;
mod record;
mod repository;

pub use logger::HistoryLogger;
pub use middleware::audit_middleware;
pub use record::HistoryRecord;
pub use repository::{HistoryRepository, InMemoryHistory, Page, DEFAULT_MAX_RECORDS};
