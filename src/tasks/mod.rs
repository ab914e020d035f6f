//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of the server.
//!
//! # Tasks
//! - TTL Cleanup: Purges expired cache entries at configured intervals
//! - History Writer: Persists audit records handed off by the middleware

mod cleanup;
mod history_writer;

pub use cleanup::spawn_cleanup_task;
pub use history_writer::spawn_history_writer;
