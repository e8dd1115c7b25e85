//! Durable conversation history.
//!
//! [`HistoryStore`] is the interface the pipeline persists through. The
//! default implementation is [`sqlite::SqliteHistoryStore`];
//! [`memory::MemoryHistoryStore`] keeps everything in-process.
//!
//! All trait methods use `impl Future` in their signatures so no extra
//! `async-trait` crate is required.
//!
//! Ordering contract: ids grow monotonically per table, `list_messages`
//! returns oldest-first and `list_artifacts` returns newest-first, whatever
//! order the backing storage reads them in.

pub mod memory;
pub mod sqlite;

use std::future::Future;

pub use memory::MemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;

use crate::error::StoreError;
use crate::types::{ArtifactRecord, Message, Role};

/// Append-only record of messages and artifacts.
///
/// Implementations must accept concurrent appends from independent requests
/// without losing any of them.
pub trait HistoryStore: Send + Sync + 'static {
    /// Persist a message and return its id.
    fn append_message(
        &self,
        role: Role,
        content: &str,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Persist an artifact and return its id.
    fn append_artifact(
        &self,
        filename: &str,
        content: &str,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// The most recent `limit` messages, oldest-first.
    fn list_messages(
        &self,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Message>, StoreError>> + Send;

    /// Every artifact, newest-first.
    fn list_artifacts(&self) -> impl Future<Output = Result<Vec<ArtifactRecord>, StoreError>> + Send;
}
