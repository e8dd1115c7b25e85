//! In-process [`HistoryStore`] for tests and database-less runs.

use chrono::Utc;
use tokio::sync::Mutex;

use super::HistoryStore;
use crate::error::StoreError;
use crate::types::{ArtifactRecord, Message, Role};

#[derive(Debug, Default)]
struct Tables {
    messages: Vec<Message>,
    artifacts: Vec<ArtifactRecord>,
}

/// Keeps both tables in vectors behind one lock, so appends are serialized
/// and ids are simply `len + 1`.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    tables: Mutex<Tables>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    async fn append_message(&self, role: Role, content: &str) -> Result<i64, StoreError> {
        let mut tables = self.tables.lock().await;
        let id = tables.messages.len() as i64 + 1;
        tables.messages.push(Message {
            id,
            role,
            content: content.to_owned(),
            timestamp: Utc::now(),
        });
        Ok(id)
    }

    async fn append_artifact(&self, filename: &str, content: &str) -> Result<i64, StoreError> {
        let mut tables = self.tables.lock().await;
        let id = tables.artifacts.len() as i64 + 1;
        tables.artifacts.push(ArtifactRecord {
            id,
            filename: filename.to_owned(),
            content: content.to_owned(),
            timestamp: Utc::now(),
        });
        Ok(id)
    }

    async fn list_messages(&self, limit: u32) -> Result<Vec<Message>, StoreError> {
        let tables = self.tables.lock().await;
        let skip = tables.messages.len().saturating_sub(limit as usize);
        Ok(tables.messages[skip..].to_vec())
    }

    async fn list_artifacts(&self) -> Result<Vec<ArtifactRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.artifacts.iter().rev().cloned().collect())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn messages_come_back_in_append_order() {
        let store = MemoryHistoryStore::new();
        for i in 0..5 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store.append_message(role, &format!("m{i}")).await.unwrap();
        }
        let messages = store.list_messages(100).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m0", "m1", "m2", "m3", "m4"]);
        assert!(messages.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn limit_keeps_the_most_recent_messages() {
        let store = MemoryHistoryStore::new();
        for i in 0..5 {
            store.append_message(Role::User, &format!("m{i}")).await.unwrap();
        }
        let messages = store.list_messages(2).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m3", "m4"]);
    }

    #[tokio::test]
    async fn artifacts_are_newest_first() {
        let store = MemoryHistoryStore::new();
        store.append_artifact("a.txt", "a").await.unwrap();
        store.append_artifact("b.txt", "b").await.unwrap();
        let artifacts = store.list_artifacts().await.unwrap();
        assert_eq!(artifacts[0].filename, "b.txt");
        assert_eq!(artifacts[1].filename, "a.txt");
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let store = Arc::new(MemoryHistoryStore::new());
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.append_message(Role::User, &i.to_string()).await.unwrap()
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<i64>>());
        assert_eq!(store.list_messages(100).await.unwrap().len(), 20);
    }
}
