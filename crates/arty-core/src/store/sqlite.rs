//! SQLite implementation of [`HistoryStore`].
//!
//! Uses [`sqlx`] with the `sqlite` feature. Migrations are run automatically
//! on startup via [`SqliteHistoryStore::connect`].
//!
//! # Migrations path
//!
//! `sqlx::migrate!("./migrations")` resolves the path **at compile time**
//! relative to `CARGO_MANIFEST_DIR`, so the directory is embedded into the
//! binary. The database file location is determined at runtime by the URL
//! passed to [`SqliteHistoryStore::connect`].
//!
//! # Queries
//!
//! The `sqlx::query` (runtime-verified) form is used so that no
//! `DATABASE_URL` environment variable is needed at compile time.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::HistoryStore;
use crate::error::StoreError;
use crate::types::{ArtifactRecord, Message, Role};

/// SQLite-backed history store. Writes are serialized by SQLite itself.
#[derive(Clone, Debug)]
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g. `"sqlite://arty.db"`
    /// or `"sqlite::memory:"` for tests.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // Every connection to `:memory:` is its own database, so pin the pool
        // to one connection that is never recycled.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, error = %e, "failed to parse stored timestamp; using now");
        Utc::now()
    })
}

impl HistoryStore for SqliteHistoryStore {
    async fn append_message(&self, role: Role, content: &str) -> Result<i64, StoreError> {
        let timestamp = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO messages (role, content, timestamp) VALUES (?1, ?2, ?3)",
        )
        .bind(role.as_ref())
        .bind(content)
        .bind(&timestamp)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn append_artifact(&self, filename: &str, content: &str) -> Result<i64, StoreError> {
        let timestamp = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO artifacts (filename, content, timestamp) VALUES (?1, ?2, ?3)",
        )
        .bind(filename)
        .bind(content)
        .bind(&timestamp)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_messages(&self, limit: u32) -> Result<Vec<Message>, StoreError> {
        // Newest rows are read first so LIMIT keeps the most recent ones.
        let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            "SELECT id, role, content, timestamp FROM messages ORDER BY id DESC LIMIT ?1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut messages = rows
            .into_iter()
            .map(|(id, role, content, timestamp)| {
                let role = role.parse::<Role>().map_err(|e| StoreError::InvalidRow {
                    table: "messages",
                    id,
                    message: format!("unknown role {role:?}: {e}"),
                })?;
                Ok(Message {
                    id,
                    role,
                    content,
                    timestamp: parse_timestamp(&timestamp),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        messages.reverse();
        Ok(messages)
    }

    async fn list_artifacts(&self) -> Result<Vec<ArtifactRecord>, StoreError> {
        let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            "SELECT id, filename, content, timestamp FROM artifacts ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, filename, content, timestamp)| ArtifactRecord {
                id,
                filename,
                content,
                timestamp: parse_timestamp(&timestamp),
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    async fn memory_store() -> SqliteHistoryStore {
        SqliteHistoryStore::connect("sqlite::memory:")
            .await
            .expect("in-memory database")
    }

    #[tokio::test]
    async fn five_messages_listed_in_append_order() {
        let store = memory_store().await;
        let roles = [Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant];
        for (i, role) in roles.iter().enumerate() {
            store.append_message(*role, &format!("m{i}")).await.unwrap();
        }

        let messages = store.list_messages(100).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m0", "m1", "m2", "m3", "m4"]);
        let listed_roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(listed_roles, roles);
    }

    #[tokio::test]
    async fn limit_returns_latest_messages_oldest_first() {
        let store = memory_store().await;
        for i in 0..5 {
            store.append_message(Role::User, &format!("m{i}")).await.unwrap();
        }
        let messages = store.list_messages(3).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn ids_increase_per_table() {
        let store = memory_store().await;
        let m1 = store.append_message(Role::User, "a").await.unwrap();
        let a1 = store.append_artifact("artifact.txt", "x").await.unwrap();
        let m2 = store.append_message(Role::Assistant, "b").await.unwrap();
        let a2 = store.append_artifact("artifact.rs", "y").await.unwrap();
        assert!(m2 > m1);
        assert!(a2 > a1);
    }

    #[tokio::test]
    async fn artifacts_listed_newest_first() {
        let store = memory_store().await;
        store.append_artifact("artifact.python", "print(1)").await.unwrap();
        store.append_artifact("artifact.js", "1").await.unwrap();

        let artifacts = store.list_artifacts().await.unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].filename, "artifact.js");
        assert_eq!(artifacts[1].content, "print(1)");
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let store = memory_store().await;
        assert!(store.list_messages(10).await.unwrap().is_empty());
        assert!(store.list_artifacts().await.unwrap().is_empty());
    }
}
