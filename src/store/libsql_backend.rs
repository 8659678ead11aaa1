//! libSQL backend — durable `StateStore` implementation.
//!
//! One row per conversation holding the JSON-encoded state. Supports local
//! file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use super::migrations;
use super::traits::{ConversationState, StateStore, decode_state, encode_state};
use crate::error::StorageError;

/// libSQL state store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StorageError::Open(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "State store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StorageError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StorageError::Open(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, StorageError> {
        let conn = db
            .connect()
            .map_err(|e| StorageError::Open(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

#[async_trait]
impl StateStore for LibSqlStore {
    async fn load(&self, conversation_id: &str) -> Result<ConversationState, StorageError> {
        let mut rows = self
            .conn
            .query(
                "SELECT state FROM conversation_state WHERE conversation_id = ?1",
                params![conversation_id],
            )
            .await
            .map_err(|e| StorageError::Query(format!("load: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| StorageError::Query(format!("load: {e}")))?;
                decode_state(&raw)
            }
            Ok(None) => Ok(ConversationState::default()),
            Err(e) => Err(StorageError::Query(format!("load: {e}"))),
        }
    }

    async fn save(
        &self,
        conversation_id: &str,
        state: &ConversationState,
    ) -> Result<(), StorageError> {
        let raw = encode_state(state)?;
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO conversation_state (conversation_id, state, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (conversation_id) DO UPDATE SET state = ?2, updated_at = ?3",
                params![conversation_id, raw, now],
            )
            .await
            .map_err(|e| StorageError::Query(format!("save: {e}")))?;

        debug!(conversation_id, depth = state.dialog_stack.depth(), "State saved");
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<bool, StorageError> {
        let count = self
            .conn
            .execute(
                "DELETE FROM conversation_state WHERE conversation_id = ?1",
                params![conversation_id],
            )
            .await
            .map_err(|e| StorageError::Query(format!("delete: {e}")))?;
        Ok(count > 0)
    }
}
