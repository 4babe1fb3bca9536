//! Async tool store consumed by the executor and the catalog.
//!
//! SQLite calls run via `spawn_blocking` so database I/O does not block
//! the async runtime.

use crate::state::Database;
use crate::types::ToolDefinition;
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::ErrorCode;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Another tool already holds this name (compared ignoring case).
#[derive(Debug, Error)]
#[error("tool name '{0}' is already taken")]
pub struct NameTaken(pub String);

/// Keyed storage for tool definitions.
#[async_trait]
pub trait ToolStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<ToolDefinition>>;

    /// Case-insensitive exact name lookup.
    async fn find_by_name(&self, name: &str) -> Result<Option<ToolDefinition>>;

    /// Atomically increment the usage counter and touch last-used/updated.
    ///
    /// Works on the stored row, never on an in-memory copy.
    async fn record_usage(&self, id: &str) -> Result<()>;

    /// Insert or fully replace a tool.
    ///
    /// Fails with [`NameTaken`] when another tool holds the name.
    async fn save(&self, tool: ToolDefinition) -> Result<ToolDefinition>;

    /// Returns `false` when no tool had the id.
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn list_active(&self) -> Result<Vec<ToolDefinition>>;

    async fn list_by_type(&self, tool_type: &str) -> Result<Vec<ToolDefinition>>;

    async fn list_all(&self) -> Result<Vec<ToolDefinition>>;
}

/// [`ToolStore`] backed by the shared SQLite [`Database`].
#[derive(Clone)]
pub struct SqliteToolStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteToolStore {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Store over a fresh in-memory database.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Arc::new(Mutex::new(Database::open_memory()?))))
    }

    /// Run `f` against the database on the blocking pool, holding the lock
    /// for the whole call.
    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let db = db.blocking_lock();
            f(&db)
        })
        .await?
    }
}

fn is_constraint_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<rusqlite::Error>()
            .and_then(rusqlite::Error::sqlite_error_code)
            == Some(ErrorCode::ConstraintViolation)
    })
}

#[async_trait]
impl ToolStore for SqliteToolStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<ToolDefinition>> {
        let id = id.to_string();
        self.with_db(move |db| db.get_tool(&id)).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ToolDefinition>> {
        let name = name.to_string();
        self.with_db(move |db| db.find_tool_by_name(&name)).await
    }

    async fn record_usage(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.with_db(move |db| {
            if !db.record_tool_usage(&id, Utc::now())? {
                bail!("Cannot record usage, tool {} no longer exists", id);
            }
            Ok(())
        })
        .await
    }

    async fn save(&self, tool: ToolDefinition) -> Result<ToolDefinition> {
        self.with_db(move |db| {
            if let Err(e) = db.upsert_tool(&tool) {
                if is_constraint_violation(&e) {
                    return Err(NameTaken(tool.name).into());
                }
                return Err(e);
            }
            Ok(db.get_tool(&tool.id)?.unwrap_or(tool))
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.with_db(move |db| db.delete_tool(&id)).await
    }

    async fn list_active(&self) -> Result<Vec<ToolDefinition>> {
        self.with_db(|db| db.list_active_tools()).await
    }

    async fn list_by_type(&self, tool_type: &str) -> Result<Vec<ToolDefinition>> {
        let tool_type = tool_type.to_string();
        self.with_db(move |db| db.list_tools_by_type(&tool_type)).await
    }

    async fn list_all(&self) -> Result<Vec<ToolDefinition>> {
        self.with_db(|db| db.list_tools()).await
    }
}
