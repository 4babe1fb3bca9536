//! SQLite database wrapper with WAL mode and migration support.

use crate::state::schema;
use crate::types::*;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{info, warn};

const TOOL_COLUMNS: &str = "id, name, description, endpoint_url, http_method, auth_type, \
     auth_config, request_template, response_mapping, is_active, tool_type, usage_count, \
     last_used_at, created_at, updated_at";

/// The tool relay database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Run schema creation and migrations.
    fn migrate(&mut self) -> Result<()> {
        let version = self.schema_version();

        if version == 0 {
            info!("Creating database schema v{}", schema::SCHEMA_VERSION);
            self.conn
                .execute_batch(schema::CREATE_SCHEMA)
                .context("Failed to create schema")?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::SCHEMA_VERSION],
            )?;
        } else {
            if version < 2 {
                info!("Migrating database v1 -> v2");
                self.conn.execute_batch(schema::MIGRATE_V1_TO_V2)?;
            }
            if version < schema::SCHEMA_VERSION {
                self.conn.execute(
                    "UPDATE schema_version SET version = ?1",
                    params![schema::SCHEMA_VERSION],
                )?;
            }
        }

        Ok(())
    }

    /// Get the current schema version (0 if uninitialized).
    fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Tools
    // -----------------------------------------------------------------------

    /// Insert a tool, or replace the configuration of the tool with the same id.
    ///
    /// Usage statistics of an existing row are left alone; only
    /// [`Database::record_tool_usage`] changes them.
    pub fn upsert_tool(&self, tool: &ToolDefinition) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO tools (id, name, description, endpoint_url, http_method, auth_type,
                    auth_config, request_template, response_mapping, is_active, tool_type,
                    usage_count, last_used_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                 ON CONFLICT(id) DO UPDATE SET
                    name = ?2, description = ?3, endpoint_url = ?4, http_method = ?5,
                    auth_type = ?6, auth_config = ?7, request_template = ?8,
                    response_mapping = ?9, is_active = ?10, tool_type = ?11,
                    updated_at = ?15",
                params![
                    tool.id,
                    tool.name,
                    tool.description,
                    tool.endpoint_url,
                    tool.http_method.map(|m| m.to_string()),
                    tool.auth_type.to_string(),
                    tool.auth_config,
                    tool.request_template,
                    tool.response_mapping,
                    tool.is_active as i32,
                    tool.tool_type,
                    tool.usage_count as i64,
                    tool.last_used_at.map(|t| t.to_rfc3339()),
                    tool.created_at.to_rfc3339(),
                    tool.updated_at.to_rfc3339(),
                ],
            )
            .with_context(|| format!("Failed to save tool '{}'", tool.name))?;
        Ok(())
    }

    /// Get a tool by id.
    pub fn get_tool(&self, id: &str) -> Result<Option<ToolDefinition>> {
        let sql = format!("SELECT {TOOL_COLUMNS} FROM tools WHERE id = ?1");
        let tool = self
            .conn
            .query_row(&sql, params![id], row_to_tool)
            .optional()?;
        Ok(tool)
    }

    /// Get a tool by name, ignoring case.
    pub fn find_tool_by_name(&self, name: &str) -> Result<Option<ToolDefinition>> {
        let sql = format!("SELECT {TOOL_COLUMNS} FROM tools WHERE name = ?1 COLLATE NOCASE LIMIT 1");
        let tool = self
            .conn
            .query_row(&sql, params![name], row_to_tool)
            .optional()?;
        Ok(tool)
    }

    /// Bump the usage counter and timestamps in a single statement.
    ///
    /// Returns `false` when no tool has the given id.
    pub fn record_tool_usage(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE tools SET usage_count = usage_count + 1, last_used_at = ?2, updated_at = ?2
             WHERE id = ?1",
            params![id, at.to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Delete a tool. Returns `false` when nothing was deleted.
    pub fn delete_tool(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM tools WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// All active tools ordered by name.
    pub fn list_active_tools(&self) -> Result<Vec<ToolDefinition>> {
        self.query_tools(
            &format!(
                "SELECT {TOOL_COLUMNS} FROM tools WHERE is_active = 1 ORDER BY name COLLATE NOCASE"
            ),
            [],
        )
    }

    /// Tools of one category, most used first.
    pub fn list_tools_by_type(&self, tool_type: &str) -> Result<Vec<ToolDefinition>> {
        self.query_tools(
            &format!(
                "SELECT {TOOL_COLUMNS} FROM tools WHERE tool_type = ?1
                 ORDER BY usage_count DESC, name COLLATE NOCASE"
            ),
            params![tool_type],
        )
    }

    /// Every tool ordered by name.
    pub fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        self.query_tools(
            &format!("SELECT {TOOL_COLUMNS} FROM tools ORDER BY name COLLATE NOCASE"),
            [],
        )
    }

    fn query_tools<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<ToolDefinition>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_tool)?;

        let mut tools = Vec::new();
        for row in rows {
            tools.push(row?);
        }
        Ok(tools)
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_tool(row: &Row<'_>) -> rusqlite::Result<ToolDefinition> {
    let name: String = row.get(1)?;

    let http_method = row
        .get::<_, Option<String>>(4)?
        .and_then(|raw| match raw.parse::<HttpMethod>() {
            Ok(method) => Some(method),
            Err(e) => {
                warn!("Tool '{}' has {}", name, e);
                None
            }
        });

    let auth_type = row
        .get::<_, String>(5)?
        .parse::<AuthType>()
        .unwrap_or_else(|e| {
            warn!("Tool '{}' has {}, treating as NONE", name, e);
            AuthType::None
        });

    Ok(ToolDefinition {
        id: row.get(0)?,
        name,
        description: row.get(2)?,
        endpoint_url: row.get(3)?,
        http_method,
        auth_type,
        auth_config: row.get(6)?,
        request_template: row.get(7)?,
        response_mapping: row.get(8)?,
        is_active: row.get::<_, i32>(9)? != 0,
        tool_type: row.get(10)?,
        usage_count: row.get::<_, i64>(11)?.max(0) as u64,
        last_used_at: row
            .get::<_, Option<String>>(12)?
            .map(|s| parse_timestamp(&s)),
        created_at: row.get::<_, String>(13).map(|s| parse_timestamp(&s))?,
        updated_at: row.get::<_, String>(14).map(|s| parse_timestamp(&s))?,
    })
}
