//! Database schema definitions and migrations.

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// Full DDL for the tool relay database.
pub const CREATE_SCHEMA: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

-- Registered external tools
CREATE TABLE IF NOT EXISTS tools (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description      TEXT NOT NULL DEFAULT '',
    endpoint_url     TEXT NOT NULL,
    http_method      TEXT,
    auth_type        TEXT NOT NULL DEFAULT 'NONE',
    auth_config      TEXT,
    request_template TEXT,
    response_mapping TEXT,
    is_active        INTEGER NOT NULL DEFAULT 1,
    tool_type        TEXT NOT NULL DEFAULT 'API',
    usage_count      INTEGER NOT NULL DEFAULT 0,
    last_used_at     TEXT,
    created_at       TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at       TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_tools_active ON tools(is_active);
CREATE INDEX IF NOT EXISTS idx_tools_type ON tools(tool_type);
"#;

/// Migration from version 1 to version 2.
pub const MIGRATE_V1_TO_V2: &str = r#"
CREATE INDEX IF NOT EXISTS idx_tools_type ON tools(tool_type);
"#;
