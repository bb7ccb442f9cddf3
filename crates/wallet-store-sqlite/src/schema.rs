//! SQL schema for the wallet SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One physical table holds every logical record table; ids are unique across
-- all record types.
CREATE TABLE IF NOT EXISTS records (
    id           TEXT PRIMARY KEY,
    record_type  TEXT NOT NULL,   -- RecordType discriminant
    content_json TEXT NOT NULL,
    tags_json    TEXT NOT NULL DEFAULT '{}',
    created_at   TEXT NOT NULL,   -- RFC 3339 UTC; store-assigned
    updated_at   TEXT             -- RFC 3339 UTC or NULL
);

CREATE INDEX IF NOT EXISTS records_type_idx ON records(record_type);

CREATE TABLE IF NOT EXISTS preferences (
    key        TEXT PRIMARY KEY,
    value_json TEXT NOT NULL
);

PRAGMA user_version = 1;
";
