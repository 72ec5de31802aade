use crate::errors::DbError;
use libsql::Connection;
use tracing::debug;

const TABLES: &[(&str, &str)] = &[
    (
        "dedupe",
        r#"
        CREATE TABLE IF NOT EXISTS dedupe (
            source TEXT NOT NULL,
            source_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (source, source_id)
        );
    "#,
    ),
    (
        "notes",
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            note_id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            source_id TEXT NOT NULL,
            source_url TEXT NOT NULL,
            title TEXT NOT NULL,
            summary_markdown TEXT NOT NULL,
            captured_metadata TEXT NOT NULL,
            saved_at TEXT NOT NULL,
            UNIQUE (source, source_id)
        );
    "#,
    ),
    (
        "merge_records",
        r#"
        CREATE TABLE IF NOT EXISTS merge_records (
            merge_id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            source_note_ids TEXT NOT NULL,
            merged_note_id TEXT NOT NULL,
            field_decisions TEXT NOT NULL,
            created_at TEXT NOT NULL,
            rollback_of TEXT,
            finalized_at TEXT
        );
    "#,
    ),
    (
        "field_decisions",
        r#"
        CREATE TABLE IF NOT EXISTS field_decisions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            note_id TEXT NOT NULL,
            field TEXT NOT NULL,
            strategy TEXT NOT NULL,
            winner_note_id TEXT,
            alt_value TEXT,
            recorded_at TEXT NOT NULL
        );
    "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_notes_source ON notes (source);",
    "CREATE INDEX IF NOT EXISTS idx_field_decisions_note ON field_decisions (note_id);",
];

pub async fn apply_schema(conn: &Connection) -> Result<(), DbError> {
    for (name, statement) in TABLES {
        debug!(table = *name, "applying schema");
        conn.execute(statement, ()).await?;
    }
    for statement in INDEXES {
        conn.execute(statement, ()).await?;
    }
    Ok(())
}
