use crate::backup;
use crate::client::MidasDb;
use crate::errors::DbError;
use chrono::{DateTime, Utc};
use libsql::{params, Row};
use midas_models::{CapturedMetadata, FieldDecision, SavedNote, Source, SummaryArtifact};
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

fn parse_source(raw: &str) -> Result<Source, DbError> {
    match raw {
        "bilibili" => Ok(Source::Bilibili),
        "xiaohongshu" => Ok(Source::Xiaohongshu),
        other => Err(DbError::Mapping(format!("unknown source {other}"))),
    }
}

fn row_to_note(row: Row) -> Result<SavedNote, DbError> {
    let captured_metadata: String = row.get(6)?;
    let captured_metadata: CapturedMetadata = serde_json::from_str(&captured_metadata)
        .map_err(|e| DbError::Mapping(format!("captured_metadata: {e}")))?;
    let saved_at: String = row.get(7)?;
    let saved_at: DateTime<Utc> = saved_at
        .parse()
        .map_err(|e| DbError::Mapping(format!("saved_at: {e}")))?;

    Ok(SavedNote {
        note_id: row.get(0)?,
        artifact: SummaryArtifact {
            source: parse_source(&row.get::<String>(1)?)?,
            source_id: row.get(2)?,
            source_url: row.get(3)?,
            title: row.get(4)?,
            summary_markdown: row.get(5)?,
            captured_metadata,
        },
        saved_at,
    })
}

/// Optional filter applied when listing a source's notes. A `None` query
/// returns everything; a `Some` query substring-matches the title
/// (case-insensitive), the simplest useful shape the spec leaves open.
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub query: Option<String>,
}

/// C3: the durable archive of saved summaries. Every write path snapshots
/// the database into `backup_dir` afterward (spec §3 I4, §4.3 step 3).
pub struct NoteStore {
    db: MidasDb,
    backup_dir: PathBuf,
}

impl NoteStore {
    pub fn new(db: MidasDb, backup_dir: PathBuf) -> Self {
        Self { db, backup_dir }
    }

    /// Best-effort: a failed backup snapshot is logged, not propagated,
    /// so a transient disk issue never turns a successful note write
    /// into a failed API call.
    async fn snapshot_after_write(&self) {
        if let Err(e) = backup::snapshot(&self.db, &self.backup_dir).await {
            warn!(error = %e, "backup snapshot after note write failed");
        }
    }

    /// Persists `artifact`. Saving over an existing `(source, source_id)`
    /// keeps that row's `note_id` and refreshes `saved_at`, so a fresh
    /// artifact supersedes the old one in place rather than creating a
    /// second row (spec §3, I1).
    pub async fn save(&self, artifact: SummaryArtifact) -> Result<SavedNote, DbError> {
        let conn = self.db.connection()?;
        let note_id = Uuid::new_v4().to_string();
        let saved_at = Utc::now();
        let captured_metadata = serde_json::to_string(&artifact.captured_metadata)
            .map_err(|e| DbError::Mapping(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO notes (note_id, source, source_id, source_url, title, summary_markdown, captured_metadata, saved_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (source, source_id) DO UPDATE SET
                source_url = excluded.source_url,
                title = excluded.title,
                summary_markdown = excluded.summary_markdown,
                captured_metadata = excluded.captured_metadata,
                saved_at = excluded.saved_at
            "#,
            params![
                note_id,
                artifact.source.as_str(),
                artifact.source_id.clone(),
                artifact.source_url.clone(),
                artifact.title.clone(),
                artifact.summary_markdown.clone(),
                captured_metadata,
                saved_at.to_rfc3339(),
            ],
        )
        .await?;

        let saved = self
            .get_by_source_id(artifact.source, &artifact.source_id)
            .await?
            .ok_or(DbError::NoteNotFound)?;
        self.snapshot_after_write().await;
        Ok(saved)
    }

    pub async fn get(&self, source: Source, note_id: &str) -> Result<Option<SavedNote>, DbError> {
        let conn = self.db.connection()?;
        let mut rows = conn
            .query(
                "SELECT note_id, source, source_id, source_url, title, summary_markdown, captured_metadata, saved_at
                 FROM notes WHERE source = ?1 AND note_id = ?2",
                params![source.as_str(), note_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_note(row)?)),
            None => Ok(None),
        }
    }

    async fn get_by_source_id(
        &self,
        source: Source,
        source_id: &str,
    ) -> Result<Option<SavedNote>, DbError> {
        let conn = self.db.connection()?;
        let mut rows = conn
            .query(
                "SELECT note_id, source, source_id, source_url, title, summary_markdown, captured_metadata, saved_at
                 FROM notes WHERE source = ?1 AND source_id = ?2",
                params![source.as_str(), source_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_note(row)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self, source: Source, filter: NoteFilter) -> Result<Vec<SavedNote>, DbError> {
        let conn = self.db.connection()?;
        let mut rows = match filter.query {
            Some(q) => {
                conn.query(
                    "SELECT note_id, source, source_id, source_url, title, summary_markdown, captured_metadata, saved_at
                     FROM notes WHERE source = ?1 AND title LIKE ?2 ORDER BY saved_at DESC",
                    params![source.as_str(), format!("%{q}%")],
                )
                .await?
            }
            None => {
                conn.query(
                    "SELECT note_id, source, source_id, source_url, title, summary_markdown, captured_metadata, saved_at
                     FROM notes WHERE source = ?1 ORDER BY saved_at DESC",
                    params![source.as_str()],
                )
                .await?
            }
        };

        let mut notes = Vec::new();
        while let Some(row) = rows.next().await? {
            notes.push(row_to_note(row)?);
        }
        Ok(notes)
    }

    pub async fn delete(&self, source: Source, note_id: &str) -> Result<(), DbError> {
        let conn = self.db.connection()?;
        let changed = conn
            .execute(
                "DELETE FROM notes WHERE source = ?1 AND note_id = ?2",
                params![source.as_str(), note_id],
            )
            .await?;
        if changed == 0 {
            return Err(DbError::NoteNotFound);
        }
        self.snapshot_after_write().await;
        Ok(())
    }

    /// Deletes every note for `source`. Callers must already have
    /// enforced the explicit-confirmation gate at the API boundary.
    pub async fn clear(&self, source: Source) -> Result<u64, DbError> {
        let conn = self.db.connection()?;
        let changed = conn
            .execute("DELETE FROM notes WHERE source = ?1", params![source.as_str()])
            .await?;
        self.snapshot_after_write().await;
        Ok(changed)
    }

    pub async fn record_field_decisions(
        &self,
        note_id: &str,
        decisions: &[FieldDecision],
    ) -> Result<(), DbError> {
        let conn = self.db.connection()?;
        let now = Utc::now().to_rfc3339();
        for decision in decisions {
            conn.execute(
                r#"
                INSERT INTO field_decisions (note_id, field, strategy, winner_note_id, alt_value, recorded_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    note_id,
                    decision.field.clone(),
                    decision.strategy.clone(),
                    decision.winner_note_id.clone(),
                    decision.alt_value.clone(),
                    now.clone(),
                ],
            )
            .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> NoteStore {
        let dir = tempfile::tempdir().unwrap();
        let db = MidasDb::open(dir.path().join("t.db")).await.unwrap();
        let backup_dir = dir.path().join("backups");
        std::mem::forget(dir);
        NoteStore::new(db, backup_dir)
    }

    fn artifact() -> SummaryArtifact {
        SummaryArtifact {
            source: Source::Bilibili,
            source_id: "BV1xx411c7abcdef".to_string(),
            source_url: "https://www.bilibili.com/video/BV1xx411c7abcdef".to_string(),
            title: "a talk about rust".to_string(),
            summary_markdown: "# Summary\ncontent".to_string(),
            captured_metadata: CapturedMetadata {
                elapsed_ms: Some(1200),
                transcript_chars: Some(3400),
            },
        }
    }

    #[tokio::test]
    async fn save_then_get() {
        let store = store().await;
        let saved = store.save(artifact()).await.unwrap();
        let fetched = store.get(Source::Bilibili, &saved.note_id).await.unwrap();
        assert_eq!(fetched.unwrap().artifact.title, "a talk about rust");
    }

    #[tokio::test]
    async fn resave_keeps_note_id() {
        let store = store().await;
        let first = store.save(artifact()).await.unwrap();
        let mut updated = artifact();
        updated.title = "a talk about rust, revised".to_string();
        let second = store.save(updated).await.unwrap();
        assert_eq!(first.note_id, second.note_id);
        assert_eq!(second.artifact.title, "a talk about rust, revised");
    }

    #[tokio::test]
    async fn list_filters_by_title() {
        let store = store().await;
        store.save(artifact()).await.unwrap();
        let matches = store
            .list(Source::Bilibili, NoteFilter { query: Some("rust".into()) })
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        let none = store
            .list(Source::Bilibili, NoteFilter { query: Some("go".into()) })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_note_errors() {
        let store = store().await;
        let err = store.delete(Source::Bilibili, "missing").await.unwrap_err();
        assert!(matches!(err, DbError::NoteNotFound));
    }
}
