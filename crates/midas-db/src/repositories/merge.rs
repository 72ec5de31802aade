use crate::client::MidasDb;
use crate::errors::DbError;
use chrono::{DateTime, Utc};
use libsql::{params, Row};
use midas_models::{FieldDecision, MergeRecord, Source};
use uuid::Uuid;

fn parse_source(raw: &str) -> Result<Source, DbError> {
    match raw {
        "bilibili" => Ok(Source::Bilibili),
        "xiaohongshu" => Ok(Source::Xiaohongshu),
        other => Err(DbError::Mapping(format!("unknown source {other}"))),
    }
}

fn row_to_record(row: Row) -> Result<MergeRecord, DbError> {
    let source_note_ids: String = row.get(2)?;
    let source_note_ids: Vec<String> = serde_json::from_str(&source_note_ids)
        .map_err(|e| DbError::Mapping(format!("source_note_ids: {e}")))?;
    let field_decisions: String = row.get(4)?;
    let field_decisions: Vec<FieldDecision> = serde_json::from_str(&field_decisions)
        .map_err(|e| DbError::Mapping(format!("field_decisions: {e}")))?;
    let created_at: String = row.get(5)?;
    let created_at: DateTime<Utc> = created_at
        .parse()
        .map_err(|e| DbError::Mapping(format!("created_at: {e}")))?;
    let finalized_at: Option<String> = row.get(7)?;
    let finalized_at = finalized_at
        .map(|s| s.parse::<DateTime<Utc>>())
        .transpose()
        .map_err(|e| DbError::Mapping(format!("finalized_at: {e}")))?;

    Ok(MergeRecord {
        merge_id: row.get(0)?,
        source: parse_source(&row.get::<String>(1)?)?,
        source_note_ids,
        merged_note_id: row.get(3)?,
        field_decisions,
        created_at,
        rollback_of: row.get(6)?,
        finalized_at,
    })
}

const SELECT_COLUMNS: &str = "merge_id, source, source_note_ids, merged_note_id, field_decisions, created_at, rollback_of, finalized_at";

/// Persistence for `MergeRecord` rows backing the Merge Engine (C11). The
/// merge engine itself owns the scoring and conflict-resolution logic;
/// this repository only stores the committed outcome of each merge.
pub struct MergeStore {
    db: MidasDb,
}

impl MergeStore {
    pub fn new(db: MidasDb) -> Self {
        Self { db }
    }

    pub async fn insert(&self, record: &MergeRecord) -> Result<(), DbError> {
        let conn = self.db.connection()?;
        let source_note_ids = serde_json::to_string(&record.source_note_ids)
            .map_err(|e| DbError::Mapping(e.to_string()))?;
        let field_decisions = serde_json::to_string(&record.field_decisions)
            .map_err(|e| DbError::Mapping(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO merge_records
                (merge_id, source, source_note_ids, merged_note_id, field_decisions, created_at, rollback_of, finalized_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.merge_id.clone(),
                record.source.as_str(),
                source_note_ids,
                record.merged_note_id.clone(),
                field_decisions,
                record.created_at.to_rfc3339(),
                record.rollback_of.clone(),
                record.finalized_at.map(|t| t.to_rfc3339()),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn get(&self, merge_id: &str) -> Result<Option<MergeRecord>, DbError> {
        let conn = self.db.connection()?;
        let mut rows = conn
            .query(
                &format!("SELECT {SELECT_COLUMNS} FROM merge_records WHERE merge_id = ?1"),
                params![merge_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_record(row)?)),
            None => Ok(None),
        }
    }

    /// The most recent non-finalized merge for `source`, if any. Only
    /// this merge may be rolled back; an older one would orphan
    /// whatever superseded it (spec §4.11, I8).
    pub async fn most_recent_pending(&self, source: Source) -> Result<Option<MergeRecord>, DbError> {
        let conn = self.db.connection()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM merge_records
                     WHERE source = ?1 AND finalized_at IS NULL
                     ORDER BY created_at DESC LIMIT 1"
                ),
                params![source.as_str()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_record(row)?)),
            None => Ok(None),
        }
    }

    pub async fn finalize(&self, merge_id: &str) -> Result<(), DbError> {
        let conn = self.db.connection()?;
        let changed = conn
            .execute(
                "UPDATE merge_records SET finalized_at = ?1 WHERE merge_id = ?2 AND finalized_at IS NULL",
                params![Utc::now().to_rfc3339(), merge_id],
            )
            .await?;
        if changed == 0 {
            let existing = self.get(merge_id).await?;
            return match existing {
                Some(_) => Err(DbError::MergeFinalized),
                None => Err(DbError::MergeNotFound),
            };
        }
        Ok(())
    }

    pub async fn delete(&self, merge_id: &str) -> Result<(), DbError> {
        let conn = self.db.connection()?;
        let changed = conn
            .execute("DELETE FROM merge_records WHERE merge_id = ?1", params![merge_id])
            .await?;
        if changed == 0 {
            return Err(DbError::MergeNotFound);
        }
        Ok(())
    }

    pub fn new_merge_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> MergeStore {
        let dir = tempfile::tempdir().unwrap();
        let db = MidasDb::open(dir.path().join("t.db")).await.unwrap();
        std::mem::forget(dir);
        MergeStore::new(db)
    }

    fn record() -> MergeRecord {
        MergeRecord {
            merge_id: MergeStore::new_merge_id(),
            source: Source::Bilibili,
            source_note_ids: vec!["a".into(), "b".into()],
            merged_note_id: "a".into(),
            field_decisions: vec![FieldDecision {
                field: "title".into(),
                strategy: "longest".into(),
                winner_note_id: Some("a".into()),
                alt_value: None,
            }],
            created_at: Utc::now(),
            rollback_of: None,
            finalized_at: None,
        }
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = store().await;
        let record = record();
        store.insert(&record).await.unwrap();
        let fetched = store.get(&record.merge_id).await.unwrap().unwrap();
        assert_eq!(fetched.merged_note_id, "a");
    }

    #[tokio::test]
    async fn most_recent_pending_excludes_finalized() {
        let store = store().await;
        let record = record();
        store.insert(&record).await.unwrap();
        store.finalize(&record.merge_id).await.unwrap();
        assert!(store
            .most_recent_pending(Source::Bilibili)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn finalize_twice_errors() {
        let store = store().await;
        let record = record();
        store.insert(&record).await.unwrap();
        store.finalize(&record.merge_id).await.unwrap();
        let err = store.finalize(&record.merge_id).await.unwrap_err();
        assert!(matches!(err, DbError::MergeFinalized));
    }
}
