use crate::client::MidasDb;
use crate::errors::DbError;
use chrono::Utc;
use libsql::params;
use midas_models::Source;

/// C2: a durable set of already-seen `(source, source_id)` pairs. A
/// candidate present here is skipped by the sync driver and never
/// re-fetched within the same run (spec §8, I2).
pub struct DedupeStore {
    db: MidasDb,
}

impl DedupeStore {
    pub fn new(db: MidasDb) -> Self {
        Self { db }
    }

    pub async fn contains(&self, source: Source, source_id: &str) -> Result<bool, DbError> {
        let conn = self.db.connection()?;
        let mut rows = conn
            .query(
                "SELECT 1 FROM dedupe WHERE source = ?1 AND source_id = ?2",
                params![source.as_str(), source_id],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    pub async fn add(&self, source: Source, source_id: &str) -> Result<(), DbError> {
        let conn = self.db.connection()?;
        conn.execute(
            "INSERT OR IGNORE INTO dedupe (source, source_id, created_at) VALUES (?1, ?2, ?3)",
            params![source.as_str(), source_id, Utc::now().to_rfc3339()],
        )
        .await?;
        Ok(())
    }

    /// Removes dedupe entries for `source` that have no corresponding
    /// saved note, the documented "synced-but-unsaved" pruning path
    /// (spec §4.2). Returns the number of rows removed.
    pub async fn prune_unsaved(&self, source: Source) -> Result<u64, DbError> {
        let conn = self.db.connection()?;
        let before = conn
            .query(
                "SELECT COUNT(*) FROM dedupe WHERE source = ?1",
                params![source.as_str()],
            )
            .await?
            .next()
            .await?
            .map(|r| r.get::<i64>(0))
            .transpose()?
            .unwrap_or(0);

        conn.execute(
            r#"
            DELETE FROM dedupe
            WHERE source = ?1
              AND source_id NOT IN (SELECT source_id FROM notes WHERE source = ?1)
            "#,
            params![source.as_str()],
        )
        .await?;

        let after = conn
            .query(
                "SELECT COUNT(*) FROM dedupe WHERE source = ?1",
                params![source.as_str()],
            )
            .await?
            .next()
            .await?
            .map(|r| r.get::<i64>(0))
            .transpose()?
            .unwrap_or(0);

        Ok((before - after).max(0) as u64)
    }

    /// Every candidate dedupe entry for `source`, used to report
    /// `candidate_count` on the prune endpoint before deletion.
    pub async fn candidate_prune_count(&self, source: Source) -> Result<u64, DbError> {
        let conn = self.db.connection()?;
        let count = conn
            .query(
                r#"
                SELECT COUNT(*) FROM dedupe
                WHERE source = ?1
                  AND source_id NOT IN (SELECT source_id FROM notes WHERE source = ?1)
                "#,
                params![source.as_str()],
            )
            .await?
            .next()
            .await?
            .map(|r| r.get::<i64>(0))
            .transpose()?
            .unwrap_or(0);
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> DedupeStore {
        let dir = tempfile::tempdir().unwrap();
        let db = MidasDb::open(dir.path().join("t.db")).await.unwrap();
        std::mem::forget(dir);
        DedupeStore::new(db)
    }

    #[tokio::test]
    async fn add_then_contains() {
        let store = store().await;
        assert!(!store.contains(Source::Bilibili, "BV1xx").await.unwrap());
        store.add(Source::Bilibili, "BV1xx").await.unwrap();
        assert!(store.contains(Source::Bilibili, "BV1xx").await.unwrap());
    }

    #[tokio::test]
    async fn prune_unsaved_removes_unreferenced_entries() {
        let store = store().await;
        store.add(Source::Bilibili, "BV1xx").await.unwrap();
        let removed = store.prune_unsaved(Source::Bilibili).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!store.contains(Source::Bilibili, "BV1xx").await.unwrap());
    }
}
