use crate::client::MidasDb;
use crate::errors::DbError;
use chrono::Utc;
use libsql::params;
use std::path::PathBuf;
use tracing::info;

/// Writes a consistent, timestamped snapshot of the database into
/// `backup_dir`, plus an overwritten `midas_latest.db` pointer (spec §6:
/// "a backup directory holds timestamped copies plus a `*_latest.*`
/// symlink-equivalent"). `VACUUM INTO` gives us a point-in-time copy even
/// while the WAL has uncheckpointed pages.
pub async fn snapshot(db: &MidasDb, backup_dir: &std::path::Path) -> Result<PathBuf, DbError> {
    std::fs::create_dir_all(backup_dir)
        .map_err(|e| DbError::Backup(format!("cannot create backup dir: {e}")))?;

    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
    let snapshot_path = backup_dir.join(format!("midas_{stamp}.db"));
    let latest_path = backup_dir.join("midas_latest.db");

    let conn = db.connection()?;
    let snapshot_path_str = snapshot_path.to_string_lossy().to_string();
    conn.execute("VACUUM INTO ?1", params![snapshot_path_str.clone()])
        .await?;

    std::fs::copy(&snapshot_path, &latest_path)
        .map_err(|e| DbError::Backup(format!("cannot update latest pointer: {e}")))?;

    info!(path = %snapshot_path.display(), "wrote database snapshot");
    Ok(snapshot_path)
}
