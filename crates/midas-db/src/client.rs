use crate::errors::DbError;
use crate::schema::apply_schema;
use libsql::{Builder, Connection, Database};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// Embedded, local-only database handle (spec §4.2/§4.3: "an embedded SQL
/// store" opened at an absolute path). Unlike the remote/Turso mode the
/// underlying `libsql` driver also supports, this never dials out; the
/// whole point of the Dedupe Store and Note Store is durable local state.
#[derive(Clone)]
pub struct MidasDb {
    driver: Arc<Database>,
    file_path: PathBuf,
}

impl MidasDb {
    /// Opens (creating if absent) the database file at `file_path`,
    /// creating its parent directory if needed, and applies the schema.
    /// Failure here is fatal at startup (spec §4.2).
    #[instrument(skip_all, fields(path = %file_path.as_ref().display()))]
    pub async fn open(file_path: impl AsRef<Path>) -> Result<Self, DbError> {
        let file_path = file_path.as_ref().to_path_buf();
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbError::Connection(format!("cannot create db directory: {e}")))?;
        }

        let driver = Builder::new_local(&file_path)
            .build()
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let conn = driver
            .connect()
            .map_err(|e| DbError::Connection(e.to_string()))?;
        apply_schema(&conn).await?;

        info!("database opened");
        Ok(Self {
            driver: Arc::new(driver),
            file_path,
        })
    }

    pub fn connection(&self) -> Result<Connection, DbError> {
        self.driver.connect().map_err(|e| DbError::Connection(e.to_string()))
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}
