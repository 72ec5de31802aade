use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(#[from] libsql::Error),

    #[error("row mapping failed: {0}")]
    Mapping(String),

    #[error("note not found")]
    NoteNotFound,

    #[error("merge record not found")]
    MergeNotFound,

    #[error("merge already finalized")]
    MergeFinalized,

    #[error("a newer merge exists for this source")]
    MergeSuperseded,

    #[error("backup snapshot failed: {0}")]
    Backup(String),
}

impl From<DbError> for midas_models::MidasError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NoteNotFound | DbError::MergeNotFound => {
                midas_models::MidasError::invalid_input(err.to_string())
            }
            DbError::MergeFinalized | DbError::MergeSuperseded => {
                midas_models::MidasError::invalid_input(err.to_string())
            }
            other => midas_models::MidasError::internal(other.to_string()),
        }
    }
}
