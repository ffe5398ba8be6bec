use std::time::Duration;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Edit conflict: record {id} is no longer at version {version}")]
    EditConflict { id: i64, version: i64 },

    #[error("Database operation exceeded time budget of {0:?}")]
    Timeout(Duration),

    #[error("Invalid order by field: {0}")]
    InvalidOrderByField(String),

    #[error("Genres encoding error: {0}")]
    GenresEncoding(#[from] serde_json::Error),
}
