use simdesk_records::RecordError;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested document was not found.
  #[error("not found: {collection}/{id}")]
  NotFound { collection: String, id: String },

  /// The document changed since it was read.
  #[error("revision conflict on {collection}/{id}: expected {expected}, found {actual}")]
  Conflict {
    collection: String,
    id: String,
    expected: i64,
    actual: i64,
  },

  /// A unique index rejected the write.
  #[error("duplicate value in {collection}: {message}")]
  Duplicate { collection: String, message: String },

  /// Sort and filter fields must be plain identifiers.
  #[error("invalid field name: {0}")]
  InvalidField(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error(transparent)]
  Record(#[from] RecordError),

  #[error("migration error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

impl Error {
  /// Map a unique-index violation to [`Error::Duplicate`].
  pub(crate) fn from_write(collection: &str, err: sqlx::Error) -> Self {
    if let sqlx::Error::Database(db) = &err
      && db.is_unique_violation()
    {
      return Error::Duplicate {
        collection: collection.to_string(),
        message: db.message().to_string(),
      };
    }
    Error::Database(err)
  }
}
