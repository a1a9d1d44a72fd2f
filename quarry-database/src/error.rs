use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum DatabaseError {
    /// Precondition failure on a database operation (bad guid, bad name,
    /// target inside its own subtree, ...)
    Validation(String),
    /// The in-memory graph contradicts itself in a way we cannot repair
    Inconsistent(String),
    /// An importer ran and failed; the path goes to the failed-import ledger
    ImportFailed { path: String, message: String },
    /// No registered importer accepts this file
    UnknownImporter(String),
    SerializedError(quarry_serialized::SerializedError),
    StringError(String),
    IoError(Arc<std::io::Error>),
    JsonError(Arc<serde_json::Error>),
}

impl std::error::Error for DatabaseError {}

impl core::fmt::Display for DatabaseError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            DatabaseError::Validation(msg) => write!(fmt, "Validation error: {}", msg),
            DatabaseError::Inconsistent(msg) => write!(fmt, "Database inconsistent: {}", msg),
            DatabaseError::ImportFailed { path, message } => {
                write!(fmt, "Import of {:?} failed: {}", path, message)
            }
            DatabaseError::UnknownImporter(path) => {
                write!(fmt, "No importer accepts {:?}", path)
            }
            DatabaseError::SerializedError(e) => e.fmt(fmt),
            DatabaseError::StringError(msg) => msg.fmt(fmt),
            DatabaseError::IoError(e) => e.fmt(fmt),
            DatabaseError::JsonError(e) => e.fmt(fmt),
        }
    }
}

impl From<quarry_serialized::SerializedError> for DatabaseError {
    fn from(error: quarry_serialized::SerializedError) -> Self {
        DatabaseError::SerializedError(error)
    }
}

impl From<std::io::Error> for DatabaseError {
    fn from(error: std::io::Error) -> Self {
        DatabaseError::IoError(Arc::new(error))
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(error: serde_json::Error) -> Self {
        DatabaseError::JsonError(Arc::new(error))
    }
}

impl From<String> for DatabaseError {
    fn from(error: String) -> Self {
        DatabaseError::StringError(error)
    }
}

impl From<&str> for DatabaseError {
    fn from(error: &str) -> Self {
        DatabaseError::StringError(error.to_string())
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
