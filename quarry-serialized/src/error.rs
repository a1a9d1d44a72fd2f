use quarry_base::LocalFileId;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum SerializedError {
    /// Structural corruption: bad magic, truncated buffer, byte range out of
    /// bounds, or a read cursor that did not land on the declared object end.
    Corrupt(String),
    /// The file was written by a newer (or too-old) format version.
    UnsupportedVersion(u32),
    /// The file targets a platform this runtime cannot load.
    UnsupportedPlatform(u32),
    /// Type-stripped file whose recorded build version does not match ours.
    VersionStringMismatch { expected: String, found: String },
    /// Operation not permitted in the file's current lifecycle state.
    InvalidState(&'static str),
    /// The object is missing or tombstoned.
    ObjectNotAvailable(LocalFileId),
    /// A reference could not be resolved and the remap policy forbids
    /// nulling it.
    UnresolvedReference(i64),
    StringError(String),
    IoError(Arc<std::io::Error>),
}

impl std::error::Error for SerializedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            SerializedError::IoError(ref e) => Some(&**e),
            _ => None,
        }
    }
}

impl core::fmt::Display for SerializedError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        match *self {
            SerializedError::Corrupt(ref msg) => write!(fmt, "corrupt serialized file: {}", msg),
            SerializedError::UnsupportedVersion(version) => {
                write!(fmt, "unsupported serialized file version {}", version)
            }
            SerializedError::UnsupportedPlatform(tag) => {
                write!(fmt, "unsupported target platform tag {}", tag)
            }
            SerializedError::VersionStringMismatch {
                ref expected,
                ref found,
            } => write!(
                fmt,
                "version string mismatch: expected {:?}, found {:?}",
                expected, found
            ),
            SerializedError::InvalidState(msg) => write!(fmt, "invalid state: {}", msg),
            SerializedError::ObjectNotAvailable(id) => {
                write!(fmt, "object {:?} is not available", id)
            }
            SerializedError::UnresolvedReference(id) => {
                write!(fmt, "reference to {} could not be resolved", id)
            }
            SerializedError::StringError(ref e) => e.fmt(fmt),
            SerializedError::IoError(ref e) => e.fmt(fmt),
        }
    }
}

impl From<&str> for SerializedError {
    fn from(str: &str) -> Self {
        SerializedError::StringError(str.to_string())
    }
}

impl From<String> for SerializedError {
    fn from(string: String) -> Self {
        SerializedError::StringError(string)
    }
}

impl From<std::io::Error> for SerializedError {
    fn from(error: std::io::Error) -> Self {
        SerializedError::IoError(Arc::new(error))
    }
}

pub type SerializedResult<T> = Result<T, SerializedError>;
