use crate::reader::classfile::DecodeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("I/O error at {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Archive error at {context}: {source}")]
    Archive {
        context: String,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("Failed to traverse {root}: {source}")]
    Traverse {
        root: String,
        #[source]
        source: walkdir::Error,
    },
    #[error("Failed to decode {resource}: {source}")]
    Decode {
        resource: String,
        #[source]
        source: DecodeError,
    },
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScanError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ScanError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn archive(context: impl Into<String>, source: zip::result::ZipError) -> Self {
        ScanError::Archive {
            context: context.into(),
            source,
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ScanError::Decode { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Attaches a location to I/O failures.
pub trait IoContext<T> {
    fn with_location(self, location: &str) -> Result<T>;
}

impl<T> IoContext<T> for std::result::Result<T, std::io::Error> {
    fn with_location(self, location: &str) -> Result<T> {
        self.map_err(|e| ScanError::io(location, e))
    }
}

impl<T> IoContext<T> for std::result::Result<T, zip::result::ZipError> {
    fn with_location(self, location: &str) -> Result<T> {
        self.map_err(|e| ScanError::archive(location, e))
    }
}
