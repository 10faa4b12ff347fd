//! Error types for the knowledge engine.
//!
//! This module provides a comprehensive error hierarchy using `thiserror` for
//! all engine operations including storage, chunking, parsing, and the
//! compilation/reasoning pipelines.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for engine operations.
///
/// Every variant carries a short machine-readable [`Error::code`] so callers
/// can build the "short code + short message" contract expected at the
/// platform boundary without leaking internal detail.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage-related errors (database operations).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Chunking-related errors (text processing).
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    /// Document parsing errors.
    #[error("parsing error: {0}")]
    Parsing(#[from] ParsingError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid state errors.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the invalid state.
        message: String,
    },

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The named agent does not exist for this tenant.
    #[error("agent not found: {name}")]
    NotFound {
        /// Agent name that was not found.
        name: String,
    },

    /// The agent exists but is not in a queryable state.
    #[error("agent {name} is not ready (status: {status})")]
    NotReady {
        /// Agent name.
        name: String,
        /// Current status of the agent.
        status: String,
    },

    /// The submitted corpus did not meet the minimum sufficiency bar.
    ///
    /// Compilation still proceeds on this error per the optimistic
    /// insufficient-data policy; it is surfaced for logging/diagnostics.
    #[error("insufficient data: {reason}")]
    InsufficientData {
        /// Explanation of why the corpus was judged insufficient.
        reason: String,
    },

    /// A source file's format could not be recognized.
    #[error("unsupported format: {format}")]
    UnsupportedFormat {
        /// The unrecognized format or extension.
        format: String,
    },

    /// The LLM provider failed (timeout, network, malformed response).
    #[error("LLM call failed: {reason}")]
    LlmFailure {
        /// Description of the failure.
        reason: String,
    },

    /// The embedding provider failed.
    #[error("embedding generation failed: {reason}")]
    EmbeddingFailure {
        /// Description of the failure.
        reason: String,
    },

    /// The reranker failed (degraded-path callers should not see this;
    /// it is reserved for reranker backends that cannot even degrade).
    #[error("reranker failed: {reason}")]
    RerankerFailure {
        /// Description of the failure.
        reason: String,
    },

    /// A compilation was requested for an agent that already has one in
    /// flight. The caller must wait for the existing job.
    #[error("compilation already in progress for agent: {name}")]
    ConflictingCompilation {
        /// Agent name with a conflicting job.
        name: String,
    },

    /// The chunk index could not durably persist a compiled chunk set.
    #[error("index write failed: {reason}")]
    IndexWriteFailure {
        /// Description of the failure.
        reason: String,
    },
}

impl Error {
    /// Returns a short, machine-readable code identifying the error kind.
    ///
    /// Stable across releases; suitable for API responses and client-side
    /// branching. Human-readable detail belongs in [`std::fmt::Display`].
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Storage(_) => "storage_error",
            Self::Chunking(_) => "chunking_error",
            Self::Parsing(_) => "parsing_error",
            Self::Io(_) => "io_error",
            Self::InvalidState { .. } => "invalid_state",
            Self::Config { .. } => "config_error",
            Self::NotFound { .. } => "not_found",
            Self::NotReady { .. } => "not_ready",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::LlmFailure { .. } => "llm_failure",
            Self::EmbeddingFailure { .. } => "embedding_failure",
            Self::RerankerFailure { .. } => "reranker_failure",
            Self::ConflictingCompilation { .. } => "conflicting_compilation",
            Self::IndexWriteFailure { .. } => "index_write_failure",
        }
    }
}

/// Storage-specific errors for database operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// Buffer not found by ID or name.
    #[error("buffer not found: {identifier}")]
    BufferNotFound {
        /// Buffer ID or name that was not found.
        identifier: String,
    },

    /// Transaction error.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Embedding error (feature-gated).
    #[cfg(feature = "fastembed-embeddings")]
    #[error("embedding error: {0}")]
    Embedding(String),
}

/// Chunking-specific errors for text processing.
#[derive(Error, Debug)]
pub enum ChunkingError {
    /// Invalid chunk configuration.
    #[error("invalid chunk configuration: {reason}")]
    InvalidConfig {
        /// Reason the configuration is invalid.
        reason: String,
    },
}

/// Document-parsing errors (C1).
#[derive(Error, Debug)]
pub enum ParsingError {
    /// The file extension does not map to a supported format.
    #[error("unrecognized file extension: {extension}")]
    UnknownExtension {
        /// The extension that was not recognized.
        extension: String,
    },

    /// A CSV file could not be parsed (malformed row, bad delimiter, etc).
    #[error("CSV parse error in {source}: {reason}")]
    Csv {
        /// Source file name.
        source: String,
        /// Reason for the failure.
        reason: String,
    },

    /// A JSON file did not match any of the accepted shapes
    /// (top-level array, object with a `data`/`items`/`records`/`entries`
    /// list, or a plain object).
    #[error("JSON structure not recognized in {source}")]
    UnrecognizedJsonShape {
        /// Source file name.
        source: String,
    },

    /// The configured text extractor for PDF/DOCX content was not supplied.
    #[error("no text extractor configured for format: {format}")]
    MissingExtractor {
        /// Format needing an extractor (`pdf` or `docx`).
        format: String,
    },

    /// A source produced zero usable content after parsing.
    #[error("source produced no usable content: {source}")]
    EmptySource {
        /// Source file name.
        source: String,
    },
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

// Implement From traits for standard library errors

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidState {
            message: "test error".to_string(),
        };
        assert_eq!(err.to_string(), "invalid state: test error");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::BufferNotFound {
            identifier: "test-buffer".to_string(),
        };
        assert_eq!(err.to_string(), "buffer not found: test-buffer");
    }

    #[test]
    fn test_chunking_error_display() {
        let err = ChunkingError::InvalidConfig {
            reason: "bad overlap".to_string(),
        };
        assert_eq!(err.to_string(), "invalid chunk configuration: bad overlap");
    }

    #[test]
    fn test_io_error_display() {
        let err = IoError::Generic("disk full".to_string());
        assert_eq!(err.to_string(), "I/O error: disk full");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_storage() {
        let storage_err = StorageError::Transaction("rollback".to_string());
        let err: Error = storage_err.into();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_error_from_chunking() {
        let chunk_err = ChunkingError::InvalidConfig {
            reason: "bad config".to_string(),
        };
        let err: Error = chunk_err.into();
        assert!(matches!(err, Error::Chunking(_)));
    }

    #[test]
    fn test_error_config() {
        let err = Error::Config {
            message: "bad config".to_string(),
        };
        assert_eq!(err.to_string(), "configuration error: bad config");
    }

    #[test]
    fn test_storage_error_variants() {
        let err = StorageError::Database("connection failed".to_string());
        assert!(err.to_string().contains("connection failed"));

        let err = StorageError::Transaction("rollback".to_string());
        assert!(err.to_string().contains("rollback"));

        let err = StorageError::Serialization("invalid json".to_string());
        assert!(err.to_string().contains("invalid json"));
    }

    #[test]
    fn test_from_rusqlite_error_to_error() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: Error = rusqlite_err.into();
        assert!(matches!(err, Error::Storage(StorageError::Database(_))));
    }

    #[test]
    fn test_from_rusqlite_error_to_storage_error() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: StorageError = rusqlite_err.into();
        assert!(matches!(err, StorageError::Database(_)));
    }

    #[test]
    fn test_from_serde_json_error_to_storage_error() {
        let json_err: serde_json::Error = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: StorageError = json_err.into();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn test_parsing_error_display() {
        let err = ParsingError::UnknownExtension {
            extension: "xyz".to_string(),
        };
        assert!(err.to_string().contains("xyz"));

        let err = ParsingError::EmptySource {
            source: "notes.txt".to_string(),
        };
        assert!(err.to_string().contains("notes.txt"));
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            Error::NotFound {
                name: "a".to_string()
            }
            .code(),
            "not_found"
        );
        assert_eq!(
            Error::NotReady {
                name: "a".to_string(),
                status: "initializing".to_string()
            }
            .code(),
            "not_ready"
        );
        assert_eq!(
            Error::ConflictingCompilation {
                name: "a".to_string()
            }
            .code(),
            "conflicting_compilation"
        );
        assert_eq!(
            Error::LlmFailure {
                reason: "timeout".to_string()
            }
            .code(),
            "llm_failure"
        );
        assert_eq!(
            Error::IndexWriteFailure {
                reason: "disk full".to_string()
            }
            .code(),
            "index_write_failure"
        );
    }

    #[test]
    fn test_not_ready_display() {
        let err = Error::NotReady {
            name: "support-bot".to_string(),
            status: "in_progress".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "agent support-bot is not ready (status: in_progress)"
        );
    }
}
