//! Error types for srcxref operations

use thiserror::Error;

/// Core error type for indexing, storage and rendering
#[derive(Error, Debug)]
pub enum IndexError {
    // === Ingestion errors (E101-E107) ===
    /// E101: Two declarations in one artifact share a binding identity
    #[error("E101: Duplicate declaration of {binding} in artifact {artifact} ({path})")]
    DuplicateDeclaration {
        artifact: String,
        binding: String,
        path: String,
    },

    /// E102: Artifact finished without any source file
    #[error("E102: No source files on artifact {artifact}")]
    EmptyArtifact { artifact: String },

    /// E103: A fact reaches past the range of its enclosing fact
    #[error("E103: Broken nesting: fact {start}..{end} exceeds enclosing bound {bound}")]
    BrokenNesting { start: usize, end: usize, bound: usize },

    /// E104: A fact boundary does not fall on a character boundary of the text
    #[error("E104: Invalid offset {offset} (text length {len})")]
    InvalidOffset { offset: usize, len: usize },

    /// E105: Two references of the same kind on an identical range
    #[error("E105: Duplicate reference at {start}+{length}: {first} / {second}")]
    DuplicateReference {
        start: u32,
        length: u32,
        first: String,
        second: String,
    },

    /// E106: The transaction queue closed before the call was applied
    #[error("E106: Transaction queue closed for artifact {artifact}")]
    QueueClosed { artifact: String },

    /// E107: A spawned producer task panicked or was cancelled
    #[error("E107: Producer task failed: {0}")]
    Task(String),

    // === Store errors (E110-E112) ===
    /// E110: Failed to open the index database
    #[error("E110: Failed to open index database: {reason}")]
    StoreOpen { reason: String },

    /// E111: SQL statement failed
    #[error("E111: Index database query failed: {reason}")]
    StoreQuery { reason: String },

    /// E112: Annotation blob could not be encoded or decoded
    #[error("E112: Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // === Environment errors (E120-E121) ===
    /// E120: Configuration error
    #[error("E120: Configuration error: {0}")]
    Config(String),

    /// E121: IO error
    #[error("E121: IO error: {0}")]
    Io(#[from] std::io::Error),

    // === Lookup errors (E130-E131) ===
    /// E130: No artifact row with this id
    #[error("E130: Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// E131: No stored source file at this path
    #[error("E131: Source file not found: {artifact}/{path}")]
    SourceFileNotFound { artifact: String, path: String },
}

impl IndexError {
    /// Get the error code (e.g., "E101")
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::DuplicateDeclaration { .. } => "E101",
            IndexError::EmptyArtifact { .. } => "E102",
            IndexError::BrokenNesting { .. } => "E103",
            IndexError::InvalidOffset { .. } => "E104",
            IndexError::DuplicateReference { .. } => "E105",
            IndexError::QueueClosed { .. } => "E106",
            IndexError::Task(_) => "E107",
            IndexError::StoreOpen { .. } => "E110",
            IndexError::StoreQuery { .. } => "E111",
            IndexError::Serialization(_) => "E112",
            IndexError::Config(_) => "E120",
            IndexError::Io(_) => "E121",
            IndexError::ArtifactNotFound(_) => "E130",
            IndexError::SourceFileNotFound { .. } => "E131",
        }
    }

    /// Get the exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            IndexError::DuplicateDeclaration { .. }
            | IndexError::EmptyArtifact { .. }
            | IndexError::DuplicateReference { .. } => 1, // Producer defects

            IndexError::BrokenNesting { .. } | IndexError::InvalidOffset { .. } => 2, // Render defects

            IndexError::QueueClosed { .. } | IndexError::Task(_) => 3,

            IndexError::StoreOpen { .. }
            | IndexError::StoreQuery { .. }
            | IndexError::Serialization(_) => 4,

            IndexError::Config(_) => 5,
            IndexError::Io(_) => 6,

            IndexError::ArtifactNotFound(_) | IndexError::SourceFileNotFound { .. } => 7,
        }
    }

    /// Whether this error aborts a whole artifact ingestion.
    ///
    /// Orchestrators retry such artifacts from scratch; compile-version gating
    /// makes the retry idempotent.
    pub fn aborts_artifact(&self) -> bool {
        matches!(
            self,
            IndexError::DuplicateDeclaration { .. }
                | IndexError::EmptyArtifact { .. }
                | IndexError::DuplicateReference { .. }
                | IndexError::QueueClosed { .. }
                | IndexError::Task(_)
                | IndexError::StoreQuery { .. }
                | IndexError::Serialization(_)
        )
    }
}

impl From<rusqlite::Error> for IndexError {
    fn from(e: rusqlite::Error) -> Self {
        IndexError::StoreQuery {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = IndexError::DuplicateDeclaration {
            artifact: "lib/1.0".to_string(),
            binding: "A#x()".to_string(),
            path: "A.java".to_string(),
        };
        assert_eq!(err.code(), "E101");
        assert_eq!(err.exit_code(), 1);
        assert!(err.aborts_artifact());

        let err = IndexError::BrokenNesting {
            start: 3,
            end: 9,
            bound: 5,
        };
        assert_eq!(err.code(), "E103");
        assert_eq!(err.exit_code(), 2);
        assert!(!err.aborts_artifact());
    }

    #[test]
    fn test_error_display() {
        let err = IndexError::EmptyArtifact {
            artifact: "lib/1.0".to_string(),
        };
        assert_eq!(err.to_string(), "E102: No source files on artifact lib/1.0");

        let err = IndexError::BrokenNesting {
            start: 3,
            end: 9,
            bound: 5,
        };
        assert!(err.to_string().contains("3..9"));
        assert!(err.to_string().contains("bound 5"));
    }

    #[test]
    fn test_rusqlite_error_maps_to_query() {
        let err: IndexError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.code(), "E111");
        assert_eq!(err.exit_code(), 4);
    }
}
