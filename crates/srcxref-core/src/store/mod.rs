//! Persistence seam for ingestion.
//!
//! The ingestion pipeline writes through the [`Transaction`] trait: one
//! method per row kind, applied by a single worker, committed once at the
//! end. Dropping an uncommitted transaction rolls it back.
//!
//! [`TransactionProvider`] opens one transaction per artifact. The SQLite
//! implementation lives in [`sqlite`]; tests plug in recording providers.

pub mod sqlite;

use serde::{Deserialize, Serialize};

use crate::annotation::ReferenceKind;
use crate::binding::BindingId;
use crate::error::IndexError;

pub use sqlite::{SqliteStore, SqliteTransaction};

// ============================================================================
// Rows
// ============================================================================

/// A persisted source file: text plus its serialized fact blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFileRow {
    pub path: String,
    /// Hex SHA-256 of `text`.
    pub hash: String,
    pub text: String,
    /// JSON-serialized facts.
    pub annotations: String,
}

/// One declaration: `binding` is declared by `artifact` in `source_file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationRow {
    pub artifact: String,
    pub binding: BindingId,
    pub source_file: String,
    pub is_type: bool,
}

/// One reference to `target` from a line of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRow {
    pub target: BindingId,
    pub kind: ReferenceKind,
    pub source_artifact: String,
    pub source_file: String,
    /// 1-based line of the reference.
    pub line: u32,
    /// Id of the reference within its source file.
    pub source_file_id: u32,
}

// ============================================================================
// Transaction Traits
// ============================================================================

/// Low-level write operations of one artifact ingestion.
///
/// Implementations need not be thread-safe: exactly one worker applies calls.
pub trait Transaction {
    /// Delete every row owned by `artifact`: its artifact row, declarations,
    /// references, source files, dependency edges and aliases.
    fn clear_artifact(&mut self, artifact: &str) -> Result<(), IndexError>;

    fn insert_artifact(&mut self, artifact: &str, compile_version: i64) -> Result<(), IndexError>;

    fn insert_dependency(&mut self, from: &str, to: &str) -> Result<(), IndexError>;

    fn insert_alias(&mut self, artifact: &str, alias: &str) -> Result<(), IndexError>;

    fn insert_source_file(&mut self, artifact: &str, file: SourceFileRow)
    -> Result<(), IndexError>;

    /// Fails with [`IndexError::DuplicateDeclaration`] when the artifact
    /// already declares `row.binding` in this transaction.
    fn insert_decl(&mut self, row: DeclarationRow) -> Result<(), IndexError>;

    fn insert_ref(&mut self, row: ReferenceRow) -> Result<(), IndexError>;

    /// Make every applied call durable.
    fn commit(self) -> Result<(), IndexError>
    where
        Self: Sized;
}

/// Opens one [`Transaction`] per artifact.
pub trait TransactionProvider {
    type Tx<'a>: Transaction
    where
        Self: 'a;

    fn begin(&mut self, artifact: &str) -> Result<Self::Tx<'_>, IndexError>;
}
