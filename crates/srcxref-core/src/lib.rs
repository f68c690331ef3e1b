//! srcxref-core: cross-reference indexing of annotated source code
//!
//! This crate turns semantic facts reported by a language front end into a
//! durable store of declarations and references, and renders source text
//! with those facts attached.

/// Core error types for srcxref operations
pub mod error;

/// Configuration handling
pub mod config;

/// Byte offset to line lookup
pub mod line_index;

/// Binding identity and canonicalization
pub mod binding;

/// Facts, reference kinds and annotated source files
pub mod annotation;

/// Nested markup rendering (HTML and tree)
pub mod render;

/// Transaction seam and the SQLite store
pub mod store;

/// Single-worker transaction actor
pub mod actor;

/// Artifact ingestion
pub mod ingest;

// Re-exports for convenience
pub use actor::{ActorWorker, AsyncTransaction, TransactionCall, channel, with_artifact_transaction};
pub use annotation::{AnnotatedSourceFile, Annotation, Fact, ReferenceKind};
pub use binding::{
    Binding, BindingId, Canonicalizer, ErasedType, MethodBinding, TypeBinding, Unsupported,
    VariableBinding, canonical_method, canonical_type, canonical_variable,
};
pub use config::{Config, IngestConfig, LogConfig, StoreConfig};
pub use error::IndexError;
pub use ingest::{
    ArtifactDump, ArtifactWriter, COMPILE_VERSION, IngestOutcome, IngestSummary, Indexer,
};
pub use line_index::LineIndex;
pub use render::{
    Emitter, HtmlEmitter, RenderNode, TreeEmitter, escape_html, render, render_html, render_tree,
};
pub use store::sqlite::ArtifactStatus;
pub use store::{
    DeclarationRow, ReferenceRow, SourceFileRow, SqliteStore, SqliteTransaction, Transaction,
    TransactionProvider,
};
