//! SQLite-backed cross-reference store.
//!
//! `SqliteStore` owns the connection; [`SqliteStore::begin`] opens one
//! write transaction per artifact. Reference and declaration rows are
//! buffered and flushed in batches through cached prepared statements.

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::{DeclarationRow, ReferenceRow, SourceFileRow, Transaction, TransactionProvider};
use crate::annotation::{AnnotatedSourceFile, Fact, ReferenceKind};
use crate::binding::BindingId;
use crate::config::Config;
use crate::error::IndexError;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Rows buffered before a flush.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default SQLite busy timeout.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS artifacts (
    id                 TEXT PRIMARY KEY,
    lastCompileVersion INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS bindings (
    artifactId  TEXT NOT NULL,
    binding     TEXT NOT NULL,
    bindingHash INTEGER NOT NULL,
    sourceFile  TEXT NOT NULL,
    isType      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS binding_references (
    targetBinding    TEXT NOT NULL,
    targetHash       INTEGER NOT NULL,
    type             INTEGER NOT NULL,
    sourceArtifactId TEXT NOT NULL,
    sourceFile       TEXT NOT NULL,
    sourceFileLine   INTEGER NOT NULL,
    sourceFileId     INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sourceFiles (
    artifactId  TEXT NOT NULL,
    path        TEXT NOT NULL,
    hash        TEXT NOT NULL,
    text        TEXT NOT NULL,
    annotations TEXT NOT NULL,
    PRIMARY KEY (artifactId, path)
);

CREATE TABLE IF NOT EXISTS dependencies (
    fromArtifactId TEXT NOT NULL,
    toArtifactId   TEXT NOT NULL,
    PRIMARY KEY (fromArtifactId, toArtifactId)
);

CREATE TABLE IF NOT EXISTS artifact_aliases (
    artifactId TEXT NOT NULL,
    alias      TEXT NOT NULL,
    PRIMARY KEY (artifactId, alias)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_bindings_artifact ON bindings(artifactId, binding);
CREATE INDEX IF NOT EXISTS idx_bindings_hash ON bindings(bindingHash);
CREATE INDEX IF NOT EXISTS idx_refs_target ON binding_references(targetHash);
CREATE INDEX IF NOT EXISTS idx_refs_source ON binding_references(sourceArtifactId, sourceFile);
"#;

fn query_err(context: &'static str) -> impl Fn(rusqlite::Error) -> IndexError {
    move |e| IndexError::StoreQuery {
        reason: format!("{}: {}", context, e),
    }
}

fn open_err(context: &'static str) -> impl Fn(rusqlite::Error) -> IndexError {
    move |e| IndexError::StoreOpen {
        reason: format!("{}: {}", context, e),
    }
}

/// Summary of one stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArtifactStatus {
    pub id: String,
    pub compile_version: i64,
    pub source_files: usize,
    pub declarations: usize,
    pub references: usize,
    pub dependencies: Vec<String>,
    pub aliases: Vec<String>,
}

// ============================================================================
// Store
// ============================================================================

/// Cross-reference database.
pub struct SqliteStore {
    conn: Connection,
    batch_size: usize,
}

impl SqliteStore {
    /// Open (or create) the store at `path` with default settings.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        Self::open_with(path, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_BATCH_SIZE)
    }

    /// Open the store named by `[store] path`, tuned by `config`.
    pub fn from_config(config: &Config) -> Result<Self, IndexError> {
        Self::open_with(
            &config.store.path,
            config.store.busy_timeout_ms,
            config.ingest.batch_size,
        )
    }

    /// Open (or create) the store at `path`.
    ///
    /// Sets WAL mode and the busy timeout, then creates the schema if not
    /// present. This operation is idempotent.
    pub fn open_with(
        path: &Path,
        busy_timeout_ms: u64,
        batch_size: usize,
    ) -> Result<Self, IndexError> {
        let conn = Connection::open(path).map_err(open_err("failed to open database"))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(open_err("failed to set PRAGMA"))?;
        Self::init(conn, busy_timeout_ms, batch_size)
    }

    /// A private in-memory store.
    pub fn open_in_memory() -> Result<Self, IndexError> {
        let conn = Connection::open_in_memory().map_err(open_err("failed to open database"))?;
        Self::init(conn, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_BATCH_SIZE)
    }

    fn init(conn: Connection, busy_timeout_ms: u64, batch_size: usize) -> Result<Self, IndexError> {
        conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
            .map_err(open_err("failed to set busy timeout"))?;
        conn.execute_batch(SCHEMA)
            .map_err(open_err("failed to create schema"))?;
        conn.execute(
            "INSERT INTO schema_version SELECT ?1 WHERE NOT EXISTS (SELECT 1 FROM schema_version)",
            [SCHEMA_VERSION],
        )
        .map_err(open_err("failed to insert schema version"))?;

        Ok(SqliteStore {
            conn,
            batch_size: batch_size.max(1),
        })
    }

    /// Query the schema version from the database.
    pub fn schema_version(&self) -> Result<i32, IndexError> {
        self.conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .map_err(query_err("failed to query schema version"))
    }

    /// Begin the write transaction of one artifact ingestion.
    pub fn begin(&mut self, artifact: &str) -> Result<SqliteTransaction<'_>, IndexError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_err("failed to begin transaction"))?;
        debug!(artifact, "transaction opened");
        Ok(SqliteTransaction {
            tx,
            artifact: artifact.to_string(),
            batch_size: self.batch_size,
            declared: HashSet::new(),
            pending_decls: Vec::new(),
            pending_refs: Vec::new(),
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Compile version the artifact was last ingested with, if any.
    pub fn artifact_version(&self, artifact: &str) -> Result<Option<i64>, IndexError> {
        self.conn
            .query_row(
                "SELECT lastCompileVersion FROM artifacts WHERE id = ?1",
                [artifact],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err("failed to query artifact"))
    }

    /// Whether `artifact` is missing or was ingested by an older version.
    pub fn needs_recompile(&self, artifact: &str, version: i64) -> Result<bool, IndexError> {
        Ok(match self.artifact_version(artifact)? {
            Some(last) => last < version,
            None => true,
        })
    }

    /// All artifact ids, sorted.
    pub fn artifacts(&self) -> Result<Vec<String>, IndexError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM artifacts ORDER BY id")
            .map_err(query_err("failed to prepare artifact query"))?;
        let ids = stmt
            .query_map([], |row| row.get(0))
            .map_err(query_err("failed to query artifacts"))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Row counts and edges of one artifact.
    pub fn artifact_status(&self, artifact: &str) -> Result<ArtifactStatus, IndexError> {
        let compile_version = self
            .artifact_version(artifact)?
            .ok_or_else(|| IndexError::ArtifactNotFound(artifact.to_string()))?;
        let count = |sql: &str| -> Result<usize, IndexError> {
            let n: i64 = self
                .conn
                .query_row(sql, [artifact], |row| row.get(0))
                .map_err(query_err("failed to count rows"))?;
            Ok(usize::try_from(n).unwrap_or(0))
        };
        Ok(ArtifactStatus {
            id: artifact.to_string(),
            compile_version,
            source_files: count("SELECT COUNT(*) FROM sourceFiles WHERE artifactId = ?1")?,
            declarations: count("SELECT COUNT(*) FROM bindings WHERE artifactId = ?1")?,
            references: count(
                "SELECT COUNT(*) FROM binding_references WHERE sourceArtifactId = ?1",
            )?,
            dependencies: self.dependencies(artifact)?,
            aliases: self.aliases(artifact)?,
        })
    }

    /// Declarations of one artifact, ordered by binding.
    pub fn declarations(&self, artifact: &str) -> Result<Vec<DeclarationRow>, IndexError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT artifactId, binding, sourceFile, isType FROM bindings
                 WHERE artifactId = ?1 ORDER BY binding",
            )
            .map_err(query_err("failed to prepare declaration query"))?;
        let rows = stmt
            .query_map([artifact], declaration_from_row)
            .map_err(query_err("failed to query declarations"))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Every reference to `binding`, across artifacts.
    pub fn references_to(&self, binding: &BindingId) -> Result<Vec<ReferenceRow>, IndexError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT targetBinding, type, sourceArtifactId, sourceFile, sourceFileLine, sourceFileId
                 FROM binding_references
                 WHERE targetHash = ?1 AND targetBinding = ?2
                 ORDER BY sourceArtifactId, sourceFile, sourceFileLine, sourceFileId",
            )
            .map_err(query_err("failed to prepare reference query"))?;
        let rows = stmt
            .query_map(params![binding.numeric_id(), binding.as_str()], |row| {
                let kind: u8 = row.get(1)?;
                let kind = ReferenceKind::from_id(kind).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Integer,
                        format!("unknown reference kind id {}", kind).into(),
                    )
                })?;
                Ok(ReferenceRow {
                    target: BindingId::new(row.get::<_, String>(0)?),
                    kind,
                    source_artifact: row.get(2)?,
                    source_file: row.get(3)?,
                    line: row.get(4)?,
                    source_file_id: row.get(5)?,
                })
            })
            .map_err(query_err("failed to query references"))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Which artifact and file declares `binding`.
    ///
    /// Several artifacts may declare the same identity (e.g. two versions of
    /// a library); the lexically first artifact wins.
    pub fn resolve_declaration(
        &self,
        binding: &BindingId,
    ) -> Result<Option<DeclarationRow>, IndexError> {
        self.conn
            .query_row(
                "SELECT artifactId, binding, sourceFile, isType FROM bindings
                 WHERE bindingHash = ?1 AND binding = ?2
                 ORDER BY artifactId LIMIT 1",
                params![binding.numeric_id(), binding.as_str()],
                declaration_from_row,
            )
            .optional()
            .map_err(query_err("failed to resolve declaration"))
    }

    /// Paths of the source files stored for `artifact`, sorted.
    pub fn source_file_paths(&self, artifact: &str) -> Result<Vec<String>, IndexError> {
        let mut stmt = self
            .conn
            .prepare("SELECT path FROM sourceFiles WHERE artifactId = ?1 ORDER BY path")
            .map_err(query_err("failed to prepare source file query"))?;
        let paths = stmt
            .query_map([artifact], |row| row.get(0))
            .map_err(query_err("failed to query source files"))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(paths)
    }

    /// Load a stored file with its facts.
    pub fn source_file(
        &self,
        artifact: &str,
        path: &str,
    ) -> Result<AnnotatedSourceFile, IndexError> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT text, annotations FROM sourceFiles WHERE artifactId = ?1 AND path = ?2",
                [artifact, path],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(query_err("failed to query source file"))?;
        let Some((text, annotations)) = row else {
            return Err(IndexError::SourceFileNotFound {
                artifact: artifact.to_string(),
                path: path.to_string(),
            });
        };
        let facts: Vec<Fact> = serde_json::from_str(&annotations)?;
        Ok(AnnotatedSourceFile { text, facts })
    }

    /// Artifacts `artifact` depends on, sorted.
    pub fn dependencies(&self, artifact: &str) -> Result<Vec<String>, IndexError> {
        self.string_column(
            "SELECT toArtifactId FROM dependencies WHERE fromArtifactId = ?1 ORDER BY toArtifactId",
            artifact,
        )
    }

    /// Alternative names of `artifact`, sorted.
    pub fn aliases(&self, artifact: &str) -> Result<Vec<String>, IndexError> {
        self.string_column(
            "SELECT alias FROM artifact_aliases WHERE artifactId = ?1 ORDER BY alias",
            artifact,
        )
    }

    fn string_column(&self, sql: &str, artifact: &str) -> Result<Vec<String>, IndexError> {
        let mut stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(query_err("failed to prepare query"))?;
        let values = stmt
            .query_map([artifact], |row| row.get(0))
            .map_err(query_err("failed to query rows"))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(values)
    }
}

fn declaration_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeclarationRow> {
    Ok(DeclarationRow {
        artifact: row.get(0)?,
        binding: BindingId::new(row.get::<_, String>(1)?),
        source_file: row.get(2)?,
        is_type: row.get(3)?,
    })
}

impl TransactionProvider for SqliteStore {
    type Tx<'a> = SqliteTransaction<'a>;

    fn begin(&mut self, artifact: &str) -> Result<SqliteTransaction<'_>, IndexError> {
        SqliteStore::begin(self, artifact)
    }
}

// ============================================================================
// Transaction
// ============================================================================

/// One artifact's write transaction. Rolls back on drop unless committed.
pub struct SqliteTransaction<'a> {
    tx: rusqlite::Transaction<'a>,
    artifact: String,
    batch_size: usize,
    /// Bindings declared so far in this transaction.
    declared: HashSet<BindingId>,
    pending_decls: Vec<DeclarationRow>,
    pending_refs: Vec<ReferenceRow>,
}

impl SqliteTransaction<'_> {
    fn flush_decls(&mut self) -> Result<(), IndexError> {
        if self.pending_decls.is_empty() {
            return Ok(());
        }
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT INTO bindings (artifactId, binding, bindingHash, sourceFile, isType)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(query_err("failed to prepare declaration insert"))?;
        for row in self.pending_decls.drain(..) {
            stmt.execute(params![
                row.artifact,
                row.binding.as_str(),
                row.binding.numeric_id(),
                row.source_file,
                row.is_type
            ])
            .map_err(|e| match e.sqlite_error_code() {
                Some(rusqlite::ErrorCode::ConstraintViolation) => {
                    IndexError::DuplicateDeclaration {
                        artifact: row.artifact.clone(),
                        binding: row.binding.to_string(),
                        path: row.source_file.clone(),
                    }
                }
                _ => IndexError::StoreQuery {
                    reason: format!("failed to insert declaration: {}", e),
                },
            })?;
        }
        debug!(artifact = %self.artifact, "flushed declarations");
        Ok(())
    }

    fn flush_refs(&mut self) -> Result<(), IndexError> {
        if self.pending_refs.is_empty() {
            return Ok(());
        }
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT INTO binding_references
                 (targetBinding, targetHash, type, sourceArtifactId, sourceFile, sourceFileLine, sourceFileId)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(query_err("failed to prepare reference insert"))?;
        for row in self.pending_refs.drain(..) {
            stmt.execute(params![
                row.target.as_str(),
                row.target.numeric_id(),
                row.kind.id(),
                row.source_artifact,
                row.source_file,
                row.line,
                row.source_file_id
            ])
            .map_err(query_err("failed to insert reference"))?;
        }
        debug!(artifact = %self.artifact, "flushed references");
        Ok(())
    }
}

impl Transaction for SqliteTransaction<'_> {
    fn clear_artifact(&mut self, artifact: &str) -> Result<(), IndexError> {
        self.pending_decls.retain(|row| row.artifact != artifact);
        self.pending_refs.retain(|row| row.source_artifact != artifact);
        self.declared.clear();

        for sql in [
            "DELETE FROM bindings WHERE artifactId = ?1",
            "DELETE FROM binding_references WHERE sourceArtifactId = ?1",
            "DELETE FROM sourceFiles WHERE artifactId = ?1",
            "DELETE FROM dependencies WHERE fromArtifactId = ?1",
            "DELETE FROM artifact_aliases WHERE artifactId = ?1",
            "DELETE FROM artifacts WHERE id = ?1",
        ] {
            self.tx
                .execute(sql, [artifact])
                .map_err(query_err("failed to clear artifact"))?;
        }
        info!(artifact, "cleared previous rows");
        Ok(())
    }

    fn insert_artifact(&mut self, artifact: &str, compile_version: i64) -> Result<(), IndexError> {
        self.tx
            .execute(
                "INSERT INTO artifacts (id, lastCompileVersion) VALUES (?1, ?2)",
                params![artifact, compile_version],
            )
            .map_err(query_err("failed to insert artifact"))?;
        Ok(())
    }

    fn insert_dependency(&mut self, from: &str, to: &str) -> Result<(), IndexError> {
        self.tx
            .execute(
                "INSERT OR IGNORE INTO dependencies (fromArtifactId, toArtifactId) VALUES (?1, ?2)",
                [from, to],
            )
            .map_err(query_err("failed to insert dependency"))?;
        Ok(())
    }

    fn insert_alias(&mut self, artifact: &str, alias: &str) -> Result<(), IndexError> {
        self.tx
            .execute(
                "INSERT OR IGNORE INTO artifact_aliases (artifactId, alias) VALUES (?1, ?2)",
                [artifact, alias],
            )
            .map_err(query_err("failed to insert alias"))?;
        Ok(())
    }

    fn insert_source_file(
        &mut self,
        artifact: &str,
        file: SourceFileRow,
    ) -> Result<(), IndexError> {
        self.tx
            .prepare_cached(
                "INSERT INTO sourceFiles (artifactId, path, hash, text, annotations)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .and_then(|mut stmt| {
                stmt.execute(params![
                    artifact,
                    file.path,
                    file.hash,
                    file.text,
                    file.annotations
                ])
            })
            .map_err(query_err("failed to insert source file"))?;
        debug!(artifact, path = %file.path, "stored source file");
        Ok(())
    }

    fn insert_decl(&mut self, row: DeclarationRow) -> Result<(), IndexError> {
        if !self.declared.insert(row.binding.clone()) {
            return Err(IndexError::DuplicateDeclaration {
                artifact: row.artifact,
                binding: row.binding.to_string(),
                path: row.source_file,
            });
        }
        self.pending_decls.push(row);
        if self.pending_decls.len() >= self.batch_size {
            self.flush_decls()?;
        }
        Ok(())
    }

    fn insert_ref(&mut self, row: ReferenceRow) -> Result<(), IndexError> {
        self.pending_refs.push(row);
        if self.pending_refs.len() >= self.batch_size {
            self.flush_refs()?;
        }
        Ok(())
    }

    fn commit(mut self) -> Result<(), IndexError> {
        self.flush_decls()?;
        self.flush_refs()?;
        let artifact = std::mem::take(&mut self.artifact);
        self.tx
            .commit()
            .map_err(query_err("failed to commit transaction"))?;
        info!(artifact = %artifact, "committed artifact");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn decl(artifact: &str, binding: &str, path: &str) -> DeclarationRow {
        let binding = BindingId::new(binding);
        DeclarationRow {
            artifact: artifact.to_string(),
            is_type: binding.is_type(),
            binding,
            source_file: path.to_string(),
        }
    }

    fn reference(artifact: &str, target: &str, line: u32, id: u32) -> ReferenceRow {
        ReferenceRow {
            target: BindingId::new(target),
            kind: ReferenceKind::MethodCall,
            source_artifact: artifact.to_string(),
            source_file: "A.java".to_string(),
            line,
            source_file_id: id,
        }
    }

    #[test]
    fn test_open_creates_db_and_schema_version() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("index.db");
        let store = SqliteStore::open(&db_path).expect("open should succeed");
        assert!(db_path.exists());
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_open_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("index.db");
        let _first = SqliteStore::open(&db_path).unwrap();
        let second = SqliteStore::open(&db_path).unwrap();
        assert_eq!(second.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_commit_makes_rows_visible() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut tx = store.begin("lib").unwrap();
        tx.clear_artifact("lib").unwrap();
        tx.insert_artifact("lib", 9).unwrap();
        tx.insert_dependency("lib", "base").unwrap();
        tx.insert_dependency("lib", "base").unwrap();
        tx.insert_alias("lib", "lib-alias").unwrap();
        tx.insert_decl(decl("lib", "A", "A.java")).unwrap();
        tx.insert_decl(decl("lib", "A#x()", "A.java")).unwrap();
        tx.insert_ref(reference("lib", "A#x()", 3, 0)).unwrap();
        tx.commit().unwrap();

        assert_eq!(store.artifact_version("lib").unwrap(), Some(9));
        assert_eq!(store.dependencies("lib").unwrap(), vec!["base"]);
        assert_eq!(store.aliases("lib").unwrap(), vec!["lib-alias"]);

        let decls = store.declarations("lib").unwrap();
        assert_eq!(decls.len(), 2);
        assert!(decls[0].is_type);
        assert!(!decls[1].is_type);

        let refs = store.references_to(&BindingId::new("A#x()")).unwrap();
        assert_eq!(refs, vec![reference("lib", "A#x()", 3, 0)]);

        let found = store
            .resolve_declaration(&BindingId::new("A#x()"))
            .unwrap()
            .unwrap();
        assert_eq!(found.source_file, "A.java");
    }

    #[test]
    fn test_drop_rolls_back() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let mut tx = store.begin("lib").unwrap();
            tx.insert_artifact("lib", 9).unwrap();
            tx.insert_decl(decl("lib", "A", "A.java")).unwrap();
        }
        assert_eq!(store.artifact_version("lib").unwrap(), None);
        assert!(store.declarations("lib").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut tx = store.begin("lib").unwrap();
        tx.insert_decl(decl("lib", "A#x()", "A.java")).unwrap();
        let err = tx.insert_decl(decl("lib", "A#x()", "B.java")).unwrap_err();
        assert_eq!(err.code(), "E101");
    }

    #[test]
    fn test_batches_flush_past_batch_size() {
        let temp = TempDir::new().unwrap();
        let mut store = SqliteStore::open_with(&temp.path().join("index.db"), 1000, 3).unwrap();
        let mut tx = store.begin("lib").unwrap();
        tx.insert_artifact("lib", 9).unwrap();
        for i in 0..10 {
            tx.insert_ref(reference("lib", "A", i + 1, i)).unwrap();
        }
        tx.commit().unwrap();
        assert_eq!(store.references_to(&BindingId::new("A")).unwrap().len(), 10);
    }

    #[test]
    fn test_clear_artifact_removes_previous_rows() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut tx = store.begin("lib").unwrap();
        tx.insert_artifact("lib", 8).unwrap();
        tx.insert_decl(decl("lib", "Old", "Old.java")).unwrap();
        tx.insert_ref(reference("lib", "Old", 1, 0)).unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin("lib").unwrap();
        tx.clear_artifact("lib").unwrap();
        tx.insert_artifact("lib", 9).unwrap();
        tx.insert_decl(decl("lib", "Old", "Moved.java")).unwrap();
        tx.commit().unwrap();

        assert_eq!(store.artifact_version("lib").unwrap(), Some(9));
        let decls = store.declarations("lib").unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].source_file, "Moved.java");
        assert!(store.references_to(&BindingId::new("Old")).unwrap().is_empty());
    }

    #[test]
    fn test_needs_recompile() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(store.needs_recompile("lib", 9).unwrap());

        let mut tx = store.begin("lib").unwrap();
        tx.insert_artifact("lib", 8).unwrap();
        tx.commit().unwrap();
        assert!(store.needs_recompile("lib", 9).unwrap());
        assert!(!store.needs_recompile("lib", 8).unwrap());
    }

    #[test]
    fn test_source_file_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let facts = vec![Fact::new(0, 5, crate::annotation::Annotation::style(["keyword"]))];
        let mut tx = store.begin("lib").unwrap();
        tx.insert_source_file("lib", SourceFileRow {
            path: "A.java".to_string(),
            hash: "00".to_string(),
            text: "class A {}".to_string(),
            annotations: serde_json::to_string(&facts).unwrap(),
        })
        .unwrap();
        tx.commit().unwrap();

        let file = store.source_file("lib", "A.java").unwrap();
        assert_eq!(file.text, "class A {}");
        assert_eq!(file.facts, facts);
        assert_eq!(store.source_file_paths("lib").unwrap(), vec!["A.java"]);

        let err = store.source_file("lib", "B.java").unwrap_err();
        assert_eq!(err.code(), "E131");
    }

    #[test]
    fn test_artifact_status() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.artifact_status("lib").unwrap_err().code(), "E130");

        let mut tx = store.begin("lib").unwrap();
        tx.insert_artifact("lib", 9).unwrap();
        tx.insert_decl(decl("lib", "A", "A.java")).unwrap();
        tx.insert_ref(reference("lib", "A", 1, 0)).unwrap();
        tx.insert_ref(reference("lib", "A", 2, 1)).unwrap();
        tx.commit().unwrap();

        let status = store.artifact_status("lib").unwrap();
        assert_eq!(status.compile_version, 9);
        assert_eq!(status.declarations, 1);
        assert_eq!(status.references, 2);
        assert_eq!(status.source_files, 0);
        assert_eq!(store.artifacts().unwrap(), vec!["lib"]);
    }
}
