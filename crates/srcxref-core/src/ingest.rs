//! Artifact ingestion: from annotated source files to store rows.
//!
//! An artifact is ingested inside one transaction. [`ArtifactWriter`] first
//! queues the deletion of everything the artifact stored before plus a fresh
//! artifact row, then turns every added source file into a source-file row,
//! one declaration row per declared binding and one reference row per
//! reference. The artifact supersedes its previous version wholesale when
//! the transaction commits, and not at all otherwise.
//!
//! [`Indexer`] wires the writer to the actor queue and the SQLite store.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::actor::{AsyncTransaction, with_artifact_transaction};
use crate::annotation::AnnotatedSourceFile;
use crate::config::Config;
use crate::error::IndexError;
use crate::line_index::LineIndex;
use crate::store::{DeclarationRow, ReferenceRow, SourceFileRow, SqliteStore};

/// Version tag written to `artifacts.lastCompileVersion`.
///
/// Bump whenever the stored shape of facts or rows changes; artifacts
/// ingested by an older version are then recompiled.
pub const COMPILE_VERSION: i64 = 9;

// ============================================================================
// Summaries
// ============================================================================

/// Row counts written for one artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub artifact: String,
    pub source_files: usize,
    pub declarations: usize,
    pub references: usize,
}

/// Result of [`Indexer::ingest_if_stale`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Already ingested with the current compile version.
    Skipped { artifact: String },
    Indexed(IngestSummary),
}

#[derive(Debug, Default)]
struct Counters {
    files: AtomicUsize,
    declarations: AtomicUsize,
    references: AtomicUsize,
}

// ============================================================================
// Artifact Writer
// ============================================================================

/// Producer-side writer of one artifact.
///
/// Clones share the same queue and counters, so one clone per source file
/// may run on its own task.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    artifact: Arc<str>,
    tx: AsyncTransaction,
    counters: Arc<Counters>,
}

impl ArtifactWriter {
    /// Start writing `artifact`: queue removal of its previous rows and the
    /// placeholder artifact row. These are the first calls of the transaction.
    pub async fn begin_artifact(artifact: &str, tx: AsyncTransaction) -> Result<Self, IndexError> {
        tx.clear_artifact(artifact).await?;
        tx.insert_artifact(artifact, COMPILE_VERSION).await?;
        info!(artifact, version = COMPILE_VERSION, "ingesting artifact");
        Ok(ArtifactWriter {
            artifact: Arc::from(artifact),
            tx,
            counters: Arc::new(Counters::default()),
        })
    }

    /// Persist one source file and the rows derived from its facts.
    ///
    /// Facts are baked first. A reference is recorded on the line holding
    /// its start offset.
    pub async fn add_source_file(
        &self,
        path: &str,
        mut file: AnnotatedSourceFile,
    ) -> Result<(), IndexError> {
        file.bake()?;
        self.counters.files.fetch_add(1, Ordering::SeqCst);

        let annotations = serde_json::to_string(&file.facts)?;
        let hash = hex::encode(Sha256::digest(file.text.as_bytes()));
        let lines = LineIndex::new(&file.text);

        let decls: Vec<DeclarationRow> = file
            .declarations()
            .map(|(_, binding)| DeclarationRow {
                artifact: self.artifact.to_string(),
                binding: binding.clone(),
                source_file: path.to_string(),
                is_type: binding.is_type(),
            })
            .collect();
        let refs: Vec<ReferenceRow> = file
            .references()
            .map(|(fact, binding, kind, id)| ReferenceRow {
                target: binding.clone(),
                kind,
                source_artifact: self.artifact.to_string(),
                source_file: path.to_string(),
                line: lines.line_at(fact.start as usize),
                source_file_id: id,
            })
            .collect();
        let (decl_count, ref_count) = (decls.len(), refs.len());

        self.tx
            .insert_source_file(&self.artifact, SourceFileRow {
                path: path.to_string(),
                hash,
                text: file.text,
                annotations,
            })
            .await?;
        for row in decls {
            self.tx.insert_decl(row).await?;
        }
        for row in refs {
            self.tx.insert_ref(row).await?;
        }

        self.counters.declarations.fetch_add(decl_count, Ordering::SeqCst);
        self.counters.references.fetch_add(ref_count, Ordering::SeqCst);
        debug!(
            artifact = %self.artifact,
            path,
            lines = lines.line_count(),
            decls = decl_count,
            refs = ref_count,
            "queued source file"
        );
        Ok(())
    }

    /// Record that this artifact depends on `target`.
    pub async fn add_dependency(&self, target: &str) -> Result<(), IndexError> {
        self.tx.insert_dependency(&self.artifact, target).await
    }

    /// Record an alternative name of this artifact.
    pub async fn add_alias(&self, alias: &str) -> Result<(), IndexError> {
        self.tx.insert_alias(&self.artifact, alias).await
    }

    /// Close the artifact; an artifact without source files is an error.
    pub fn finish(&self) -> Result<IngestSummary, IndexError> {
        let source_files = self.counters.files.load(Ordering::SeqCst);
        if source_files == 0 {
            return Err(IndexError::EmptyArtifact {
                artifact: self.artifact.to_string(),
            });
        }
        Ok(IngestSummary {
            artifact: self.artifact.to_string(),
            source_files,
            declarations: self.counters.declarations.load(Ordering::SeqCst),
            references: self.counters.references.load(Ordering::SeqCst),
        })
    }
}

// ============================================================================
// Artifact Dump
// ============================================================================

/// Everything a front end reports about one artifact, as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDump {
    pub id: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub files: BTreeMap<String, AnnotatedSourceFile>,
}

// ============================================================================
// Indexer
// ============================================================================

/// Ingests artifacts into a [`SqliteStore`].
pub struct Indexer {
    store: SqliteStore,
    queue_capacity: usize,
}

impl Indexer {
    pub fn new(store: SqliteStore, queue_capacity: usize) -> Self {
        Indexer {
            store,
            queue_capacity,
        }
    }

    /// Open the configured store.
    pub fn from_config(config: &Config) -> Result<Self, IndexError> {
        Ok(Self::new(
            SqliteStore::from_config(config)?,
            config.ingest.queue_capacity,
        ))
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn into_store(self) -> SqliteStore {
        self.store
    }

    /// Whether `artifact` must be (re)ingested by this version.
    pub fn needs_recompile(&self, artifact: &str) -> Result<bool, IndexError> {
        self.store.needs_recompile(artifact, COMPILE_VERSION)
    }

    /// Ingest `artifact` in one transaction.
    ///
    /// `produce` receives the writer after the previous rows are queued for
    /// deletion; it adds source files, dependencies and aliases, and must
    /// await any task it spawns. The transaction commits only if `produce`
    /// succeeds and at least one source file was added.
    pub async fn ingest_artifact<F, Fut>(
        &mut self,
        artifact: &str,
        produce: F,
    ) -> Result<IngestSummary, IndexError>
    where
        F: FnOnce(ArtifactWriter) -> Fut,
        Fut: Future<Output = Result<(), IndexError>>,
    {
        let summary = with_artifact_transaction(
            &mut self.store,
            artifact,
            self.queue_capacity,
            |tx| async move {
                let writer = ArtifactWriter::begin_artifact(artifact, tx).await?;
                produce(writer.clone()).await?;
                writer.finish()
            },
        )
        .await
        .inspect_err(|e| {
            if e.aborts_artifact() {
                warn!(artifact, code = e.code(), "ingestion aborted, previous version kept");
            }
        })?;
        info!(
            artifact,
            files = summary.source_files,
            declarations = summary.declarations,
            references = summary.references,
            "artifact indexed"
        );
        Ok(summary)
    }

    /// Ingest `artifact` unless it is already current.
    pub async fn ingest_if_stale<F, Fut>(
        &mut self,
        artifact: &str,
        produce: F,
    ) -> Result<IngestOutcome, IndexError>
    where
        F: FnOnce(ArtifactWriter) -> Fut,
        Fut: Future<Output = Result<(), IndexError>>,
    {
        if !self.needs_recompile(artifact)? {
            debug!(artifact, "artifact is current, skipping");
            return Ok(IngestOutcome::Skipped {
                artifact: artifact.to_string(),
            });
        }
        let summary = self.ingest_artifact(artifact, produce).await?;
        Ok(IngestOutcome::Indexed(summary))
    }

    /// Ingest a whole dump, one spawned producer per source file.
    ///
    /// With `force` unset, a current artifact is skipped.
    pub async fn ingest_dump(
        &mut self,
        dump: ArtifactDump,
        force: bool,
    ) -> Result<IngestOutcome, IndexError> {
        let ArtifactDump {
            id,
            dependencies,
            aliases,
            files,
        } = dump;
        let produce = |writer: ArtifactWriter| async move {
            for dependency in &dependencies {
                writer.add_dependency(dependency).await?;
            }
            for alias in &aliases {
                writer.add_alias(alias).await?;
            }
            let mut producers = JoinSet::new();
            for (path, file) in files {
                let writer = writer.clone();
                producers.spawn(async move { writer.add_source_file(&path, file).await });
            }
            drop(writer);
            while let Some(joined) = producers.join_next().await {
                joined.map_err(|e| IndexError::Task(e.to_string()))??;
            }
            Ok(())
        };
        if force {
            let summary = self.ingest_artifact(&id, produce).await?;
            Ok(IngestOutcome::Indexed(summary))
        } else {
            self.ingest_if_stale(&id, produce).await
        }
    }
}
