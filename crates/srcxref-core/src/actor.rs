//! Single-worker transaction actor.
//!
//! Many producers (one per source file, typically) feed one transaction that
//! is not thread-safe. Producers hold an [`AsyncTransaction`] handle and
//! enqueue [`TransactionCall`]s on a bounded channel; one [`ActorWorker`]
//! applies them to the real transaction strictly in submission order.
//!
//! ```text
//!  producer ──┐
//!  producer ──┼──> [ bounded queue ] ──> ActorWorker ──> Transaction
//!  producer ──┘
//! ```
//!
//! A full queue suspends producers (backpressure); an empty queue suspends
//! the worker. [`with_artifact_transaction`] joins the producer task and the
//! worker and commits only after both are done.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::IndexError;
use crate::store::{
    DeclarationRow, ReferenceRow, SourceFileRow, Transaction, TransactionProvider,
};

/// Default queue bound.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

// ============================================================================
// Calls
// ============================================================================

/// One queued [`Transaction`] method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionCall {
    ClearArtifact { artifact: String },
    InsertArtifact { artifact: String, compile_version: i64 },
    InsertDependency { from: String, to: String },
    InsertAlias { artifact: String, alias: String },
    InsertSourceFile { artifact: String, file: SourceFileRow },
    InsertDecl(DeclarationRow),
    InsertRef(ReferenceRow),
}

impl TransactionCall {
    /// Apply this call to `tx`.
    pub fn apply<T: Transaction + ?Sized>(self, tx: &mut T) -> Result<(), IndexError> {
        match self {
            TransactionCall::ClearArtifact { artifact } => tx.clear_artifact(&artifact),
            TransactionCall::InsertArtifact {
                artifact,
                compile_version,
            } => tx.insert_artifact(&artifact, compile_version),
            TransactionCall::InsertDependency { from, to } => tx.insert_dependency(&from, &to),
            TransactionCall::InsertAlias { artifact, alias } => tx.insert_alias(&artifact, &alias),
            TransactionCall::InsertSourceFile { artifact, file } => {
                tx.insert_source_file(&artifact, file)
            }
            TransactionCall::InsertDecl(row) => tx.insert_decl(row),
            TransactionCall::InsertRef(row) => tx.insert_ref(row),
        }
    }
}

// ============================================================================
// Producer Handle
// ============================================================================

/// Producer-side handle of the actor queue.
///
/// Cheap to clone and `Send`; each method enqueues one call and suspends
/// while the queue is full. Fails with [`IndexError::QueueClosed`] once the
/// worker has stopped.
#[derive(Debug, Clone)]
pub struct AsyncTransaction {
    sender: mpsc::Sender<TransactionCall>,
    artifact: Arc<str>,
}

impl AsyncTransaction {
    /// Artifact this queue belongs to.
    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    /// Enqueue one call.
    pub async fn submit(&self, call: TransactionCall) -> Result<(), IndexError> {
        self.sender
            .send(call)
            .await
            .map_err(|_| IndexError::QueueClosed {
                artifact: self.artifact.to_string(),
            })
    }

    pub async fn clear_artifact(&self, artifact: &str) -> Result<(), IndexError> {
        self.submit(TransactionCall::ClearArtifact {
            artifact: artifact.to_string(),
        })
        .await
    }

    pub async fn insert_artifact(
        &self,
        artifact: &str,
        compile_version: i64,
    ) -> Result<(), IndexError> {
        self.submit(TransactionCall::InsertArtifact {
            artifact: artifact.to_string(),
            compile_version,
        })
        .await
    }

    pub async fn insert_dependency(&self, from: &str, to: &str) -> Result<(), IndexError> {
        self.submit(TransactionCall::InsertDependency {
            from: from.to_string(),
            to: to.to_string(),
        })
        .await
    }

    pub async fn insert_alias(&self, artifact: &str, alias: &str) -> Result<(), IndexError> {
        self.submit(TransactionCall::InsertAlias {
            artifact: artifact.to_string(),
            alias: alias.to_string(),
        })
        .await
    }

    pub async fn insert_source_file(
        &self,
        artifact: &str,
        file: SourceFileRow,
    ) -> Result<(), IndexError> {
        self.submit(TransactionCall::InsertSourceFile {
            artifact: artifact.to_string(),
            file,
        })
        .await
    }

    pub async fn insert_decl(&self, row: DeclarationRow) -> Result<(), IndexError> {
        self.submit(TransactionCall::InsertDecl(row)).await
    }

    pub async fn insert_ref(&self, row: ReferenceRow) -> Result<(), IndexError> {
        self.submit(TransactionCall::InsertRef(row)).await
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Consumer side of the actor queue.
#[derive(Debug)]
pub struct ActorWorker {
    receiver: mpsc::Receiver<TransactionCall>,
    artifact: Arc<str>,
}

impl ActorWorker {
    /// Apply queued calls to `tx` in submission order until every
    /// [`AsyncTransaction`] handle is dropped and the queue is drained.
    ///
    /// Returns the number of applied calls. Stops at the first failing call;
    /// the queue closes and pending producers see [`IndexError::QueueClosed`].
    pub async fn run<T: Transaction + ?Sized>(mut self, tx: &mut T) -> Result<usize, IndexError> {
        let mut applied = 0;
        while let Some(call) = self.receiver.recv().await {
            if let Err(e) = call.apply(tx) {
                warn!(artifact = %self.artifact, applied, error = %e, "transaction call failed");
                self.receiver.close();
                return Err(e);
            }
            applied += 1;
        }
        debug!(artifact = %self.artifact, applied, "worker drained");
        Ok(applied)
    }
}

/// Create a bounded actor queue for `artifact`.
///
/// A capacity of 0 is treated as 1.
pub fn channel(artifact: &str, capacity: usize) -> (AsyncTransaction, ActorWorker) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let artifact: Arc<str> = Arc::from(artifact);
    (
        AsyncTransaction {
            sender,
            artifact: Arc::clone(&artifact),
        },
        ActorWorker { receiver, artifact },
    )
}

/// Run `task` against a fresh transaction of `artifact` and commit it.
///
/// The producer task and the worker run concurrently on the current task.
/// The returned future resolves only after the producer task has finished,
/// the worker has applied every queued call, and the transaction has been
/// committed. On any failure the transaction is dropped and rolls back; a
/// worker failure is reported in preference to the `QueueClosed` errors it
/// causes in producers. Dropping the returned future rolls back as well.
pub async fn with_artifact_transaction<P, F, Fut, R>(
    provider: &mut P,
    artifact: &str,
    capacity: usize,
    task: F,
) -> Result<R, IndexError>
where
    P: TransactionProvider,
    F: FnOnce(AsyncTransaction) -> Fut,
    Fut: Future<Output = Result<R, IndexError>>,
{
    let mut tx = provider.begin(artifact)?;
    let (handle, worker) = channel(artifact, capacity);

    let (task_result, worker_result) = tokio::join!(task(handle), worker.run(&mut tx));

    let applied = match worker_result {
        Ok(applied) => applied,
        Err(e) => {
            warn!(artifact, error = %e, "rolling back artifact");
            return Err(e);
        }
    };
    let value = match task_result {
        Ok(value) => value,
        Err(e) => {
            warn!(artifact, error = %e, "producer failed, rolling back artifact");
            return Err(e);
        }
    };

    tx.commit()?;
    debug!(artifact, applied, "artifact transaction closed");
    Ok(value)
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transaction that records every call.

    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default, Clone)]
    pub struct Recorder {
        pub log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        pub fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        pub fn calls(&self) -> usize {
            self.entries()
                .iter()
                .filter(|entry| !matches!(entry.as_str(), "begin" | "commit" | "rollback"))
                .count()
        }

        fn push(&self, entry: impl Into<String>) {
            self.log.lock().unwrap().push(entry.into());
        }
    }

    /// Records calls; fails the call with index `fail_at`, if set.
    pub struct RecordingTx {
        recorder: Recorder,
        fail_at: Option<usize>,
        seen: usize,
        committed: bool,
    }

    impl RecordingTx {
        pub fn new(recorder: Recorder) -> Self {
            RecordingTx {
                recorder,
                fail_at: None,
                seen: 0,
                committed: false,
            }
        }

        fn record(&mut self, entry: String) -> Result<(), IndexError> {
            let index = self.seen;
            self.seen += 1;
            if self.fail_at == Some(index) {
                return Err(IndexError::StoreQuery {
                    reason: format!("injected failure at call {}", index),
                });
            }
            self.recorder.push(entry);
            Ok(())
        }
    }

    impl Drop for RecordingTx {
        fn drop(&mut self) {
            if !self.committed {
                self.recorder.push("rollback");
            }
        }
    }

    impl Transaction for RecordingTx {
        fn clear_artifact(&mut self, artifact: &str) -> Result<(), IndexError> {
            self.record(format!("clear {}", artifact))
        }

        fn insert_artifact(&mut self, artifact: &str, version: i64) -> Result<(), IndexError> {
            self.record(format!("artifact {} v{}", artifact, version))
        }

        fn insert_dependency(&mut self, from: &str, to: &str) -> Result<(), IndexError> {
            self.record(format!("dependency {} -> {}", from, to))
        }

        fn insert_alias(&mut self, artifact: &str, alias: &str) -> Result<(), IndexError> {
            self.record(format!("alias {} = {}", artifact, alias))
        }

        fn insert_source_file(
            &mut self,
            artifact: &str,
            file: SourceFileRow,
        ) -> Result<(), IndexError> {
            self.record(format!("file {}/{}", artifact, file.path))
        }

        fn insert_decl(&mut self, row: DeclarationRow) -> Result<(), IndexError> {
            self.record(format!("decl {}", row.binding))
        }

        fn insert_ref(&mut self, row: ReferenceRow) -> Result<(), IndexError> {
            self.record(format!("ref {}:{}", row.target, row.line))
        }

        fn commit(mut self) -> Result<(), IndexError> {
            self.committed = true;
            self.recorder.push("commit");
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct RecordingProvider {
        pub recorder: Recorder,
        pub fail_at: Option<usize>,
    }

    impl TransactionProvider for RecordingProvider {
        type Tx<'a> = RecordingTx;

        fn begin(&mut self, _artifact: &str) -> Result<RecordingTx, IndexError> {
            self.recorder.push("begin");
            let mut tx = RecordingTx::new(self.recorder.clone());
            tx.fail_at = self.fail_at;
            Ok(tx)
        }
    }
}
