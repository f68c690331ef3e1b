//! Implementation of the `srcxref ingest` command

use std::fs;
use std::path::Path;

use srcxref_core::{ArtifactDump, IndexError, IngestOutcome, Indexer};
use tracing::info;

use super::Context;
use crate::output;

/// Run the ingest command
pub fn run_ingest(ctx: &Context, dump: &Path, force: bool) -> Result<i32, IndexError> {
    let content = fs::read_to_string(dump)?;
    let dump: ArtifactDump = serde_json::from_str(&content)?;
    info!(artifact = %dump.id, files = dump.files.len(), "read artifact dump");

    let mut indexer = Indexer::new(ctx.open_store()?, ctx.config.ingest.queue_capacity);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(indexer.ingest_dump(dump, force))?;

    if ctx.json {
        output::print_ok("ingest", &outcome)?;
    } else if !ctx.quiet {
        match &outcome {
            IngestOutcome::Skipped { artifact } => {
                println!("{} is up to date (use --force to re-ingest)", artifact);
            }
            IngestOutcome::Indexed(summary) => println!(
                "indexed {}: {} files, {} declarations, {} references",
                summary.artifact, summary.source_files, summary.declarations, summary.references
            ),
        }
    }
    Ok(0)
}
