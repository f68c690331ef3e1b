//! CLI argument parsing with clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// srcxref - cross-reference index of declarations and references
#[derive(Parser)]
#[command(name = "srcxref")]
#[command(version = VERSION)]
#[command(about = "Ingest resolved source facts and browse declarations and references")]
#[command(
    long_about = "srcxref stores, per artifact, the declarations and references a language front end reports, and renders stored source files with those facts attached.\n\nArtifacts are ingested from JSON dumps and superseded wholesale on re-ingestion."
)]
pub struct Cli {
    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (defaults to ./srcxref.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Database file, overriding [store] path
    #[arg(long, global = true, value_name = "FILE")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest an artifact dump
    ///
    /// Skips artifacts already ingested by this version unless --force.
    #[command(
        long_about = "Ingest an artifact dump.\n\nThe dump is a JSON document:\n  {\"id\": ..., \"dependencies\": [...], \"aliases\": [...],\n   \"files\": {\"<path>\": {\"text\": ..., \"facts\": [...]}}}\n\nAll previous rows of the artifact are replaced in one transaction."
    )]
    Ingest {
        /// Artifact dump (JSON)
        dump: PathBuf,

        /// Re-ingest even when the artifact is current
        #[arg(long)]
        force: bool,
    },

    /// Render a stored source file
    Render {
        /// Artifact id
        artifact: String,

        /// Path of the source file within the artifact
        path: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = RenderFormat::Html)]
        format: RenderFormat,
    },

    /// List references to a binding
    Refs {
        /// Canonical binding, e.g. `java.util.Map#put(java.lang.Object,java.lang.Object)`
        binding: String,
    },

    /// Show what is stored for an artifact
    Status {
        /// Artifact id
        artifact: String,
    },
}

impl Commands {
    /// Command name for JSON envelopes
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Ingest { .. } => "ingest",
            Commands::Render { .. } => "render",
            Commands::Refs { .. } => "refs",
            Commands::Status { .. } => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    /// Hyperlinked HTML fragment
    Html,
    /// JSON node tree with byte offsets
    Tree,
}

/// Parse CLI arguments
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ingest_args() {
        let cli = Cli::try_parse_from(["srcxref", "--json", "ingest", "dump.json", "--force"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Ingest { dump, force } => {
                assert_eq!(dump, PathBuf::from("dump.json"));
                assert!(force);
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn test_render_defaults_to_html() {
        let cli = Cli::try_parse_from(["srcxref", "render", "lib", "A.java"]).unwrap();
        match cli.command {
            Commands::Render { format, .. } => assert_eq!(format, RenderFormat::Html),
            _ => panic!("expected render"),
        }

        let cli = Cli::try_parse_from([
            "srcxref", "--db", "x.db", "render", "lib", "A.java", "--format", "tree",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("x.db")));
        assert!(matches!(cli.command, Commands::Render {
            format: RenderFormat::Tree,
            ..
        }));
    }
}
