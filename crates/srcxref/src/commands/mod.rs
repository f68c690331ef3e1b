//! CLI command implementations

pub mod ingest;
pub mod refs;
pub mod render;
pub mod status;

pub use ingest::run_ingest;
pub use refs::run_refs;
pub use render::run_render;
pub use status::run_status;

use srcxref_core::{Config, IndexError, SqliteStore};

/// Settings shared by every command
pub struct Context {
    pub config: Config,
    pub json: bool,
    pub quiet: bool,
}

impl Context {
    /// Open the configured database
    pub fn open_store(&self) -> Result<SqliteStore, IndexError> {
        SqliteStore::from_config(&self.config)
    }
}
