//! Implementation of the `srcxref status` command

use srcxref_core::{COMPILE_VERSION, IndexError};

use super::Context;
use crate::output;

/// Run the status command
pub fn run_status(ctx: &Context, artifact: &str) -> Result<i32, IndexError> {
    let store = ctx.open_store()?;
    let status = store.artifact_status(artifact)?;

    if ctx.json {
        output::print_ok("status", &status)?;
        return Ok(0);
    }

    let current = if status.compile_version < COMPILE_VERSION {
        " (stale)"
    } else {
        ""
    };
    println!("artifact:      {}", status.id);
    println!("version:       {}{}", status.compile_version, current);
    println!("source files:  {}", status.source_files);
    println!("declarations:  {}", status.declarations);
    println!("references:    {}", status.references);
    if !status.dependencies.is_empty() {
        println!("dependencies:  {}", status.dependencies.join(", "));
    }
    if !status.aliases.is_empty() {
        println!("aliases:       {}", status.aliases.join(", "));
    }
    Ok(0)
}
