//! Implementation of the `srcxref refs` command

use srcxref_core::{BindingId, IndexError};

use super::Context;
use crate::output;

/// Run the refs command
pub fn run_refs(ctx: &Context, binding: &str) -> Result<i32, IndexError> {
    let store = ctx.open_store()?;
    let binding = BindingId::new(binding);
    let refs = store.references_to(&binding)?;

    if ctx.json {
        output::print_ok("refs", &refs)?;
        return Ok(0);
    }
    if refs.is_empty() {
        if !ctx.quiet {
            println!("no references to {}", binding);
        }
        return Ok(0);
    }
    for r in &refs {
        println!(
            "{}/{}:{}  {}",
            r.source_artifact, r.source_file, r.line, r.kind
        );
    }
    Ok(0)
}
