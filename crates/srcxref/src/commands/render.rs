//! Implementation of the `srcxref render` command

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use srcxref_core::{BindingId, IndexError, SqliteStore, render_html, render_tree};

use super::Context;
use crate::cli::RenderFormat;
use crate::output;

/// Run the render command
pub fn run_render(
    ctx: &Context,
    artifact: &str,
    path: &str,
    format: RenderFormat,
) -> Result<i32, IndexError> {
    let store = ctx.open_store()?;
    let file = store.source_file(artifact, path)?;

    match format {
        RenderFormat::Html => {
            let html = render_html(&file.text, &file.facts, |binding| {
                link(&store, artifact, path, binding)
            })?;
            if ctx.json {
                output::print_ok("render", &html)?;
            } else {
                println!("{}", html);
            }
        }
        RenderFormat::Tree => {
            let tree = render_tree(&file.text, &file.facts)?;
            if ctx.json {
                output::print_ok("render", &tree)?;
            } else {
                println!("{}", serde_json::to_string_pretty(&tree)?);
            }
        }
    }
    Ok(0)
}

/// Characters encoded in a binding: everything outside the URL unreserved set.
const BINDING: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Link target of a reference: an anchor in this file, the declaring file of
/// another artifact, or the reference listing when nothing declares it.
fn link(store: &SqliteStore, artifact: &str, path: &str, binding: &BindingId) -> String {
    let encoded = utf8_percent_encode(binding.as_str(), BINDING);
    match store.resolve_declaration(binding) {
        Ok(Some(decl)) if decl.artifact == artifact && decl.source_file == path => {
            format!("#{}", encoded)
        }
        Ok(Some(decl)) => format!("/{}/{}#{}", decl.artifact, decl.source_file, encoded),
        Ok(None) | Err(_) => format!("/references?binding={}", encoded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srcxref_core::{DeclarationRow, Transaction};

    fn store_declaring(artifact: &str, binding: &str, path: &str) -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut tx = store.begin(artifact).unwrap();
        tx.insert_artifact(artifact, 1).unwrap();
        let binding = BindingId::new(binding);
        tx.insert_decl(DeclarationRow {
            artifact: artifact.to_string(),
            is_type: binding.is_type(),
            binding,
            source_file: path.to_string(),
        })
        .unwrap();
        tx.commit().unwrap();
        store
    }

    #[test]
    fn test_undeclared_member_link_is_encoded() {
        let store = SqliteStore::open_in_memory().unwrap();
        let href = link(&store, "lib", "A.java", &BindingId::new("Z#y(int)"));
        assert_eq!(href, "/references?binding=Z%23y%28int%29");
        // no raw '#' left to cut the query short
        let query = href.split('#').next().unwrap();
        assert_eq!(query, href);
    }

    #[test]
    fn test_same_file_link_is_encoded_fragment() {
        let store = store_declaring("lib", "A#x(java.lang.String)", "A.java");
        let href = link(&store, "lib", "A.java", &BindingId::new("A#x(java.lang.String)"));
        assert_eq!(href, "#A%23x%28java.lang.String%29");
    }

    #[test]
    fn test_other_artifact_link_is_encoded_fragment() {
        let store = store_declaring("base", "B#f", "p/B.java");
        let href = link(&store, "lib", "A.java", &BindingId::new("B#f"));
        assert_eq!(href, "/base/p/B.java#B%23f");
    }
}
