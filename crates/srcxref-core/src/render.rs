//! Rendering annotated text into nested markup.
//!
//! [`render`] walks a text left to right with a list of properly nested
//! facts and hands every text gap and every fact to an [`Emitter`], which
//! decides what the output looks like. Two emitters ship:
//!
//! - [`HtmlEmitter`]: hyperlinked HTML with per-line anchors
//! - [`TreeEmitter`]: a format-agnostic [`RenderNode`] tree carrying byte offsets
//!
//! Facts must nest. A fact that reaches past its enclosing fact (or past the
//! end of the text) is a [`IndexError::BrokenNesting`]; a fact boundary that
//! splits a UTF-8 character is an [`IndexError::InvalidOffset`].

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, Fact};
use crate::binding::BindingId;
use crate::error::IndexError;

// ============================================================================
// Emitter
// ============================================================================

/// Output side of [`render`].
pub trait Emitter {
    type Node;

    /// A run of plain text starting at byte `offset`.
    fn text(&mut self, offset: usize, text: &str) -> Self::Node;

    /// Wrap the already-rendered children of `fact`.
    fn wrap(&mut self, fact: &Fact, children: Vec<Self::Node>) -> Self::Node;
}

/// Render `text` with `facts` attached.
///
/// Facts are stably sorted by start; facts sharing a start keep their given
/// order, so a parent must precede its children (see
/// [`AnnotatedSourceFile::bake`](crate::annotation::AnnotatedSourceFile::bake)).
pub fn render<E: Emitter>(
    text: &str,
    facts: &[Fact],
    emitter: &mut E,
) -> Result<Vec<E::Node>, IndexError> {
    let mut sorted: Vec<&Fact> = facts.iter().collect();
    sorted.sort_by_key(|fact| fact.start);

    let mut walk = Walk {
        text,
        facts: &sorted,
        next: 0,
    };
    let nodes = walk.consume(0, text.len(), true, emitter)?;
    debug_assert_eq!(walk.next, sorted.len());
    Ok(nodes)
}

struct Walk<'a> {
    text: &'a str,
    facts: &'a [&'a Fact],
    next: usize,
}

impl Walk<'_> {
    /// Consume facts starting inside `pos..bound`, returning the rendered
    /// nodes for that range. At the top level, facts starting exactly at the
    /// end of the text belong to the range too.
    fn consume<E: Emitter>(
        &mut self,
        mut pos: usize,
        bound: usize,
        top: bool,
        emitter: &mut E,
    ) -> Result<Vec<E::Node>, IndexError> {
        let mut out = Vec::new();
        while let Some(fact) = self.facts.get(self.next).copied() {
            let start = fact.start as usize;
            if start > bound || (start == bound && !top) {
                if top {
                    return Err(IndexError::BrokenNesting {
                        start,
                        end: start + fact.length as usize,
                        bound,
                    });
                }
                break;
            }
            let end = start + fact.length as usize;
            if end > bound || start < pos {
                return Err(IndexError::BrokenNesting { start, end, bound });
            }
            for offset in [start, end] {
                if !self.text.is_char_boundary(offset) {
                    return Err(IndexError::InvalidOffset {
                        offset,
                        len: self.text.len(),
                    });
                }
            }

            if pos < start {
                out.push(emitter.text(pos, &self.text[pos..start]));
            }
            self.next += 1;
            let children = self.consume(start, end, false, emitter)?;
            out.push(emitter.wrap(fact, children));
            pos = end;
        }
        if pos < bound {
            out.push(emitter.text(pos, &self.text[pos..bound]));
        }
        Ok(out)
    }
}

// ============================================================================
// HTML
// ============================================================================

/// Emits HTML with a line anchor at the start of every line.
///
/// References become links whose `href` comes from the link function;
/// declarations become anchors named after their binding.
pub struct HtmlEmitter<F> {
    link: F,
    line: u32,
    at_line_start: bool,
}

impl<F> HtmlEmitter<F>
where
    F: Fn(&BindingId) -> String,
{
    pub fn new(link: F) -> Self {
        HtmlEmitter {
            link,
            line: 1,
            at_line_start: true,
        }
    }

    fn line_anchor(&mut self, out: &mut String) {
        let n = self.line;
        out.push_str(&format!(
            "<a href=\"#{n}\" id=\"{n}\" class=\"line\" data-line=\"{n}\"></a>"
        ));
        self.line += 1;
        self.at_line_start = false;
    }

    /// Close the document: a text ending in a newline (or an empty text)
    /// still gets the anchor of its final, empty line.
    pub fn finish(&mut self, out: &mut String) {
        if self.at_line_start {
            self.line_anchor(out);
        }
    }
}

impl<F> Emitter for HtmlEmitter<F>
where
    F: Fn(&BindingId) -> String,
{
    type Node = String;

    fn text(&mut self, _offset: usize, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if self.at_line_start {
                self.line_anchor(&mut out);
            }
            push_escaped_char(&mut out, c);
            if c == '\n' {
                self.at_line_start = true;
            }
        }
        out
    }

    fn wrap(&mut self, fact: &Fact, children: Vec<String>) -> String {
        let inner = children.concat();
        match &fact.payload {
            Annotation::BindingReference { binding, kind, id } => format!(
                "<a href=\"{}\" class=\"ref\" data-kind=\"{}\" data-ref-id=\"{}\">{}</a>",
                escape_html(&(self.link)(binding)),
                kind.id(),
                id,
                inner
            ),
            Annotation::BindingDeclaration { binding } => format!(
                "<a id=\"{}\" class=\"decl\">{}</a>",
                escape_html(binding.as_str()),
                inner
            ),
            Annotation::Style { classes } => {
                let classes: Vec<&str> = classes.iter().map(String::as_str).collect();
                format!(
                    "<span class=\"{}\">{}</span>",
                    escape_html(&classes.join(" ")),
                    inner
                )
            }
            Annotation::LocalReference { local_id } => format!(
                "<span class=\"local\" data-local-id=\"{}\">{}</span>",
                escape_html(local_id),
                inner
            ),
        }
    }
}

/// Render a whole file as an HTML fragment.
pub fn render_html<F>(text: &str, facts: &[Fact], link: F) -> Result<String, IndexError>
where
    F: Fn(&BindingId) -> String,
{
    let mut emitter = HtmlEmitter::new(link);
    let mut html = render(text, facts, &mut emitter)?.concat();
    emitter.finish(&mut html);
    Ok(html)
}

fn push_escaped_char(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        c => out.push(c),
    }
}

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        push_escaped_char(&mut out, c);
    }
    out
}

// ============================================================================
// Tree
// ============================================================================

/// Format-agnostic render output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum RenderNode {
    Text {
        start: usize,
        text: String,
    },
    Annotated {
        start: u32,
        length: u32,
        annotation: Annotation,
        children: Vec<RenderNode>,
    },
}

/// Emits [`RenderNode`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeEmitter;

impl Emitter for TreeEmitter {
    type Node = RenderNode;

    fn text(&mut self, offset: usize, text: &str) -> RenderNode {
        RenderNode::Text {
            start: offset,
            text: text.to_string(),
        }
    }

    fn wrap(&mut self, fact: &Fact, children: Vec<RenderNode>) -> RenderNode {
        RenderNode::Annotated {
            start: fact.start,
            length: fact.length,
            annotation: fact.payload.clone(),
            children,
        }
    }
}

/// Render a whole file as a [`RenderNode`] tree.
pub fn render_tree(text: &str, facts: &[Fact]) -> Result<Vec<RenderNode>, IndexError> {
    render(text, facts, &mut TreeEmitter)
}
