//! Annotation model: byte-range-tagged facts on source text.
//!
//! A front end reports, per source file, a sequence of [`Fact`]s. Each fact
//! tags a byte range with an [`Annotation`]:
//!
//! - [`Annotation::BindingDeclaration`]: the declaring occurrence of a symbol
//! - [`Annotation::BindingReference`]: a use of a symbol, classified by [`ReferenceKind`]
//! - [`Annotation::Style`]: presentation classes (keyword, comment, ...)
//! - [`Annotation::LocalReference`]: a use of a file-local variable
//!
//! Facts on one file must nest: two overlapping facts are either disjoint or
//! one contains the other. [`AnnotatedSourceFile::bake`] puts a file into the
//! canonical order the renderer and the store expect.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

use crate::binding::{BindingId, Canonicalizer};
use crate::error::IndexError;

// ============================================================================
// Reference Kinds
// ============================================================================

/// Classification of a reference, kept for downstream analytics.
///
/// Serialized as its stable numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ReferenceKind {
    Unclassified,
    SuperConstructorCall,
    SuperMethodCall,
    MethodCall,
    SuperType,
    SuperMethod,
    Javadoc,
    ReturnType,
    LocalVariableType,
    ParameterType,
    FieldType,
    TypeConstraint,
    InstanceOf,
    Cast,
    Import,
    AnnotationType,
    ConstructorCall,
    ThrowsDeclaration,
    StaticMemberQualifier,
    MethodReferenceReceiverType,
    TypeParameter,
    WildcardBound,
    ThisReferenceQualifier,
    SuperReferenceQualifier,
    AnnotationMemberValue,
    NestedClassQualifier,
    FieldRead,
    FieldWrite,
    FieldReadWrite,
    OnDemandImport,
    PackageDeclaration,
    MemberReferenceQualifier,
    EnclosingMethod,
    NestMember,
    NestHost,
    InnerClass,
    IndyType,
    IndyBootstrap,
    MainClass,
    SpiProvider,
}

impl ReferenceKind {
    /// All kinds, in id order.
    pub const ALL: [ReferenceKind; 40] = [
        ReferenceKind::Unclassified,
        ReferenceKind::SuperConstructorCall,
        ReferenceKind::SuperMethodCall,
        ReferenceKind::MethodCall,
        ReferenceKind::SuperType,
        ReferenceKind::SuperMethod,
        ReferenceKind::Javadoc,
        ReferenceKind::ReturnType,
        ReferenceKind::LocalVariableType,
        ReferenceKind::ParameterType,
        ReferenceKind::FieldType,
        ReferenceKind::TypeConstraint,
        ReferenceKind::InstanceOf,
        ReferenceKind::Cast,
        ReferenceKind::Import,
        ReferenceKind::AnnotationType,
        ReferenceKind::ConstructorCall,
        ReferenceKind::ThrowsDeclaration,
        ReferenceKind::StaticMemberQualifier,
        ReferenceKind::MethodReferenceReceiverType,
        ReferenceKind::TypeParameter,
        ReferenceKind::WildcardBound,
        ReferenceKind::ThisReferenceQualifier,
        ReferenceKind::SuperReferenceQualifier,
        ReferenceKind::AnnotationMemberValue,
        ReferenceKind::NestedClassQualifier,
        ReferenceKind::FieldRead,
        ReferenceKind::FieldWrite,
        ReferenceKind::FieldReadWrite,
        ReferenceKind::OnDemandImport,
        ReferenceKind::PackageDeclaration,
        ReferenceKind::MemberReferenceQualifier,
        ReferenceKind::EnclosingMethod,
        ReferenceKind::NestMember,
        ReferenceKind::NestHost,
        ReferenceKind::InnerClass,
        ReferenceKind::IndyType,
        ReferenceKind::IndyBootstrap,
        ReferenceKind::MainClass,
        ReferenceKind::SpiProvider,
    ];

    /// Stable numeric id, persisted in `binding_references.type`.
    ///
    /// Ids are never reused; id 4 is retired.
    pub fn id(self) -> u8 {
        match self {
            ReferenceKind::Unclassified => 0,
            ReferenceKind::SuperConstructorCall => 1,
            ReferenceKind::SuperMethodCall => 2,
            ReferenceKind::MethodCall => 3,
            ReferenceKind::SuperType => 5,
            ReferenceKind::SuperMethod => 6,
            ReferenceKind::Javadoc => 7,
            ReferenceKind::ReturnType => 8,
            ReferenceKind::LocalVariableType => 9,
            ReferenceKind::ParameterType => 10,
            ReferenceKind::FieldType => 11,
            ReferenceKind::TypeConstraint => 12,
            ReferenceKind::InstanceOf => 13,
            ReferenceKind::Cast => 14,
            ReferenceKind::Import => 15,
            ReferenceKind::AnnotationType => 16,
            ReferenceKind::ConstructorCall => 17,
            ReferenceKind::ThrowsDeclaration => 18,
            ReferenceKind::StaticMemberQualifier => 19,
            ReferenceKind::MethodReferenceReceiverType => 20,
            ReferenceKind::TypeParameter => 21,
            ReferenceKind::WildcardBound => 22,
            ReferenceKind::ThisReferenceQualifier => 23,
            ReferenceKind::SuperReferenceQualifier => 24,
            ReferenceKind::AnnotationMemberValue => 25,
            ReferenceKind::NestedClassQualifier => 26,
            ReferenceKind::FieldRead => 27,
            ReferenceKind::FieldWrite => 28,
            ReferenceKind::FieldReadWrite => 29,
            ReferenceKind::OnDemandImport => 30,
            ReferenceKind::PackageDeclaration => 31,
            ReferenceKind::MemberReferenceQualifier => 32,
            ReferenceKind::EnclosingMethod => 33,
            ReferenceKind::NestMember => 34,
            ReferenceKind::NestHost => 35,
            ReferenceKind::InnerClass => 36,
            ReferenceKind::IndyType => 37,
            ReferenceKind::IndyBootstrap => 38,
            ReferenceKind::MainClass => 39,
            ReferenceKind::SpiProvider => 40,
        }
    }

    /// Look up a kind by its numeric id.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// Human-readable name for listings.
    pub fn display_name(self) -> &'static str {
        match self {
            ReferenceKind::Unclassified => "Unclassified",
            ReferenceKind::SuperConstructorCall => "Super constructor call",
            ReferenceKind::SuperMethodCall => "Super method call",
            ReferenceKind::MethodCall => "Method call",
            ReferenceKind::SuperType => "Super type",
            ReferenceKind::SuperMethod => "Super method",
            ReferenceKind::Javadoc => "Javadoc",
            ReferenceKind::ReturnType => "Return type",
            ReferenceKind::LocalVariableType => "Local variable type",
            ReferenceKind::ParameterType => "Parameter type",
            ReferenceKind::FieldType => "Field type",
            ReferenceKind::TypeConstraint => "Type constraint",
            ReferenceKind::InstanceOf => "instanceof",
            ReferenceKind::Cast => "Cast type",
            ReferenceKind::Import => "Import",
            ReferenceKind::AnnotationType => "Annotation type",
            ReferenceKind::ConstructorCall => "Constructor call",
            ReferenceKind::ThrowsDeclaration => "Throws declaration",
            ReferenceKind::StaticMemberQualifier => "Static member qualifier",
            ReferenceKind::MethodReferenceReceiverType => "Method ref receiver",
            ReferenceKind::TypeParameter => "Type parameter",
            ReferenceKind::WildcardBound => "Wildcard bound",
            ReferenceKind::ThisReferenceQualifier => "this reference qualifier",
            ReferenceKind::SuperReferenceQualifier => "super reference qualifier",
            ReferenceKind::AnnotationMemberValue => "Annotation member value",
            ReferenceKind::NestedClassQualifier => "Nested class qualifier",
            ReferenceKind::FieldRead => "Field read",
            ReferenceKind::FieldWrite => "Field write",
            ReferenceKind::FieldReadWrite => "Field read+write",
            ReferenceKind::OnDemandImport => "On-Demand Import",
            ReferenceKind::PackageDeclaration => "Package declaration",
            ReferenceKind::MemberReferenceQualifier => "Type qualifier for member reference",
            ReferenceKind::EnclosingMethod => "Enclosing method",
            ReferenceKind::NestMember => "Nest member",
            ReferenceKind::NestHost => "Nest host",
            ReferenceKind::InnerClass => "Inner class",
            ReferenceKind::IndyType => "invokedynamic type",
            ReferenceKind::IndyBootstrap => "invokedynamic bootstrap method",
            ReferenceKind::MainClass => "Main class",
            ReferenceKind::SpiProvider => "SPI provider",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl From<ReferenceKind> for u8 {
    fn from(kind: ReferenceKind) -> u8 {
        kind.id()
    }
}

impl TryFrom<u8> for ReferenceKind {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        ReferenceKind::from_id(id).ok_or_else(|| format!("unknown reference kind id {}", id))
    }
}

// ============================================================================
// Facts
// ============================================================================

/// Payload of a fact. Closed set; consumers match exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Annotation {
    /// This range is the declaring occurrence of `binding`.
    #[serde(rename = "binding-decl")]
    BindingDeclaration { binding: BindingId },

    /// This range references `binding`.
    #[serde(rename = "binding-ref")]
    BindingReference {
        binding: BindingId,
        kind: ReferenceKind,
        /// Id of this reference within its source file.
        id: u32,
    },

    /// Presentation-only classes.
    #[serde(rename = "style")]
    Style { classes: BTreeSet<String> },

    /// Reference to a variable scoped to the enclosing file.
    #[serde(rename = "lv-ref")]
    LocalReference { local_id: String },
}

impl Annotation {
    /// Shorthand for a style annotation.
    pub fn style<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Annotation::Style {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    /// The binding this annotation gives identity to, if any.
    pub fn binding(&self) -> Option<&BindingId> {
        match self {
            Annotation::BindingDeclaration { binding }
            | Annotation::BindingReference { binding, .. } => Some(binding),
            Annotation::Style { .. } | Annotation::LocalReference { .. } => None,
        }
    }
}

/// An immutable byte-range-tagged annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub start: u32,
    pub length: u32,
    pub payload: Annotation,
}

impl Fact {
    pub fn new(start: u32, length: u32, payload: Annotation) -> Self {
        Fact {
            start,
            length,
            payload,
        }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        u64::from(self.start) + u64::from(self.length)
    }
}

// ============================================================================
// Annotated Source File
// ============================================================================

/// Source text plus the facts attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnnotatedSourceFile {
    pub text: String,
    #[serde(default)]
    pub facts: Vec<Fact>,
}

impl AnnotatedSourceFile {
    pub fn new(text: impl Into<String>) -> Self {
        AnnotatedSourceFile {
            text: text.into(),
            facts: Vec::new(),
        }
    }

    /// Record one fact; order is fixed later by [`bake`](Self::bake).
    pub fn annotate(&mut self, start: u32, length: u32, annotation: Annotation) {
        self.facts.push(Fact::new(start, length, annotation));
    }

    /// Record a fact whose identity comes from a front-end handle.
    ///
    /// A handle without canonical identity drops the fact; returns whether
    /// it was recorded.
    pub fn annotate_binding<H, C, F>(
        &mut self,
        start: u32,
        length: u32,
        handle: &H,
        canonicalizer: &C,
        payload: F,
    ) -> bool
    where
        H: ?Sized,
        C: Canonicalizer<H> + ?Sized,
        F: FnOnce(BindingId) -> Annotation,
    {
        match canonicalizer.canonicalize(handle) {
            Some(binding) => {
                self.annotate(start, length, payload(binding));
                true
            }
            None => {
                trace!(start, length, "binding has no identity, fact dropped");
                false
            }
        }
    }

    /// Declarations in this file, in fact order.
    pub fn declarations(&self) -> impl Iterator<Item = (&Fact, &BindingId)> {
        self.facts.iter().filter_map(|fact| match &fact.payload {
            Annotation::BindingDeclaration { binding } => Some((fact, binding)),
            _ => None,
        })
    }

    /// References in this file, in fact order.
    pub fn references(&self) -> impl Iterator<Item = (&Fact, &BindingId, ReferenceKind, u32)> {
        self.facts.iter().filter_map(|fact| match &fact.payload {
            Annotation::BindingReference { binding, kind, id } => Some((fact, binding, *kind, *id)),
            _ => None,
        })
    }

    /// Normalize fact order and merge facts on identical ranges.
    ///
    /// Order: by start; at equal start zero-length facts first, then longer
    /// facts before shorter ones so a parent precedes the children that share
    /// its start; remaining ties keep emission order. Styles on an identical
    /// range merge into one. Two references of the same kind on an identical
    /// range are rejected, except super-type/super-method references, which
    /// may legitimately coincide (one method overriding several supers, a
    /// lambda implementing a functional interface).
    pub fn bake(&mut self) -> Result<(), IndexError> {
        self.facts.sort_by_key(|fact| {
            let width = if fact.length == 0 {
                0
            } else {
                u64::from(u32::MAX) + 1 - u64::from(fact.length)
            };
            (fact.start, width)
        });

        let mut i = 0;
        while i < self.facts.len() {
            let mut j = i + 1;
            let mut merged = None;
            while merged.is_none()
                && j < self.facts.len()
                && self.facts[j].start == self.facts[i].start
                && self.facts[j].length == self.facts[i].length
            {
                merged = try_merge(&self.facts[i], &self.facts[j])?;
                j += 1;
            }
            match merged {
                Some(annotation) => {
                    self.facts.remove(j - 1);
                    self.facts[i].payload = annotation;
                }
                None => i += 1,
            }
        }
        Ok(())
    }
}

fn try_merge(a: &Fact, b: &Fact) -> Result<Option<Annotation>, IndexError> {
    match (&a.payload, &b.payload) {
        (Annotation::Style { classes: left }, Annotation::Style { classes: right }) => {
            Ok(Some(Annotation::Style {
                classes: left.union(right).cloned().collect(),
            }))
        }
        (
            Annotation::BindingReference {
                binding: left,
                kind: left_kind,
                ..
            },
            Annotation::BindingReference {
                binding: right,
                kind: right_kind,
                ..
            },
        ) => {
            let supers = [ReferenceKind::SuperType, ReferenceKind::SuperMethod];
            if supers.contains(left_kind) && supers.contains(right_kind) {
                return Ok(None);
            }
            if left_kind != right_kind {
                return Ok(None);
            }
            Err(IndexError::DuplicateReference {
                start: a.start,
                length: a.length,
                first: left.to_string(),
                second: right.to_string(),
            })
        }
        _ => Ok(None),
    }
}
