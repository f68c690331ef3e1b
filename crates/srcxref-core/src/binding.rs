//! Binding identity: canonical strings for declared symbols.
//!
//! A front end resolves every name in a source file to a *binding* (a type,
//! a method or constructor, a field or variable). This module turns those
//! bindings into a [`BindingId`]:
//!
//! | Binding | Canonical form | Example |
//! |---------|----------------|---------|
//! | Type | erased qualified name, binary name for local/anonymous types | `java.util.Map`, `A$1` |
//! | Field / variable | `Type#name` | `A#f` |
//! | Method | `Type#name(P1,P2)` | `A#x(java.lang.Object)` |
//! | Constructor | `Type(P1,P2)` | `B()` |
//!
//! The identity is deterministic and stable across recompilations, so a
//! reference from one artifact to a binding declared in another stays
//! resolvable without recompiling the declaring artifact.
//!
//! The front end is injected through the [`TypeBinding`], [`VariableBinding`]
//! and [`MethodBinding`] traits. Any binding that cannot be canonicalized
//! (synthetic members such as array `length`, unresolved bindings, erasures
//! the front end does not support) yields `None` and the fact is dropped.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::trace;

// ============================================================================
// Binding Identity
// ============================================================================

/// Canonical identity of a declared symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(String);

impl BindingId {
    /// Wrap an already-canonical string.
    pub fn new(canonical: impl Into<String>) -> Self {
        BindingId(canonical.into())
    }

    /// The canonical string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identity names a type rather than a member.
    ///
    /// This is a structural test on the canonical string: member identities
    /// always contain `#` (fields, methods) or `(` (constructors).
    pub fn is_type(&self) -> bool {
        !self.0.contains('#') && !self.0.contains('(')
    }

    /// Numeric id for indexed lookup: the first 8 bytes of the SHA-256 digest
    /// of the canonical string, big-endian.
    pub fn numeric_id(&self) -> i64 {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        i64::from_be_bytes(prefix)
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BindingId {
    fn from(s: &str) -> Self {
        BindingId::new(s)
    }
}

// ============================================================================
// Front-end Capability
// ============================================================================

/// Raised by a front end when it cannot erase a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unsupported;

/// Names of an erased type declaration as reported by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErasedType {
    /// Fully qualified name; empty for local and anonymous types.
    pub qualified_name: String,
    /// Binary name (`Outer$Inner`, `Outer$1`), if the front end knows one.
    pub binary_name: Option<String>,
}

/// A type binding supplied by the front end.
pub trait TypeBinding {
    /// The erasure of this type's generic declaration.
    ///
    /// `Ok(None)` means the binding is unresolved; `Err(Unsupported)` means
    /// the front end cannot erase it.
    fn erased_declaration(&self) -> Result<Option<ErasedType>, Unsupported>;
}

/// A field or variable binding supplied by the front end.
pub trait VariableBinding {
    type Type: TypeBinding;

    /// Declaring type; `None` for synthetic members such as array `length`
    /// and for locals.
    fn declaring_type(&self) -> Option<Self::Type>;

    fn name(&self) -> &str;
}

/// A method or constructor binding supplied by the front end.
pub trait MethodBinding {
    type Type: TypeBinding;

    fn declaring_type(&self) -> Option<Self::Type>;

    fn name(&self) -> &str;

    fn is_constructor(&self) -> bool;

    /// Declared parameter types, in declaration order.
    fn parameter_types(&self) -> Vec<Self::Type>;
}

// ============================================================================
// Canonicalization
// ============================================================================

/// Canonical string of a type binding.
pub fn canonical_type<T: TypeBinding + ?Sized>(binding: &T) -> Option<String> {
    let erased = match binding.erased_declaration() {
        Ok(Some(erased)) => erased,
        Ok(None) => {
            trace!("unresolved type binding");
            return None;
        }
        Err(Unsupported) => {
            trace!("type erasure unsupported");
            return None;
        }
    };
    if !erased.qualified_name.is_empty() {
        return Some(erased.qualified_name);
    }
    // local / anonymous types
    erased.binary_name.filter(|name| !name.is_empty())
}

/// Canonical string of a field or variable binding: `Type#name`.
pub fn canonical_variable<V: VariableBinding + ?Sized>(binding: &V) -> Option<String> {
    let Some(declaring) = binding.declaring_type() else {
        trace!(name = binding.name(), "variable without declaring type");
        return None;
    };
    let owner = canonical_type(&declaring)?;
    Some(format!("{}#{}", owner, binding.name()))
}

/// Canonical string of a method binding: `Type#name(P1,P2)`, or `Type(P1,P2)`
/// for constructors.
pub fn canonical_method<M: MethodBinding + ?Sized>(binding: &M) -> Option<String> {
    let Some(declaring) = binding.declaring_type() else {
        trace!(name = binding.name(), "method without declaring type");
        return None;
    };
    let mut out = canonical_type(&declaring)?;
    if !binding.is_constructor() {
        out.push('#');
        out.push_str(binding.name());
    }
    out.push('(');
    for (i, parameter) in binding.parameter_types().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&canonical_type(parameter)?);
    }
    out.push(')');
    Some(out)
}

/// Any binding a front end can hand over for canonicalization.
#[derive(Debug, Clone)]
pub enum Binding<T, V, M> {
    Type(T),
    Variable(V),
    Method(M),
}

impl<T, V, M> Binding<T, V, M>
where
    T: TypeBinding,
    V: VariableBinding,
    M: MethodBinding,
{
    /// Canonicalize this binding; `None` drops the fact it belongs to.
    pub fn canonicalize(&self) -> Option<BindingId> {
        let canonical = match self {
            Binding::Type(t) => canonical_type(t),
            Binding::Variable(v) => canonical_variable(v),
            Binding::Method(m) => canonical_method(m),
        };
        canonical.map(BindingId)
    }
}

/// Injected capability: resolve an opaque front-end handle to an identity.
pub trait Canonicalizer<H: ?Sized> {
    fn canonicalize(&self, handle: &H) -> Option<BindingId>;
}

impl<H: ?Sized, F> Canonicalizer<H> for F
where
    F: Fn(&H) -> Option<BindingId>,
{
    fn canonicalize(&self, handle: &H) -> Option<BindingId> {
        self(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotatedSourceFile, Annotation, ReferenceKind};

    #[derive(Debug, Clone)]
    enum TestType {
        Named(&'static str, Option<&'static str>),
        Unresolved,
        Unsupported,
    }

    impl TypeBinding for TestType {
        fn erased_declaration(&self) -> Result<Option<ErasedType>, Unsupported> {
            match self {
                TestType::Named(qualified, binary) => Ok(Some(ErasedType {
                    qualified_name: qualified.to_string(),
                    binary_name: binary.map(str::to_string),
                })),
                TestType::Unresolved => Ok(None),
                TestType::Unsupported => Err(Unsupported),
            }
        }
    }

    struct TestVariable {
        owner: Option<TestType>,
        name: &'static str,
    }

    impl VariableBinding for TestVariable {
        type Type = TestType;

        fn declaring_type(&self) -> Option<TestType> {
            self.owner.clone()
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    struct TestMethod {
        owner: Option<TestType>,
        name: &'static str,
        constructor: bool,
        params: Vec<TestType>,
    }

    impl MethodBinding for TestMethod {
        type Type = TestType;

        fn declaring_type(&self) -> Option<TestType> {
            self.owner.clone()
        }

        fn name(&self) -> &str {
            self.name
        }

        fn is_constructor(&self) -> bool {
            self.constructor
        }

        fn parameter_types(&self) -> Vec<TestType> {
            self.params.clone()
        }
    }

    fn class(name: &'static str) -> TestType {
        TestType::Named(name, Some(name))
    }

    #[test]
    fn test_constructor_without_parameters() {
        let ctor = TestMethod {
            owner: Some(class("B")),
            name: "<init>",
            constructor: true,
            params: vec![],
        };
        assert_eq!(canonical_method(&ctor).as_deref(), Some("B()"));
    }

    #[test]
    fn test_method_with_object_parameter() {
        let method = TestMethod {
            owner: Some(class("A")),
            name: "x",
            constructor: false,
            params: vec![class("java.lang.Object")],
        };
        assert_eq!(
            canonical_method(&method).as_deref(),
            Some("A#x(java.lang.Object)")
        );
    }

    #[test]
    fn test_method_parameters_comma_joined() {
        let method = TestMethod {
            owner: Some(class("java.util.Map")),
            name: "put",
            constructor: false,
            params: vec![class("java.lang.Object"), class("java.lang.Object")],
        };
        assert_eq!(
            canonical_method(&method).as_deref(),
            Some("java.util.Map#put(java.lang.Object,java.lang.Object)")
        );
    }

    #[test]
    fn test_field() {
        let field = TestVariable {
            owner: Some(class("A")),
            name: "f",
        };
        assert_eq!(canonical_variable(&field).as_deref(), Some("A#f"));
    }

    #[test]
    fn test_array_length_has_no_identity() {
        let length = TestVariable {
            owner: None,
            name: "length",
        };
        assert_eq!(canonical_variable(&length), None);
    }

    #[test]
    fn test_local_type_falls_back_to_binary_name() {
        let local = TestType::Named("", Some("A$1Local"));
        assert_eq!(canonical_type(&local).as_deref(), Some("A$1Local"));

        let nameless = TestType::Named("", None);
        assert_eq!(canonical_type(&nameless), None);
    }

    #[test]
    fn test_unresolved_and_unsupported_types() {
        assert_eq!(canonical_type(&TestType::Unresolved), None);
        assert_eq!(canonical_type(&TestType::Unsupported), None);

        let field = TestVariable {
            owner: Some(TestType::Unsupported),
            name: "f",
        };
        assert_eq!(canonical_variable(&field), None);
    }

    #[test]
    fn test_failing_parameter_aborts_method() {
        let method = TestMethod {
            owner: Some(class("A")),
            name: "x",
            constructor: false,
            params: vec![class("int"), TestType::Unresolved],
        };
        assert_eq!(canonical_method(&method), None);
    }

    #[test]
    fn test_binding_enum_dispatch() {
        let binding: Binding<TestType, TestVariable, TestMethod> = Binding::Variable(TestVariable {
            owner: Some(class("A")),
            name: "f",
        });
        assert_eq!(binding.canonicalize(), Some(BindingId::new("A#f")));

        let binding: Binding<TestType, TestVariable, TestMethod> =
            Binding::Type(TestType::Unresolved);
        assert_eq!(binding.canonicalize(), None);
    }

    #[test]
    fn test_front_end_bindings_feed_annotations() {
        type TestBinding = Binding<TestType, TestVariable, TestMethod>;
        let mut file = AnnotatedSourceFile::new("a.length + a.f");
        let read = |binding| Annotation::BindingReference {
            binding,
            kind: ReferenceKind::FieldRead,
            id: 0,
        };

        let length: TestBinding = Binding::Variable(TestVariable {
            owner: None,
            name: "length",
        });
        let field: TestBinding = Binding::Variable(TestVariable {
            owner: Some(class("A")),
            name: "f",
        });
        assert!(!file.annotate_binding(2, 6, &length, &TestBinding::canonicalize, read));
        assert!(file.annotate_binding(13, 1, &field, &TestBinding::canonicalize, read));

        let refs: Vec<&str> = file.references().map(|(_, b, _, _)| b.as_str()).collect();
        assert_eq!(refs, vec!["A#f"]);
    }

    #[test]
    fn test_closure_canonicalizer() {
        let resolver = |handle: &u32| (*handle > 0).then(|| BindingId::new(format!("T{}", handle)));
        assert_eq!(
            Canonicalizer::<u32>::canonicalize(&resolver, &3),
            Some(BindingId::new("T3"))
        );
        assert_eq!(Canonicalizer::<u32>::canonicalize(&resolver, &0), None);
    }

    #[test]
    fn test_is_type() {
        assert!(BindingId::new("java.util.Map").is_type());
        assert!(BindingId::new("A$1").is_type());
        assert!(!BindingId::new("A#f").is_type());
        assert!(!BindingId::new("B()").is_type());
        assert!(!BindingId::new("A#x(int)").is_type());
    }

    #[test]
    fn test_numeric_id_is_deterministic() {
        let a = BindingId::new("A#x()");
        assert_eq!(a.numeric_id(), BindingId::new("A#x()").numeric_id());
        assert_ne!(a.numeric_id(), BindingId::new("A#y()").numeric_id());
    }
}
