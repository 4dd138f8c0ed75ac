//! The type lattice: approximate, union-valued Python types.
//!
//! Every value is immutable once constructed; "widening" a container means
//! producing a new value whose content type is the merge of the old content
//! type and the newly observed one, so observed types only ever grow.
//!
//! Merge rules:
//! - `Mixed` (the unknown placeholder) is the identity element
//! - structurally equal inputs merge to themselves
//! - anything else merges into an [`Type::Unsure`] union, flattened and
//!   deduplicated
//!
//! `Unsure` members are kept in canonical (sorted) order, which makes merge
//! commutative under structural equality.

use crate::model::{DeclarationId, ScopeId};
use std::fmt;

// ============================================================================
// Kind Tags
// ============================================================================

/// Primitive type markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntegralKind {
    Int,
    Float,
    Bool,
    Str,
    /// The type of `None` and of functions observed to return nothing.
    None,
    /// The generic placeholder: nothing is known about the value.
    Mixed,
}

impl IntegralKind {
    /// The builtin stub class backing values of this kind, if any.
    pub fn stub_class(self) -> Option<&'static str> {
        match self {
            IntegralKind::Int => Some("int"),
            IntegralKind::Float => Some("float"),
            IntegralKind::Bool => Some("bool"),
            IntegralKind::Str => Some("str"),
            IntegralKind::None | IntegralKind::Mixed => None,
        }
    }
}

/// Which variable-length container a type models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContainerKind {
    List,
    Dict,
    Set,
}

impl ContainerKind {
    /// Whether this container kind carries a key type.
    pub fn has_keys(self) -> bool {
        matches!(self, ContainerKind::Dict)
    }

    /// The builtin stub class backing this container kind.
    pub fn stub_class(self) -> &'static str {
        match self {
            ContainerKind::List => "list",
            ContainerKind::Dict => "dict",
            ContainerKind::Set => "set",
        }
    }

    /// Map a builtin stub class name back to a container kind.
    pub fn from_stub_class(name: &str) -> Option<ContainerKind> {
        match name {
            "list" => Some(ContainerKind::List),
            "dict" => Some(ContainerKind::Dict),
            "set" => Some(ContainerKind::Set),
            _ => None,
        }
    }
}

// ============================================================================
// Type
// ============================================================================

/// An inferred type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
    /// A primitive marker, including the unknown placeholder.
    Integral(IntegralKind),
    /// Nominal type of a class or of its instances; points back at the
    /// declaration defining the class and the scope holding its members.
    Structure {
        declaration: DeclarationId,
        scope: ScopeId,
    },
    /// A callable with positional parameter types and a return type.
    Function {
        parameters: Vec<Type>,
        returns: Box<Type>,
    },
    /// list/dict/set: content (and for dict, key) types widen as elements
    /// are observed, and never shrink.
    VariableLength {
        kind: ContainerKind,
        key: Option<Box<Type>>,
        content: Box<Type>,
    },
    /// tuple: fixed arity, a precise type per position.
    Indexed { entries: Vec<Type> },
    /// One of several possible types. Flattened, deduplicated, sorted.
    Unsure(Vec<Type>),
}

impl Type {
    /// The unknown placeholder.
    pub fn mixed() -> Type {
        Type::Integral(IntegralKind::Mixed)
    }

    /// The type of `None` / of a call returning nothing.
    pub fn void() -> Type {
        Type::Integral(IntegralKind::None)
    }

    /// A fresh, empty container of the given kind.
    pub fn container(kind: ContainerKind) -> Type {
        Type::VariableLength {
            kind,
            key: kind.has_keys().then(|| Box::new(Type::mixed())),
            content: Box::new(Type::mixed()),
        }
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, Type::Integral(IntegralKind::Mixed))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Integral(IntegralKind::None))
    }

    /// Whether the type carries any information worth keeping.
    pub fn is_useful(&self) -> bool {
        !self.is_mixed()
    }

    /// Merge two types per the lattice rules.
    pub fn merge(a: Type, b: Type) -> Type {
        if a.is_mixed() {
            return b;
        }
        if b.is_mixed() || a == b {
            return a;
        }
        // containers of the same kind widen element-wise instead of forming
        // a union, so repeated builds observe a monotonically growing
        // content type rather than an unsure of container generations
        if let (
            Type::VariableLength {
                kind: kind_a,
                key: key_a,
                content: content_a,
            },
            Type::VariableLength {
                kind: kind_b,
                key: key_b,
                content: content_b,
            },
        ) = (&a, &b)
        {
            if kind_a == kind_b {
                let key = match (key_a, key_b) {
                    (Some(ka), Some(kb)) => {
                        Some(Box::new(Type::merge((**ka).clone(), (**kb).clone())))
                    }
                    (Some(k), None) | (None, Some(k)) => Some(k.clone()),
                    (None, None) => None,
                };
                return Type::VariableLength {
                    kind: *kind_a,
                    key,
                    content: Box::new(Type::merge(
                        (**content_a).clone(),
                        (**content_b).clone(),
                    )),
                };
            }
        }
        let mut members = Vec::new();
        for t in [a, b] {
            match t {
                Type::Unsure(inner) => members.extend(inner),
                other => members.push(other),
            }
        }
        Type::unsure_of(members)
    }

    /// Build a union from the given members: flattens nested unions, drops
    /// mixed members, deduplicates structurally, and canonicalizes order.
    ///
    /// Zero surviving members yield mixed; a single member yields itself.
    pub fn unsure_of(members: Vec<Type>) -> Type {
        let mut flat = Vec::new();
        for t in members {
            match t {
                Type::Unsure(inner) => flat.extend(inner),
                other if other.is_mixed() => {}
                other => flat.push(other),
            }
        }
        flat.sort();
        flat.dedup();
        match flat.len() {
            0 => Type::mixed(),
            1 => flat.into_iter().next().expect("length checked"),
            _ => Type::Unsure(flat),
        }
    }

    /// The alternatives this type stands for: a union's members, or the type
    /// itself.
    pub fn alternatives(&self) -> &[Type] {
        match self {
            Type::Unsure(members) => members,
            other => std::slice::from_ref(other),
        }
    }

    /// Widen a container's content type with an observed element type.
    ///
    /// No-op on non-container types.
    pub fn with_content(self, observed: Type) -> Type {
        match self {
            Type::VariableLength { kind, key, content } => Type::VariableLength {
                kind,
                key,
                content: Box::new(Type::merge(*content, observed)),
            },
            other => other,
        }
    }

    /// Widen a keyed container's key type with an observed key type.
    ///
    /// No-op on containers without keys and on non-container types.
    pub fn with_key(self, observed: Type) -> Type {
        match self {
            Type::VariableLength {
                kind,
                key: Some(key),
                content,
            } => Type::VariableLength {
                kind,
                key: Some(Box::new(Type::merge(*key, observed))),
                content,
            },
            other => other,
        }
    }

    /// Content type of a container, if this is one.
    pub fn content_type(&self) -> Option<&Type> {
        match self {
            Type::VariableLength { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Key type of a keyed container, if this is one.
    pub fn key_type(&self) -> Option<&Type> {
        match self {
            Type::VariableLength { key: Some(key), .. } => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integral(kind) => {
                let name = match kind {
                    IntegralKind::Int => "int",
                    IntegralKind::Float => "float",
                    IntegralKind::Bool => "bool",
                    IntegralKind::Str => "str",
                    IntegralKind::None => "None",
                    IntegralKind::Mixed => "mixed",
                };
                write!(f, "{name}")
            }
            Type::Structure { declaration, .. } => write!(f, "object<{declaration}>"),
            Type::Function {
                parameters,
                returns,
            } => {
                write!(f, "function (")?;
                for (i, p) in parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {returns}")
            }
            Type::VariableLength { kind, key, content } => {
                let name = kind.stub_class();
                match key {
                    Some(key) => write!(f, "{name} of {key} : {content}"),
                    None => write!(f, "{name} of {content}"),
                }
            }
            Type::Indexed { entries } => {
                write!(f, "tuple (")?;
                for (i, t) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ")")
            }
            Type::Unsure(members) => {
                write!(f, "unsure (")?;
                for (i, t) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> Type {
        Type::Integral(IntegralKind::Int)
    }

    fn string() -> Type {
        Type::Integral(IntegralKind::Str)
    }

    fn boolean() -> Type {
        Type::Integral(IntegralKind::Bool)
    }

    #[test]
    fn test_merge_mixed_is_identity() {
        for t in [int(), string(), Type::container(ContainerKind::List)] {
            assert_eq!(Type::merge(Type::mixed(), t.clone()), t);
            assert_eq!(Type::merge(t.clone(), Type::mixed()), t);
        }
        assert_eq!(Type::merge(Type::mixed(), Type::mixed()), Type::mixed());
    }

    #[test]
    fn test_merge_idempotent() {
        let list_of_int = Type::container(ContainerKind::List).with_content(int());
        for t in [int(), string(), list_of_int] {
            assert_eq!(Type::merge(t.clone(), t.clone()), t);
        }
    }

    #[test]
    fn test_merge_commutative() {
        let ab = Type::merge(int(), string());
        let ba = Type::merge(string(), int());
        assert_eq!(ab, ba);
        assert!(matches!(ab, Type::Unsure(ref m) if m.len() == 2));
    }

    #[test]
    fn test_merge_flattens_and_dedups() {
        let ab = Type::merge(int(), string());
        let abc = Type::merge(ab.clone(), boolean());
        match &abc {
            Type::Unsure(members) => assert_eq!(members.len(), 3),
            other => panic!("expected union, got {other}"),
        }
        // re-merging a member changes nothing
        assert_eq!(Type::merge(abc.clone(), int()), abc);
        // merging two unions with shared members dedups
        let bc = Type::merge(string(), boolean());
        assert_eq!(Type::merge(ab, bc), abc);
    }

    #[test]
    fn test_same_kind_containers_merge_elementwise() {
        let a = Type::container(ContainerKind::List).with_content(int());
        let b = Type::container(ContainerKind::List).with_content(string());
        let merged = Type::merge(a.clone(), b);
        assert_eq!(
            merged,
            Type::container(ContainerKind::List).with_content(Type::merge(int(), string()))
        );
        // a freshly observed empty container does not degrade a widened one
        assert_eq!(
            Type::merge(a.clone(), Type::container(ContainerKind::List)),
            a
        );
        // different kinds still form a union
        let set = Type::container(ContainerKind::Set);
        assert!(matches!(
            Type::merge(a.clone(), set),
            Type::Unsure(ref m) if m.len() == 2
        ));
        // dict keys merge alongside contents
        let d1 = Type::container(ContainerKind::Dict).with_key(string()).with_content(int());
        let d2 = Type::container(ContainerKind::Dict).with_key(boolean());
        let merged = Type::merge(d1, d2);
        assert_eq!(merged.key_type(), Some(&Type::merge(string(), boolean())));
    }

    #[test]
    fn test_unsure_of_degenerate_cases() {
        assert_eq!(Type::unsure_of(vec![]), Type::mixed());
        assert_eq!(Type::unsure_of(vec![int()]), int());
        assert_eq!(Type::unsure_of(vec![Type::mixed(), int()]), int());
    }

    #[test]
    fn test_container_widening_is_monotonic() {
        let t = Type::container(ContainerKind::List);
        let t = t.with_content(int());
        assert_eq!(t.content_type(), Some(&int()));
        let t = t.with_content(string());
        match t.content_type() {
            Some(Type::Unsure(members)) => assert_eq!(members.len(), 2),
            other => panic!("expected union content, got {other:?}"),
        }
        // observing an already-known type changes nothing
        let widened = t.clone().with_content(int());
        assert_eq!(widened, t);
    }

    #[test]
    fn test_dict_key_widening() {
        let d = Type::container(ContainerKind::Dict);
        assert!(d.key_type().is_some());
        let d = d.with_key(string()).with_content(int());
        assert_eq!(d.key_type(), Some(&string()));
        // sets have no keys; with_key is a no-op
        let s = Type::container(ContainerKind::Set).with_key(string());
        assert_eq!(s.key_type(), None);
    }

    #[test]
    fn test_display() {
        let t = Type::container(ContainerKind::List).with_content(int());
        assert_eq!(t.to_string(), "list of int");
        assert_eq!(Type::merge(int(), string()).to_string(), "unsure (int, str)");
    }
}
