//! Type expressions: the composite types values are checked against.
//!
//! A `TypeExpr` is plain data. Deferred members carry only the identity of a
//! named reference; the name and everything needed to resolve it live in the
//! session's capture registry, so rendering a type expression needs registry
//! access.

use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::registry::{CaptureRegistry, RefId};

/// A concrete, non-composite type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Atom {
    /// Matches every value.
    #[strum(serialize = "Any")]
    Any,
    #[strum(serialize = "None")]
    None,
    Bool,
    Int,
    Float,
    Str,
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::None => f.write_str("None"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
        }
    }
}

/// A type expression, possibly containing deferred named references.
///
/// Deferred members are created only through
/// [`Session::deferred`](crate::Session::deferred), which records the
/// definition-site environment as a side effect of construction. Everything
/// else can be built directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpr {
    Atom(Atom),
    /// A union of alternatives; a value matches if any member matches.
    Union(Vec<TypeExpr>),
    /// A homogeneous list.
    List(Box<TypeExpr>),
    /// A mapping with typed keys and values.
    Mapping(Box<TypeExpr>, Box<TypeExpr>),
    /// A named reference, to be resolved in its captured environment.
    Deferred(RefId),
}

impl TypeExpr {
    /// Builds a union from the given members.
    #[must_use]
    pub fn union(members: impl IntoIterator<Item = Self>) -> Self {
        Self::Union(members.into_iter().collect())
    }

    /// Builds `list[element]`.
    #[must_use]
    pub fn list_of(element: Self) -> Self {
        Self::List(Box::new(element))
    }

    /// Builds `mapping[key, value]`.
    #[must_use]
    pub fn mapping_of(key: Self, value: Self) -> Self {
        Self::Mapping(Box::new(key), Box::new(value))
    }

    /// Writes the Python-flavored rendering of this expression.
    ///
    /// Deferred references render as quoted forward-reference strings
    /// (`'V'`), which requires the registry that owns their names.
    pub(crate) fn repr_fmt(&self, f: &mut impl Write, registry: &CaptureRegistry) -> fmt::Result {
        match self {
            Self::Atom(atom) => write!(f, "{atom}"),
            Self::Union(members) => {
                if members.is_empty() {
                    return f.write_str("Never");
                }
                let mut first = true;
                for member in members {
                    if !first {
                        f.write_str(" | ")?;
                    }
                    first = false;
                    member.repr_fmt(f, registry)?;
                }
                Ok(())
            }
            Self::List(element) => {
                f.write_str("list[")?;
                element.repr_fmt(f, registry)?;
                f.write_char(']')
            }
            Self::Mapping(key, value) => {
                f.write_str("mapping[")?;
                key.repr_fmt(f, registry)?;
                f.write_str(", ")?;
                value.repr_fmt(f, registry)?;
                f.write_char(']')
            }
            Self::Deferred(id) => write!(f, "'{}'", registry.name(*id)),
        }
    }
}

impl From<Atom> for TypeExpr {
    fn from(atom: Atom) -> Self {
        Self::Atom(atom)
    }
}
