//! Runtime values checked against type expressions.
//!
//! `Value` is a small, self-contained document model: the shapes a checked
//! value can take (scalars, lists, mappings, sets). It deliberately carries
//! no interior references, so values can be cloned, serialized, and walked
//! without any arena bookkeeping.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// A runtime value that can be checked against a [`TypeExpr`](crate::TypeExpr).
///
/// Mappings preserve insertion order and allow arbitrary keys, matching
/// Python dict semantics rather than JSON objects. Entries are stored as
/// pairs because the matcher only ever iterates them; no keyed lookup is
/// performed during checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Insertion-ordered key/value pairs.
    Dict(Vec<(Value, Value)>),
    Set(Vec<Value>),
}

impl Value {
    /// Returns the kind tag used in error reporting.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::None => Kind::NoneType,
            Self::Bool(_) => Kind::Bool,
            Self::Int(_) => Kind::Int,
            Self::Float(_) => Kind::Float,
            Self::Str(_) => Kind::Str,
            Self::List(_) => Kind::List,
            Self::Dict(_) => Kind::Dict,
            Self::Set(_) => Kind::Set,
        }
    }

    /// Converts a JSON document into a value.
    ///
    /// Numbers that fit in `i64` become [`Value::Int`]; everything else
    /// numeric becomes [`Value::Float`]. Object keys become string keys.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            serde_json::Value::Object(entries) => Self::Dict(
                entries
                    .into_iter()
                    .map(|(key, value)| (Self::Str(key), Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Converts this value back into a JSON document.
    ///
    /// Returns `None` for shapes JSON cannot represent: sets, mapping keys
    /// that are not strings, and non-finite floats.
    #[must_use]
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::None => Some(serde_json::Value::Null),
            Self::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Self::Int(i) => Some(serde_json::Value::Number((*i).into())),
            Self::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number),
            Self::Str(s) => Some(serde_json::Value::String(s.clone())),
            Self::List(items) => items
                .iter()
                .map(Self::to_json)
                .collect::<Option<Vec<_>>>()
                .map(serde_json::Value::Array),
            Self::Dict(entries) => {
                let mut object = serde_json::Map::new();
                for (key, value) in entries {
                    let Self::Str(key) = key else { return None };
                    object.insert(key.clone(), value.to_json()?);
                }
                Some(serde_json::Value::Object(object))
            }
            Self::Set(_) => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Self::from_json(json)
    }
}

/// The kind of a runtime value, named the way Python names its types.
///
/// Parsed from lowercase names via strum (`"int"`, `"str"`, ...); `NoneType`
/// keeps its canonical capitalization in display output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Kind {
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    List,
    Dict,
    Set,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoneType => f.write_str("NoneType"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::List => f.write_str("list"),
            Self::Dict => f.write_str("dict"),
            Self::Set => f.write_str("set"),
        }
    }
}
