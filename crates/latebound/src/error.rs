//! Error taxonomy for resolution and checking.
//!
//! Every failure names the identifier involved and states which environment
//! chain was searched, so callers can tell *why* resolution failed, not just
//! that it did. Resolution failures are returned to the immediate caller,
//! never swallowed, and never replaced with a guessed value.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::value::Kind;

/// Result alias for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Result alias for value/type checking operations.
pub type CheckResult<T> = Result<T, CheckError>;

/// Which environment chain a failed lookup actually searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Searched {
    /// The captured definition-site environment existed and was used.
    Captured,
    /// No capture existed; the caller-supplied fallback chain was used.
    Fallback,
    /// No capture existed and no fallback was supplied.
    Neither,
}

impl fmt::Display for Searched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Captured => f.write_str("searched the captured definition-site environment"),
            Self::Fallback => f.write_str("no captured environment; searched the fallback environment"),
            Self::Neither => f.write_str("no captured environment and no fallback supplied"),
        }
    }
}

/// A failure while resolving a deferred named reference.
#[derive(Debug, Clone, PartialEq, IntoStaticStr, Serialize, Deserialize)]
pub enum ResolveError {
    /// The reference is already being resolved higher up the same call.
    CircularResolution {
        name: String,
    },
    /// The name was not bound anywhere in the searched chain.
    UnresolvedName {
        name: String,
        searched: Searched,
    },
    /// The name was bound, but to something that is not a type.
    NotAType {
        name: String,
        kind: Kind,
    },
}

impl ResolveError {
    /// Stable kind name for this error, e.g. `"UnresolvedName"`.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircularResolution { name } => {
                write!(f, "circular resolution of '{name}'")
            }
            Self::UnresolvedName { name, searched } => {
                write!(f, "cannot resolve name '{name}' ({searched})")
            }
            Self::NotAType { name, kind } => {
                write!(f, "'{name}' resolved to a non-type value of kind {kind}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// One step of the path from the checked root value to a mismatch site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathStep {
    /// List or set element position.
    Index(usize),
    /// Mapping value under a string key.
    Key(String),
    /// Mapping value of the n-th entry, when the key is not a string.
    Entry(usize),
    /// The key itself of the n-th mapping entry.
    EntryKey(usize),
}

/// The location of a mismatch inside the checked value, rooted at `$`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuePath(Vec<PathStep>);

impl ValuePath {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, step: PathStep) {
        self.0.push(step);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }

    /// Number of steps from the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for step in &self.0 {
            match step {
                PathStep::Index(index) => write!(f, "[{index}]")?,
                PathStep::Key(key) => write!(f, "[{key:?}]")?,
                PathStep::Entry(index) => write!(f, ".entry({index})")?,
                PathStep::EntryKey(index) => write!(f, ".key({index})")?,
            }
        }
        Ok(())
    }
}

/// A failure while checking a value against a type expression.
#[derive(Debug, Clone, PartialEq, IntoStaticStr, Serialize, Deserialize)]
pub enum CheckError {
    /// The value at `path` does not match the expected type.
    Mismatch {
        path: ValuePath,
        /// Rendering of the type expression the value was checked against.
        expected: String,
        found: Kind,
    },
    /// A deferred reference encountered during the walk failed to resolve.
    Resolve(ResolveError),
    /// The check exceeded the configured recursion depth.
    RecursionLimit {
        limit: usize,
    },
}

impl CheckError {
    /// Stable kind name for this error, e.g. `"Mismatch"`.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch { path, expected, found } => {
                write!(f, "type mismatch at {path}: expected {expected}, found {found}")
            }
            Self::Resolve(err) => write!(f, "{err}"),
            Self::RecursionLimit { limit } => {
                write!(f, "maximum check depth exceeded: {limit}")
            }
        }
    }
}

impl std::error::Error for CheckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Resolve(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResolveError> for CheckError {
    fn from(err: ResolveError) -> Self {
        Self::Resolve(err)
    }
}
