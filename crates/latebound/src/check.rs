//! The value/type matcher.
//!
//! A recursive "does this value match this type" walk. Deferred references
//! encountered mid-walk are resolved through the session, threading one
//! in-progress guard owned by the top-level check. Termination on recursive
//! types comes from the value being finite, with a depth limit turning
//! pathological nesting into an explicit error instead of stack exhaustion.

use serde::{Deserialize, Serialize};

use crate::{
    error::{CheckError, CheckResult, PathStep, ValuePath},
    resolve::InProgress,
    scope::ScopeChain,
    session::Session,
    tracer::Tracer,
    types::{Atom, TypeExpr},
    value::Value,
};

/// Default maximum check recursion depth.
pub const DEFAULT_MAX_CHECK_DEPTH: usize = 500;

/// Limits applied to a single top-level check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CheckLimits {
    /// Maximum recursion depth, counting both value structure and deferred
    /// reference chasing.
    pub max_depth: usize,
}

impl Default for CheckLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_CHECK_DEPTH,
        }
    }
}

impl<Tr: Tracer> Session<Tr> {
    /// Checks `value` against `expr`.
    ///
    /// Deferred references resolve in their captured environments; `fallback`
    /// is consulted only for references with no capture. The check owns its
    /// cycle guard for the duration of the call, as one top-level operation.
    pub fn check(&mut self, value: &Value, expr: &TypeExpr, fallback: Option<&ScopeChain>) -> CheckResult<()> {
        let mut guard = InProgress::default();
        let mut path = ValuePath::new();
        self.check_inner(value, expr, fallback, &mut guard, &mut path, 0)
    }

    fn check_inner(
        &mut self,
        value: &Value,
        expr: &TypeExpr,
        fallback: Option<&ScopeChain>,
        guard: &mut InProgress,
        path: &mut ValuePath,
        depth: usize,
    ) -> CheckResult<()> {
        if depth > self.limits.max_depth {
            return Err(CheckError::RecursionLimit {
                limit: self.limits.max_depth,
            });
        }
        match expr {
            TypeExpr::Atom(atom) => {
                if atom_matches(*atom, value) {
                    Ok(())
                } else {
                    Err(self.mismatch(path, expr, value))
                }
            }
            TypeExpr::Union(members) => {
                // A union matches if any member matches. Members are tried in
                // order; mismatches are collected, hard errors (resolution
                // failures, depth) propagate as soon as they are reached.
                let mut deepest: Option<CheckError> = None;
                for member in members {
                    match self.check_inner(value, member, fallback, guard, path, depth + 1) {
                        Ok(()) => return Ok(()),
                        Err(err @ CheckError::Mismatch { .. }) => {
                            if mismatch_depth(&err) > deepest.as_ref().map_or(path.depth(), mismatch_depth) {
                                deepest = Some(err);
                            }
                        }
                        Err(err) => return Err(err),
                    }
                }
                // Report the member failure that made it deepest into the
                // value; if none got past this level, report the union
                // itself as the expectation.
                match deepest {
                    Some(err) => Err(err),
                    None => Err(self.mismatch(path, expr, value)),
                }
            }
            TypeExpr::List(element) => {
                let Value::List(items) = value else {
                    return Err(self.mismatch(path, expr, value));
                };
                for (index, item) in items.iter().enumerate() {
                    path.push(PathStep::Index(index));
                    let result = self.check_inner(item, element, fallback, guard, path, depth + 1);
                    path.pop();
                    result?;
                }
                Ok(())
            }
            TypeExpr::Mapping(key_type, value_type) => {
                let Value::Dict(entries) = value else {
                    return Err(self.mismatch(path, expr, value));
                };
                for (index, (entry_key, entry_value)) in entries.iter().enumerate() {
                    path.push(PathStep::EntryKey(index));
                    let result = self.check_inner(entry_key, key_type, fallback, guard, path, depth + 1);
                    path.pop();
                    result?;

                    path.push(match entry_key {
                        Value::Str(key) => PathStep::Key(key.clone()),
                        _ => PathStep::Entry(index),
                    });
                    let result = self.check_inner(entry_value, value_type, fallback, guard, path, depth + 1);
                    path.pop();
                    result?;
                }
                Ok(())
            }
            TypeExpr::Deferred(id) => {
                let resolved = self.resolve_guarded(*id, fallback, guard)?;
                self.check_inner(value, &resolved, fallback, guard, path, depth + 1)
            }
        }
    }

    fn mismatch(&self, path: &ValuePath, expr: &TypeExpr, value: &Value) -> CheckError {
        CheckError::Mismatch {
            path: path.clone(),
            expected: self.type_repr(expr),
            found: value.kind(),
        }
    }
}

/// Returns the path depth of a mismatch error.
fn mismatch_depth(err: &CheckError) -> usize {
    match err {
        CheckError::Mismatch { path, .. } => path.depth(),
        _ => 0,
    }
}

/// Atom matching, with CPython's isinstance semantics: bool is a subclass
/// of int, so `True` matches `int`; ints do not match `float`.
fn atom_matches(atom: Atom, value: &Value) -> bool {
    match atom {
        Atom::Any => true,
        Atom::None => matches!(value, Value::None),
        Atom::Bool => matches!(value, Value::Bool(_)),
        Atom::Int => matches!(value, Value::Int(_) | Value::Bool(_)),
        Atom::Float => matches!(value, Value::Float(_)),
        Atom::Str => matches!(value, Value::Str(_)),
    }
}
