//! Resolution of deferred references in their captured environments.
//!
//! Resolution behaves as if it ran at the original definition site: the
//! captured environment wins unconditionally when it exists, and the
//! caller-supplied fallback chain is consulted only when no capture was
//! recorded. What is importable at the resolution call site never matters;
//! only what was visible where the reference was written does.

use ahash::AHashSet;

use crate::{
    error::{ResolveError, ResolveResult, Searched},
    registry::RefId,
    scope::{Binding, ScopeChain},
    session::Session,
    tracer::Tracer,
    types::TypeExpr,
};

/// References currently being resolved within one top-level call.
///
/// Each top-level resolve or check owns its own guard; guards are never
/// shared across unrelated calls.
pub(crate) type InProgress = AHashSet<RefId>;

impl<Tr: Tracer> Session<Tr> {
    /// Resolves every deferred reference in `expr`, returning the
    /// normalized expression.
    ///
    /// This is the plain callable resolution primitive: it is not tied to
    /// the matcher and can be called directly. A fresh cycle guard is
    /// created for the call.
    ///
    /// # Panics
    /// Panics if a reference in `expr` has been released.
    pub fn resolve(&mut self, expr: &TypeExpr, fallback: Option<&ScopeChain>) -> ResolveResult<TypeExpr> {
        let mut guard = InProgress::default();
        self.normalize(expr.clone(), fallback, &mut guard, false)
    }

    /// Resolves a single deferred reference to its concrete type.
    ///
    /// # Panics
    /// Panics if the reference has been released.
    pub fn resolve_ref(&mut self, id: RefId, fallback: Option<&ScopeChain>) -> ResolveResult<TypeExpr> {
        let mut guard = InProgress::default();
        self.resolve_guarded(id, fallback, &mut guard)
    }

    /// Resolves `id` with an explicit in-progress guard.
    ///
    /// The memoized result, when present, is returned without touching any
    /// environment. Otherwise the captured environment (or the fallback
    /// chain when no capture exists) is searched innermost-first, and a
    /// found type expression is normalized and memoized. Failures are not
    /// memoized: a later retry may succeed once the missing name is bound.
    pub(crate) fn resolve_guarded(
        &mut self,
        id: RefId,
        fallback: Option<&ScopeChain>,
        guard: &mut InProgress,
    ) -> ResolveResult<TypeExpr> {
        let name = self.registry.name(id).to_owned();
        if guard.contains(&id) {
            return Err(ResolveError::CircularResolution { name });
        }
        if let Some(resolved) = self.registry.resolved(id) {
            let resolved = resolved.clone();
            self.tracer.on_memo_hit(&name);
            return Ok(resolved);
        }

        self.tracer.on_lookup(&name);
        let searched;
        let binding = if let Some(env) = self.registry.captured(id) {
            searched = Searched::Captured;
            env.lookup(&name, &self.scopes).cloned()
        } else if let Some(chain) = fallback {
            searched = Searched::Fallback;
            self.scopes.lookup(chain, &name).cloned()
        } else {
            searched = Searched::Neither;
            None
        };

        match binding {
            Some(Binding::Type(expr)) => {
                guard.insert(id);
                let normalized = self.normalize(expr, fallback, guard, false);
                guard.remove(&id);
                let expr = normalized?;
                self.registry.memoize(id, expr.clone());
                Ok(expr)
            }
            Some(Binding::Value(value)) => Err(ResolveError::NotAType {
                name,
                kind: value.kind(),
            }),
            None => Err(ResolveError::UnresolvedName { name, searched }),
        }
    }

    /// Normalizes an expression by resolving the deferred references in it.
    ///
    /// `nested` is true below the first composite constructor. A nested
    /// reference that is already in the guard belongs to the composite
    /// currently being resolved and is left deferred; that is what lets
    /// genuinely recursive types resolve without looping. In alias position
    /// (`nested == false`) the same condition is a resolution cycle and
    /// fails.
    fn normalize(
        &mut self,
        expr: TypeExpr,
        fallback: Option<&ScopeChain>,
        guard: &mut InProgress,
        nested: bool,
    ) -> ResolveResult<TypeExpr> {
        match expr {
            TypeExpr::Atom(atom) => Ok(TypeExpr::Atom(atom)),
            TypeExpr::Deferred(id) => {
                if nested && guard.contains(&id) {
                    return Ok(TypeExpr::Deferred(id));
                }
                self.resolve_guarded(id, fallback, guard)
            }
            TypeExpr::Union(members) => {
                let members = members
                    .into_iter()
                    .map(|member| self.normalize(member, fallback, guard, true))
                    .collect::<ResolveResult<Vec<_>>>()?;
                Ok(TypeExpr::Union(members))
            }
            TypeExpr::List(element) => {
                let element = self.normalize(*element, fallback, guard, true)?;
                Ok(TypeExpr::list_of(element))
            }
            TypeExpr::Mapping(key, value) => {
                let key = self.normalize(*key, fallback, guard, true)?;
                let value = self.normalize(*value, fallback, guard, true)?;
                Ok(TypeExpr::mapping_of(key, value))
            }
        }
    }
}
