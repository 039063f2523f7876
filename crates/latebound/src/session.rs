//! Session state: scope table, capture registry, and lifecycle.
//!
//! A `Session` is the component that assembles composite types. It owns the
//! scope table and the capture registry with an explicit lifecycle instead
//! of ambient global state: created per type-building session (or once per
//! process), cleared or dropped when the types it built are no longer
//! needed.

use ahash::AHashSet;

use crate::{
    check::CheckLimits,
    registry::{CaptureRegistry, CapturedScope, RefId},
    scope::{Binding, ScopeChain, ScopeId, ScopeOrigin, Scopes},
    tracer::{NoopTracer, Tracer},
    types::TypeExpr,
    value::Value,
};

/// Owns every scope and deferred reference created through it.
///
/// The session is single-threaded by construction: all mutating operations
/// take `&mut self`, so the borrow checker enforces the one-at-a-time
/// discipline the registry needs. Sessions are independent; references and
/// scope ids from one session are meaningless in another.
#[derive(Debug)]
pub struct Session<Tr: Tracer = NoopTracer> {
    pub(crate) scopes: Scopes,
    pub(crate) registry: CaptureRegistry,
    pub(crate) limits: CheckLimits,
    pub(crate) tracer: Tr,
}

impl Session<NoopTracer> {
    /// Creates a session with no tracing and default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tracer(NoopTracer)
    }
}

impl Default for Session<NoopTracer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tr: Tracer> Session<Tr> {
    /// Creates a session with the given tracer and default limits.
    #[must_use]
    pub fn with_tracer(tracer: Tr) -> Self {
        Self {
            scopes: Scopes::default(),
            registry: CaptureRegistry::default(),
            limits: CheckLimits::default(),
            tracer,
        }
    }

    /// Replaces the check limits.
    pub fn set_limits(&mut self, limits: CheckLimits) {
        self.limits = limits;
    }

    /// Returns the tracer for inspection.
    pub fn tracer(&self) -> &Tr {
        &self.tracer
    }

    // --- scopes ---

    /// Creates a durable module-level scope.
    pub fn module_scope(&mut self, name: &str) -> ScopeId {
        self.scopes.new_scope(ScopeOrigin::Module { name: name.to_owned() })
    }

    /// Creates a transient function-local scope.
    pub fn local_scope(&mut self, function: &str) -> ScopeId {
        self.scopes.new_scope(ScopeOrigin::Local {
            function: function.to_owned(),
        })
    }

    /// Creates a machinery scope that capture will skip.
    ///
    /// Builder helpers that construct deferred references on a caller's
    /// behalf run under one of these, so the environment they see is never
    /// mistaken for the caller's definition site.
    pub fn internal_scope(&mut self) -> ScopeId {
        self.scopes.new_scope(ScopeOrigin::Internal)
    }

    /// Disposes a scope, freeing its slot for reuse.
    ///
    /// Captured module associations to the disposed scope go dead (resolution
    /// reports the name unresolved); captured local snapshots are unaffected.
    pub fn dispose_scope(&mut self, id: ScopeId) {
        self.scopes.dispose(id);
    }

    /// Binds `name` to a type in the given scope.
    ///
    /// # Panics
    /// Panics if the scope has been disposed.
    pub fn bind_type(&mut self, scope: ScopeId, name: &str, expr: TypeExpr) {
        self.scopes.get_mut(scope).bind(name, Binding::Type(expr));
    }

    /// Binds `name` to a non-type value in the given scope.
    ///
    /// # Panics
    /// Panics if the scope has been disposed.
    pub fn bind_value(&mut self, scope: ScopeId, name: &str, value: Value) {
        self.scopes.get_mut(scope).bind(name, Binding::Value(value));
    }

    // --- deferred references ---

    /// Creates a deferred named reference, capturing its defining
    /// environment from `chain` before returning.
    ///
    /// This factory is the designated way to construct deferred members:
    /// capture is a mandatory, synchronous side effect of construction, so a
    /// reference can never exist without the registry having seen it. The
    /// chain is walked innermost-first and machinery scopes are skipped; if
    /// no qualifying scope exists, no capture is recorded and resolution
    /// will later fail explicitly rather than guess from the ambient
    /// environment.
    pub fn deferred(&mut self, name: &str, chain: &ScopeChain) -> TypeExpr {
        let id = self.registry.new_ref(name);
        self.registry.capture(id, chain, &self.scopes);
        self.tracer.on_capture(name);
        TypeExpr::Deferred(id)
    }

    /// Returns the name a deferred reference stands for.
    ///
    /// # Panics
    /// Panics if the reference has been released.
    #[must_use]
    pub fn ref_name(&self, id: RefId) -> &str {
        self.registry.name(id)
    }

    /// Renders a type expression in Python-flavored syntax.
    #[must_use]
    pub fn type_repr(&self, expr: &TypeExpr) -> String {
        let mut out = String::new();
        expr.repr_fmt(&mut out, &self.registry)
            .expect("writing to a String cannot fail");
        out
    }

    // --- lifecycle ---

    /// Releases every deferred reference reachable from `expr`.
    ///
    /// Walks the expression, each released reference's memoized resolution,
    /// and each captured local snapshot, releasing transitively. Call this
    /// when a composite type is discarded so registry entries do not pin
    /// captured environments for the rest of the session. Clones of `expr`
    /// share its references and become unresolvable afterwards.
    pub fn release(&mut self, expr: &TypeExpr) {
        let mut seen = AHashSet::new();
        let mut work = vec![expr.clone()];
        while let Some(expr) = work.pop() {
            for id in collect_refs(&expr) {
                if !seen.insert(id) || !self.registry.is_live(id) {
                    continue;
                }
                if let Some(resolved) = self.registry.resolved(id) {
                    work.push(resolved.clone());
                }
                if let Some(env) = self.registry.captured(id) {
                    for captured in env.scopes() {
                        let CapturedScope::Snapshot { bindings, .. } = captured else {
                            continue;
                        };
                        for binding in bindings.values() {
                            if let Binding::Type(expr) = binding {
                                work.push(expr.clone());
                            }
                        }
                    }
                }
                self.registry.release(id);
            }
        }
    }

    /// Clears all scopes, references, and captures.
    pub fn clear(&mut self) {
        self.scopes.clear();
        self.registry.clear();
    }

    // --- snapshots ---

    /// Serializes the durable session state (scopes and registry).
    ///
    /// Limits and tracer state are transient and not included.
    ///
    /// # Panics
    /// Panics if serialization fails, which should not happen for
    /// well-formed session state.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        postcard::to_allocvec(&(&self.scopes, &self.registry)).expect("session serialization should not fail")
    }

    /// Rebuilds a session from [`snapshot`](Self::snapshot) bytes.
    pub fn restore(bytes: &[u8]) -> Result<Self, postcard::Error>
    where
        Tr: Default,
    {
        let (scopes, registry) = postcard::from_bytes(bytes)?;
        Ok(Self {
            scopes,
            registry,
            limits: CheckLimits::default(),
            tracer: Tr::default(),
        })
    }

    /// Creates an independent deep copy of the session state via a
    /// serialization round-trip.
    ///
    /// Scope ids and reference ids remain valid in the fork because the
    /// table layouts are preserved. The fork starts with a fresh tracer.
    #[must_use]
    pub fn fork(&self) -> Self
    where
        Tr: Default,
    {
        Self::restore(&self.snapshot()).expect("session deserialization should not fail")
    }
}

/// Collects the deferred reference ids appearing in an expression.
fn collect_refs(expr: &TypeExpr) -> Vec<RefId> {
    let mut ids = Vec::new();
    let mut stack = vec![expr];
    while let Some(expr) = stack.pop() {
        match expr {
            TypeExpr::Atom(_) => {}
            TypeExpr::Union(members) => stack.extend(members.iter()),
            TypeExpr::List(element) => stack.push(element),
            TypeExpr::Mapping(key, value) => {
                stack.push(key);
                stack.push(value);
            }
            TypeExpr::Deferred(id) => ids.push(*id),
        }
    }
    ids
}
