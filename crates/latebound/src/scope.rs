//! Defining environments: scopes, bindings, and lexical chains.
//!
//! Scopes are stored arena-style in a [`Scopes`] table owned by the session.
//! Module scopes are durable for the life of the session; local scopes are
//! transient and can be disposed once the code that introduced them is done,
//! with their slots reused by later scopes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{types::TypeExpr, value::Value};

/// Unique identifier for a scope stored in the session's scope table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(u32);

impl ScopeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index.try_into().expect("Invalid scope id"))
    }

    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a scope comes from, and therefore how capture treats it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeOrigin {
    /// A module-level scope, durably associated with its compilation unit.
    Module {
        /// Module name, e.g. `"json_type"`.
        name: String,
    },
    /// A function-local scope; transient, snapshotted at capture time.
    Local {
        /// Name of the enclosing function.
        function: String,
    },
    /// A scope belonging to the type machinery itself.
    ///
    /// Capture skips these when walking outward for the definition site, so
    /// the machinery's own helper frames are never mistaken for user code.
    Internal,
}

impl ScopeOrigin {
    /// Returns true for machinery scopes that capture must skip.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }

    /// A human-readable label for diagnostics and snapshots.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Module { name } => name,
            Self::Local { function } => function,
            Self::Internal => "<internal>",
        }
    }
}

/// A name bound in a scope: either a type or an ordinary value.
///
/// The distinction is what lets resolution report "found, but not a type"
/// separately from "not found".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Binding {
    Type(TypeExpr),
    Value(Value),
}

/// Insertion-ordered name bindings, as visible inside one scope.
pub(crate) type Bindings = IndexMap<String, Binding>;

/// A single scope: its origin plus the bindings visible in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Scope {
    origin: ScopeOrigin,
    bindings: Bindings,
}

impl Scope {
    pub fn new(origin: ScopeOrigin) -> Self {
        Self {
            origin,
            bindings: Bindings::default(),
        }
    }

    pub fn origin(&self) -> &ScopeOrigin {
        &self.origin
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn bind(&mut self, name: &str, binding: Binding) {
        self.bindings.insert(name.to_owned(), binding);
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }
}

/// The chain of lexical scopes active at some point, innermost first.
///
/// A chain is just a list of scope ids; it does not own the scopes and can
/// be rebuilt cheaply for every construction site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeChain(SmallVec<[ScopeId; 4]>);

impl ScopeChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes the next enclosing scope (outward of all previous entries).
    pub fn push(&mut self, id: ScopeId) {
        self.0.push(id);
    }

    /// Iterates the chain innermost to outermost.
    pub fn iter(&self) -> impl Iterator<Item = ScopeId> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[ScopeId]> for ScopeChain {
    fn from(ids: &[ScopeId]) -> Self {
        Self(ids.iter().copied().collect())
    }
}

impl<const N: usize> From<[ScopeId; N]> for ScopeChain {
    fn from(ids: [ScopeId; N]) -> Self {
        Self(ids.into_iter().collect())
    }
}

/// Storage for all scopes in a session.
///
/// Disposed slots are kept and reused for later scopes, so long-running
/// sessions that repeatedly enter and leave local scopes do not grow the
/// table without bound.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Scopes {
    slots: Vec<Option<Scope>>,
    /// Slot indices freed by disposal, available for reuse.
    reuse_ids: Vec<ScopeId>,
}

impl Scopes {
    /// Creates a new scope and returns its id, reusing a freed slot if any.
    pub fn new_scope(&mut self, origin: ScopeOrigin) -> ScopeId {
        if let Some(reuse_id) = self.reuse_ids.pop() {
            self.slots[reuse_id.index()] = Some(Scope::new(origin));
            reuse_id
        } else {
            let id = ScopeId::new(self.slots.len());
            self.slots.push(Some(Scope::new(origin)));
            id
        }
    }

    /// Returns the scope for `id`, or `None` if it has been disposed.
    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Returns mutable access to the scope for `id`.
    ///
    /// # Panics
    /// Panics if the scope has been disposed.
    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        self.slots[id.index()].as_mut().expect("scope was disposed")
    }

    /// Disposes a scope, freeing its slot for reuse.
    ///
    /// Disposing an already-disposed scope is a no-op. Lookups through a
    /// chain that still names the disposed id simply skip it.
    pub fn dispose(&mut self, id: ScopeId) {
        if self.slots[id.index()].take().is_some() {
            self.reuse_ids.push(id);
        }
    }

    /// Looks up `name` along `chain`, innermost to outermost.
    ///
    /// Disposed scopes in the chain are skipped rather than treated as an
    /// error; the chain describes where to look, not what must still exist.
    pub fn lookup(&self, chain: &ScopeChain, name: &str) -> Option<&Binding> {
        chain
            .iter()
            .filter_map(|id| self.get(id))
            .find_map(|scope| scope.get(name))
    }

    /// Removes every scope and frees all slots.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.reuse_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Atom;

    fn module(scopes: &mut Scopes, name: &str) -> ScopeId {
        scopes.new_scope(ScopeOrigin::Module { name: name.to_owned() })
    }

    /// Inner bindings shadow outer ones along a chain.
    #[test]
    fn chain_lookup_prefers_innermost() {
        let mut scopes = Scopes::default();
        let outer = module(&mut scopes, "outer");
        let inner = scopes.new_scope(ScopeOrigin::Local {
            function: "f".to_owned(),
        });
        scopes.get_mut(outer).bind("t", Binding::Type(Atom::Int.into()));
        scopes.get_mut(inner).bind("t", Binding::Type(Atom::Str.into()));

        let chain = ScopeChain::from([inner, outer]);
        assert_eq!(
            scopes.lookup(&chain, "t"),
            Some(&Binding::Type(Atom::Str.into())),
            "innermost binding should win"
        );
    }

    /// Disposed scopes are skipped by lookup instead of failing.
    #[test]
    fn lookup_skips_disposed_scopes() {
        let mut scopes = Scopes::default();
        let outer = module(&mut scopes, "outer");
        let inner = scopes.new_scope(ScopeOrigin::Local {
            function: "f".to_owned(),
        });
        scopes.get_mut(outer).bind("t", Binding::Type(Atom::Int.into()));
        scopes.get_mut(inner).bind("t", Binding::Type(Atom::Str.into()));
        scopes.dispose(inner);

        let chain = ScopeChain::from([inner, outer]);
        assert_eq!(scopes.lookup(&chain, "t"), Some(&Binding::Type(Atom::Int.into())));
    }

    /// Disposal frees the slot for the next scope.
    #[test]
    fn disposed_slots_are_reused() {
        let mut scopes = Scopes::default();
        let first = module(&mut scopes, "a");
        scopes.dispose(first);
        let second = module(&mut scopes, "b");
        assert_eq!(first.index(), second.index(), "slot should be reused");
    }
}
