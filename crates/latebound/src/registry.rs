//! Named references and the capture registry.
//!
//! The registry is the explicit replacement for the source technique of
//! patching a constructor and stashing call-site frames in a process-global
//! dict keyed by object id: every deferred reference is created through the
//! session factory, which records the environment visible at the creation
//! point here, exactly once, before the reference escapes to the caller.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    scope::{Binding, Bindings, ScopeChain, ScopeId, ScopeOrigin, Scopes},
    types::TypeExpr,
};

/// Identity of a named reference.
///
/// Two references with the same name created at different sites get distinct
/// ids; identity, not the name, keys the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RefId(u32);

impl RefId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index.try_into().expect("Invalid reference id"))
    }

    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The record behind a deferred reference: its name and, once resolution has
/// succeeded, the memoized concrete type.
///
/// Failed resolutions leave `resolved` empty so a later retry can succeed
/// after the missing name appears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct NamedRef {
    name: String,
    resolved: Option<TypeExpr>,
}

/// One scope of a captured environment.
///
/// Module scopes are durable, so the capture keeps only their id. Local
/// scopes are ordinarily gone by the time resolution runs, so the capture
/// snapshots their bindings instead, the analogue of keeping the defining
/// frame alive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum CapturedScope {
    Module(ScopeId),
    Snapshot {
        /// Label of the local scope the snapshot came from.
        label: String,
        bindings: Bindings,
    },
}

/// A captured defining environment: the chain from the definition site
/// outward, innermost first, with machinery scopes already filtered out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct CapturedEnv(SmallVec<[CapturedScope; 4]>);

impl CapturedEnv {
    /// Looks up `name` innermost to outermost, exactly as captured.
    ///
    /// A captured module scope that has since been disposed contributes
    /// nothing; the lookup moves on to the next captured scope.
    pub fn lookup<'a>(&'a self, name: &str, scopes: &'a Scopes) -> Option<&'a Binding> {
        self.0.iter().find_map(|captured| match captured {
            CapturedScope::Module(id) => scopes.get(*id).and_then(|scope| scope.get(name)),
            CapturedScope::Snapshot { bindings, .. } => bindings.get(name),
        })
    }

    /// Returns the captured scopes, innermost first.
    pub fn scopes(&self) -> &[CapturedScope] {
        &self.0
    }
}

/// Process-wide (per session) store mapping each reference's identity to its
/// record and captured defining environment.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct CaptureRegistry {
    refs: Vec<Option<NamedRef>>,
    reuse_ids: Vec<RefId>,
    captures: AHashMap<RefId, CapturedEnv>,
}

impl CaptureRegistry {
    /// Allocates a fresh reference record with no capture and no memo.
    pub fn new_ref(&mut self, name: &str) -> RefId {
        let record = NamedRef {
            name: name.to_owned(),
            resolved: None,
        };
        if let Some(reuse_id) = self.reuse_ids.pop() {
            self.refs[reuse_id.index()] = Some(record);
            reuse_id
        } else {
            let id = RefId::new(self.refs.len());
            self.refs.push(Some(record));
            id
        }
    }

    /// Captures the defining environment for `id` from `chain`.
    ///
    /// Walks the chain innermost-first, skipping machinery scopes; the first
    /// non-internal scope is the definition site, and it plus every
    /// following non-internal scope is recorded: module scopes by id,
    /// local scopes by snapshot.
    ///
    /// Runs at most once per reference: an existing entry is never
    /// overwritten. A chain with no qualifying scope records nothing, which
    /// surfaces later as an explicit resolution failure rather than a crash
    /// here.
    pub fn capture(&mut self, id: RefId, chain: &ScopeChain, scopes: &Scopes) {
        if self.captures.contains_key(&id) {
            return;
        }
        let mut captured = SmallVec::new();
        for scope_id in chain.iter() {
            let Some(scope) = scopes.get(scope_id) else { continue };
            match scope.origin() {
                ScopeOrigin::Internal => continue,
                ScopeOrigin::Module { .. } => captured.push(CapturedScope::Module(scope_id)),
                ScopeOrigin::Local { function } => captured.push(CapturedScope::Snapshot {
                    label: function.clone(),
                    bindings: scope.bindings().clone(),
                }),
            }
        }
        if !captured.is_empty() {
            self.captures.insert(id, CapturedEnv(captured));
        }
    }

    /// Returns the captured environment for `id`, if capture found one.
    pub fn captured(&self, id: RefId) -> Option<&CapturedEnv> {
        self.captures.get(&id)
    }

    /// Returns the name the reference stands for.
    ///
    /// # Panics
    /// Panics if the reference has been released.
    pub fn name(&self, id: RefId) -> &str {
        &self.record(id).name
    }

    /// Returns the memoized resolution, if one has been recorded.
    pub fn resolved(&self, id: RefId) -> Option<&TypeExpr> {
        self.record(id).resolved.as_ref()
    }

    /// Records a successful resolution. Later calls return this unchanged.
    pub fn memoize(&mut self, id: RefId, expr: TypeExpr) {
        let record = self.refs[id.index()].as_mut().expect("reference was released");
        record.resolved = Some(expr);
    }

    /// Removes the reference record and its capture entry, freeing the slot.
    ///
    /// Releasing an already-released reference is a no-op.
    pub fn release(&mut self, id: RefId) {
        self.captures.remove(&id);
        if self.refs[id.index()].take().is_some() {
            self.reuse_ids.push(id);
        }
    }

    /// Returns true if the reference has not been released.
    pub fn is_live(&self, id: RefId) -> bool {
        self.refs.get(id.index()).is_some_and(Option::is_some)
    }

    /// Removes every reference and capture entry.
    pub fn clear(&mut self) {
        self.refs.clear();
        self.reuse_ids.clear();
        self.captures.clear();
    }

    fn record(&self, id: RefId) -> &NamedRef {
        self.refs[id.index()].as_ref().expect("reference was released")
    }
}
