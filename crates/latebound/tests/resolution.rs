//! Tests for the resolution operation: memoization, failure taxonomy, and
//! the recursive-type policy.

use latebound::{
    Atom, CountingTracer, Kind, ResolveError, ScopeChain, Searched, Session, TypeExpr, Value,
};
use pretty_assertions::assert_eq;

// =============================================================================
// 1. Idempotence
// =============================================================================

/// Resolving twice returns identical results, and the second resolution is
/// a memo hit that performs no environment lookup.
#[test]
fn resolution_is_idempotent() {
    let mut session = Session::with_tracer(CountingTracer::default());
    let module = session.module_scope("m");
    session.bind_type(module, "T", Atom::Int.into());
    let r = session.deferred("T", &ScopeChain::from([module]));

    let first = session.resolve(&r, None).unwrap();
    assert_eq!(session.tracer().lookups, 1);
    assert_eq!(session.tracer().memo_hits, 0);

    let second = session.resolve(&r, None).unwrap();
    assert_eq!(first, second, "memoized result must be returned unchanged");
    assert_eq!(session.tracer().lookups, 1, "no second lookup may happen");
    assert_eq!(session.tracer().memo_hits, 1);
}

/// Memoization is keyed by identity: resolving one reference does not
/// pre-resolve another reference to the same name.
#[test]
fn memoization_is_per_reference() {
    let mut session = Session::with_tracer(CountingTracer::default());
    let module = session.module_scope("m");
    session.bind_type(module, "T", Atom::Int.into());
    let chain = ScopeChain::from([module]);
    let first = session.deferred("T", &chain);
    let second = session.deferred("T", &chain);

    session.resolve(&first, None).unwrap();
    session.resolve(&second, None).unwrap();
    assert_eq!(session.tracer().lookups, 2, "each identity resolves once");
}

// =============================================================================
// 2. Failure Taxonomy
// =============================================================================

/// A name bound nowhere fails with `UnresolvedName`, stating that the
/// captured environment was the one searched.
#[test]
fn unresolved_name_reports_captured_chain() {
    let mut session = Session::new();
    let module = session.module_scope("m");
    let r = session.deferred("Missing", &ScopeChain::from([module]));

    let err = session.resolve(&r, None).unwrap_err();
    assert_eq!(
        err,
        ResolveError::UnresolvedName {
            name: "Missing".to_owned(),
            searched: Searched::Captured,
        }
    );
    assert_eq!(err.kind_name(), "UnresolvedName");
}

/// With no capture and a fallback that also lacks the name, the error says
/// the fallback chain was searched.
#[test]
fn unresolved_name_reports_fallback_chain() {
    let mut session = Session::new();
    let r = session.deferred("Missing", &ScopeChain::new());
    let caller = session.module_scope("caller");
    let fallback = ScopeChain::from([caller]);

    let err = session.resolve(&r, Some(&fallback)).unwrap_err();
    assert_eq!(
        err,
        ResolveError::UnresolvedName {
            name: "Missing".to_owned(),
            searched: Searched::Fallback,
        }
    );
}

/// A name bound to a plain value is rejected with the value's kind.
#[test]
fn non_type_binding_is_rejected() {
    let mut session = Session::new();
    let module = session.module_scope("m");
    session.bind_value(module, "n", Value::Int(7));
    let r = session.deferred("n", &ScopeChain::from([module]));

    let err = session.resolve(&r, None).unwrap_err();
    assert_eq!(
        err,
        ResolveError::NotAType {
            name: "n".to_owned(),
            kind: Kind::Int,
        }
    );
    assert_eq!(err.to_string(), "'n' resolved to a non-type value of kind int");
}

// =============================================================================
// 3. Retry After Failure
// =============================================================================

/// Failed resolutions are not cached: once the missing name is bound, the
/// same reference resolves successfully.
#[test]
fn failed_resolution_is_retry_eligible() {
    let mut session = Session::with_tracer(CountingTracer::default());
    let module = session.module_scope("m");
    let r = session.deferred("Later", &ScopeChain::from([module]));

    let err = session.resolve(&r, None).unwrap_err();
    assert!(matches!(err, ResolveError::UnresolvedName { .. }));

    session.bind_type(module, "Later", Atom::Int.into());
    let resolved = session.resolve(&r, None).unwrap();
    assert_eq!(session.type_repr(&resolved), "int");
    assert_eq!(session.tracer().lookups, 2, "the retry performs a fresh lookup");
}

// =============================================================================
// 4. Alias Chains and Cycles
// =============================================================================

/// A name bound to another deferred reference resolves through it.
#[test]
fn alias_chain_resolves_through_intermediate_names() {
    let mut session = Session::new();
    let module = session.module_scope("m");
    let chain = ScopeChain::from([module]);
    let a = session.deferred("A", &chain);
    let b = session.deferred("B", &chain);
    session.bind_type(module, "A", b);
    session.bind_type(module, "B", Atom::Str.into());

    let resolved = session.resolve(&a, None).unwrap();
    assert_eq!(session.type_repr(&resolved), "str");
}

/// A pure alias cycle can never produce a type and fails.
#[test]
fn alias_cycle_fails_with_circular_resolution() {
    let mut session = Session::new();
    let module = session.module_scope("m");
    let chain = ScopeChain::from([module]);
    let x = session.deferred("X", &chain);
    let y = session.deferred("Y", &chain);
    session.bind_type(module, "X", y);
    session.bind_type(module, "Y", x.clone());

    let err = session.resolve(&x, None).unwrap_err();
    assert_eq!(err.kind_name(), "CircularResolution");
    assert_eq!(err.to_string(), "circular resolution of 'X'");
}

/// The degenerate `X = X` alias fails rather than looping.
#[test]
fn direct_self_alias_fails() {
    let mut session = Session::new();
    let module = session.module_scope("m");
    let chain = ScopeChain::from([module]);
    let x = session.deferred("X", &chain);
    session.bind_type(module, "X", x.clone());

    let err = session.resolve(&x, None).unwrap_err();
    assert_eq!(
        err,
        ResolveError::CircularResolution {
            name: "X".to_owned()
        }
    );
}

// =============================================================================
// 5. Recursive Composites
// =============================================================================

/// A self-referential composite resolves, leaving the in-flight member
/// deferred rather than expanding forever.
#[test]
fn recursive_composite_resolves_with_deferred_member() {
    let mut session = Session::new();
    let module = session.module_scope("m");
    let chain = ScopeChain::from([module]);
    let v = TypeExpr::union([Atom::Int.into(), TypeExpr::list_of(session.deferred("V", &chain))]);
    session.bind_type(module, "V", v.clone());

    let inner = match &v {
        TypeExpr::Union(members) => members[1].clone(),
        _ => unreachable!(),
    };
    let resolved = session.resolve(&inner, None).unwrap();
    assert_eq!(session.type_repr(&resolved), "int | list['V']");
}

/// Nested references that are not part of the in-flight composite are
/// resolved and substituted eagerly.
#[test]
fn independent_nested_references_are_substituted() {
    let mut session = Session::new();
    let module = session.module_scope("m");
    let chain = ScopeChain::from([module]);
    let v = TypeExpr::union([Atom::Int.into(), TypeExpr::list_of(session.deferred("W", &chain))]);
    session.bind_type(module, "V", v);
    session.bind_type(module, "W", Atom::Str.into());

    let v_ref = session.deferred("V", &chain);
    let resolved = session.resolve(&v_ref, None).unwrap();
    assert_eq!(session.type_repr(&resolved), "int | list[str]");
}

/// A failing nested reference fails the whole resolution.
#[test]
fn nested_resolution_failures_propagate() {
    let mut session = Session::new();
    let module = session.module_scope("m");
    let chain = ScopeChain::from([module]);
    let v = TypeExpr::union([Atom::Int.into(), TypeExpr::list_of(session.deferred("Gone", &chain))]);
    session.bind_type(module, "V", v);

    let v_ref = session.deferred("V", &chain);
    let err = session.resolve(&v_ref, None).unwrap_err();
    assert_eq!(
        err,
        ResolveError::UnresolvedName {
            name: "Gone".to_owned(),
            searched: Searched::Captured,
        }
    );
}
