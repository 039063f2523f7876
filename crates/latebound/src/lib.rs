#![doc = include_str!("../../../README.md")]

mod check;
mod error;
mod registry;
mod resolve;
mod scope;
mod session;
mod tracer;
mod types;
mod value;

pub use crate::{
    check::{CheckLimits, DEFAULT_MAX_CHECK_DEPTH},
    error::{CheckError, CheckResult, PathStep, ResolveError, ResolveResult, Searched, ValuePath},
    registry::RefId,
    scope::{Binding, ScopeChain, ScopeId, ScopeOrigin},
    session::Session,
    tracer::{CountingTracer, NoopTracer, RecordingTracer, TraceEvent, Tracer},
    types::{Atom, TypeExpr},
    value::{Kind, Value},
};
