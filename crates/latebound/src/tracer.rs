//! Resolution tracing infrastructure.
//!
//! Provides a trait-based tracing system for capture and resolution with
//! zero-cost abstraction: with [`NoopTracer`] every hook compiles away via
//! monomorphization.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op (production default) |
//! | [`CountingTracer`] | Lookup/memo-hit/capture counters |
//! | [`RecordingTracer`] | Full event recording for post-mortem inspection |

/// Trace event emitted during capture and resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A defining environment was captured for a new reference.
    Capture {
        name: String,
    },
    /// An environment lookup was performed for a reference's name.
    Lookup {
        name: String,
    },
    /// A resolution returned its memoized result without any lookup.
    MemoHit {
        name: String,
    },
}

/// Trait for capture/resolution tracing.
///
/// All methods have default no-op implementations, so [`NoopTracer`]
/// requires zero lines of code and compiles to zero instructions.
/// Implementations only override the hooks they care about.
pub trait Tracer {
    /// Called when a defining environment is captured for a new reference.
    fn on_capture(&mut self, name: &str) {
        let _ = name;
    }

    /// Called when resolution performs an actual environment lookup.
    fn on_lookup(&mut self, name: &str) {
        let _ = name;
    }

    /// Called when resolution returns a memoized result without lookup.
    fn on_memo_hit(&mut self, name: &str) {
        let _ = name;
    }
}

/// Zero-cost no-op tracer, the production default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Counts lookups, memo hits, and captures.
///
/// The lookup counter is what makes resolution idempotence observable:
/// resolving an already-resolved reference must not move it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountingTracer {
    pub captures: usize,
    pub lookups: usize,
    pub memo_hits: usize,
}

impl Tracer for CountingTracer {
    fn on_capture(&mut self, _name: &str) {
        self.captures += 1;
    }

    fn on_lookup(&mut self, _name: &str) {
        self.lookups += 1;
    }

    fn on_memo_hit(&mut self, _name: &str) {
        self.memo_hits += 1;
    }
}

/// Records every trace event in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events in emission order.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }
}

impl Tracer for RecordingTracer {
    fn on_capture(&mut self, name: &str) {
        self.events.push(TraceEvent::Capture { name: name.to_owned() });
    }

    fn on_lookup(&mut self, name: &str) {
        self.events.push(TraceEvent::Lookup { name: name.to_owned() });
    }

    fn on_memo_hit(&mut self, name: &str) {
        self.events.push(TraceEvent::MemoHit { name: name.to_owned() });
    }
}
