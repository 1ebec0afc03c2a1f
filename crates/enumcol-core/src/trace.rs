//! Field resolution tracing boundary.
//!
//! Tracing is optional, injected by the caller, and must not affect
//! resolution or coercion semantics.

use crate::primitive::Primitive;

///
/// FieldTraceSink
///

pub trait FieldTraceSink: Send + Sync {
    fn on_event(&self, event: FieldTraceEvent);
}

///
/// FieldTraceEvent
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldTraceEvent {
    /// The factory fixed a storage primitive for a field.
    Resolved {
        field: String,
        enum_path: String,
        primitive: Primitive,
    },
    /// A CHECK constraint was emitted for a field.
    ConstraintEmitted { field: String, name: String },
}
