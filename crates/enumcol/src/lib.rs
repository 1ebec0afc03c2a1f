//! Enumcol — enumerated types as first-class database column types.
//!
//! This is the public meta-crate. Downstream users depend on **enumcol**
//! only. It re-exports the stable public API from `enumcol-core`: the
//! enumeration model, field factory, coercion engine, and constraint
//! builder.

pub use enumcol_core as core;

pub use enumcol_core::{
    coerce, constraint, error, field, flags, model, primitive, trace, types, value, width,
};

//
// Prelude
//

pub mod prelude {
    pub use enumcol_core::prelude::*;
}
