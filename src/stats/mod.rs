//! Per-field statistics over a stream of samples
//!
//! The accumulator builds one `StructStats` per nesting level; the resolver
//! reads it once, and the reporter turns individual `FieldStat`s into
//! annotation text.

pub mod accumulator;
pub mod formats;
pub mod report;

pub use accumulator::{ElementType, FieldStat, ObservedType, StructStats, CARDINALITY_LIMIT};
pub use formats::{detect_format, StringFormat};
pub use report::{annotate, percentile};
