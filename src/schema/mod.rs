//! Typed schema trees
//!
//! Statistics resolve into a `ResolvedType` tree through the resolver, or
//! per-sample types fold into one through `merge`. Extraction then factors
//! shared records out of the finished tree.

pub mod extract;
pub mod merge;
pub mod resolver;

pub use extract::extract_structs;
pub use merge::{derive_type, merge_types, order_fields};
pub use resolver::{resolve_stats, Resolver};
