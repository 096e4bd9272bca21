//! # Smelter - struct definitions from sample JSON
//!
//! Reads sample JSON objects, gathers per-field statistics and resolves them
//! into a typed record tree that renders as Go struct declarations.
//!
//! ## Modules
//!
//! - **naming**: JSON keys to exported identifiers
//! - **stats**: per-field statistics and their display annotations
//! - **schema**: type resolution, pairwise merging and struct extraction
//! - **input**: document and line-delimited sample sources
//! - **pipeline**: the run driver with progress and cancellation
//! - **render**: Go source and JSON tree output
//!
//! ## Quick Start
//!
//! ```rust
//! use smelter::{generate, GeneratorConfig, InputMode};
//!
//! # fn main() -> smelter::Result<()> {
//! let input = "{\"a\": 1, \"b\": null}\n{\"a\": 2.5, \"b\": \"x\"}\n";
//! let config = GeneratorConfig::default().with_omit_empty(false);
//!
//! let source = generate(input.as_bytes(), InputMode::Lines, &config)?;
//! assert!(source.contains("B *string `json:\"b\"`"));
//! # Ok(())
//! # }
//! ```
//!
//! ### In-memory samples
//!
//! ```rust
//! use smelter::{infer_schema, GeneratorConfig, Kind};
//! use serde_json::json;
//!
//! let samples = vec![
//!     json!({"name": "Alice", "age": 30}),
//!     json!({"name": "Bob", "age": null}),
//! ];
//!
//! let schema = infer_schema(&samples, &GeneratorConfig::default()).unwrap();
//! let age = schema.root.child("Age").unwrap();
//! assert_eq!(age.kind, Kind::Numeric);
//! assert!(age.nullable);
//! ```

use serde_json::Value;
use std::io::BufRead;

pub mod error;
pub mod input;
pub mod naming;
pub mod pipeline;
pub mod render;
pub mod schema;
pub mod stats;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use input::{InputMode, Sample, SampleSource};
pub use naming::{normalize_key, FieldNamer};
pub use pipeline::{NoProgress, Pipeline, ProgressReporter, UpdatePolicy};
pub use render::{render, render_go, render_json, OutputFormat};
pub use schema::{derive_type, extract_structs, merge_types, resolve_stats};
pub use stats::{FieldStat, StructStats};
pub use types::{FieldOrder, GeneratorConfig, Kind, ResolvedType, Schema, Strategy};

/// Main entry point: read samples and render Go source
pub fn generate<R: BufRead>(reader: R, mode: InputMode, config: &GeneratorConfig) -> Result<String> {
    let source = SampleSource::open(reader, mode)?;
    let schema = Pipeline::new(config).run_source(source, &mut NoProgress, None)?;
    render_go(&schema, config)
}

/// Infer a schema from already decoded values; non-objects are skipped
pub fn infer_schema(samples: &[Value], config: &GeneratorConfig) -> Result<Schema> {
    let objects: Vec<Result<Sample>> = samples
        .iter()
        .filter_map(|value| value.as_object().cloned().map(Ok))
        .collect();
    let skipped = samples.len() - objects.len();

    match Pipeline::new(config).run(objects, Some(samples.len() - skipped), &mut NoProgress, None) {
        Err(Error::NoSamples { .. }) => Err(Error::NoSamples { skipped }),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_generation() {
        let config = GeneratorConfig::default().with_type_name("Event");
        let text = generate(r#"{"user_id": 7, "tags": ["a"]}"#.as_bytes(), InputMode::Auto, &config).unwrap();

        assert!(text.starts_with("package main\n"));
        assert!(text.contains("type Event struct {"));
        assert!(text.contains("\tUserID float64"));
        assert!(text.contains("`json:\"user_id,omitempty\"`"));
        assert!(text.contains("Tags   []string"));
    }

    #[test]
    fn test_infer_schema_skips_non_objects() {
        let schema = infer_schema(&[json!(1), json!({"a": true})], &GeneratorConfig::default()).unwrap();
        assert_eq!(schema.root.children.len(), 1);

        let err = infer_schema(&[json!(1)], &GeneratorConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NoSamples { skipped: 1 }));
    }
}
