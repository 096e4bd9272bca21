use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::stats::FieldStat;

/// Kind of an emitted schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Only nulls were seen so far (merge path placeholder)
    Null,
    Bool,
    Numeric,
    String,
    Record,
    /// Array nested inside a repeated field, element type unknown
    Array,
    /// No single concrete type could be determined
    Dynamic,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Numeric => "numeric",
            Kind::String => "string",
            Kind::Record => "record",
            Kind::Array => "array",
            Kind::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field statistics attached to a resolved node for annotation
#[derive(Debug, Clone)]
pub struct StatRef {
    pub field: Arc<FieldStat>,
    /// Number of samples observed at the field's nesting level
    pub level_samples: usize,
}

/// One node of the inferred schema tree
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedType {
    /// Normalized identifier
    pub name: String,
    pub kind: Kind,
    pub repeated: bool,
    pub nullable: bool,
    /// Fields of a record, empty for every other kind
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResolvedType>,
    /// Original JSON key, present only when it differs from `name`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialization_key: Option<String>,
    /// Name of the shared definition this record was factored into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_ref: Option<String>,
    #[serde(skip)]
    pub stat: Option<StatRef>,
}

impl ResolvedType {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        ResolvedType {
            name: name.into(),
            kind,
            repeated: false,
            nullable: false,
            children: Vec::new(),
            serialization_key: None,
            shared_ref: None,
            stat: None,
        }
    }

    pub fn record(name: impl Into<String>, children: Vec<ResolvedType>) -> Self {
        let mut node = ResolvedType::new(name, Kind::Record);
        node.children = children;
        node
    }

    pub fn with_repeated(mut self, repeated: bool) -> Self {
        self.repeated = repeated;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_serialization_key(mut self, key: Option<String>) -> Self {
        self.serialization_key = key;
        self
    }

    pub fn is_record(&self) -> bool {
        self.kind == Kind::Record
    }

    /// Key the renderer should write into the decoding tag
    pub fn json_key(&self) -> &str {
        self.serialization_key.as_deref().unwrap_or(&self.name)
    }

    pub fn child(&self, name: &str) -> Option<&ResolvedType> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Result of one run: the root record plus shared definitions it references
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    pub root: ResolvedType,
    /// Emitted before the root; dependencies precede their users
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub definitions: Vec<ResolvedType>,
}

impl Schema {
    pub fn new(root: ResolvedType) -> Self {
        Schema {
            root,
            definitions: Vec::new(),
        }
    }

    pub fn definition(&self, name: &str) -> Option<&ResolvedType> {
        self.definitions.iter().find(|d| d.name == name)
    }
}

/// Order in which the fields of a record are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldOrder {
    /// By serialization key
    #[default]
    Alphabetical,
    /// By first appearance in the input
    Encounter,
    /// Most frequent first
    CommonFirst,
    /// Least frequent first
    RareFirst,
}

impl FromStr for FieldOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alphabetical" => Ok(FieldOrder::Alphabetical),
            "encounter" => Ok(FieldOrder::Encounter),
            "common-first" => Ok(FieldOrder::CommonFirst),
            "rare-first" => Ok(FieldOrder::RareFirst),
            other => Err(format!(
                "unknown field order '{}' (expected alphabetical, encounter, common-first or rare-first)",
                other
            )),
        }
    }
}

/// How samples are combined into one type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Accumulate statistics, resolve once
    #[default]
    Accumulate,
    /// Derive a type per sample and fold pairwise
    Merge,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accumulate" => Ok(Strategy::Accumulate),
            "merge" => Ok(Strategy::Merge),
            other => Err(format!("unknown strategy '{}' (expected accumulate or merge)", other)),
        }
    }
}

/// Configuration owned by a single run
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Name of the root type, also the prefix of shared definitions
    pub type_name: String,

    /// Package clause of the rendered source
    pub package_name: String,

    pub field_order: FieldOrder,

    /// Factor repeated and nullable records into shared definitions
    pub extract_structs: bool,

    /// Attach field statistics as trailing comments
    pub stat_comments: bool,

    /// Add `omitempty` to every decoding tag
    pub omit_empty: bool,

    pub strategy: Strategy,

    /// Minimum time between progressive updates
    pub update_interval: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            type_name: String::from("Foo"),
            package_name: String::from("main"),
            field_order: FieldOrder::Alphabetical,
            extract_structs: false,
            stat_comments: false,
            omit_empty: true,
            strategy: Strategy::Accumulate,
            update_interval: Duration::from_millis(500),
        }
    }
}

impl GeneratorConfig {
    #[must_use]
    pub fn with_type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = name.into();
        self
    }

    #[must_use]
    pub fn with_package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = name.into();
        self
    }

    #[must_use]
    pub fn with_field_order(mut self, order: FieldOrder) -> Self {
        self.field_order = order;
        self
    }

    #[must_use]
    pub fn with_extract_structs(mut self, enabled: bool) -> Self {
        self.extract_structs = enabled;
        self
    }

    #[must_use]
    pub fn with_stat_comments(mut self, enabled: bool) -> Self {
        self.stat_comments = enabled;
        self
    }

    #[must_use]
    pub fn with_omit_empty(mut self, enabled: bool) -> Self {
        self.omit_empty = enabled;
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_parsing() {
        assert_eq!("encounter".parse::<FieldOrder>().unwrap(), FieldOrder::Encounter);
        assert_eq!("rare-first".parse::<FieldOrder>().unwrap(), FieldOrder::RareFirst);
        assert!("random".parse::<FieldOrder>().is_err());
    }

    #[test]
    fn test_json_key_falls_back_to_name() {
        let plain = ResolvedType::new("Name", Kind::String);
        assert_eq!(plain.json_key(), "Name");

        let renamed = ResolvedType::new("UserID", Kind::Numeric)
            .with_serialization_key(Some("user_id".to_string()));
        assert_eq!(renamed.json_key(), "user_id");
    }

    #[test]
    fn test_config_is_per_run() {
        let a = GeneratorConfig::default().with_type_name("Event");
        let b = GeneratorConfig::default();
        assert_eq!(a.type_name, "Event");
        assert_eq!(b.type_name, "Foo");
    }
}
