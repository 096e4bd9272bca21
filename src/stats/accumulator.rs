//! Streaming accumulator of per-field statistics
//!
//! Samples are folded into a `StructStats` one at a time. Nested objects are
//! kept verbatim and only reduced when the resolver recurses into them, so a
//! nested record is unioned across every sample rather than derived from one.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::formats::{detect_format, StringFormat};
use crate::naming::FieldNamer;

/// Maximum number of distinct scalar values tracked per field
pub const CARDINALITY_LIMIT: usize = 100;

/// Kind of the first element of an observed array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    Null,
    Bool,
    Number,
    String,
    Record,
    Array,
    /// The array was empty
    Empty,
}

impl ElementType {
    fn of(value: Option<&Value>) -> Self {
        match value {
            None => ElementType::Empty,
            Some(Value::Null) => ElementType::Null,
            Some(Value::Bool(_)) => ElementType::Bool,
            Some(Value::Number(_)) => ElementType::Number,
            Some(Value::String(_)) => ElementType::String,
            Some(Value::Object(_)) => ElementType::Record,
            Some(Value::Array(_)) => ElementType::Array,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ElementType::Null => "null",
            ElementType::Bool => "bool",
            ElementType::Number => "number",
            ElementType::String => "string",
            ElementType::Record => "object",
            ElementType::Array => "array",
            ElementType::Empty => "any",
        }
    }
}

/// Type of one observation of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObservedType {
    Null,
    Bool,
    Number,
    String,
    Record,
    Array(ElementType),
}

impl ObservedType {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => ObservedType::Null,
            Value::Bool(_) => ObservedType::Bool,
            Value::Number(_) => ObservedType::Number,
            Value::String(_) => ObservedType::String,
            Value::Object(_) => ObservedType::Record,
            Value::Array(items) => ObservedType::Array(ElementType::of(items.first())),
        }
    }
}

impl fmt::Display for ObservedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservedType::Null => f.write_str("null"),
            ObservedType::Bool => f.write_str("bool"),
            ObservedType::Number => f.write_str("number"),
            ObservedType::String => f.write_str("string"),
            ObservedType::Record => f.write_str("object"),
            ObservedType::Array(element) => write!(f, "[]{}", element.label()),
        }
    }
}

/// Statistics for one normalized field at one nesting level
#[derive(Debug, Clone)]
pub struct FieldStat {
    /// Key as it first appeared in the input
    pub key: String,
    pub type_counts: BTreeMap<ObservedType, usize>,
    pub total_count: usize,
    /// Every object this field held, bare or as first array element
    pub nested: Vec<Map<String, Value>>,
    pub numeric_values: Vec<f64>,
    /// Occurrences of each probed scalar value
    pub values: HashMap<String, usize>,
    /// Probed values in first-seen order
    pub value_order: Vec<String>,
    pub string_formats: BTreeMap<StringFormat, usize>,
    /// Position of the field in the level's encounter sequence
    pub first_seen: usize,
}

impl FieldStat {
    pub fn new(key: impl Into<String>, first_seen: usize) -> Self {
        FieldStat {
            key: key.into(),
            type_counts: BTreeMap::new(),
            total_count: 0,
            nested: Vec::new(),
            numeric_values: Vec::new(),
            values: HashMap::new(),
            value_order: Vec::new(),
            string_formats: BTreeMap::new(),
            first_seen,
        }
    }

    /// Record one value held by this field
    pub fn observe(&mut self, value: &Value) {
        self.total_count += 1;
        *self.type_counts.entry(ObservedType::of(value)).or_insert(0) += 1;

        match value {
            Value::Null => {}
            Value::Object(obj) => self.nested.push(obj.clone()),
            // Only the first element is inspected
            Value::Array(items) => {
                if let Some(Value::Object(obj)) = items.first() {
                    self.nested.push(obj.clone());
                }
            }
            Value::Bool(b) => self.probe(if *b { "true" } else { "false" }),
            Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    self.numeric_values.push(f);
                    self.probe(&f.to_string());
                }
            }
            Value::String(s) => {
                if let Some(format) = detect_format(s) {
                    *self.string_formats.entry(format).or_insert(0) += 1;
                }
                self.probe(s);
            }
        }
    }

    fn probe(&mut self, repr: &str) {
        if let Some(count) = self.values.get_mut(repr) {
            *count += 1;
            return;
        }
        if self.values.len() < CARDINALITY_LIMIT {
            self.values.insert(repr.to_string(), 1);
            self.value_order.push(repr.to_string());
        }
    }

    pub fn count(&self, observed: ObservedType) -> usize {
        self.type_counts.get(&observed).copied().unwrap_or(0)
    }

    pub fn null_count(&self) -> usize {
        self.count(ObservedType::Null)
    }

    pub fn non_null_count(&self) -> usize {
        self.total_count - self.null_count()
    }

    /// Observations that were arrays of any element type
    pub fn array_count(&self) -> usize {
        self.type_counts
            .iter()
            .filter(|(t, _)| matches!(t, ObservedType::Array(_)))
            .map(|(_, c)| c)
            .sum()
    }

    /// Element-type counts across all array observations
    pub fn element_counts(&self) -> BTreeMap<ElementType, usize> {
        let mut counts = BTreeMap::new();
        for (observed, count) in &self.type_counts {
            if let ObservedType::Array(element) = observed {
                *counts.entry(*element).or_insert(0) += count;
            }
        }
        counts
    }

    pub fn distinct_values(&self) -> usize {
        self.values.len()
    }

    /// True once the probe stopped admitting new values
    pub fn probe_saturated(&self) -> bool {
        self.values.len() >= CARDINALITY_LIMIT
    }

    /// Copy without the captured nested objects, for attaching to output
    pub fn detached(&self) -> FieldStat {
        FieldStat {
            key: self.key.clone(),
            type_counts: self.type_counts.clone(),
            total_count: self.total_count,
            nested: Vec::new(),
            numeric_values: self.numeric_values.clone(),
            values: self.values.clone(),
            value_order: self.value_order.clone(),
            string_formats: self.string_formats.clone(),
            first_seen: self.first_seen,
        }
    }
}

/// Statistics for one nesting level
#[derive(Debug, Clone, Default)]
pub struct StructStats {
    fields: HashMap<String, FieldStat>,
    total_samples: usize,
    next_seq: usize,
}

impl StructStats {
    pub fn new() -> Self {
        StructStats {
            fields: HashMap::new(),
            total_samples: 0,
            next_seq: 0,
        }
    }

    /// Build a level from captured nested objects
    pub fn from_objects(namer: &mut FieldNamer, objects: &[Map<String, Value>]) -> Self {
        let mut stats = StructStats::new();
        for obj in objects {
            stats.observe_sample(namer, obj);
        }
        stats
    }

    /// Fold one whole object into the level
    pub fn observe_sample(&mut self, namer: &mut FieldNamer, sample: &Map<String, Value>) {
        self.total_samples += 1;
        for (key, value) in sample {
            self.observe(namer, key, value);
        }
    }

    /// Record one key/value pair of the current sample
    pub fn observe(&mut self, namer: &mut FieldNamer, key: &str, value: &Value) {
        let name = namer.normalize(key);
        let next_seq = &mut self.next_seq;
        let stat = self.fields.entry(name).or_insert_with(|| {
            let stat = FieldStat::new(key, *next_seq);
            *next_seq += 1;
            stat
        });
        stat.observe(value);
    }

    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    pub fn field(&self, name: &str) -> Option<&FieldStat> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldStat)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
