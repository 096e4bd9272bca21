//! Resolution of accumulated statistics into a typed tree
//!
//! Each field gets one dominant kind: the non-null observation type with the
//! highest count. Nulls alongside a concrete kind make the field nullable;
//! a field seen only as arrays becomes repeated and the same rule picks its
//! element kind. Record fields recurse through a fresh `StructStats` built
//! from every captured nested object.

use std::sync::Arc;
use tracing::debug;

use crate::naming::FieldNamer;
use crate::stats::{ElementType, FieldStat, ObservedType, StructStats};
use crate::types::{FieldOrder, GeneratorConfig, Kind, ResolvedType, StatRef};

/// Resolves `StructStats` into a record tree
pub struct Resolver<'a> {
    config: &'a GeneratorConfig,
    namer: &'a mut FieldNamer,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a GeneratorConfig, namer: &'a mut FieldNamer) -> Self {
        Resolver { config, namer }
    }

    /// Resolve the top level into the root record
    pub fn resolve(&mut self, stats: &StructStats) -> ResolvedType {
        let children = self.resolve_level(stats);
        debug!(
            fields = children.len(),
            samples = stats.total_samples(),
            "resolved root record"
        );
        ResolvedType::record(self.config.type_name.clone(), children)
    }

    fn resolve_level(&mut self, stats: &StructStats) -> Vec<ResolvedType> {
        let mut fields: Vec<(&String, &FieldStat)> = stats.fields().collect();
        sort_fields(&mut fields, self.config.field_order);

        fields
            .into_iter()
            .map(|(name, stat)| self.resolve_field(name, stat, stats.total_samples()))
            .collect()
    }

    fn resolve_field(&mut self, name: &str, stat: &FieldStat, level_samples: usize) -> ResolvedType {
        let non_null = stat.non_null_count();
        let arrays = stat.array_count();

        let mut node = if non_null == 0 {
            ResolvedType::new(name, Kind::Dynamic)
        } else if arrays == non_null {
            self.resolve_elements(name, stat).with_repeated(true)
        } else if arrays > 0 {
            // arrays mixed with bare values
            ResolvedType::new(name, Kind::Dynamic)
        } else {
            match dominant_scalar(stat) {
                Some(Kind::Record) => self.resolve_record(name, stat),
                Some(kind) => ResolvedType::new(name, kind),
                None => ResolvedType::new(name, Kind::Dynamic),
            }
        };

        node.nullable = stat.null_count() > 0 && node.kind != Kind::Dynamic;
        if name != stat.key {
            node.serialization_key = Some(stat.key.clone());
        }
        if self.config.stat_comments {
            node.stat = Some(StatRef {
                field: Arc::new(stat.detached()),
                level_samples,
            });
        }
        node
    }

    fn resolve_elements(&mut self, name: &str, stat: &FieldStat) -> ResolvedType {
        let element = stat
            .element_counts()
            .into_iter()
            .filter_map(|(element, count)| element_kind(element).map(|kind| (kind, count)))
            .max_by_key(|(kind, count)| (*count, precedence(*kind)))
            .map(|(kind, _)| kind);

        match element {
            Some(Kind::Record) => self.resolve_record(name, stat),
            Some(kind) => ResolvedType::new(name, kind),
            None => ResolvedType::new(name, Kind::Dynamic),
        }
    }

    fn resolve_record(&mut self, name: &str, stat: &FieldStat) -> ResolvedType {
        let nested = StructStats::from_objects(self.namer, &stat.nested);
        let children = self.resolve_level(&nested);
        ResolvedType::record(name, children)
    }
}

/// Resolve with a throwaway namer
pub fn resolve_stats(config: &GeneratorConfig, stats: &StructStats) -> ResolvedType {
    let mut namer = FieldNamer::new();
    Resolver::new(config, &mut namer).resolve(stats)
}

fn sort_fields(fields: &mut [(&String, &FieldStat)], order: FieldOrder) {
    match order {
        FieldOrder::Alphabetical => {
            fields.sort_by(|a, b| a.1.key.cmp(&b.1.key).then(a.1.first_seen.cmp(&b.1.first_seen)))
        }
        FieldOrder::Encounter => fields.sort_by_key(|(_, stat)| stat.first_seen),
        FieldOrder::CommonFirst => fields.sort_by(|a, b| {
            b.1.total_count
                .cmp(&a.1.total_count)
                .then(a.1.first_seen.cmp(&b.1.first_seen))
        }),
        FieldOrder::RareFirst => fields.sort_by(|a, b| {
            a.1.total_count
                .cmp(&b.1.total_count)
                .then(a.1.first_seen.cmp(&b.1.first_seen))
        }),
    }
}

/// Highest-count non-null, non-array kind; ties go to the richer kind
fn dominant_scalar(stat: &FieldStat) -> Option<Kind> {
    stat.type_counts
        .iter()
        .filter_map(|(observed, count)| {
            let kind = match observed {
                ObservedType::Bool => Kind::Bool,
                ObservedType::Number => Kind::Numeric,
                ObservedType::String => Kind::String,
                ObservedType::Record => Kind::Record,
                ObservedType::Null | ObservedType::Array(_) => return None,
            };
            Some((kind, *count))
        })
        .max_by_key(|(kind, count)| (*count, precedence(*kind)))
        .map(|(kind, _)| kind)
}

fn element_kind(element: ElementType) -> Option<Kind> {
    match element {
        ElementType::Bool => Some(Kind::Bool),
        ElementType::Number => Some(Kind::Numeric),
        ElementType::String => Some(Kind::String),
        ElementType::Record => Some(Kind::Record),
        ElementType::Array => Some(Kind::Array),
        ElementType::Null | ElementType::Empty => None,
    }
}

fn precedence(kind: Kind) -> u8 {
    match kind {
        Kind::Record => 5,
        Kind::Array => 4,
        Kind::String => 3,
        Kind::Numeric => 2,
        Kind::Bool => 1,
        Kind::Null | Kind::Dynamic => 0,
    }
}
