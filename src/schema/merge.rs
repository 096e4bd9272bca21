//! Pairwise merging of resolved types
//!
//! Used by the merge strategy: every sample is typed on its own and folded
//! into the running type. Unlike the accumulator path, a field missing from
//! one operand is passed through as-is and never marked nullable.

use serde_json::Value;

use crate::naming::FieldNamer;
use crate::types::{FieldOrder, Kind, ResolvedType};

/// Merge two resolved types into one that describes both
///
/// The kind decision is symmetric. Record fields keep `a`'s order, with
/// fields only present in `b` appended.
pub fn merge_types(a: ResolvedType, b: ResolvedType) -> ResolvedType {
    if a.kind == Kind::Null && (!a.repeated || b.repeated) {
        return mark_nullable(b);
    }
    if b.kind == Kind::Null && (!b.repeated || a.repeated) {
        return mark_nullable(a);
    }

    if a.repeated != b.repeated {
        return degrade(a, false);
    }

    match (a.kind, b.kind) {
        (Kind::Record, Kind::Record) => merge_records(a, b),
        (x, y) if x == y => {
            let nullable = a.nullable || b.nullable;
            a.with_nullable(nullable)
        }
        _ => {
            let repeated = a.repeated;
            degrade(a, repeated)
        }
    }
}

fn merge_records(mut a: ResolvedType, b: ResolvedType) -> ResolvedType {
    a.nullable = a.nullable || b.nullable;
    for child in b.children {
        match a.children.iter().position(|existing| existing.name == child.name) {
            Some(index) => {
                let existing = a.children.remove(index);
                a.children.insert(index, merge_types(existing, child));
            }
            None => a.children.push(child),
        }
    }
    a
}

fn mark_nullable(node: ResolvedType) -> ResolvedType {
    let nullable = node.kind != Kind::Dynamic;
    node.with_nullable(nullable)
}

/// Conflicting observations collapse to the dynamic kind
fn degrade(mut node: ResolvedType, repeated: bool) -> ResolvedType {
    node.kind = Kind::Dynamic;
    node.repeated = repeated;
    node.nullable = false;
    node.children.clear();
    node
}

/// Apply a field order to a merged tree
///
/// Merged trees carry no frequencies, so only the alphabetical order changes
/// anything; every other order keeps encounter order.
pub fn order_fields(node: &mut ResolvedType, order: FieldOrder) {
    if order == FieldOrder::Alphabetical {
        node.children.sort_by(|a, b| a.json_key().cmp(b.json_key()));
    }
    for child in &mut node.children {
        order_fields(child, order);
    }
}

/// Type a single JSON value without any statistics
pub fn derive_type(name: &str, value: &Value, namer: &mut FieldNamer) -> ResolvedType {
    match value {
        Value::Null => ResolvedType::new(name, Kind::Null),
        Value::Bool(_) => ResolvedType::new(name, Kind::Bool),
        Value::Number(_) => ResolvedType::new(name, Kind::Numeric),
        Value::String(_) => ResolvedType::new(name, Kind::String),
        Value::Object(obj) => {
            let mut record = ResolvedType::record(name, Vec::new());
            for (key, value) in obj {
                let field_name = namer.normalize(key);
                let mut field = derive_type(&field_name, value, namer);
                if field_name != *key {
                    field.serialization_key = Some(key.clone());
                }
                match record.children.iter().position(|c| c.name == field_name) {
                    Some(index) => {
                        let existing = record.children.remove(index);
                        record.children.insert(index, merge_types(existing, field));
                    }
                    None => record.children.push(field),
                }
            }
            record
        }
        Value::Array(items) => {
            let element = items
                .iter()
                .map(|item| derive_type(name, item, namer))
                .reduce(merge_types);

            let element = match element {
                None => ResolvedType::new(name, Kind::Null),
                // arrays of arrays keep only their outer shape
                Some(inner) if inner.repeated => ResolvedType::new(name, Kind::Array),
                Some(inner) => inner,
            };
            element.with_repeated(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn derive(value: Value) -> ResolvedType {
        derive_type("Foo", &value, &mut FieldNamer::new())
    }

    fn scalar(kind: Kind) -> ResolvedType {
        ResolvedType::new("F", kind)
    }

    #[test]
    fn test_null_placeholder_yields_other_side_nullable() {
        let merged = merge_types(scalar(Kind::Null), scalar(Kind::String));
        assert_eq!(merged.kind, Kind::String);
        assert!(merged.nullable);

        let merged = merge_types(scalar(Kind::String), scalar(Kind::Null));
        assert_eq!(merged.kind, Kind::String);
        assert!(merged.nullable);
    }

    #[test]
    fn test_same_kind_is_kept() {
        let merged = merge_types(scalar(Kind::Numeric), scalar(Kind::Numeric));
        assert_eq!(merged.kind, Kind::Numeric);
        assert!(!merged.nullable);
    }

    #[test]
    fn test_mismatch_degrades_to_dynamic() {
        let merged = merge_types(scalar(Kind::Bool), scalar(Kind::String));
        assert_eq!(merged.kind, Kind::Dynamic);

        // dynamic never refines back
        let merged = merge_types(merged, scalar(Kind::Bool));
        assert_eq!(merged.kind, Kind::Dynamic);

        let merged = merge_types(merged, scalar(Kind::Null));
        assert_eq!(merged.kind, Kind::Dynamic);
        assert!(!merged.nullable);
    }

    #[test]
    fn test_kind_decision_is_symmetric() {
        let kinds = [
            Kind::Null,
            Kind::Bool,
            Kind::Numeric,
            Kind::String,
            Kind::Record,
            Kind::Array,
            Kind::Dynamic,
        ];
        for a in kinds {
            for b in kinds {
                for (ra, rb) in [(false, false), (true, true), (true, false)] {
                    let left = merge_types(
                        scalar(a).with_repeated(ra),
                        scalar(b).with_repeated(rb),
                    );
                    let right = merge_types(
                        scalar(b).with_repeated(rb),
                        scalar(a).with_repeated(ra),
                    );
                    assert_eq!(left.kind, right.kind, "{a} / {b}");
                    assert_eq!(left.repeated, right.repeated, "{a} / {b}");
                    assert_eq!(left.nullable, right.nullable, "{a} / {b}");
                }
            }
        }
    }

    #[test]
    fn test_records_union_fields() {
        let a = derive(json!({"x": 1, "y": "s"}));
        let b = derive(json!({"z": true, "x": 2.5}));
        let merged = merge_types(a, b);

        let names: Vec<_> = merged.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["X", "Y", "Z"]);
        // absent-in-one fields are not made optional on this path
        assert!(!merged.child("Y").unwrap().nullable);
        assert!(!merged.child("Z").unwrap().nullable);
        assert_eq!(merged.child("X").unwrap().kind, Kind::Numeric);
    }

    #[test]
    fn test_record_field_order_follows_operands() {
        let a = derive(json!({"x": 1}));
        let b = derive(json!({"y": 1}));
        let ab = merge_types(a.clone(), b.clone());
        let ba = merge_types(b, a);

        let names = |t: &ResolvedType| -> Vec<String> {
            t.children.iter().map(|c| c.name.clone()).collect()
        };
        assert_eq!(names(&ab), vec!["X", "Y"]);
        assert_eq!(names(&ba), vec!["Y", "X"]);
    }

    #[test]
    fn test_arrays_merge_elements() {
        let a = derive(json!({"tags": ["a"]}));
        let b = derive(json!({"tags": ["b", "c"]}));
        let merged = merge_types(a, b);
        let tags = merged.child("Tags").unwrap();
        assert!(tags.repeated);
        assert_eq!(tags.kind, Kind::String);

        let mixed = derive(json!({"v": [1, "x"]}));
        let v = mixed.child("V").unwrap();
        assert!(v.repeated);
        assert_eq!(v.kind, Kind::Dynamic);
    }

    #[test]
    fn test_array_against_scalar_is_dynamic() {
        let merged = merge_types(derive(json!({"v": [1]})), derive(json!({"v": 1})));
        let v = merged.child("V").unwrap();
        assert_eq!(v.kind, Kind::Dynamic);
        assert!(!v.repeated);
    }

    #[test]
    fn test_empty_array_takes_later_element_type() {
        let merged = merge_types(derive(json!({"v": []})), derive(json!({"v": ["a"]})));
        let v = merged.child("V").unwrap();
        assert!(v.repeated);
        assert_eq!(v.kind, Kind::String);
    }

    #[test]
    fn test_nested_records_merge_recursively() {
        let a = derive(json!({"user": {"name": "a"}}));
        let b = derive(json!({"user": {"age": 1}}));
        let c = derive(json!({"user": null}));
        let merged = merge_types(merge_types(a, b), c);
        let user = merged.child("User").unwrap();
        assert_eq!(user.kind, Kind::Record);
        assert!(user.nullable);
        assert_eq!(user.children.len(), 2);
    }

    #[test]
    fn test_order_fields() {
        let mut merged = merge_types(
            derive(json!({"zeta": 1, "inner": {"b": 1, "a": 2}})),
            derive(json!({"alpha": 1})),
        );

        let mut encounter = merged.clone();
        order_fields(&mut encounter, FieldOrder::Encounter);
        let names: Vec<_> = encounter.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Inner", "Alpha"]);

        order_fields(&mut merged, FieldOrder::Alphabetical);
        let names: Vec<_> = merged.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Inner", "Zeta"]);
        let inner: Vec<_> = merged.child("Inner").unwrap().children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(inner, vec!["A", "B"]);
    }

    #[test]
    fn test_array_of_arrays() {
        let t = derive(json!({"m": [[1, 2], [3]]}));
        let m = t.child("M").unwrap();
        assert!(m.repeated);
        assert_eq!(m.kind, Kind::Array);
    }
}
