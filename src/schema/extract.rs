//! Factoring repeated and nullable records into shared definitions
//!
//! The tree is moved into an arena first. A read-only post-order walk
//! computes structural signatures and groups candidates; only once the
//! census is complete are group members rewritten into references by index.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use tracing::debug;

use crate::types::{GeneratorConfig, Kind, ResolvedType, Schema};

/// Records with fewer fields are only extracted when nullable
const MIN_SHARED_FIELDS: usize = 3;

/// Share of fields that must carry a prefix for a semantic name
const SEMANTIC_THRESHOLD: f64 = 0.8;

/// Field-name prefixes that map to a readable definition suffix
const SEMANTIC_PREFIXES: &[(&str, &str)] = &[("St", "Stat")];

const NULLABLE_SUFFIX: &str = ":nullable";

struct Slot {
    node: ResolvedType,
    children: Vec<usize>,
}

/// Flattened tree, index 0 is the root
struct Arena {
    slots: Vec<Slot>,
}

impl Arena {
    fn from_tree(root: ResolvedType) -> Self {
        let mut arena = Arena { slots: Vec::new() };
        arena.insert(root);
        arena
    }

    fn insert(&mut self, mut node: ResolvedType) -> usize {
        let children = std::mem::take(&mut node.children);
        let index = self.slots.len();
        self.slots.push(Slot {
            node,
            children: Vec::new(),
        });
        let ids: Vec<usize> = children.into_iter().map(|child| self.insert(child)).collect();
        self.slots[index].children = ids;
        index
    }

    fn post_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.slots.len());
        let mut stack = vec![(0usize, false)];
        while let Some((index, expanded)) = stack.pop() {
            if expanded {
                order.push(index);
                continue;
            }
            stack.push((index, true));
            for &child in self.slots[index].children.iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Rebuild the subtree at `index`; references keep no children
    fn materialize(&self, index: usize) -> ResolvedType {
        let slot = &self.slots[index];
        let mut node = slot.node.clone();
        if node.shared_ref.is_none() {
            node.children = slot
                .children
                .iter()
                .map(|&child| self.materialize(child))
                .collect();
        }
        node
    }
}

struct Group {
    /// Signature without the nullable suffix, shared by equal shapes
    shape: String,
    nullable: bool,
    members: Vec<usize>,
}

impl Group {
    fn should_extract(&self) -> bool {
        self.members.len() > 1 || self.nullable
    }
}

/// Extract shared definitions from `root`
///
/// The root itself is never a candidate. Definitions come out in order of
/// the earliest post-order occurrence of their shape, counting members that
/// only reuse a definition, so anything a definition references is emitted
/// before it.
pub fn extract_structs(root: ResolvedType, config: &GeneratorConfig) -> Schema {
    let mut arena = Arena::from_tree(root);
    let order = arena.post_order();

    let mut signatures: Vec<String> = vec![String::new(); arena.slots.len()];
    let mut groups: Vec<Group> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();

    for &index in &order {
        let slot = &arena.slots[index];
        if slot.node.kind != Kind::Record {
            continue;
        }
        let shape = signature(&arena, &signatures, index);

        if index != 0 && is_candidate(&slot.node, slot.children.len()) {
            let key = if slot.node.nullable {
                format!("{}{}", shape, NULLABLE_SUFFIX)
            } else {
                shape.clone()
            };
            let position = *group_index.entry(key).or_insert_with(|| {
                groups.push(Group {
                    shape: shape.clone(),
                    nullable: slot.node.nullable,
                    members: Vec::new(),
                });
                groups.len() - 1
            });
            groups[position].members.push(index);
        }
        signatures[index] = shape;
    }

    let prefix = if config.type_name.is_empty() {
        "Foo"
    } else {
        config.type_name.as_str()
    };
    let mut rank = vec![0usize; arena.slots.len()];
    for (position, &index) in order.iter().enumerate() {
        rank[index] = position;
    }

    // earliest member of each shape across plain and nullable groups
    let mut earliest: HashMap<&str, usize> = HashMap::new();
    for group in &groups {
        for &member in &group.members {
            let entry = earliest.entry(group.shape.as_str()).or_insert(member);
            if rank[member] < rank[*entry] {
                *entry = member;
            }
        }
    }

    let mut extracted: Vec<(&str, usize)> = Vec::new();
    for group in groups.iter().filter(|g| g.should_extract()) {
        if !extracted.iter().any(|(shape, _)| *shape == group.shape) {
            let shape = group.shape.as_str();
            extracted.push((shape, earliest[shape]));
        }
    }
    // a definition's dependencies sit below its members, so they rank lower
    extracted.sort_by_key(|&(_, first)| rank[first]);

    let mut taken: HashSet<String> = HashSet::from([prefix.to_string()]);
    let mut names: HashMap<String, String> = HashMap::new();
    let mut sources: Vec<(String, usize)> = Vec::new();
    for (shape, first) in extracted {
        let name = definition_name(prefix, &arena, first, shape, &mut taken);
        names.insert(shape.to_string(), name.clone());
        sources.push((name, first));
    }

    // every candidate whose shape got a definition references it
    for group in &groups {
        if let Some(name) = names.get(&group.shape) {
            for &member in &group.members {
                arena.slots[member].node.shared_ref = Some(name.clone());
            }
        }
    }

    let definitions: Vec<ResolvedType> = sources
        .iter()
        .map(|(name, first)| {
            let children = arena.slots[*first]
                .children
                .iter()
                .map(|&child| arena.materialize(child))
                .collect();
            ResolvedType::record(name.clone(), children)
        })
        .collect();

    debug!(
        candidates = groups.iter().map(|g| g.members.len()).sum::<usize>(),
        definitions = definitions.len(),
        "extracted shared structs"
    );

    Schema {
        root: arena.materialize(0),
        definitions,
    }
}

fn is_candidate(node: &ResolvedType, fields: usize) -> bool {
    fields > 0 && (fields >= MIN_SHARED_FIELDS || node.nullable)
}

/// Sorted field tokens; nested records contribute their own signature
fn signature(arena: &Arena, signatures: &[String], index: usize) -> String {
    let mut tokens: Vec<String> = arena.slots[index]
        .children
        .iter()
        .map(|&child| {
            let node = &arena.slots[child].node;
            let mut token = String::new();
            if node.repeated {
                token.push_str("[]");
            }
            token.push_str(&node.name);
            if let Some(key) = &node.serialization_key {
                let _ = write!(token, "({})", key);
            }
            token.push(':');
            token.push_str(node.kind.as_str());
            if node.nullable {
                token.push('*');
            }
            if node.kind == Kind::Record {
                let _ = write!(token, "{{{}}}", signatures[child]);
            }
            token
        })
        .collect();
    tokens.sort();
    tokens.join(",")
}

fn definition_name(
    prefix: &str,
    arena: &Arena,
    index: usize,
    shape: &str,
    taken: &mut HashSet<String>,
) -> String {
    let fields: Vec<&str> = arena.slots[index]
        .children
        .iter()
        .map(|&child| arena.slots[child].node.name.as_str())
        .collect();

    let base = semantic_suffix(&fields)
        .map(|suffix| format!("{}{}", prefix, suffix))
        .unwrap_or_else(|| format!("{}Struct{}", prefix, checksum(shape)));

    let mut name = base.clone();
    let mut n = 2;
    while !taken.insert(name.clone()) {
        name = format!("{}{}", base, n);
        n += 1;
    }
    name
}

fn semantic_suffix(fields: &[&str]) -> Option<&'static str> {
    if fields.is_empty() {
        return None;
    }
    SEMANTIC_PREFIXES.iter().find_map(|(prefix, suffix)| {
        let matching = fields.iter().filter(|f| f.starts_with(prefix)).count();
        (matching as f64 >= fields.len() as f64 * SEMANTIC_THRESHOLD).then_some(*suffix)
    })
}

/// First four digest bytes as eight upper-case hex digits
fn checksum(shape: &str) -> String {
    let digest = Sha256::digest(shape.as_bytes());
    digest[..4].iter().fold(String::with_capacity(8), |mut out, byte| {
        let _ = write!(out, "{:02X}", byte);
        out
    })
}
