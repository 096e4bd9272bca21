//! JSON key to identifier mapping
//!
//! `foo_id` becomes `FooID`: underscore-separated segments are title-cased and
//! joined, a trailing acronym segment is upper-cased, and anything that is not
//! a valid identifier character becomes `_`.

use std::collections::HashMap;

/// Trailing segments that are emitted fully upper-case
const ACRONYMS: &[&str] = &["id", "url"];

/// Memoizing key normalizer, one per run
#[derive(Debug, Default)]
pub struct FieldNamer {
    cache: HashMap<String, String>,
}

impl FieldNamer {
    pub fn new() -> Self {
        FieldNamer {
            cache: HashMap::new(),
        }
    }

    /// Normalize a JSON key, reusing earlier results
    pub fn normalize(&mut self, key: &str) -> String {
        if let Some(name) = self.cache.get(key) {
            return name.clone();
        }
        let name = normalize_key(key);
        self.cache.insert(key.to_string(), name.clone());
        name
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Normalize a JSON key without memoization
pub fn normalize_key(key: &str) -> String {
    let mut parts: Vec<String> = key.split('_').map(title_case).collect();

    if let Some(last) = parts.last_mut() {
        if ACRONYMS.contains(&last.to_lowercase().as_str()) {
            *last = last.to_uppercase();
        }
    }

    let assembled: String = parts
        .concat()
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let ok = if i == 0 {
                c.is_alphabetic()
            } else {
                c.is_alphanumeric()
            };
            if ok {
                c
            } else {
                '_'
            }
        })
        .collect();

    if assembled.is_empty() {
        String::from("_")
    } else {
        assembled
    }
}

/// Upper-case every letter that starts a word
fn title_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut at_boundary = true;
    for c in segment.chars() {
        if at_boundary {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_boundary = is_word_separator(c);
    }
    out
}

fn is_word_separator(c: char) -> bool {
    if c.is_ascii() {
        return !(c.is_ascii_alphanumeric() || c == '_');
    }
    if c.is_alphanumeric() {
        return false;
    }
    c.is_whitespace()
}
