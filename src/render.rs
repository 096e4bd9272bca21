//! Rendering of finished schemas
//!
//! `render_go` produces Go struct declarations: shared definitions first,
//! then the root type. The result goes through a structural check before it
//! is returned, and a failing check hands the raw text back inside the
//! error. `render_json` dumps the tree itself.

use std::fmt::Write;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::stats::annotate;
use crate::types::{GeneratorConfig, Kind, ResolvedType, Schema};

/// Output flavour of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Go,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "go" => Ok(OutputFormat::Go),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}' (expected go or json)", other)),
        }
    }
}

pub fn render(schema: &Schema, config: &GeneratorConfig, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Go => render_go(schema, config),
        OutputFormat::Json => render_json(schema),
    }
}

/// Pretty-printed JSON form of the schema tree
pub fn render_json(schema: &Schema) -> Result<String> {
    let mut text = serde_json::to_string_pretty(schema)?;
    text.push('\n');
    Ok(text)
}

/// Go source for the schema
pub fn render_go(schema: &Schema, config: &GeneratorConfig) -> Result<String> {
    let renderer = GoRenderer { config };
    let mut out = format!("package {}\n", config.package_name);

    for definition in &schema.definitions {
        out.push('\n');
        renderer.write_declaration(&mut out, definition);
    }
    out.push('\n');
    renderer.write_declaration(&mut out, &schema.root);

    check_structure(&out)?;
    Ok(out)
}

struct GoRenderer<'a> {
    config: &'a GeneratorConfig,
}

/// One field line before alignment
struct Row {
    name: String,
    ty: String,
    tag: Option<String>,
    comment: Option<String>,
}

impl GoRenderer<'_> {
    fn write_declaration(&self, out: &mut String, node: &ResolvedType) {
        out.push_str("type ");
        out.push_str(&node.name);
        out.push(' ');
        out.push_str(&self.struct_body(node, 0));
        out.push('\n');
    }

    fn struct_body(&self, node: &ResolvedType, depth: usize) -> String {
        if node.children.is_empty() {
            return String::from("struct{}");
        }

        let rows: Vec<Row> = node
            .children
            .iter()
            .map(|child| self.row(child, depth))
            .collect();

        let mut body = String::from("struct {\n");
        write_rows(&mut body, &rows, &"\t".repeat(depth + 1));
        body.push_str(&"\t".repeat(depth));
        body.push('}');
        body
    }

    fn row(&self, field: &ResolvedType, depth: usize) -> Row {
        Row {
            name: field.name.clone(),
            ty: self.type_expr(field, depth),
            tag: self.tag(field),
            comment: self.comment(field),
        }
    }

    fn type_expr(&self, field: &ResolvedType, depth: usize) -> String {
        let base = match &field.shared_ref {
            Some(name) => name.clone(),
            None => match field.kind {
                Kind::Record => self.struct_body(field, depth + 1),
                Kind::Numeric => String::from("float64"),
                Kind::String => String::from("string"),
                Kind::Bool => String::from("bool"),
                Kind::Array => String::from("[]any"),
                Kind::Dynamic | Kind::Null => String::from("any"),
            },
        };

        if field.repeated {
            format!("[]{}", base)
        } else if field.nullable && !matches!(field.kind, Kind::Dynamic | Kind::Null | Kind::Array) {
            format!("*{}", base)
        } else {
            base
        }
    }

    fn tag(&self, field: &ResolvedType) -> Option<String> {
        let value = if self.config.omit_empty {
            format!("{},omitempty", field.json_key())
        } else if field.serialization_key.is_some() {
            field.json_key().to_string()
        } else {
            return None;
        };
        let tag = format!("json:{}", go_quote(&value));
        // raw strings cannot hold a backtick
        if tag.contains('`') {
            Some(go_quote(&tag))
        } else {
            Some(format!("`{}`", tag))
        }
    }

    fn comment(&self, field: &ResolvedType) -> Option<String> {
        if !self.config.stat_comments {
            return None;
        }
        let stat = field.stat.as_ref()?;
        annotate(&stat.field, stat.level_samples, field.kind).map(|text| format!("// {}", text))
    }
}

/// Double-quoted Go string literal
fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Write rows with gofmt-style columns; multi-line types break alignment runs
fn write_rows(out: &mut String, rows: &[Row], indent: &str) {
    let mut start = 0;
    while start < rows.len() {
        let mut end = start;
        while end < rows.len() && !rows[end].ty.contains('\n') {
            end += 1;
        }

        write_aligned(out, &rows[start..end], indent);

        if end < rows.len() {
            let row = &rows[end];
            let mut line = format!("{}{} {}", indent, row.name, row.ty);
            for extra in [&row.tag, &row.comment].into_iter().flatten() {
                line.push(' ');
                line.push_str(extra);
            }
            out.push_str(&line);
            out.push('\n');
            end += 1;
        }
        start = end;
    }
}

fn write_aligned(out: &mut String, rows: &[Row], indent: &str) {
    let name_width = rows.iter().map(|r| r.name.chars().count()).max().unwrap_or(0);
    let type_width = rows.iter().map(|r| r.ty.chars().count()).max().unwrap_or(0);
    let tag_width = rows
        .iter()
        .filter_map(|r| r.tag.as_ref())
        .map(|t| t.chars().count())
        .max()
        .unwrap_or(0);

    for row in rows {
        let mut line = format!("{}{:<nw$} {:<tw$}", indent, row.name, row.ty, nw = name_width, tw = type_width);
        match (&row.tag, &row.comment) {
            (Some(tag), Some(comment)) => {
                line.push_str(&format!(" {:<w$} {}", tag, comment, w = tag_width));
            }
            (Some(tag), None) => {
                line.push(' ');
                line.push_str(tag);
            }
            (None, Some(comment)) => {
                if tag_width > 0 {
                    line.push_str(&" ".repeat(tag_width + 1));
                }
                line.push(' ');
                line.push_str(comment);
            }
            (None, None) => {}
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
}

/// Balanced braces, closed tags and valid identifiers
///
/// Comments are skipped. Positions are 1-based.
pub fn check_structure(text: &str) -> Result<()> {
    let mut open: Vec<(usize, usize)> = Vec::new();
    let mut raw_start: Option<(usize, usize)> = None;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;

        if raw_start.is_none() {
            let depth = open.len();
            check_line_identifiers(text, line, line_no, depth)?;
        }

        let mut chars = line.char_indices().peekable();
        while let Some((offset, c)) = chars.next() {
            let column = line[..offset].chars().count() + 1;
            if raw_start.is_some() {
                if c == '`' {
                    raw_start = None;
                }
                continue;
            }
            match c {
                '/' if matches!(chars.peek(), Some((_, '/'))) => break,
                '`' => raw_start = Some((line_no, column)),
                '"' => {
                    let mut escaped = false;
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        match c {
                            '\\' if !escaped => escaped = true,
                            '"' if !escaped => {
                                closed = true;
                                break;
                            }
                            _ => escaped = false,
                        }
                    }
                    if !closed {
                        return Err(Error::render("unterminated string", line_no, column, text));
                    }
                }
                '{' => open.push((line_no, column)),
                '}' => {
                    if open.pop().is_none() {
                        return Err(Error::render("unexpected '}'", line_no, column, text));
                    }
                }
                _ => {}
            }
        }
    }

    if let Some((line, column)) = raw_start {
        return Err(Error::render("unterminated struct tag", line, column, text));
    }
    if let Some((line, column)) = open.pop() {
        return Err(Error::render("unclosed '{'", line, column, text));
    }
    Ok(())
}

fn check_line_identifiers(text: &str, line: &str, line_no: usize, depth: usize) -> Result<()> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('}') || trimmed.starts_with("//") {
        return Ok(());
    }
    let column = line.len() - trimmed.len() + 1;

    let (what, name, column) = if depth > 0 {
        ("field name", first_token(trimmed), column)
    } else if let Some(rest) = trimmed.strip_prefix("type ") {
        let name = rest
            .rfind(" struct")
            .map(|end| &rest[..end])
            .unwrap_or_else(|| first_token(rest));
        ("type name", name, column + 5)
    } else if let Some(rest) = trimmed.strip_prefix("package ") {
        ("package name", first_token(rest), column + 8)
    } else {
        return Ok(());
    };

    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::render(format!("invalid {} '{}'", what, name), line_no, column, text))
    }
}

fn first_token(s: &str) -> &str {
    s.split_whitespace().next().unwrap_or("")
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatRef;
    use crate::stats::FieldStat;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn scalar(name: &str, kind: Kind) -> ResolvedType {
        ResolvedType::new(name, kind)
    }

    #[test]
    fn test_render_simple_struct() {
        let root = ResolvedType::record(
            "Foo",
            vec![
                scalar("A", Kind::Numeric).with_serialization_key(Some("a".into())),
                scalar("B", Kind::String)
                    .with_nullable(true)
                    .with_serialization_key(Some("b".into())),
            ],
        );
        let text = render_go(&Schema::new(root), &GeneratorConfig::default()).unwrap();
        assert_eq!(
            text,
            "package main\n\ntype Foo struct {\n\tA float64 `json:\"a,omitempty\"`\n\tB *string `json:\"b,omitempty\"`\n}\n"
        );
    }

    #[test]
    fn test_tags_without_omitempty() {
        let root = ResolvedType::record(
            "Foo",
            vec![
                scalar("UserID", Kind::Numeric).with_serialization_key(Some("user_id".into())),
                scalar("Name", Kind::String),
            ],
        );
        let config = GeneratorConfig::default().with_omit_empty(false);
        let text = render_go(&Schema::new(root), &config).unwrap();
        assert!(text.contains("\tUserID float64 `json:\"user_id\"`\n"), "{text}");
        assert!(text.contains("\tName   string\n"), "{text}");
    }

    #[test]
    fn test_kinds_map_to_go_types() {
        let root = ResolvedType::record(
            "Foo",
            vec![
                scalar("Any", Kind::Dynamic),
                scalar("Flag", Kind::Bool).with_nullable(true),
                scalar("Matrix", Kind::Array).with_repeated(true),
                scalar("Tags", Kind::String).with_repeated(true).with_nullable(true),
                ResolvedType::record("Empty", vec![]),
            ],
        );
        let config = GeneratorConfig::default().with_omit_empty(false);
        let text = render_go(&Schema::new(root), &config).unwrap();
        assert!(text.contains("\tAny    any\n"), "{text}");
        assert!(text.contains("\tFlag   *bool\n"), "{text}");
        assert!(text.contains("\tMatrix [][]any\n"), "{text}");
        assert!(text.contains("\tTags   []string\n"), "{text}");
        assert!(text.contains("\tEmpty  struct{}\n"), "{text}");
    }

    #[test]
    fn test_nested_inline_struct() {
        let root = ResolvedType::record(
            "Foo",
            vec![ResolvedType::record("User", vec![scalar("Name", Kind::String)]).with_nullable(true)],
        );
        let config = GeneratorConfig::default().with_omit_empty(false);
        let text = render_go(&Schema::new(root), &config).unwrap();
        assert_eq!(
            text,
            "package main\n\ntype Foo struct {\n\tUser *struct {\n\t\tName string\n\t}\n}\n"
        );
    }

    #[test]
    fn test_definitions_precede_root_and_references() {
        let definition = ResolvedType::record(
            "FooAddress",
            vec![scalar("City", Kind::String), scalar("Zip", Kind::Numeric)],
        );
        let mut home = ResolvedType::new("Home", Kind::Record).with_nullable(true);
        home.shared_ref = Some("FooAddress".into());
        let mut past = ResolvedType::new("Past", Kind::Record).with_repeated(true);
        past.shared_ref = Some("FooAddress".into());

        let schema = Schema {
            root: ResolvedType::record("Foo", vec![home, past]),
            definitions: vec![definition],
        };
        let config = GeneratorConfig::default().with_omit_empty(false);
        let text = render_go(&schema, &config).unwrap();

        let def_at = text.find("type FooAddress struct").unwrap();
        let root_at = text.find("type Foo struct").unwrap();
        assert!(def_at < root_at);
        assert!(text.contains("\tHome *FooAddress\n"), "{text}");
        assert!(text.contains("\tPast []FooAddress\n"), "{text}");
    }

    #[test]
    fn test_stat_comments() {
        let mut stat = FieldStat::new("count", 0);
        stat.observe(&json!(1));
        stat.observe(&json!(2));
        let mut field = scalar("Count", Kind::Numeric).with_serialization_key(Some("count".into()));
        field.stat = Some(StatRef {
            field: Arc::new(stat),
            level_samples: 4,
        });
        let root = ResolvedType::record("Foo", vec![field]);

        let config = GeneratorConfig::default().with_stat_comments(true);
        let text = render_go(&Schema::new(root.clone()), &config).unwrap();
        assert!(
            text.contains("`json:\"count,omitempty\"` // seen in 50.0% (2/4), values: 1:50.0%, 2:50.0%"),
            "{text}"
        );

        let plain = render_go(&Schema::new(root), &GeneratorConfig::default()).unwrap();
        assert!(!plain.contains("//"), "{plain}");
    }

    #[test]
    fn test_invalid_type_name_is_a_render_error() {
        let root = ResolvedType::record("my type", vec![scalar("A", Kind::Bool)]);
        let err = render_go(&Schema::new(root), &GeneratorConfig::default()).unwrap_err();
        match &err {
            Error::Render { line, column, .. } => {
                assert_eq!(*line, 3);
                assert_eq!(*column, 6);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.unformatted_source().unwrap().contains("type my type struct"));
    }

    #[test]
    fn test_check_structure() {
        assert!(check_structure("package main\n\ntype Foo struct {\n\tA int `json:\"a\"`\n}\n").is_ok());

        let err = check_structure("package main\n\ntype Foo struct {\n\tA int\n").unwrap_err();
        assert!(err.to_string().contains("unclosed '{'"), "{err}");

        let err = check_structure("package main\n}\n").unwrap_err();
        assert!(err.to_string().contains("line 2, column 1"), "{err}");

        let err = check_structure("package main\ntype Foo struct {\n\tA int `json:\"a\n}\n").unwrap_err();
        assert!(err.to_string().contains("unterminated struct tag"), "{err}");

        let err = check_structure("package main-x\n").unwrap_err();
        assert!(err.to_string().contains("invalid package name"), "{err}");

        // braces inside comments are ignored
        assert!(check_structure("package main\ntype Foo struct {\n\tA int // {\n}\n").is_ok());
    }

    #[test]
    fn test_keys_with_quotes_and_backticks() {
        let root = ResolvedType::record(
            "Foo",
            vec![
                scalar("A", Kind::String).with_serialization_key(Some("a\"b".into())),
                scalar("B", Kind::String).with_serialization_key(Some("x`y".into())),
                scalar("C", Kind::String).with_serialization_key(Some("`{".into())),
                scalar("D", Kind::String).with_serialization_key(Some("tab\there".into())),
            ],
        );
        let text = render_go(&Schema::new(root), &GeneratorConfig::default()).unwrap();

        assert!(text.contains(r#"`json:"a\"b,omitempty"`"#), "{text}");
        assert!(text.contains(r#""json:\"x`y,omitempty\"""#), "{text}");
        assert!(text.contains(r#""json:\"`{,omitempty\"""#), "{text}");
        assert!(text.contains(r#"`json:"tab\there,omitempty"`"#), "{text}");
    }

    #[test]
    fn test_check_structure_skips_quoted_tags() {
        assert!(check_structure("package main\ntype Foo struct {\n\tA int \"json:\\\"}`\\\"\"\n}\n").is_ok());

        let err = check_structure("package main\ntype Foo struct {\n\tA int \"json:\n}\n").unwrap_err();
        assert!(err.to_string().contains("unterminated string"), "{err}");
    }

    #[test]
    fn test_render_json() {
        let root = ResolvedType::record("Foo", vec![scalar("A", Kind::Numeric)]);
        let text = render_json(&Schema::new(root)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["root"]["name"], "Foo");
        assert_eq!(value["root"]["children"][0]["kind"], "numeric");
        assert!(value.get("definitions").is_none());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
