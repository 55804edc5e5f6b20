//! Markdown documents: front matter + body rendered with pulldown-cmark.

use std::path::Path;

use anyhow::{Context, Result};
use pulldown_cmark::{Options, Parser, html};
use serde_json::Value;

use crate::module::Attrs;
use crate::utils::date::Date;

/// Attribute naming the layout template.
pub const LAYOUT: &str = "layout";
/// Attribute carrying the document date.
pub const DATE: &str = "date";

/// A parsed markdown document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub attrs: Attrs,
    pub html: String,
}

impl Document {
    /// Parse and render `source`; `file` supplies a fallback date.
    pub fn parse(source: &str, file: &Path) -> Result<Self> {
        let (mut attrs, body) = match split_front_matter(source) {
            Some((FrontMatter::Yaml(fm), body)) => (parse_yaml_like(fm), body),
            Some((FrontMatter::Toml(fm), body)) => (
                parse_toml(fm).with_context(|| format!("invalid front matter in {}", file.display()))?,
                body,
            ),
            None => (Attrs::new(), source),
        };

        if !attrs.contains_key(DATE)
            && let Some(date) = file
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(Date::find_in)
        {
            attrs.insert(DATE.to_string(), Value::String(date.to_string()));
        }

        Ok(Self {
            attrs,
            html: render_html(body),
        })
    }

    /// Layout name from front matter, if any.
    pub fn layout(&self) -> Option<&str> {
        self.attrs
            .get(LAYOUT)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Render markdown to HTML.
pub fn render_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(markdown, options);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

enum FrontMatter<'a> {
    Yaml(&'a str),
    Toml(&'a str),
}

/// Split a leading front matter block from the body.
///
/// `---` opens a YAML-like block closed by `---` or `...`; `+++` opens a TOML
/// block closed by `+++`. Delimiters must sit on their own line.
fn split_front_matter(source: &str) -> Option<(FrontMatter<'_>, &str)> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let (first, rest) = source.split_once('\n')?;
    let (closers, is_toml): (&[&str], bool) = match first.trim_end() {
        "---" => (&["---", "..."], false),
        "+++" => (&["+++"], true),
        _ => return None,
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if closers.contains(&line.trim_end()) {
            let fm = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let fm = if is_toml { FrontMatter::Toml(fm) } else { FrontMatter::Yaml(fm) };
            return Some((fm, body));
        }
        offset += line.len();
    }
    None
}

/// Parse simple `key: value` lines.
fn parse_yaml_like(content: &str) -> Attrs {
    let mut attrs = Attrs::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                attrs.insert(key.to_string(), parse_yaml_value(value.trim()));
            }
        }
    }
    attrs
}

/// Parse a YAML-like value string to a JSON value
///
/// - Booleans: `true`, `false`
/// - Null: `null`, `~`, empty
/// - Numbers: `123`, `3.14`
/// - Arrays: `a, b, c` -> `["a", "b", "c"]`
/// - Quoted strings keep their content verbatim
fn parse_yaml_value(s: &str) -> Value {
    if let Some(inner) = unquote(s) {
        return Value::String(inner.to_string());
    }
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if s.is_empty() || s.eq_ignore_ascii_case("null") || s == "~" {
        return Value::Null;
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(n) = s.parse::<f64>()
        && let Some(num) = serde_json::Number::from_f64(n)
    {
        return Value::Number(num);
    }
    if s.contains(',') {
        let items = s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| Value::String(item.to_string()))
            .collect();
        return Value::Array(items);
    }
    Value::String(s.to_string())
}

fn unquote(s: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|q| {
        s.strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
    })
}

fn parse_toml(content: &str) -> Result<Attrs> {
    let table: toml::Table = toml::from_str(content)?;
    Ok(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect())
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(t) => Value::Object(t.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect()),
    }
}
