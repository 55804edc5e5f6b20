//! Placeholder templates: `{{ name }}` substitution over plain text.
//!
//! Values are HTML-escaped except `content`, which carries already rendered
//! markup. Strings render as-is, arrays join with `, `, null and missing keys
//! render empty.

use serde_json::Value;

use super::{Attrs, Template};
use crate::utils::html::escape;

/// Name of the unescaped body slot.
pub const CONTENT: &str = "content";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(String),
}

/// A parsed text template.
#[derive(Debug, Clone)]
pub struct TextTemplate {
    segments: Vec<Segment>,
}

impl TextTemplate {
    /// Parse template source. Fails on an unterminated `{{` or an empty name.
    pub fn parse(source: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                let line = source[..source.len() - rest.len() + start].lines().count().max(1);
                return Err(format!("unterminated `{{{{` on line {line}"));
            };
            let name = after[..end].trim();
            if name.is_empty() {
                return Err("empty placeholder `{{ }}`".to_string());
            }
            segments.push(Segment::Var(name.to_string()));
            rest = &after[end + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Var(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }
}

impl Template for TextTemplate {
    fn render(&self, attrs: &Attrs, content: Option<&str>) -> anyhow::Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Var(name) if name == CONTENT => {
                    if let Some(content) = content {
                        out.push_str(content);
                    } else if let Some(value) = attrs.get(CONTENT) {
                        out.push_str(&escape(&stringify(value)));
                    }
                }
                Segment::Var(name) => {
                    if let Some(value) = attrs.get(name) {
                        out.push_str(&escape(&stringify(value)));
                    }
                }
            }
        }
        Ok(out)
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attrs {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_and_render() {
        let t = TextTemplate::parse("<h1>{{ title }}</h1>{{content}}").unwrap();
        assert_eq!(t.placeholders().collect::<Vec<_>>(), ["title", "content"]);

        let html = t
            .render(&attrs(json!({"title": "A & B"})), Some("<p>body</p>"))
            .unwrap();
        assert_eq!(html, "<h1>A &amp; B</h1><p>body</p>");
    }

    #[test]
    fn test_missing_and_typed_values() {
        let t = TextTemplate::parse("[{{ a }}|{{ b }}|{{ c }}|{{ d }}]").unwrap();
        let html = t
            .render(&attrs(json!({"a": 3, "b": true, "c": ["x", "y"]})), None)
            .unwrap();
        assert_eq!(html, "[3|true|x, y|]");
    }

    #[test]
    fn test_content_attr_is_escaped_without_body() {
        let t = TextTemplate::parse("{{ content }}").unwrap();
        let html = t.render(&attrs(json!({"content": "<b>"})), None).unwrap();
        assert_eq!(html, "&lt;b&gt;");
    }

    #[test]
    fn test_unterminated_placeholder() {
        let err = TextTemplate::parse("line\n<p>{{ title</p>").unwrap_err();
        assert!(err.contains("line 2"), "{err}");
        assert!(TextTemplate::parse("{{ }}").is_err());
    }

    #[test]
    fn test_plain_text() {
        let t = TextTemplate::parse("no placeholders").unwrap();
        assert_eq!(t.render(&Attrs::new(), None).unwrap(), "no placeholders");
    }
}
