//! Turns a fetched changelog body into the HTML fragment handed to the summarizer.
//!
//! JSON bodies are rendered entry by entry; anything else is treated as HTML
//! and mined for changelog-marked elements.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

/// Substituted whenever extraction finds nothing, so the summarizer never sees
/// an empty prompt body.
pub const EMPTY_PLACEHOLDER: &str = "Success.";

const CHANGELOG_SELECTOR: &str = r#"[class*="changelog"], [id="changelog"]"#;

static FIRST_PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<p>.*?</p>").expect("paragraph pattern is valid"));

#[derive(Debug, Clone, PartialEq)]
pub enum Changes {
    List(Vec<String>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum VersionEntry {
    Release {
        version: Option<String>,
        changes: Option<Changes>,
    },
    /// A bare string element of the JSON array.
    Note(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangelogSource {
    Structured(Vec<VersionEntry>),
    Unstructured(String),
}

impl ChangelogSource {
    /// Decide once whether `raw` is a JSON changelog or an HTML page.
    pub fn classify(raw: &str) -> Self {
        let entries = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => items,
            Ok(Value::Object(map)) if is_release(&map) => vec![Value::Object(map)],
            // Wrappers such as `{"releases": [...]}`: entries are the array values.
            Ok(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .flatten()
                .collect(),
            _ => Vec::new(),
        };
        if entries.is_empty() {
            return Self::Unstructured(raw.to_string());
        }
        Self::Structured(entries.iter().map(version_entry).collect())
    }

    pub fn render(&self) -> String {
        let html = match self {
            Self::Structured(entries) => render_entries(entries),
            Self::Unstructured(raw) => select_changelog_html(raw),
        };
        if html.trim().is_empty() {
            EMPTY_PLACEHOLDER.to_string()
        } else {
            html
        }
    }
}

/// Classify and render in one step. Never fails and never returns an empty string.
pub fn extract(raw: &str) -> String {
    ChangelogSource::classify(raw).render()
}

fn is_release(map: &serde_json::Map<String, Value>) -> bool {
    map.contains_key("version") || map.contains_key("changes")
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn version_entry(value: &Value) -> VersionEntry {
    match value {
        Value::Object(map) => {
            let version = map
                .get("version")
                .filter(|v| !v.is_null())
                .map(scalar_text);
            let changes = match map.get("changes") {
                Some(Value::Array(items)) => Some(Changes::List(items.iter().map(scalar_text).collect())),
                Some(Value::Null) | None => None,
                Some(other) => Some(Changes::Text(scalar_text(other))),
            };
            VersionEntry::Release { version, changes }
        }
        Value::Array(items) if items.is_empty() => VersionEntry::Release {
            version: None,
            changes: None,
        },
        Value::Array(_) => VersionEntry::Note(value.to_string()),
        scalar => VersionEntry::Note(scalar_text(scalar)),
    }
}

fn esc(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

fn render_entries(entries: &[VersionEntry]) -> String {
    let mut html = String::from(r#"<div class="changelog-content">"#);
    for entry in entries {
        html.push_str(r#"<div class="changelog-entry">"#);
        match entry {
            VersionEntry::Release { version, changes } => {
                if let Some(version) = version {
                    html.push_str(&format!("<h3>Version: {}</h3>", esc(version)));
                }
                match changes {
                    Some(Changes::List(items)) => {
                        html.push_str("<ul>");
                        for item in items {
                            html.push_str(&format!("<li>{}</li>", esc(item)));
                        }
                        html.push_str("</ul>");
                    }
                    Some(Changes::Text(text)) => html.push_str(&format!("<p>{}</p>", esc(text))),
                    None => {}
                }
            }
            VersionEntry::Note(text) => html.push_str(&format!("<p>{}</p>", esc(text))),
        }
        html.push_str("</div>");
    }
    html.push_str("</div>");
    html
}

fn select_changelog_html(raw: &str) -> String {
    let document = Html::parse_document(raw);
    let mut content = String::new();

    if let Ok(selector) = Selector::parse(CHANGELOG_SELECTOR) {
        for element in document.select(&selector) {
            // Nested matches are already part of their ancestor's markup.
            let nested = element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| selector.matches(&ancestor));
            if !nested {
                content.push_str(&element.html());
            }
        }
    }

    if !content.is_empty() {
        return content;
    }

    let preview: String = raw.chars().take(1000).collect();
    debug!(html = %preview, "no changelog-marked element, falling back");

    FIRST_PARAGRAPH
        .find(raw)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_versions_render_heading_and_list() {
        let html = extract(r#"[{"version":"2.0","changes":["Fixed bug","Added feature"]}]"#);
        assert!(html.contains("<h3>Version: 2.0</h3>"));
        assert!(html.contains("<ul><li>Fixed bug</li><li>Added feature</li></ul>"));
        assert!(html.starts_with(r#"<div class="changelog-content">"#));
    }

    #[test]
    fn json_entry_shapes() {
        let source = ChangelogSource::classify(r#"[{"version":3,"changes":"One change"},"loose note",{}]"#);
        assert_eq!(
            source,
            ChangelogSource::Structured(vec![
                VersionEntry::Release {
                    version: Some("3".into()),
                    changes: Some(Changes::Text("One change".into())),
                },
                VersionEntry::Note("loose note".into()),
                VersionEntry::Release {
                    version: None,
                    changes: None,
                },
            ])
        );
        let html = source.render();
        assert!(html.contains("<h3>Version: 3</h3><p>One change</p>"));
        assert!(html.contains("<p>loose note</p>"));
    }

    #[test]
    fn json_text_is_escaped() {
        let html = extract(r#"["<script>alert(1)</script>"]"#);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn non_empty_json_never_extracts_empty() {
        for raw in [r#"[""]"#, r#"[null]"#, r#"[{}]"#, r#"[[]]"#, r#"{"a":""}"#] {
            let html = extract(raw);
            assert!(!html.trim().is_empty(), "empty output for {raw}");
        }
    }

    #[test]
    fn wrapped_release_list_keeps_its_entries() {
        let html = extract(r#"{"releases":[{"version":"1.0","changes":["Fixed crash"]}]}"#);
        assert!(html.contains("<h3>Version: 1.0</h3>"));
        assert!(html.contains("<li>Fixed crash</li>"));
    }

    #[test]
    fn single_release_object_is_one_entry() {
        let source = ChangelogSource::classify(r#"{"version":"0.9","changes":"Initial"}"#);
        assert_eq!(
            source,
            ChangelogSource::Structured(vec![VersionEntry::Release {
                version: Some("0.9".into()),
                changes: Some(Changes::Text("Initial".into())),
            }])
        );
    }

    #[test]
    fn object_without_entries_is_passed_through() {
        let raw = r#"{"name":"widget","latest":"2.1"}"#;
        assert_eq!(ChangelogSource::classify(raw), ChangelogSource::Unstructured(raw.into()));
        assert_eq!(extract(raw), raw);
    }

    #[test]
    fn nested_array_entry_keeps_its_text() {
        let html = extract(r#"[["1.0","Fixed crash"]]"#);
        assert!(html.contains("Fixed crash"));
    }

    #[test]
    fn scalars_and_empty_json_are_not_structured() {
        assert_eq!(ChangelogSource::classify("42"), ChangelogSource::Unstructured("42".into()));
        assert_eq!(ChangelogSource::classify("[]"), ChangelogSource::Unstructured("[]".into()));
    }

    #[test]
    fn html_changelog_elements_are_concatenated() {
        let raw = r#"<html><body>
            <nav>menu</nav>
            <section class="main-changelog"><h2>1.2</h2><div class="changelog-item">x</div></section>
            <div id="changelog"><p>1.1</p></div>
        </body></html>"#;
        let html = extract(raw);
        assert!(html.starts_with(r#"<section class="main-changelog">"#));
        assert!(html.contains(r#"<div id="changelog"><p>1.1</p></div>"#));
        assert_eq!(html.matches("changelog-item").count(), 1);
        assert!(!html.contains("menu"));
    }

    #[test]
    fn html_without_marker_falls_back_to_first_paragraph() {
        let raw = "<html><body><h1>News</h1><p>first\nline</p><p>second</p></body></html>";
        assert_eq!(extract(raw), "<p>first\nline</p>");
    }

    #[test]
    fn html_without_marker_or_paragraph_is_returned_whole() {
        let raw = "<html><body><h1>Release 4</h1><div>notes</div></body></html>";
        assert_eq!(extract(raw), raw);
        assert_eq!(extract("plain text notes"), "plain text notes");
    }

    #[test]
    fn empty_input_gets_placeholder() {
        assert_eq!(extract(""), EMPTY_PLACEHOLDER);
        assert_eq!(extract("   \n"), EMPTY_PLACEHOLDER);
    }
}
