//! JSON-API -> structured page converter (spec §4.1).
//!
//! When a documentation source exposes a JSON endpoint, this converter is
//! preferred over HTML rendering: it bypasses the browser entirely and is
//! cheaper in memory. The `contentHash` for pages built this way is
//! computed from the structured record's canonical form, not the raw JSON
//! (see [`canonical_form`]).

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::models::{StructuredDocumentationPage, StructuredParameter};

/// Rewrite a rendered documentation URL into its JSON-API counterpart, if
/// the site follows Apple's DocC convention of mirroring every
/// `/documentation/...` page at `/tutorials/data/documentation/....json`.
/// Returns `None` for URLs with no known JSON counterpart.
pub fn derive_json_endpoint(url: &str) -> Option<String> {
    let (prefix, path) = url.split_once("/documentation/")?;
    Some(format!("{prefix}/tutorials/data/documentation/{path}.json"))
}

/// Parse a DocC-style JSON payload into a [`StructuredDocumentationPage`].
/// Fails soft: fields that are absent or malformed are left empty.
pub fn parse_structured_page(json: &Value) -> StructuredDocumentationPage {
    let title = json
        .pointer("/metadata/title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let abstract_ = json
        .pointer("/abstract")
        .and_then(Value::as_array)
        .map(render_inline_content_array)
        .unwrap_or_default();

    let declaration = json
        .pointer("/primaryContentSections")
        .and_then(Value::as_array)
        .and_then(|sections| {
            sections.iter().find_map(|s| {
                s.get("declarations")
                    .and_then(Value::as_array)
                    .and_then(|decls| decls.first())
                    .and_then(|d| d.get("tokens"))
                    .and_then(Value::as_array)
                    .map(render_token_array)
            })
        });

    let parameters = json
        .pointer("/primaryContentSections")
        .and_then(Value::as_array)
        .and_then(|sections| {
            sections.iter().find_map(|s| s.get("parameters").and_then(Value::as_array))
        })
        .map(|params| {
            params
                .iter()
                .map(|p| StructuredParameter {
                    name: p.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                    description: p
                        .get("content")
                        .and_then(Value::as_array)
                        .map(render_inline_content_array)
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    let return_value = json
        .pointer("/primaryContentSections")
        .and_then(Value::as_array)
        .and_then(|sections| {
            sections
                .iter()
                .find_map(|s| s.get("returns").and_then(Value::as_array))
                .map(render_inline_content_array)
        });

    let discussion = json
        .pointer("/primaryContentSections")
        .and_then(Value::as_array)
        .and_then(|sections| {
            sections
                .iter()
                .find(|s| s.get("kind").and_then(Value::as_str) == Some("content"))
                .and_then(|s| s.get("content"))
                .and_then(Value::as_array)
                .map(render_inline_content_array)
        });

    let availability = json.pointer("/metadata/platforms").and_then(Value::as_array).map(|platforms| {
        platforms
            .iter()
            .filter_map(|p| {
                let name = p.get("name").and_then(Value::as_str)?;
                let introduced = p.get("introducedAt").and_then(Value::as_str)?;
                Some(format!("{name} {introduced}+"))
            })
            .collect::<Vec<_>>()
            .join(", ")
    });

    let relationships = json
        .pointer("/relationshipsSections")
        .and_then(Value::as_array)
        .map(|sections| {
            sections
                .iter()
                .filter_map(|s| s.get("title").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let topics = json
        .pointer("/topicSections")
        .and_then(Value::as_array)
        .map(|sections| {
            sections
                .iter()
                .filter_map(|s| s.get("title").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    StructuredDocumentationPage {
        title,
        abstract_,
        declaration,
        parameters,
        return_value,
        discussion,
        availability,
        relationships,
        topics,
    }
}

fn render_inline_content_array(items: &[Value]) -> String {
    items
        .iter()
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_token_array(tokens: &[Value]) -> String {
    tokens
        .iter()
        .filter_map(|t| t.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("")
}

/// Render the structured page back into Markdown for backward-compatible
/// on-disk storage (spec §4.1: "also emits a Markdown rendering").
pub fn render_markdown(page: &StructuredDocumentationPage) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", page.title));
    if !page.abstract_.is_empty() {
        out.push_str(&page.abstract_);
        out.push_str("\n\n");
    }
    if let Some(decl) = &page.declaration {
        out.push_str("```swift\n");
        out.push_str(decl);
        out.push_str("\n```\n\n");
    }
    if !page.parameters.is_empty() {
        out.push_str("## Parameters\n\n");
        for p in &page.parameters {
            out.push_str(&format!("- `{}`: {}\n", p.name, p.description));
        }
        out.push('\n');
    }
    if let Some(ret) = &page.return_value {
        out.push_str(&format!("## Return Value\n\n{ret}\n\n"));
    }
    if let Some(discussion) = &page.discussion {
        out.push_str(&format!("## Discussion\n\n{discussion}\n\n"));
    }
    out.trim().to_string()
}

/// Canonical form used to derive `contentHash` for JSON-API-sourced pages:
/// a deterministic, field-ordered textual representation of the structured
/// record rather than the raw JSON payload (whose key order and whitespace
/// may vary between fetches of unchanged content).
pub fn canonical_form(page: &StructuredDocumentationPage) -> String {
    let mut parts = vec![page.title.clone(), page.abstract_.clone()];
    if let Some(d) = &page.declaration {
        parts.push(d.clone());
    }
    for p in &page.parameters {
        parts.push(format!("{}:{}", p.name, p.description));
    }
    if let Some(r) = &page.return_value {
        parts.push(r.clone());
    }
    if let Some(d) = &page.discussion {
        parts.push(d.clone());
    }
    parts.join("\u{1}")
}

pub fn content_hash(page: &StructuredDocumentationPage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_form(page).as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_title_and_abstract() {
        let payload = json!({
            "metadata": {"title": "View"},
            "abstract": [{"text": "A piece of UI."}]
        });
        let page = parse_structured_page(&payload);
        assert_eq!(page.title, "View");
        assert_eq!(page.abstract_, "A piece of UI.");
    }

    #[test]
    fn missing_fields_produce_empty_defaults() {
        let page = parse_structured_page(&json!({}));
        assert_eq!(page.title, "");
        assert!(page.parameters.is_empty());
    }

    #[test]
    fn content_hash_is_stable_for_equivalent_structured_record() {
        let a = parse_structured_page(&json!({"metadata": {"title": "X"}, "abstract": [{"text": "Y"}]}));
        let b = parse_structured_page(&json!({"abstract": [{"text": "Y"}], "metadata": {"title": "X"}}));
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn derives_json_endpoint_from_documentation_url() {
        let endpoint = derive_json_endpoint("https://developer.apple.com/documentation/swiftui/view");
        assert_eq!(
            endpoint.as_deref(),
            Some("https://developer.apple.com/tutorials/data/documentation/swiftui/view.json")
        );
    }

    #[test]
    fn no_json_endpoint_for_non_documentation_url() {
        assert!(derive_json_endpoint("https://developer.apple.com/design/human-interface-guidelines").is_none());
    }
}
