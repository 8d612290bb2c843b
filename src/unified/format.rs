//! Pure output formatters for unified search results (spec §4.6).
//!
//! Text/JSON/markdown formatters take only the merged result set; they
//! never re-enter the indexes. The markdown formatter is shared verbatim
//! between the CLI `search` command and the `search`/`search_docs` MCP
//! tools so both paths are byte-identical.

use serde::Serialize;

use crate::models::SearchResultItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" => Ok(OutputFormat::Markdown),
            other => anyhow::bail!("unrecognized format {other:?}, expected text|json|markdown"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PerSourceCount {
    pub source: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnifiedSearchResult {
    pub items: Vec<SearchResultItem>,
    pub per_source_counts: Vec<PerSourceCount>,
    pub total_count: usize,
}

/// One teaser slot: a source name plus up to a handful of hits from it.
#[derive(Debug, Clone, Serialize)]
pub struct TeaserSlot {
    pub source: String,
    pub items: Vec<SearchResultItem>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TeaserResults {
    pub slots: Vec<TeaserSlot>,
}

pub fn format_result(result: &UnifiedSearchResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_text(result),
        OutputFormat::Json => format_json(result),
        OutputFormat::Markdown => format_markdown(result),
    }
}

fn format_text(result: &UnifiedSearchResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} result(s)\n", result.total_count));
    for item in &result.items {
        out.push_str(&format!(
            "- [{}/{}] {} ({})\n  {}\n",
            item.source, item.framework, item.title, item.availability_string, item.summary
        ));
    }
    out
}

fn format_json(result: &UnifiedSearchResult) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
}

fn format_markdown(result: &UnifiedSearchResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("**{} result(s)**\n\n", result.total_count));
    for item in &result.items {
        out.push_str(&format!(
            "### {}\n*{} / {}* — {}\n\n{}\n\n",
            item.title, item.source, item.framework, item.availability_string, item.summary
        ));
    }
    out
}

pub fn format_teasers_markdown(teasers: &TeaserResults) -> String {
    let mut out = String::new();
    for slot in &teasers.slots {
        if slot.items.is_empty() {
            continue;
        }
        out.push_str(&format!("**More from {}**\n\n", slot.source));
        for item in &slot.items {
            out.push_str(&format!("- {}\n", item.title));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UnifiedSearchResult {
        UnifiedSearchResult {
            items: vec![SearchResultItem {
                uri: "apple-docs://SwiftUI/view".into(),
                source: "apple-docs".into(),
                framework: "SwiftUI".into(),
                title: "View".into(),
                summary: "A type that represents a view.".into(),
                summary_truncated: false,
                availability_string: "iOS 13.0+".into(),
                rank: 0.1,
            }],
            per_source_counts: vec![PerSourceCount { source: "apple-docs".into(), count: 1 }],
            total_count: 1,
        }
    }

    #[test]
    fn text_format_includes_title_and_count() {
        let text = format_result(&sample(), OutputFormat::Text);
        assert!(text.contains("1 result"));
        assert!(text.contains("View"));
    }

    #[test]
    fn json_format_round_trips() {
        let json = format_result(&sample(), OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["total_count"], 1);
    }

    #[test]
    fn markdown_format_uses_heading_per_item() {
        let md = format_result(&sample(), OutputFormat::Markdown);
        assert!(md.starts_with("**1 result"));
        assert!(md.contains("### View"));
    }

    #[test]
    fn format_from_str_rejects_unknown() {
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
