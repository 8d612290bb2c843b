//! Crawl engine: the single-writer state machine that walks a
//! documentation site (spec §4.3).
//!
//! Conceptually the loop passes through `Idle -> Fetching -> Parsing ->
//! Persisting -> Delaying -> Idle` once per URL, terminating when the
//! queue empties or `max_pages` is reached. [`CrawlState`] exists for
//! progress reporting; the driving loop below thread data through local
//! bindings rather than the enum, since each step's output is the next
//! step's only input.

use std::path::PathBuf;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{info, warn};
use url::Url;

use crate::converters::html_markdown::{html_to_markdown, infer_framework_from_url};
use crate::converters::json_api;
use crate::crawl::metadata::CrawlMetadata;
use crate::crawl::renderer::FetchRenderer;
use crate::crawl::retry::{fetch_with_retry, should_recycle_proactively};
use crate::crawl::session::Session;
use crate::errors::CupertinoError;
use crate::models::{build_uri, PageMetadata};

/// Labels the current step for progress reporting only; the loop itself
/// does not branch on this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    Fetching(String),
    Parsing(String),
    Persisting(String),
    Delaying,
    Terminated,
}

pub struct CrawlOptions {
    pub source: String,
    pub start_url: String,
    pub allowed_prefixes: Vec<String>,
    pub output_directory: PathBuf,
    pub max_pages: usize,
    pub max_depth: usize,
    pub request_delay: Duration,
    pub renderer_recycle_every: u32,
    pub force_recrawl: bool,
    pub checkpoint_interval_secs: u64,
    /// Prefer the source's JSON-API endpoint over HTML rendering when one
    /// can be derived for a URL (spec §4.1, §4.3 step 3).
    pub prefer_json_api: bool,
}

#[derive(Debug, Default)]
pub struct CrawlSummary {
    pub total_pages: u64,
    pub skipped_pages: u64,
    pub errors: u64,
}

/// Run the crawl loop to completion or cancellation.
///
/// Resumes from a checkpointed session if one is present in `metadata`;
/// otherwise starts a fresh session at `opts.start_url`.
pub async fn run(
    opts: &CrawlOptions,
    metadata: &CrawlMetadata,
    renderer: &mut dyn FetchRenderer,
) -> Result<CrawlSummary, CupertinoError> {
    let mut session = match metadata.session_state().await {
        Some(checkpoint) if checkpoint.is_active => Session::from_checkpoint(&checkpoint),
        _ => Session::new(opts.start_url.clone(), opts.output_directory.clone()),
    };

    std::fs::create_dir_all(&opts.output_directory).map_err(|e| {
        CupertinoError::PersistenceError(format!(
            "creating output directory {}: {e}",
            opts.output_directory.display()
        ))
    })?;

    let mut summary = CrawlSummary::default();
    let mut successful_fetches = 0u32;

    loop {
        if session.queue.is_empty() || session.visited.len() >= opts.max_pages {
            break;
        }

        let Some((url, depth)) = session.queue.pop_front() else {
            break;
        };
        let url = normalize_url(&url);
        if session.visited.contains(&url) {
            continue;
        }
        session.visited.insert(url.clone());

        // Fetching + Parsing: prefer the JSON endpoint when the source has
        // one (spec §4.3 step 3), falling back to HTML rendering when the
        // page has no JSON counterpart or the JSON fetch fails.
        let fetched = match fetch_page(renderer, &url, &opts.allowed_prefixes, opts.prefer_json_api).await {
            Ok(fetched) => {
                successful_fetches += 1;
                if should_recycle_proactively(successful_fetches, opts.renderer_recycle_every) {
                    renderer.recycle().await?;
                }
                fetched
            }
            Err(e) => {
                warn!(url = %url, error = %e, "fetch failed");
                metadata.record_framework_error(&opts.source).await;
                summary.errors += 1;
                delay_and_checkpoint(opts, metadata, &session).await?;
                continue;
            }
        };

        let FetchedPage { markdown, content_hash, links } = fetched;
        let framework = infer_framework_from_url(&url);
        let slug = slug_from_url(&url);
        let uri = build_uri(&opts.source, &framework, &slug);
        let file_path = opts.output_directory.join(&framework).join(format!("{slug}.md"));

        let should_write = metadata
            .should_recrawl(
                &url,
                &content_hash,
                &file_path.to_string_lossy(),
                opts.force_recrawl,
            )
            .await;

        if !should_write {
            summary.skipped_pages += 1;
        } else {
            // Persisting
            match persist_page(&file_path, &markdown) {
                Ok(()) => {
                    let is_new = metadata.page(&url).await.is_none();
                    metadata
                        .update_page(
                            url.clone(),
                            PageMetadata {
                                uri: uri.clone(),
                                source: opts.source.clone(),
                                framework: framework.clone(),
                                file_path: file_path.to_string_lossy().to_string(),
                                content_hash,
                                depth,
                                last_crawled: chrono::Utc::now(),
                            },
                        )
                        .await
                        .map_err(|e| CupertinoError::PersistenceError(e.to_string()))?;
                    metadata.record_framework_page(&framework, is_new).await;
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "persist failed");
                    summary.errors += 1;
                }
            }
        }
        summary.total_pages += 1;

        if depth + 1 <= opts.max_depth {
            for link in links {
                if !session.visited.contains(&link) {
                    session.queue.push_back((link, depth + 1));
                }
            }
        }

        delay_and_checkpoint(opts, metadata, &session).await?;
    }

    metadata.mark_framework_complete(&opts.source).await;
    metadata
        .clear_session_state()
        .await
        .map_err(|e| CupertinoError::PersistenceError(e.to_string()))?;
    metadata
        .record_stats(summary.total_pages, summary.skipped_pages, summary.errors)
        .await;

    info!(
        source = %opts.source,
        total = summary.total_pages,
        skipped = summary.skipped_pages,
        errors = summary.errors,
        "crawl complete"
    );

    Ok(summary)
}

struct FetchedPage {
    markdown: String,
    content_hash: String,
    links: Vec<String>,
}

/// Fetch and parse one page, preferring the JSON-API path when `prefer_json`
/// is set and the URL has a derivable JSON counterpart; falls back to HTML
/// rendering (via `renderer.fetch`, with its own retry policy) whenever the
/// JSON path isn't available or fails.
async fn fetch_page(
    renderer: &mut dyn FetchRenderer,
    url: &str,
    allowed_prefixes: &[String],
    prefer_json: bool,
) -> Result<FetchedPage, CupertinoError> {
    if prefer_json {
        if let Some(json_url) = json_api::derive_json_endpoint(url) {
            match renderer.fetch_json(&json_url).await {
                Ok(json) => {
                    let page = json_api::parse_structured_page(&json);
                    return Ok(FetchedPage {
                        markdown: json_api::render_markdown(&page),
                        content_hash: json_api::content_hash(&page),
                        links: extract_links_from_json(&json, url, allowed_prefixes),
                    });
                }
                Err(e) => {
                    warn!(url = %json_url, error = %e, "JSON-API fetch failed, falling back to HTML");
                }
            }
        }
    }

    let html = fetch_with_retry(renderer, url).await?;
    let markdown = html_to_markdown(&html);
    Ok(FetchedPage {
        content_hash: hash_content(&markdown),
        links: extract_links(&html, url, allowed_prefixes),
        markdown,
    })
}

/// Extract same-site link targets from a DocC JSON payload's `references`
/// map, each keyed by a `doc://` identifier and carrying a relative `url`.
fn extract_links_from_json(json: &serde_json::Value, base_url: &str, allowed_prefixes: &[String]) -> Vec<String> {
    let Some(references) = json.get("references").and_then(serde_json::Value::as_object) else {
        return Vec::new();
    };
    let base = Url::parse(base_url).ok();

    references
        .values()
        .filter_map(|r| r.get("url").and_then(serde_json::Value::as_str))
        .filter_map(|href| match &base {
            Some(base) => base.join(href).ok().map(|u| u.to_string()),
            None => Url::parse(href).ok().map(|u| u.to_string()),
        })
        .map(|u| normalize_url(&u))
        .filter(|u| allowed_prefixes.is_empty() || allowed_prefixes.iter().any(|p| u.starts_with(p)))
        .collect()
}

async fn delay_and_checkpoint(
    opts: &CrawlOptions,
    metadata: &CrawlMetadata,
    session: &Session,
) -> Result<(), CupertinoError> {
    tokio::time::sleep(opts.request_delay).await;
    let checkpoint = session.to_checkpoint();
    metadata
        .auto_save_if_needed(&checkpoint, opts.checkpoint_interval_secs)
        .await
        .map_err(|e| CupertinoError::PersistenceError(e.to_string()))?;
    Ok(())
}

fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn slug_from_url(url: &str) -> String {
    url.rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("index")
        .split(['?', '#'])
        .next()
        .unwrap_or("index")
        .to_string()
}

fn extract_links(html: &str, base_url: &str, allowed_prefixes: &[String]) -> Vec<String> {
    use scraper::{Html, Selector};
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let base = Url::parse(base_url).ok();

    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| match &base {
            Some(base) => base.join(href).ok().map(|u| u.to_string()),
            None => Url::parse(href).ok().map(|u| u.to_string()),
        })
        .map(|u| normalize_url(&u))
        .filter(|u| allowed_prefixes.is_empty() || allowed_prefixes.iter().any(|p| u.starts_with(p)))
        .collect()
}

fn persist_page(path: &std::path::Path, content: &str) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FakeRenderer {
        json: Option<serde_json::Value>,
        html: String,
    }

    #[async_trait]
    impl FetchRenderer for FakeRenderer {
        async fn fetch(&mut self, _url: &str) -> Result<String, CupertinoError> {
            Ok(self.html.clone())
        }

        async fn recycle(&mut self) -> Result<(), CupertinoError> {
            Ok(())
        }

        async fn fetch_json(&mut self, url: &str) -> Result<serde_json::Value, CupertinoError> {
            self.json.clone().ok_or_else(|| CupertinoError::NotFound(url.to_string()))
        }
    }

    #[tokio::test]
    async fn fetch_page_prefers_json_when_available() {
        let mut renderer = FakeRenderer {
            json: Some(serde_json::json!({"metadata": {"title": "View"}, "abstract": [{"text": "A view."}]})),
            html: "<html><body>fallback</body></html>".to_string(),
        };
        let fetched = fetch_page(
            &mut renderer,
            "https://developer.apple.com/documentation/swiftui/view",
            &[],
            true,
        )
        .await
        .unwrap();
        assert!(fetched.markdown.contains("# View"));
        assert!(fetched.markdown.contains("A view."));
    }

    #[tokio::test]
    async fn fetch_page_falls_back_to_html_when_json_fetch_fails() {
        let mut renderer = FakeRenderer {
            json: None,
            html: "<html><body><h1>Fallback</h1></body></html>".to_string(),
        };
        let fetched = fetch_page(
            &mut renderer,
            "https://developer.apple.com/documentation/swiftui/view",
            &[],
            true,
        )
        .await
        .unwrap();
        assert!(fetched.markdown.contains("Fallback"));
    }

    #[tokio::test]
    async fn fetch_page_uses_html_when_json_api_not_preferred() {
        let mut renderer = FakeRenderer {
            json: Some(serde_json::json!({"metadata": {"title": "Should not be used"}})),
            html: "<html><body><h1>Rendered</h1></body></html>".to_string(),
        };
        let fetched = fetch_page(
            &mut renderer,
            "https://developer.apple.com/documentation/swiftui/view",
            &[],
            false,
        )
        .await
        .unwrap();
        assert!(fetched.markdown.contains("Rendered"));
    }

    #[test]
    fn slug_from_url_strips_query_and_fragment() {
        assert_eq!(slug_from_url("https://x/documentation/swiftui/view?x=1"), "view");
        assert_eq!(slug_from_url("https://x/documentation/swiftui/view#frag"), "view");
    }

    #[test]
    fn normalize_url_strips_fragment() {
        assert_eq!(normalize_url("https://x/y#section"), "https://x/y");
    }

    #[test]
    fn extract_links_filters_by_allowed_prefix() {
        let html = r#"<a href="/documentation/swiftui/view">a</a><a href="https://other.com/x">b</a>"#;
        let links = extract_links(
            html,
            "https://developer.apple.com/",
            &["https://developer.apple.com/documentation".to_string()],
        );
        assert_eq!(links.len(), 1);
        assert!(links[0].contains("swiftui/view"));
    }
}
