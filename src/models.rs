//! Core data models shared across the crawl engine, the two indexes, and
//! the unified search orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the eight ingestion categories enumerated in the data model.
/// `samples` is the sample-code project index rather than a doc-index
/// source; the unified orchestrator queries it through a separate path
/// but still fans out across it and reports it in per-source counts.
pub const ALL_SOURCES: &[&str] = &[
    "apple-docs",
    "apple-archive",
    "swift-evolution",
    "swift-org",
    "swift-book",
    "hig",
    "packages",
    "samples",
];

/// A document in the doc index (spec §3 "Documents").
///
/// `uri` is the stable identifier, `<source>://<framework>/<slug>`, and is
/// unique across the lifetime of the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub uri: String,
    pub source: String,
    pub framework: String,
    pub language: Option<String>,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub summary_truncated: bool,
    pub file_path: String,
    pub content_hash: String,
    pub last_crawled: DateTime<Utc>,
    pub json_data: Option<String>,
    pub availability: PlatformAvailability,
}

/// Per-platform minimum-availability fields, stored as dotted version
/// strings and compared as normalized `(major, minor)` tuples.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformAvailability {
    pub min_ios: Option<String>,
    pub min_macos: Option<String>,
    pub min_tvos: Option<String>,
    pub min_watchos: Option<String>,
    pub min_visionos: Option<String>,
}

impl PlatformAvailability {
    /// Parse a free-text availability string like `"iOS 13.0+, macOS 10.15+"`
    /// into per-platform minima.
    pub fn parse(availability: &str) -> Self {
        let mut out = Self::default();
        for clause in availability.split(',') {
            let clause = clause.trim().trim_end_matches('+').trim();
            let Some((platform, version)) = clause.split_once(' ') else {
                continue;
            };
            let version = version.trim().to_string();
            match platform.to_lowercase().as_str() {
                "ios" => out.min_ios = Some(version),
                "macos" => out.min_macos = Some(version),
                "tvos" => out.min_tvos = Some(version),
                "watchos" => out.min_watchos = Some(version),
                "visionos" => out.min_visionos = Some(version),
                _ => {}
            }
        }
        out
    }
}

/// Parse a dotted version string into a normalized `(major, minor)` tuple,
/// stripping any pre-release suffix (e.g. `"13.0-beta"` -> `(13, 0)`).
/// Resolves the platform-minimum comparator open question: comparison is
/// inclusive (`candidate >= minimum`) on this tuple.
pub fn normalize_version(version: &str) -> (u32, u32) {
    let core = version.split(['-', '+']).next().unwrap_or(version);
    let mut parts = core.split('.');
    let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    (major, minor)
}

/// `true` if `candidate` satisfies a `min` constraint: `candidate >= min`.
pub fn satisfies_minimum(candidate: &str, min: &str) -> bool {
    normalize_version(candidate) >= normalize_version(min)
}

/// A ranked search hit from the doc index (spec §4.4 `search`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub uri: String,
    pub source: String,
    pub framework: String,
    pub title: String,
    pub summary: String,
    pub summary_truncated: bool,
    pub availability_string: String,
    pub rank: f64,
}

/// Framework -> document count, as returned by `listFrameworks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkCount {
    pub framework: String,
    pub document_count: i64,
}

// ───────────────────────────── Sample index ─────────────────────────────

/// A sample-code project (spec §3 "Projects, Files, Symbols, Imports").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub frameworks: Vec<String>,
    pub readme: Option<String>,
    pub web_url: Option<String>,
    pub zip_filename: Option<String>,
    pub file_count: i64,
    pub total_size: i64,
    pub indexed_at: DateTime<Utc>,
}

/// A file belonging to a project. `(project_id, path)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub project_id: String,
    pub path: String,
    pub filename: String,
    pub folder: String,
    pub extension: String,
    pub content: String,
    pub size: i64,
}

/// Extensions eligible for sample indexing (spec §3 File allow-list).
pub const INDEXABLE_EXTENSIONS: &[&str] = &[
    "swift",
    "h",
    "m",
    "mm",
    "c",
    "cpp",
    "hpp",
    "metal",
    "plist",
    "json",
    "strings",
    "entitlements",
    "xcconfig",
    "md",
    "txt",
    "rtf",
    "mlmodel",
    "storyboard",
    "xib",
];

/// Maximum file size (bytes) eligible for sample indexing.
pub const MAX_INDEXABLE_FILE_SIZE: u64 = 1024 * 1024;

/// A Swift (or Obj-C) declaration extracted from a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub file_id: i64,
    pub name: String,
    pub kind: SymbolKind,
    pub line: i64,
    pub column: i64,
    pub is_async: bool,
    pub is_throws: bool,
    pub is_public: bool,
    pub is_static: bool,
    pub attributes: Vec<String>,
    pub conformances: Vec<String>,
    pub generic_parameters: Vec<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Struct,
    Enum,
    Actor,
    Protocol,
    Extension,
    Function,
    Method,
    Initializer,
    Property,
    Subscript,
    Typealias,
    Associatedtype,
    Case,
    Operator,
    Macro,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::Actor => "actor",
            SymbolKind::Protocol => "protocol",
            SymbolKind::Extension => "extension",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Initializer => "initializer",
            SymbolKind::Property => "property",
            SymbolKind::Subscript => "subscript",
            SymbolKind::Typealias => "typealias",
            SymbolKind::Associatedtype => "associatedtype",
            SymbolKind::Case => "case",
            SymbolKind::Operator => "operator",
            SymbolKind::Macro => "macro",
        }
    }
}

/// A module import statement extracted from a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    pub file_id: i64,
    pub module_name: String,
    pub line: i64,
    pub is_exported: bool,
}

/// Result of running the Swift symbol/import extractor over one file.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFile {
    pub symbols: Vec<ExtractedSymbol>,
    pub imports: Vec<ExtractedImport>,
    pub has_errors: bool,
}

/// A symbol prior to being assigned a `file_id` by the indexer.
#[derive(Debug, Clone)]
pub struct ExtractedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub line: i64,
    pub column: i64,
    pub is_async: bool,
    pub is_throws: bool,
    pub is_public: bool,
    pub is_static: bool,
    pub attributes: Vec<String>,
    pub conformances: Vec<String>,
    pub generic_parameters: Vec<String>,
    pub signature: Option<String>,
}

/// An import prior to being assigned a `file_id` by the indexer.
#[derive(Debug, Clone)]
pub struct ExtractedImport {
    pub module_name: String,
    pub line: i64,
    pub is_exported: bool,
}

/// A file-search hit, carrying a bolded FTS5 snippet (spec §4.5 `searchFiles`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSearchResult {
    pub project_id: String,
    pub path: String,
    pub filename: String,
    pub snippet: String,
    pub rank: f64,
}

// ───────────────────────────── Structured pages ─────────────────────────

/// Output of the JSON-API converter (spec §4.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredDocumentationPage {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_: String,
    pub declaration: Option<String>,
    pub parameters: Vec<StructuredParameter>,
    pub return_value: Option<String>,
    pub discussion: Option<String>,
    pub availability: Option<String>,
    pub relationships: Vec<String>,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredParameter {
    pub name: String,
    pub description: String,
}

// ───────────────────────────── Crawl metadata ────────────────────────────

/// Per-URL crawl record (spec §3 "Page metadata").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMetadata {
    pub uri: String,
    pub source: String,
    pub framework: String,
    pub file_path: String,
    pub content_hash: String,
    pub depth: usize,
    pub last_crawled: DateTime<Utc>,
}

/// Build a document's stable identifier, `<source>://<framework>/<slug>`
/// (spec §3 "Documents"). Used at crawl time to populate
/// [`PageMetadata::uri`] and at save time to populate `Document.uri`, so
/// the two never diverge.
pub fn build_uri(source: &str, framework: &str, slug: &str) -> String {
    format!("{source}://{framework}/{slug}")
}

/// Per-framework crawl counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameworkStats {
    pub pages: u64,
    pub new: u64,
    pub updated: u64,
    pub errors: u64,
    pub status: CrawlStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CrawlStatus {
    #[default]
    InProgress,
    Complete,
}

/// Aggregate crawl statistics persisted in the metadata file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlStatistics {
    pub total_pages: u64,
    pub skipped_pages: u64,
    pub errors: u64,
}
