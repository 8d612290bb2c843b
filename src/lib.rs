//! # Cupertino
//!
//! **A local, searchable knowledge base of Apple platform documentation and
//! sample code, served over a CLI and an MCP stdio server.**
//!
//! Cupertino crawls documentation sites and sample-code archives, converts
//! what it finds into two on-disk SQLite FTS5 indexes, and exposes both
//! through a command-line interface and a JSON-RPC server implementing the
//! Model Context Protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌───────────┐   ┌────────────┐
//! │ crawl::*   │──▶│ converters  │──▶│ doc_index  │──▶│ unified::* │
//! │ (engine,   │   │ (html_md,   │   │ sample_    │   │ (orchestr, │
//! │  metadata, │   │  json_api,  │   │ index      │   │  format)   │
//! │  renderer) │   │  swift_sym) │   │ (FTS5)     │   │            │
//! └────────────┘   └─────────────┘   └───────────┘   └─────┬──────┘
//!                                                            │
//!                                        ┌───────────────────┼────────┐
//!                                        ▼                            ▼
//!                                   ┌──────────┐                ┌──────────┐
//!                                   │   CLI    │                │   MCP    │
//!                                   │(cupertino)│               │ (stdio)  │
//!                                   └──────────┘                └──────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. The **crawl engine** ([`crawl::engine`]) fetches pages via a
//!    [`crawl::renderer::FetchRenderer`], tracking visited URLs and queue
//!    depth in [`crawl::session`], checkpointing to `metadata.json` via
//!    [`crawl::metadata`].
//! 2. **Converters** ([`converters`]) turn fetched HTML/JSON/Swift source
//!    into [`models::Document`]s and [`models::ExtractedFile`]s.
//! 3. Documents are upserted into the **doc index** ([`doc_index`]); sample
//!    projects into the **sample index** ([`sample_index`]) — both WAL-mode
//!    SQLite FTS5 schemas.
//! 4. The **unified orchestrator** ([`unified::orchestrator`]) fans a query
//!    out across sources and merges; [`unified::format`] renders the result
//!    as text, JSON, or markdown.
//! 5. Results are exposed via the **CLI** (`cupertino search` et al.) and
//!    the **MCP stdio server** ([`mcp`]).
//!
//! ## Quick Start
//!
//! ```bash
//! cupertino fetch --type docs --framework SwiftUI
//! cupertino index
//! cupertino search "async sequence" --format markdown
//! cupertino serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types shared across the crawl engine and both indexes |
//! | [`errors`] | Typed error taxonomy for MCP dispatch and CLI exit-code mapping |
//! | [`summary`] | Paragraph-boundary document summary derivation |
//! | [`converters`] | HTML→Markdown, JSON-API→structured page, Swift→symbols |
//! | [`crawl`] | Crawl state, session checkpointing, fetch/retry, the crawl loop |
//! | [`doc_index`] | Documentation FTS5 schema, ingest, ranked search |
//! | [`sample_index`] | Sample-project FTS5 schema, ZIP ingest, cleanup, search |
//! | [`unified`] | Multi-source fan-out orchestrator and output formatters |
//! | [`mcp`] | MCP stdio JSON-RPC server and tool registry |
//! | [`catalogs`] | Static priority-package and archive-guide tables |
//! | [`remote_save`] | `save --remote` checkpoint file |
//! | [`doctor`] | `doctor` command: index health report |
//! | [`progress`] | Crawl-session stderr logging with memory-usage prefix |
//!
//! ## Configuration
//!
//! Cupertino is configured via a TOML file (default: `<base_dir>/config.toml`).
//! See [`config`] for all available options and [`config::load_config`] for
//! validation rules.

pub mod catalogs;
pub mod config;
pub mod converters;
pub mod crawl;
pub mod doc_index;
pub mod doctor;
pub mod errors;
pub mod mcp;
pub mod models;
pub mod progress;
pub mod remote_save;
pub mod sample_index;
pub mod summary;
pub mod unified;
