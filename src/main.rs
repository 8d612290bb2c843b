//! `cupertino` CLI (spec §6).
//!
//! `fetch` crawls a source into markdown files under `<base_dir>/pages/`;
//! `save` rebuilds the doc index from those files; `index` (re)ingests
//! sample-code ZIPs/directories into the sample index; `search`/`read`/
//! `list-frameworks`/`list-samples`/`search-samples`/`read-sample`/
//! `read-sample-file` query the indexes; `serve` runs the MCP stdio server;
//! `doctor` reports index health; `cleanup` strips junk from a sample ZIP.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use cupertino::catalogs;
use cupertino::config::{self, Config, CrawlSourceConfig};
use cupertino::crawl::engine::{self, CrawlOptions};
use cupertino::crawl::metadata::CrawlMetadata;
use cupertino::crawl::renderer::HttpRenderer;
use cupertino::doc_index;
use cupertino::doctor;
use cupertino::mcp::server::McpServer;
use cupertino::mcp::tools::{ToolContext, ToolRegistry};
use cupertino::models::{Document, PlatformAvailability};
use cupertino::progress;
use cupertino::remote_save::{RemoteSavePhase, RemoteSaveState};
use cupertino::sample_index;
use cupertino::summary;
use cupertino::unified::format::{format_result, format_teasers_markdown, OutputFormat};
use cupertino::unified::orchestrator::{self, OrchestratorOptions};

#[derive(Parser)]
#[command(
    name = "cupertino",
    about = "Cupertino — a local, searchable knowledge base of Apple platform documentation and sample code",
    version
)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl one source (or all configured sources) into markdown files
    Fetch {
        /// apple-docs, apple-archive, swift-evolution, swift-org, swift-book, hig, packages, or all
        #[arg(long = "type")]
        source_type: String,

        /// Ignore content-hash/file-existence checks and recrawl everything
        #[arg(long)]
        force: bool,
    },

    /// Rebuild the doc index from crawled markdown files
    Save {
        /// Checkpoint a remote-release upload alongside the rebuild
        #[arg(long)]
        remote: bool,
    },

    /// (Re)ingest sample-code ZIPs/directories into the sample index
    Index {
        /// Reingest projects already present in the index
        #[arg(long)]
        force: bool,
    },

    /// Run the MCP stdio JSON-RPC server
    Serve,

    /// Search the doc index (single source or fanned out across all)
    Search {
        query: String,
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value = "text")]
        format: String,
        #[arg(long)]
        framework: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long = "include-archive")]
        include_archive: bool,
        #[arg(long = "min-ios")]
        min_ios: Option<String>,
        #[arg(long = "min-macos")]
        min_macos: Option<String>,
        #[arg(long = "min-tvos")]
        min_tvos: Option<String>,
        #[arg(long = "min-watchos")]
        min_watchos: Option<String>,
        #[arg(long = "min-visionos")]
        min_visionos: Option<String>,
    },

    /// Fetch the raw content of a document by URI
    Read {
        uri: String,
        #[arg(long, default_value = "markdown")]
        format: String,
    },

    /// List every framework in the doc index with its document count
    ListFrameworks,

    /// List indexed sample-code projects
    ListSamples {
        #[arg(long)]
        framework: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },

    /// Search indexed sample-code projects
    SearchSamples {
        query: String,
        #[arg(long = "search-files")]
        search_files: bool,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Fetch the README of an indexed sample-code project
    ReadSample { project_id: String },

    /// Fetch a single file's content within an indexed sample-code project
    ReadSampleFile { project_id: String, path: String },

    /// Report index health: sizes, document/project counts, per-framework breakdown
    Doctor,

    /// Strip junk paths (.git, .DS_Store, build output, ...) from a sample-code ZIP
    Cleanup {
        zip_path: PathBuf,
        #[arg(long)]
        replace: bool,
        #[arg(long = "dry-run")]
        dry_run: bool,
    },

    /// Write a starter config.toml at the given path
    Setup {
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Setup { .. }) {
        return run_setup(&cli.command).await;
    }

    let config = config::load_config(&cli.config)?;

    let result = match cli.command {
        Commands::Fetch { source_type, force } => run_fetch(&config, &source_type, force).await,
        Commands::Save { remote } => run_save(&config, remote).await,
        Commands::Index { force } => run_index(&config, force).await,
        Commands::Serve => run_serve(&config).await,
        Commands::Search {
            query,
            source,
            format,
            framework,
            language,
            limit,
            include_archive,
            min_ios,
            min_macos,
            min_tvos,
            min_watchos,
            min_visionos,
        } => {
            run_search(
                &config,
                &query,
                source,
                &format,
                framework,
                language,
                limit,
                include_archive,
                min_ios,
                min_macos,
                min_tvos,
                min_watchos,
                min_visionos,
            )
            .await
        }
        Commands::Read { uri, format } => run_read(&config, &uri, &format).await,
        Commands::ListFrameworks => run_list_frameworks(&config).await,
        Commands::ListSamples { framework, limit } => run_list_samples(&config, framework, limit).await,
        Commands::SearchSamples { query, search_files, limit } => {
            run_search_samples(&config, &query, search_files, limit).await
        }
        Commands::ReadSample { project_id } => run_read_sample(&config, &project_id).await,
        Commands::ReadSampleFile { project_id, path } => {
            run_read_sample_file(&config, &project_id, &path).await
        }
        Commands::Doctor => doctor::run_doctor(&config).await,
        Commands::Cleanup { zip_path, replace, dry_run } => run_cleanup(&zip_path, replace, dry_run),
        Commands::Setup { .. } => unreachable!("handled above"),
    };

    if let Err(e) = &result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn source_config<'a>(config: &'a Config, source: &str) -> Option<&'a CrawlSourceConfig> {
    match source {
        "apple-docs" => config.sources.apple_docs.as_ref(),
        "apple-archive" => config.sources.apple_archive.as_ref(),
        "swift-evolution" => config.sources.swift_evolution.as_ref(),
        "swift-org" => config.sources.swift_org.as_ref(),
        "swift-book" => config.sources.swift_book.as_ref(),
        "hig" => config.sources.hig.as_ref(),
        "packages" => config.sources.packages.as_ref(),
        _ => None,
    }
}

async fn run_fetch(config: &Config, source_type: &str, force: bool) -> Result<()> {
    progress::init_stderr_logging();

    let sources: Vec<&str> = if source_type == "all" {
        cupertino::models::ALL_SOURCES.to_vec()
    } else {
        vec![source_type]
    };

    for source in sources {
        let Some(source_cfg) = source_config(config, source) else {
            if source_type == "all" {
                continue;
            }
            bail!(
                "no [sources.{}] entry configured in {}",
                source.replace('-', "_"),
                config.base_dir.display()
            );
        };

        println!("Fetching {source}...");
        let metadata = CrawlMetadata::load_or_create(&config.metadata_path()).await?;
        let mut renderer = HttpRenderer::new()?;

        let opts = CrawlOptions {
            source: source.to_string(),
            start_url: source_cfg.start_url.clone(),
            allowed_prefixes: source_cfg.allowed_prefixes.clone(),
            output_directory: config.base_dir.join("pages").join(source),
            max_pages: config.crawl.max_pages,
            max_depth: config.crawl.max_depth,
            request_delay: std::time::Duration::from_millis(config.crawl.request_delay_ms),
            renderer_recycle_every: config.crawl.renderer_recycle_every,
            force_recrawl: force || config.crawl.force_recrawl,
            checkpoint_interval_secs: config.crawl.checkpoint_interval_secs,
            prefer_json_api: source_cfg.prefers_json_api,
        };

        let summary = engine::run(&opts, &metadata, &mut renderer).await?;
        println!(
            "  {} pages ({} skipped, {} errors)",
            summary.total_pages, summary.skipped_pages, summary.errors
        );

        if source == "swift-org" {
            generate_and_persist_priority_packages(config, &opts.output_directory)?;
        }
    }

    Ok(())
}

/// Derived-task step (spec §4.3 "Derived tasks", §4.8 "post-crawl
/// generator"): after a Swift.org crawl, scan the crawled markdown for
/// `github.com/<owner>/<repo>` references and persist a refreshed priority
/// package list for later `fetch --type packages` runs to consume.
fn generate_and_persist_priority_packages(config: &Config, swift_org_pages_dir: &Path) -> Result<()> {
    let pages: Vec<String> = walkdir::WalkDir::new(swift_org_pages_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|ext| ext.to_str()) == Some("md"))
        .filter_map(|e| std::fs::read_to_string(e.path()).ok())
        .collect();

    let packages = catalogs::generate_priority_packages_from_swift_org(&pages);
    cupertino::crawl::metadata::atomic_write_json(&config.priority_packages_path(), &packages)?;
    println!(
        "  derived {} priority package(s) from swift.org at {}",
        packages.len(),
        config.priority_packages_path().display()
    );
    Ok(())
}

/// Derive the first `#`-heading line as a document title, if present.
fn extract_title(content: &str) -> Option<String> {
    content
        .lines()
        .find(|l| l.trim_start().starts_with('#'))
        .map(|l| l.trim_start_matches('#').trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Derive an availability clause from a `> Note: ... iOS 13.0+ ...`-shaped
/// line, if the page happened to render one (best-effort; many pages carry
/// none).
fn extract_availability_line(content: &str) -> Option<String> {
    content
        .lines()
        .find(|l| l.contains("iOS") || l.contains("macOS") || l.contains("tvOS"))
        .map(|l| l.trim().to_string())
}

async fn run_save(config: &Config, remote: bool) -> Result<()> {
    progress::init_stderr_logging();

    let pool = doc_index::schema::rebuild(&config.docs_db_path()).await?;
    let metadata = CrawlMetadata::load_or_create(&config.metadata_path()).await?;
    let pages = metadata.all_pages().await;

    let mut indexed = 0u64;
    for page in pages.values() {
        let Ok(content) = std::fs::read_to_string(&page.file_path) else {
            continue;
        };
        let title = extract_title(&content).unwrap_or_else(|| page.framework.clone());
        let (doc_summary, summary_truncated) =
            summary::derive_summary(&content, config.retrieval.summary_word_cap);
        let availability = extract_availability_line(&content)
            .map(|l| PlatformAvailability::parse(&l))
            .unwrap_or_default();

        let doc = Document {
            uri: page.uri.clone(),
            source: page.source.clone(),
            framework: page.framework.clone(),
            language: None,
            title,
            content,
            summary: doc_summary,
            summary_truncated,
            file_path: page.file_path.clone(),
            content_hash: page.content_hash.clone(),
            last_crawled: page.last_crawled,
            json_data: None,
            availability,
        };
        doc_index::ingest::index_document(&pool, &doc).await?;
        indexed += 1;
    }

    println!("Rebuilt doc index with {indexed} documents at {}", config.docs_db_path().display());

    if remote {
        for source in cupertino::models::ALL_SOURCES {
            if source_config(config, source).is_none() {
                continue;
            }
            let path = config.base_dir.join(format!("remote-save-state-{source}.json"));
            let mut state = RemoteSaveState::load(&path).unwrap_or_else(|| RemoteSaveState::new(*source));
            state.advance(RemoteSavePhase::Done, None);
            state.persist(&path)?;
        }
        println!("Checkpointed remote-save state (upload is handled by an external release tool).");
    }

    Ok(())
}

async fn run_index(config: &Config, force: bool) -> Result<()> {
    progress::init_stderr_logging();

    let pool = sample_index::schema::connect(&config.samples_db_path()).await?;
    let summary = sample_index::ingest::ingest_all(&pool, &config.sample_code_dir(), force).await?;

    println!(
        "Indexed {} project(s), {} file(s) ({} skipped)",
        summary.projects_indexed, summary.files_indexed, summary.projects_skipped
    );
    Ok(())
}

async fn run_serve(config: &Config) -> Result<()> {
    progress::init_stderr_logging();

    let docs_pool = if config.docs_db_path().exists() {
        Some(doc_index::schema::connect(&config.docs_db_path()).await?)
    } else {
        tracing::warn!("doc index not found, search_docs/search/read_document/list_frameworks will be unavailable");
        None
    };
    let samples_pool = if config.samples_db_path().exists() {
        Some(sample_index::schema::connect(&config.samples_db_path()).await?)
    } else {
        tracing::warn!("sample index not found, sample tools will be unavailable");
        None
    };

    let ctx = ToolContext {
        docs_pool,
        samples_pool,
        orchestrator_opts: Arc::new(orchestrator_opts(config)),
    };
    let registry = ToolRegistry::build(ctx);
    let server = McpServer::new(registry);
    server.connect_stdio().await
}

fn orchestrator_opts(config: &Config) -> OrchestratorOptions {
    OrchestratorOptions {
        fanout_timeout: std::time::Duration::from_millis(config.retrieval.fanout_timeout_ms),
        default_limit: config.retrieval.default_limit,
        teaser_limit: config.retrieval.teaser_limit,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_search(
    config: &Config,
    query: &str,
    source: Option<String>,
    format: &str,
    framework: Option<String>,
    language: Option<String>,
    limit: Option<i64>,
    include_archive: bool,
    min_ios: Option<String>,
    min_macos: Option<String>,
    min_tvos: Option<String>,
    min_watchos: Option<String>,
    min_visionos: Option<String>,
) -> Result<()> {
    if !config.docs_db_path().exists() {
        bail!("no doc index at {} — run `cupertino fetch` then `cupertino save`", config.docs_db_path().display());
    }
    let pool = doc_index::schema::connect(&config.docs_db_path()).await?;
    let samples_pool = if config.samples_db_path().exists() {
        Some(sample_index::schema::connect(&config.samples_db_path()).await?)
    } else {
        None
    };
    let format: OutputFormat = format.parse()?;

    let filters = doc_index::search::SearchFilters {
        source: source.clone(),
        framework,
        language,
        include_archive,
        min_ios,
        min_macos,
        min_tvos,
        min_watchos,
        min_visionos,
    };
    let opts = orchestrator_opts(config);
    let result = orchestrator::search(&pool, samples_pool.as_ref(), query, &filters, limit, &opts).await?;
    println!("{}", format_result(&result, format));

    if let Some(source) = &source {
        let teasers =
            orchestrator::fetch_teasers(&pool, samples_pool.as_ref(), query, source, include_archive, &opts)
                .await;
        let rendered = format_teasers_markdown(&teasers);
        if !rendered.is_empty() {
            println!("{rendered}");
        }
    }

    Ok(())
}

async fn run_read(config: &Config, uri: &str, format: &str) -> Result<()> {
    let pool = doc_index::schema::connect(&config.docs_db_path()).await?;
    let record = doc_index::search::read_document(&pool, uri)
        .await?
        .with_context(|| format!("no document with uri {uri}"))?;
    let (content, json_data) = record;
    if format == "json" {
        println!("{}", json_data.unwrap_or(content));
    } else {
        println!("{content}");
    }
    Ok(())
}

async fn run_list_frameworks(config: &Config) -> Result<()> {
    let pool = doc_index::schema::connect(&config.docs_db_path()).await?;
    let frameworks = doc_index::search::list_frameworks(&pool).await?;
    for fw in frameworks {
        println!("{:<32} {:>8}", fw.framework, fw.document_count);
    }
    Ok(())
}

async fn run_list_samples(config: &Config, framework: Option<String>, limit: i64) -> Result<()> {
    let pool = sample_index::schema::connect(&config.samples_db_path()).await?;
    let mut projects = sample_index::search::search_projects(&pool, "*", limit).await.unwrap_or_default();
    if let Some(fw) = &framework {
        projects.retain(|p| p.frameworks.iter().any(|f| f.eq_ignore_ascii_case(fw)));
    }
    for p in projects {
        println!("{:<28} {:>6} files  {}", p.id, p.file_count, p.frameworks.join(", "));
    }
    Ok(())
}

async fn run_search_samples(config: &Config, query: &str, search_files: bool, limit: i64) -> Result<()> {
    let pool = sample_index::schema::connect(&config.samples_db_path()).await?;
    let projects = sample_index::search::search_projects(&pool, query, limit).await?;
    for p in &projects {
        println!("{}  {}", p.id, p.title);
    }
    if search_files {
        let files = sample_index::search::search_files(&pool, query, None, limit).await?;
        for f in &files {
            println!("{}:{}\n  {}", f.project_id, f.path, f.snippet);
        }
    }
    Ok(())
}

async fn run_read_sample(config: &Config, project_id: &str) -> Result<()> {
    let pool = sample_index::schema::connect(&config.samples_db_path()).await?;
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT readme FROM projects WHERE id = ?")
        .bind(project_id)
        .fetch_optional(&pool)
        .await?;
    let readme = row
        .and_then(|(readme,)| readme)
        .with_context(|| format!("no project with id {project_id}"))?;
    println!("{readme}");
    Ok(())
}

async fn run_read_sample_file(config: &Config, project_id: &str, path: &str) -> Result<()> {
    let pool = sample_index::schema::connect(&config.samples_db_path()).await?;
    let content = sample_index::search::read_file(&pool, project_id, path)
        .await?
        .with_context(|| format!("no file {path} in project {project_id}"))?;
    println!("{content}");
    Ok(())
}

fn run_cleanup(zip_path: &Path, replace: bool, dry_run: bool) -> Result<()> {
    let report = if dry_run {
        sample_index::cleanup::dry_run(zip_path)?
    } else {
        sample_index::cleanup::clean(zip_path, replace)?
    };
    println!("removed {} kept {}", report.removed, report.kept);
    Ok(())
}

async fn run_setup(command: &Commands) -> Result<()> {
    let Commands::Setup { path } = command else {
        unreachable!()
    };

    let (priority_packages, archive_guides) = catalogs::load(Path::new("/nonexistent"));
    println!(
        "Bundled catalogs: {} priority packages, {} archive guides.",
        priority_packages.len(),
        archive_guides.len()
    );

    if path.exists() {
        bail!("{} already exists, refusing to overwrite", path.display());
    }

    let starter = r#"# Cupertino configuration.
# base_dir = "~/.cupertino"

[crawl]
max_pages = 10000
max_depth = 6
request_delay_ms = 250
checkpoint_interval_secs = 30

[retrieval]
default_limit = 12
teaser_limit = 3
fanout_timeout_ms = 8000

[sources.apple_docs]
start_url = "https://developer.apple.com/documentation/swiftui"
allowed_prefixes = ["https://developer.apple.com/documentation/"]

[sources.swift_evolution]
start_url = "https://github.com/apple/swift-evolution/blob/main/proposals"
allowed_prefixes = ["https://github.com/apple/swift-evolution/"]
"#;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, starter)?;
    println!("Wrote starter config to {}", path.display());
    Ok(())
}
