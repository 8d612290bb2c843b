//! Black-box CLI tests driving the `cupertino` binary end to end.
//!
//! `fetch` needs network access so it's exercised only via its config-lookup
//! error path; everything downstream of a crawl (`save`, `index`, `search`,
//! `read`, `list-frameworks`, `list-samples`, `search-samples`, `read-sample`,
//! `read-sample-file`, `doctor`, `setup`) is driven against a hand-built
//! `metadata.json` + `pages/` tree and a bare sample-code project directory,
//! standing in for what a real crawl/ingest would have produced.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn cupertino_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cupertino"))
}

fn run(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(cupertino_bin())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run cupertino: {e}"));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

struct Env {
    _tmp: tempfile::TempDir,
    config_path: PathBuf,
    base_dir: PathBuf,
}

fn write_config(base_dir: &Path) -> PathBuf {
    let config_path = base_dir.join("config.toml");
    fs::write(
        &config_path,
        format!(
            r#"base_dir = "{}"

[retrieval]
default_limit = 12
"#,
            base_dir.join("data").display()
        ),
    )
    .unwrap();
    config_path
}

/// Seed `metadata.json` and `pages/<source>/<slug>.md` for two sources so
/// `save` has something to rebuild the doc index from.
fn seed_crawled_pages(base_dir: &Path) {
    let pages_dir = base_dir.join("data").join("pages");
    let view_path = pages_dir.join("apple-docs").join("view.md");
    let async_path = pages_dir.join("swift-org").join("async-await.md");
    fs::create_dir_all(view_path.parent().unwrap()).unwrap();
    fs::create_dir_all(async_path.parent().unwrap()).unwrap();

    fs::write(
        &view_path,
        "# View\n\niOS 13.0+, macOS 10.15+\n\nA type that represents part of your app's user interface, composed declaratively.\n",
    )
    .unwrap();
    fs::write(
        &async_path,
        "# Concurrency\n\nStructured concurrency with async/await lets you write asynchronous code that reads like synchronous code.\n",
    )
    .unwrap();

    let metadata = format!(
        r#"{{
  "pages": {{
    "https://developer.apple.com/documentation/swiftui/view": {{
      "uri": "apple-docs://SwiftUI/view",
      "source": "apple-docs",
      "framework": "SwiftUI",
      "file_path": "{view_path}",
      "content_hash": "hash-view",
      "depth": 0,
      "last_crawled": "2024-01-01T00:00:00Z"
    }},
    "https://www.swift.org/documentation/concurrency/async-await": {{
      "uri": "swift-org://Concurrency/async-await",
      "source": "swift-org",
      "framework": "Concurrency",
      "file_path": "{async_path}",
      "content_hash": "hash-async",
      "depth": 0,
      "last_crawled": "2024-01-01T00:00:00Z"
    }}
  }},
  "frameworks": {{}},
  "crawl_state": null,
  "stats": {{ "total_pages": 2, "skipped_pages": 0, "errors": 0 }},
  "last_crawl": null
}}
"#,
        view_path = view_path.to_string_lossy().replace('\\', "\\\\"),
        async_path = async_path.to_string_lossy().replace('\\', "\\\\"),
    );
    fs::write(base_dir.join("data").join("metadata.json"), metadata).unwrap();
}

/// A bare (non-ZIP) sample-code project directory under `sample-code/`.
fn seed_sample_project(base_dir: &Path) {
    let project_dir = base_dir.join("data").join("sample-code").join("DemoApp");
    let sources_dir = project_dir.join("Sources");
    fs::create_dir_all(&sources_dir).unwrap();

    fs::write(project_dir.join("README.md"), "Demo App readme content describing the sample.\n").unwrap();
    fs::write(
        sources_dir.join("ContentView.swift"),
        "import SwiftUI\n\npublic struct ContentView: View {\n    public var body: some View {\n        Text(\"Hi\")\n    }\n}\n",
    )
    .unwrap();
}

fn setup_env() -> Env {
    let tmp = tempfile::tempdir().unwrap();
    let base_dir = tmp.path().to_path_buf();
    let config_path = write_config(&base_dir);
    Env { _tmp: tmp, config_path, base_dir }
}

#[test]
fn setup_writes_starter_config_and_refuses_to_overwrite() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested").join("config.toml");

    let (stdout, _, success) = run(&path, &["setup", "--path", path.to_str().unwrap()]);
    assert!(success, "setup should succeed: {stdout}");
    assert!(path.exists());
    assert!(stdout.contains("Wrote starter config"));

    let (_, stderr, success) = run(&path, &["setup", "--path", path.to_str().unwrap()]);
    assert!(!success, "second setup should refuse to overwrite");
    assert!(stderr.contains("already exists"));
}

#[test]
fn fetch_without_source_config_fails_with_clear_error() {
    let env = setup_env();
    let (_, stderr, success) = run(&env.config_path, &["fetch", "--type", "apple-docs"]);
    assert!(!success);
    assert!(stderr.contains("sources.apple_docs"), "got: {stderr}");
}

#[test]
fn save_rebuilds_doc_index_from_crawled_pages() {
    let env = setup_env();
    seed_crawled_pages(&env.base_dir);

    let (stdout, stderr, success) = run(&env.config_path, &["save"]);
    assert!(success, "save failed: stdout={stdout} stderr={stderr}");
    assert!(stdout.contains("Rebuilt doc index with 2 documents"), "got: {stdout}");
    assert!(env.base_dir.join("data").join("search.db").exists());
}

#[test]
fn search_with_source_finds_the_matching_document() {
    let env = setup_env();
    seed_crawled_pages(&env.base_dir);
    run(&env.config_path, &["save"]);

    let (stdout, _, success) =
        run(&env.config_path, &["search", "interface", "--source", "apple-docs"]);
    assert!(success);
    assert!(stdout.contains("View"), "got: {stdout}");
}

#[test]
fn search_fans_out_across_sources_without_explicit_source() {
    let env = setup_env();
    seed_crawled_pages(&env.base_dir);
    run(&env.config_path, &["save"]);

    let (stdout, _, success) = run(&env.config_path, &["search", "concurrency"]);
    assert!(success);
    assert!(stdout.contains("Concurrency") || stdout.contains("1 result"), "got: {stdout}");
}

#[test]
fn search_min_ios_filter_excludes_documents_below_the_floor() {
    let env = setup_env();
    seed_crawled_pages(&env.base_dir);
    run(&env.config_path, &["save"]);

    let (below, _, _) =
        run(&env.config_path, &["search", "interface", "--source", "apple-docs", "--min-ios", "12.0"]);
    assert!(below.contains("View"), "iOS 13.0+ doc should satisfy a 12.0 floor: {below}");

    let (above, _, _) =
        run(&env.config_path, &["search", "interface", "--source", "apple-docs", "--min-ios", "14.0"]);
    assert!(!above.contains("View"), "iOS 13.0+ doc should not satisfy a 14.0 floor: {above}");
}

#[test]
fn search_without_a_doc_index_fails_with_actionable_error() {
    let env = setup_env();
    let (_, stderr, success) = run(&env.config_path, &["search", "anything"]);
    assert!(!success);
    assert!(stderr.contains("no doc index"), "got: {stderr}");
}

#[test]
fn read_returns_raw_document_content() {
    let env = setup_env();
    seed_crawled_pages(&env.base_dir);
    run(&env.config_path, &["save"]);

    let (stdout, _, success) = run(&env.config_path, &["read", "apple-docs://SwiftUI/view"]);
    assert!(success);
    assert!(stdout.contains("represents part of your app's user interface"), "got: {stdout}");
}

#[test]
fn list_frameworks_reports_every_ingested_framework() {
    let env = setup_env();
    seed_crawled_pages(&env.base_dir);
    run(&env.config_path, &["save"]);

    let (stdout, _, success) = run(&env.config_path, &["list-frameworks"]);
    assert!(success);
    assert!(stdout.contains("SwiftUI"));
    assert!(stdout.contains("Concurrency"));
}

#[test]
fn doctor_reports_document_and_project_counts() {
    let env = setup_env();
    seed_crawled_pages(&env.base_dir);
    seed_sample_project(&env.base_dir);
    run(&env.config_path, &["save"]);
    run(&env.config_path, &["index"]);

    let (stdout, _, success) = run(&env.config_path, &["doctor"]);
    assert!(success);
    assert!(stdout.contains("Documents:     2"), "got: {stdout}");
    assert!(stdout.contains("Projects:      1"), "got: {stdout}");
}

#[test]
fn index_ingests_a_bare_project_directory() {
    let env = setup_env();
    seed_sample_project(&env.base_dir);

    let (stdout, stderr, success) = run(&env.config_path, &["index"]);
    assert!(success, "index failed: stdout={stdout} stderr={stderr}");
    assert!(stdout.contains("Indexed 1 project"), "got: {stdout}");
}

#[test]
fn list_samples_and_search_samples_find_the_ingested_project() {
    let env = setup_env();
    seed_sample_project(&env.base_dir);
    run(&env.config_path, &["index"]);

    let (list_out, _, success) = run(&env.config_path, &["list-samples"]);
    assert!(success);
    assert!(list_out.contains("DemoApp"), "got: {list_out}");

    let (search_out, _, success) = run(&env.config_path, &["search-samples", "readme"]);
    assert!(success);
    assert!(search_out.contains("DemoApp"), "got: {search_out}");
}

#[test]
fn read_sample_and_read_sample_file_return_project_contents() {
    let env = setup_env();
    seed_sample_project(&env.base_dir);
    run(&env.config_path, &["index"]);

    let (readme, _, success) = run(&env.config_path, &["read-sample", "DemoApp"]);
    assert!(success);
    assert!(readme.contains("Demo App readme content"));

    let (file, _, success) =
        run(&env.config_path, &["read-sample-file", "DemoApp", "Sources/ContentView.swift"]);
    assert!(success);
    assert!(file.contains("struct ContentView"));
}

#[test]
fn read_sample_file_missing_path_fails() {
    let env = setup_env();
    seed_sample_project(&env.base_dir);
    run(&env.config_path, &["index"]);

    let (_, stderr, success) =
        run(&env.config_path, &["read-sample-file", "DemoApp", "Sources/DoesNotExist.swift"]);
    assert!(!success);
    assert!(stderr.contains("no file"), "got: {stderr}");
}
