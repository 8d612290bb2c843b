//! Sample index ingest (spec §4.5 "Ingest").
//!
//! Enumerates ZIPs and extracted project directories under the sample-code
//! root, extracts (or uses directly) each project, walks indexable files,
//! and runs the Swift symbol/import extractor over every `.swift` file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use walkdir::WalkDir;

use crate::converters::swift_symbols;
use crate::models::{INDEXABLE_EXTENSIONS, MAX_INDEXABLE_FILE_SIZE};

const README_VARIANTS: &[&str] = &["README.md", "Readme.md", "readme.md", "README.txt", "README"];

#[derive(Debug, Default)]
pub struct IngestSummary {
    pub projects_indexed: u64,
    pub projects_skipped: u64,
    pub files_indexed: u64,
}

/// Ingest every ZIP and bare project directory under `sample_code_root`.
pub async fn ingest_all(
    pool: &SqlitePool,
    sample_code_root: &Path,
    force: bool,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    if !sample_code_root.exists() {
        return Ok(summary);
    }

    for entry in std::fs::read_dir(sample_code_root)
        .with_context(|| format!("reading {}", sample_code_root.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        let is_zip = path.extension().map(|e| e == "zip").unwrap_or(false);
        if !is_zip && !path.is_dir() {
            continue;
        }

        let project_id = slug_from_filename(&path);
        if !force && project_already_indexed(pool, &project_id).await? {
            summary.projects_skipped += 1;
            continue;
        }
        if force {
            delete_project(pool, &project_id).await?;
        }

        let result = if is_zip {
            ingest_zip_project(pool, &path, &project_id).await
        } else {
            ingest_directory_project(pool, &path, &project_id, None).await
        };

        match result {
            Ok(file_count) => {
                summary.projects_indexed += 1;
                summary.files_indexed += file_count;
            }
            Err(e) => {
                tracing::warn!(project = %project_id, error = %e, "project ingest failed");
                summary.projects_skipped += 1;
            }
        }
    }

    Ok(summary)
}

async fn project_already_indexed(pool: &SqlitePool, project_id: &str) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT COUNT(*) > 0 FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

async fn ingest_zip_project(pool: &SqlitePool, zip_path: &Path, project_id: &str) -> Result<u64> {
    let tmp = tempfile::tempdir()?;
    {
        let file = std::fs::File::open(zip_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        archive.extract(tmp.path())?;
    }

    let root = detect_project_root(tmp.path())?;
    ingest_directory_project(pool, &root, project_id, Some(zip_path)).await
}

/// Detect the "project root": the single nested directory if the
/// extraction produced exactly one top-level entry, otherwise the
/// extraction root itself (spec §4.5).
fn detect_project_root(extracted_to: &Path) -> Result<PathBuf> {
    let mut entries: Vec<PathBuf> =
        std::fs::read_dir(extracted_to)?.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    entries.retain(|p| !p.file_name().map(|n| n == "__MACOSX").unwrap_or(false));

    if entries.len() == 1 && entries[0].is_dir() {
        Ok(entries.remove(0))
    } else {
        Ok(extracted_to.to_path_buf())
    }
}

async fn ingest_directory_project(
    pool: &SqlitePool,
    root: &Path,
    project_id: &str,
    zip_path: Option<&Path>,
) -> Result<u64> {
    let readme = README_VARIANTS
        .iter()
        .find_map(|name| std::fs::read_to_string(root.join(name)).ok());

    let title = project_id.replace(['-', '_'], " ");

    let mut tx = pool.begin().await?;

    let mut file_count = 0i64;
    let mut total_size = 0i64;
    let mut frameworks = std::collections::BTreeSet::new();

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !INDEXABLE_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        let metadata = std::fs::metadata(path)?;
        if metadata.len() > MAX_INDEXABLE_FILE_SIZE {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };

        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");
        let filename = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let folder = relative
            .parent()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();

        let file_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO files (project_id, path, filename, folder, extension, content, size)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(project_id, path) DO UPDATE SET content = excluded.content, size = excluded.size
            RETURNING id
            "#,
        )
        .bind(project_id)
        .bind(&rel_str)
        .bind(&filename)
        .bind(&folder)
        .bind(&ext)
        .bind(&content)
        .bind(metadata.len() as i64)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM files_fts WHERE file_id = ?").bind(file_id).execute(&mut *tx).await?;
        sqlx::query(
            "INSERT INTO files_fts (file_id, project_id, path, content) VALUES (?, ?, ?, ?)",
        )
        .bind(file_id)
        .bind(project_id)
        .bind(&rel_str)
        .bind(&content)
        .execute(&mut *tx)
        .await?;

        file_count += 1;
        total_size += metadata.len() as i64;

        if ext == "swift" {
            let extracted = swift_symbols::extract(&content);
            sqlx::query("DELETE FROM file_symbols WHERE file_id = ?")
                .bind(file_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM file_imports WHERE file_id = ?")
                .bind(file_id)
                .execute(&mut *tx)
                .await?;

            for symbol in &extracted.symbols {
                let symbol_id: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO file_symbols
                        (file_id, name, kind, line, column, is_async, is_throws, is_public, is_static,
                         attributes, conformances, generic_parameters, signature)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    RETURNING id
                    "#,
                )
                .bind(file_id)
                .bind(&symbol.name)
                .bind(symbol.kind.as_str())
                .bind(symbol.line)
                .bind(symbol.column)
                .bind(symbol.is_async)
                .bind(symbol.is_throws)
                .bind(symbol.is_public)
                .bind(symbol.is_static)
                .bind(serde_json::to_string(&symbol.attributes)?)
                .bind(serde_json::to_string(&symbol.conformances)?)
                .bind(serde_json::to_string(&symbol.generic_parameters)?)
                .bind(&symbol.signature)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query(
                    "INSERT INTO file_symbols_fts (symbol_id, file_id, name, kind, attributes, signature) VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(symbol_id)
                .bind(file_id)
                .bind(&symbol.name)
                .bind(symbol.kind.as_str())
                .bind(symbol.attributes.join(" "))
                .bind(symbol.signature.clone().unwrap_or_default())
                .execute(&mut *tx)
                .await?;
            }

            for import in &extracted.imports {
                sqlx::query(
                    "INSERT INTO file_imports (file_id, module_name, line, is_exported) VALUES (?, ?, ?, ?)",
                )
                .bind(file_id)
                .bind(&import.module_name)
                .bind(import.line)
                .bind(import.is_exported)
                .execute(&mut *tx)
                .await?;
                frameworks.insert(import.module_name.to_lowercase());
            }
        }
    }

    let frameworks: Vec<String> = frameworks.into_iter().collect();
    let zip_filename = zip_path.and_then(|p| p.file_name()).map(|n| n.to_string_lossy().to_string());

    sqlx::query(
        r#"
        INSERT INTO projects (id, title, description, frameworks, readme, web_url, zip_filename, file_count, total_size, indexed_at)
        VALUES (?, ?, '', ?, ?, NULL, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            frameworks = excluded.frameworks,
            readme = excluded.readme,
            zip_filename = excluded.zip_filename,
            file_count = excluded.file_count,
            total_size = excluded.total_size,
            indexed_at = excluded.indexed_at
        "#,
    )
    .bind(project_id)
    .bind(&title)
    .bind(serde_json::to_string(&frameworks)?)
    .bind(&readme)
    .bind(&zip_filename)
    .bind(file_count)
    .bind(total_size)
    .bind(Utc::now().timestamp())
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM projects_fts WHERE id = ?").bind(project_id).execute(&mut *tx).await?;
    sqlx::query("INSERT INTO projects_fts (id, title, description, readme) VALUES (?, ?, '', ?)")
        .bind(project_id)
        .bind(&title)
        .bind(&readme)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(file_count as u64)
}

/// Delete a project and cascade to its files, symbols, imports, and their
/// FTS mirrors (spec §8 invariant).
pub async fn delete_project(pool: &SqlitePool, project_id: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM file_symbols_fts WHERE file_id IN (SELECT id FROM files WHERE project_id = ?)",
    )
    .bind(project_id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM files_fts WHERE project_id = ?").bind(project_id).execute(&mut *tx).await?;
    sqlx::query("DELETE FROM projects_fts WHERE id = ?").bind(project_id).execute(&mut *tx).await?;
    sqlx::query("DELETE FROM projects WHERE id = ?").bind(project_id).execute(&mut *tx).await?;

    tx.commit().await?;
    Ok(())
}

fn slug_from_filename(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_from_filename_strips_extension() {
        assert_eq!(slug_from_filename(Path::new("/tmp/FancyList.zip")), "FancyList");
        assert_eq!(slug_from_filename(Path::new("/tmp/FancyList")), "FancyList");
    }
}
