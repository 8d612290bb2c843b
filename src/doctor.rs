//! `doctor` command: reports document/project counts, per-source and
//! per-framework breakdowns, and whether each index file exists and opens
//! cleanly. Modeled on the teacher's `stats.rs` (`ctx stats`).

use anyhow::Result;

use crate::config::Config;

pub async fn run_doctor(config: &Config) -> Result<()> {
    println!("Cupertino — Index Health");
    println!("=========================");
    println!();
    println!("  Base directory: {}", config.base_dir.display());
    println!();

    report_doc_index(config).await;
    println!();
    report_sample_index(config).await;
    println!();

    Ok(())
}

async fn report_doc_index(config: &Config) {
    let path = config.docs_db_path();
    if !path.exists() {
        println!("  Doc index:     not found at {}", path.display());
        println!("                 run `cupertino fetch` then `cupertino index` to create it.");
        return;
    }

    match crate::doc_index::schema::connect(&path).await {
        Ok(pool) => {
            let doc_count = crate::doc_index::ingest::document_count(&pool).await.unwrap_or(0);
            let frameworks = crate::doc_index::search::list_frameworks(&pool).await.unwrap_or_default();
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

            println!("  Doc index:     {}", path.display());
            println!("  Size:          {}", format_bytes(size));
            println!("  Documents:     {doc_count}");
            println!("  Frameworks:    {}", frameworks.len());
            if !frameworks.is_empty() {
                println!();
                println!("  {:<32} {:>10}", "FRAMEWORK", "DOCUMENTS");
                println!("  {}", "-".repeat(44));
                for fw in frameworks.iter().take(20) {
                    println!("  {:<32} {:>10}", fw.framework, fw.document_count);
                }
                if frameworks.len() > 20 {
                    println!("  ... and {} more", frameworks.len() - 20);
                }
            }
        }
        Err(e) => {
            println!("  Doc index:     found but failed to open: {e}");
            println!("                 consider `cupertino index` to rebuild.");
        }
    }
}

async fn report_sample_index(config: &Config) {
    let path = config.samples_db_path();
    if !path.exists() {
        println!("  Sample index:  not found at {}", path.display());
        println!("                 run `cupertino fetch --type samples` then `cupertino index`.");
        return;
    }

    match crate::sample_index::schema::connect(&path).await {
        Ok(pool) => {
            let project_count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM projects").fetch_one(&pool).await.unwrap_or(0);
            let file_count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM files").fetch_one(&pool).await.unwrap_or(0);
            let symbol_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_symbols")
                .fetch_one(&pool)
                .await
                .unwrap_or(0);
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

            println!("  Sample index:  {}", path.display());
            println!("  Size:          {}", format_bytes(size));
            println!("  Projects:      {project_count}");
            println!("  Files:         {file_count}");
            println!("  Symbols:       {symbol_count}");
        }
        Err(e) => {
            println!("  Sample index:  found but failed to open: {e}");
            println!("                 consider `cupertino index` to rebuild.");
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
