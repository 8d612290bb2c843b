//! ZIP pre-cleanup (spec §4.5 "ZIP pre-cleanup").
//!
//! Strips junk paths (`.git`, `.DS_Store`, build outputs, `__MACOSX`, ...)
//! out of a sample-code ZIP before it is ingested, recompressing with
//! `/usr/bin/ditto` so Apple resource forks survive the round trip.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};

/// Path fragments that mark a file or directory for removal. Matched
/// against any path component or glob-style suffix.
const JUNK_PATTERNS: &[&str] = &[
    ".git",
    ".gitignore",
    ".DS_Store",
    "xcuserdata",
    "DerivedData",
    "build",
    "Pods",
    ".swiftpm",
    "__MACOSX",
];

fn is_junk(relative: &Path) -> bool {
    for component in relative.components() {
        let name = component.as_os_str().to_string_lossy();
        if JUNK_PATTERNS.iter().any(|p| name == *p) {
            return true;
        }
        if name.ends_with(".xcuserstate") || name.starts_with("._") {
            return true;
        }
    }
    false
}

#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: u64,
    pub kept: u64,
}

/// Count candidate removals in `zip_path` without extracting it, via
/// `zipinfo -1`.
pub fn dry_run(zip_path: &Path) -> Result<CleanupReport> {
    let output = Command::new("zipinfo")
        .arg("-1")
        .arg(zip_path)
        .output()
        .with_context(|| format!("running zipinfo on {}", zip_path.display()))?;
    if !output.status.success() {
        bail!("zipinfo failed for {}", zip_path.display());
    }

    let listing = String::from_utf8_lossy(&output.stdout);
    let mut report = CleanupReport::default();
    for line in listing.lines() {
        if line.is_empty() {
            continue;
        }
        if is_junk(Path::new(line)) {
            report.removed += 1;
        } else {
            report.kept += 1;
        }
    }
    Ok(report)
}

/// Clean `zip_path` in place: extract, remove junk paths, recompress with
/// `ditto`. Writes to `<name>.cleaned.zip` unless `replace` is set, in
/// which case the original is overwritten. Idempotent: running this twice
/// on an already-clean archive removes nothing on the second pass.
pub fn clean(zip_path: &Path, replace: bool) -> Result<CleanupReport> {
    let tmp = tempfile::tempdir()?;
    {
        let file = std::fs::File::open(zip_path)
            .with_context(|| format!("opening {}", zip_path.display()))?;
        let mut archive = zip::ZipArchive::new(file)?;
        archive.extract(tmp.path())?;
    }

    let mut report = CleanupReport::default();
    for entry in walkdir::WalkDir::new(tmp.path())
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let relative = path.strip_prefix(tmp.path()).unwrap_or(path);
        if relative.as_os_str().is_empty() {
            continue;
        }
        if is_junk(relative) {
            if entry.file_type().is_dir() {
                let _ = std::fs::remove_dir_all(path);
            } else {
                let _ = std::fs::remove_file(path);
            }
            report.removed += 1;
        } else if entry.file_type().is_file() {
            report.kept += 1;
        }
    }

    let output_path: PathBuf = if replace {
        zip_path.to_path_buf()
    } else {
        zip_path.with_extension("cleaned.zip")
    };
    if output_path.exists() {
        std::fs::remove_file(&output_path)?;
    }

    recompress_with_ditto(tmp.path(), &output_path)?;
    Ok(report)
}

/// Recompress the directory tree at `source_dir` into a single ZIP at
/// `dest_zip` using `/usr/bin/ditto -c -k --sequesterRsrc`, which preserves
/// Apple resource forks that a generic ZIP writer would drop.
fn recompress_with_ditto(source_dir: &Path, dest_zip: &Path) -> Result<()> {
    let status = Command::new("/usr/bin/ditto")
        .arg("-c")
        .arg("-k")
        .arg("--sequesterRsrc")
        .arg(source_dir)
        .arg(dest_zip)
        .status()
        .with_context(|| "spawning /usr/bin/ditto")?;
    if !status.success() {
        bail!("ditto failed recompressing {}", source_dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_junk_matches_known_patterns() {
        assert!(is_junk(Path::new("Project/.git/HEAD")));
        assert!(is_junk(Path::new("Project/.DS_Store")));
        assert!(is_junk(Path::new("Project/__MACOSX/foo")));
        assert!(is_junk(Path::new("Project/._resource")));
        assert!(is_junk(Path::new("Project/Foo.xcuserstate")));
        assert!(!is_junk(Path::new("Project/Sources/App.swift")));
    }
}
