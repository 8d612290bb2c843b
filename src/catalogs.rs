//! External catalogs (spec §4.8): a static priority-package list, a
//! curated archive-guide list, and a post-crawl generator that refreshes
//! the priority list from Swift.org content.
//!
//! The bundled tables are compiled in via [`once_cell::sync::Lazy`]. A
//! user-override TOML file, when present, replaces them; a parse failure
//! in that file falls back to the bundled defaults silently (it is not
//! fatal to `fetch`/`index`).

use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityPackage {
    pub name: String,
    pub repository: String,
    pub tier: PackageTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageTier {
    AppleOfficial,
    Ecosystem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveGuide {
    pub url: String,
    pub framework: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogOverride {
    #[serde(default)]
    priority_packages: Vec<PriorityPackage>,
    #[serde(default)]
    archive_guides: Vec<ArchiveGuide>,
}

pub static DEFAULT_PRIORITY_PACKAGES: Lazy<Vec<PriorityPackage>> = Lazy::new(|| {
    vec![
        PriorityPackage {
            name: "swift-argument-parser".into(),
            repository: "apple/swift-argument-parser".into(),
            tier: PackageTier::AppleOfficial,
        },
        PriorityPackage {
            name: "swift-collections".into(),
            repository: "apple/swift-collections".into(),
            tier: PackageTier::AppleOfficial,
        },
        PriorityPackage {
            name: "swift-algorithms".into(),
            repository: "apple/swift-algorithms".into(),
            tier: PackageTier::AppleOfficial,
        },
        PriorityPackage {
            name: "swift-async-algorithms".into(),
            repository: "apple/swift-async-algorithms".into(),
            tier: PackageTier::AppleOfficial,
        },
        PriorityPackage {
            name: "swift-nio".into(),
            repository: "apple/swift-nio".into(),
            tier: PackageTier::AppleOfficial,
        },
        PriorityPackage {
            name: "swift-log".into(),
            repository: "apple/swift-log".into(),
            tier: PackageTier::AppleOfficial,
        },
        PriorityPackage {
            name: "Alamofire".into(),
            repository: "Alamofire/Alamofire".into(),
            tier: PackageTier::Ecosystem,
        },
        PriorityPackage {
            name: "swift-composable-architecture".into(),
            repository: "pointfreeco/swift-composable-architecture".into(),
            tier: PackageTier::Ecosystem,
        },
        PriorityPackage {
            name: "Kingfisher".into(),
            repository: "onevcat/Kingfisher".into(),
            tier: PackageTier::Ecosystem,
        },
    ]
});

pub static DEFAULT_ARCHIVE_GUIDES: Lazy<Vec<ArchiveGuide>> = Lazy::new(|| {
    vec![
        ArchiveGuide {
            url: "https://developer.apple.com/library/archive/documentation/Cocoa/Conceptual/AutolayoutPG/index.html".into(),
            framework: "AutoLayout".into(),
        },
        ArchiveGuide {
            url: "https://developer.apple.com/library/archive/documentation/General/Conceptual/DevPedia-CocoaCore/index.html".into(),
            framework: "Cocoa".into(),
        },
        ArchiveGuide {
            url: "https://developer.apple.com/library/archive/documentation/Cocoa/Conceptual/CoreData/index.html".into(),
            framework: "CoreData".into(),
        },
    ]
});

/// Load the priority-package and archive-guide catalogs, preferring
/// `override_path` when it exists and parses cleanly.
pub fn load(override_path: &Path) -> (Vec<PriorityPackage>, Vec<ArchiveGuide>) {
    if let Ok(contents) = std::fs::read_to_string(override_path) {
        match toml::from_str::<CatalogOverride>(&contents) {
            Ok(parsed) if !parsed.priority_packages.is_empty() || !parsed.archive_guides.is_empty() => {
                let packages = if parsed.priority_packages.is_empty() {
                    DEFAULT_PRIORITY_PACKAGES.clone()
                } else {
                    parsed.priority_packages
                };
                let guides = if parsed.archive_guides.is_empty() {
                    DEFAULT_ARCHIVE_GUIDES.clone()
                } else {
                    parsed.archive_guides
                };
                return (packages, guides);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %override_path.display(), error = %e, "catalog override failed to parse, using bundled defaults");
            }
        }
    }
    (DEFAULT_PRIORITY_PACKAGES.clone(), DEFAULT_ARCHIVE_GUIDES.clone())
}

/// Scan `swift_org_markdown` pages for `github.com/<owner>/<repo>`
/// references and emit a freshly-computed priority list (spec §4.8
/// "post-crawl generator"). Order of first appearance is preserved;
/// duplicates are dropped.
pub fn generate_priority_packages_from_swift_org(pages: &[String]) -> Vec<PriorityPackage> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for page in pages {
        for repo in extract_github_repos(page) {
            if seen.insert(repo.clone()) {
                let name = repo.rsplit('/').next().unwrap_or(&repo).to_string();
                out.push(PriorityPackage {
                    name,
                    repository: repo,
                    tier: PackageTier::Ecosystem,
                });
            }
        }
    }
    out
}

fn extract_github_repos(text: &str) -> Vec<String> {
    const MARKER: &str = "github.com/";
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(idx) = rest.find(MARKER) {
        let after = &rest[idx + MARKER.len()..];
        let candidate: String = after
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || *c == '/' || *c == '.')
            .collect();
        let parts: Vec<&str> = candidate.splitn(3, '/').collect();
        if parts.len() >= 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            let repo = format!("{}/{}", parts[0], parts[1].trim_end_matches(".git"));
            out.push(repo);
        }
        rest = after;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_falls_back_to_defaults_when_override_missing() {
        let (packages, guides) = load(Path::new("/nonexistent/catalogs.toml"));
        assert!(!packages.is_empty());
        assert!(!guides.is_empty());
    }

    #[test]
    fn load_falls_back_to_defaults_on_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalogs.toml");
        std::fs::write(&path, "not valid = [ toml").unwrap();
        let (packages, _) = load(&path);
        assert_eq!(packages.len(), DEFAULT_PRIORITY_PACKAGES.len());
    }

    #[test]
    fn extract_github_repos_finds_owner_repo_pairs() {
        let text = "See https://github.com/apple/swift-nio and github.com/pointfreeco/swift-composable-architecture for more.";
        let repos = extract_github_repos(text);
        assert!(repos.contains(&"apple/swift-nio".to_string()));
        assert!(repos.contains(&"pointfreeco/swift-composable-architecture".to_string()));
    }

    #[test]
    fn generate_priority_packages_dedupes() {
        let pages = vec![
            "github.com/apple/swift-nio".to_string(),
            "github.com/apple/swift-nio again".to_string(),
        ];
        let packages = generate_priority_packages_from_swift_org(&pages);
        assert_eq!(packages.len(), 1);
    }
}
