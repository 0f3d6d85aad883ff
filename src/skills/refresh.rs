use crate::error::{Result, SkillsError};
use crate::path_utils::is_plain_dir_name;
use crate::skills::shared::git::{GitCli, RepoCloner, clone_with_fallback};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SOURCES_FILE: &str = "sources.json";

/// Entries never carried over from an upstream checkout.
const SKIPPED_NAMES: &[&str] = &[".git", ".github", ".DS_Store"];

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct UpstreamSource {
    /// Entries without a url are left alone.
    pub url: Option<String>,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Subdirectory of the repository holding the package.
    #[serde(default)]
    pub path: String,
}

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshFailure {
    pub id: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default)]
pub struct RefreshReport {
    /// `None` when the source root has no `sources.json`.
    pub sources_file: Option<PathBuf>,
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    pub failures: Vec<RefreshFailure>,
}

impl RefreshReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Brings packages in the source root up to date before the catalog is read.
pub trait CatalogRefresh {
    fn refresh(&self, source_root: &Path) -> Result<RefreshReport>;
}

/// Loads `sources.json` from the source root. A missing file yields `None`.
pub fn load_sources(source_root: &Path) -> Result<Option<BTreeMap<String, UpstreamSource>>> {
    let path = source_root.join(SOURCES_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path).map_err(|e| SkillsError::Refresh {
        message: t!("skills.refresh.read_failed", path = path.display(), error = e).to_string(),
    })?;
    let sources = serde_json::from_str(&content).map_err(|e| SkillsError::Refresh {
        message: t!("skills.refresh.parse_failed", path = path.display(), error = e).to_string(),
    })?;
    Ok(Some(sources))
}

pub struct GitRefresh<C: RepoCloner = GitCli> {
    cloner: C,
}

impl GitRefresh<GitCli> {
    pub fn new() -> Self {
        Self { cloner: GitCli }
    }
}

impl Default for GitRefresh<GitCli> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: RepoCloner> GitRefresh<C> {
    pub fn with_cloner(cloner: C) -> Self {
        Self { cloner }
    }

    fn refresh_one(
        &self,
        source_root: &Path,
        id: &str,
        source: &UpstreamSource,
        url: &str,
    ) -> anyhow::Result<()> {
        if !is_plain_dir_name(id) {
            anyhow::bail!(t!("skills.refresh.invalid_id", id = id));
        }

        let checkout = tempfile::Builder::new().prefix("skillsync-clone-").tempdir()?;
        let repo_dir = checkout.path().join("repo");
        clone_with_fallback(&self.cloner, url, &source.branch, &repo_dir)?;

        let subtree = repo_dir.join(source.path.trim_matches('/'));
        if !subtree.is_dir() {
            anyhow::bail!(t!("skills.refresh.path_missing", path = source.path));
        }

        // Stage next to the package so the swap is a rename on one filesystem.
        let staging = tempfile::Builder::new()
            .prefix(".skillsync-refresh-")
            .tempdir_in(source_root)?;
        let staged = staging.path().join(id);
        copy_upstream_tree(&subtree, &staged)?;

        let package_dir = source_root.join(id);
        if fs::symlink_metadata(&package_dir).is_ok() {
            if package_dir.is_dir() {
                fs::remove_dir_all(&package_dir)?;
            } else {
                fs::remove_file(&package_dir)?;
            }
        }
        fs::rename(&staged, &package_dir)?;
        Ok(())
    }
}

impl<C: RepoCloner> CatalogRefresh for GitRefresh<C> {
    fn refresh(&self, source_root: &Path) -> Result<RefreshReport> {
        if !source_root.is_dir() {
            return Err(SkillsError::SourceNotFound {
                path: source_root.to_path_buf(),
            });
        }
        let Some(sources) = load_sources(source_root)? else {
            tracing::info!("no {} in {}", SOURCES_FILE, source_root.display());
            return Ok(RefreshReport::default());
        };

        let mut report = RefreshReport {
            sources_file: Some(source_root.join(SOURCES_FILE)),
            ..RefreshReport::default()
        };
        for (id, source) in &sources {
            let Some(url) = source.url.as_deref().filter(|url| !url.trim().is_empty()) else {
                report.skipped.push(id.clone());
                continue;
            };
            tracing::info!("refreshing {id} from {url} ({})", source.branch);
            match self.refresh_one(source_root, id, source, url) {
                Ok(()) => report.updated.push(id.clone()),
                Err(err) => {
                    tracing::warn!("refresh of {id} failed: {err:#}");
                    report.failures.push(RefreshFailure {
                        id: id.clone(),
                        reason: format!("{err:#}"),
                    });
                }
            }
        }
        Ok(report)
    }
}

fn copy_upstream_tree(src: &Path, dst: &Path) -> anyhow::Result<()> {
    let walker = WalkDir::new(src)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !SKIPPED_NAMES
                    .iter()
                    .any(|name| entry.file_name() == std::ffi::OsStr::new(name))
        });
    for entry in walker {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src)?;
        let out = dst.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&out)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &out)?;
        } else {
            tracing::debug!("skipping non-regular entry {}", entry.path().display());
        }
    }
    Ok(())
}
