use crate::error::{Result, SkillsError};
use crate::path_utils::is_hidden;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// The set of skill packages found directly under a source root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    pub root: PathBuf,
    pub packages: BTreeSet<String>,
}

impl Catalog {
    pub fn contains(&self, id: &str) -> bool {
        self.packages.contains(id)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn package_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }
}

/// Every non-hidden immediate subdirectory of `source_root` is one package.
/// Symlinked directories are not packages.
pub fn list_packages(source_root: &Path) -> Result<Catalog> {
    let meta = match fs::metadata(source_root) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(SkillsError::SourceNotFound {
                path: source_root.to_path_buf(),
            });
        }
        Err(err) => return Err(err.into()),
    };
    if !meta.is_dir() {
        return Err(SkillsError::SourceNotDirectory {
            path: source_root.to_path_buf(),
        });
    }

    let mut packages = BTreeSet::new();
    for entry in fs::read_dir(source_root)? {
        let entry = entry?;
        let path = entry.path();
        if is_hidden(&path) {
            continue;
        }
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            tracing::debug!("skipping symlinked entry {}", path.display());
            continue;
        }
        if !file_type.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            packages.insert(name.to_string());
        } else {
            tracing::warn!("skipping non UTF-8 package directory {}", path.display());
        }
    }

    tracing::debug!(
        "found {} packages under {}",
        packages.len(),
        source_root.display()
    );
    Ok(Catalog {
        root: source_root.to_path_buf(),
        packages,
    })
}
