use crate::skills::catalog::{Catalog, Selection};
use crate::skills::targets::Target;
use crate::skills::targets::tree::{PackageTree, TreeDiff, diff_mirror, diff_overlay};
use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    /// The target becomes a pruned copy of the whole source root.
    Mirror,
    /// Only the selected packages are written; nothing is deleted.
    Overlay,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Mirror => f.write_str("mirror"),
            SyncMode::Overlay => f.write_str("overlay"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SyncPlan {
    pub target: Target,
    pub mode: SyncMode,
    pub source_root: PathBuf,
    /// Empty in mirror mode.
    pub packages: Vec<PackageTree>,
}

pub fn plan(selection: &Selection, target: &Target, catalog: &Catalog) -> SyncPlan {
    match selection {
        Selection::All => SyncPlan {
            target: target.clone(),
            mode: SyncMode::Mirror,
            source_root: catalog.root.clone(),
            packages: Vec::new(),
        },
        Selection::Packages(ids) => SyncPlan {
            target: target.clone(),
            mode: SyncMode::Overlay,
            source_root: catalog.root.clone(),
            packages: ids
                .iter()
                .map(|id| PackageTree {
                    id: id.clone(),
                    source: catalog.package_dir(id),
                })
                .collect(),
        },
    }
}

impl SyncPlan {
    /// The concrete operations this plan implies right now. Reads both trees,
    /// writes nothing.
    pub fn operations(&self) -> TreeDiff {
        match self.mode {
            SyncMode::Mirror => {
                diff_mirror(&self.source_root, &self.target.root, &self.target.exclude)
            }
            SyncMode::Overlay => {
                diff_overlay(&self.packages, &self.target.root, &self.target.exclude)
            }
        }
    }
}
