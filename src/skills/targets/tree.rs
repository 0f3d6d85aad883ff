use crate::skills::targets::ExcludeRules;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOp {
    CreateDir(PathBuf),
    CopyFile { from: PathBuf, to: PathBuf },
    RemoveFile(PathBuf),
    RemoveDir(PathBuf),
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOp::CreateDir(path) => write!(f, "mkdir  {}", path.display()),
            FileOp::CopyFile { to, .. } => write!(f, "copy   {}", to.display()),
            FileOp::RemoveFile(path) => write!(f, "delete {}", path.display()),
            FileOp::RemoveDir(path) => write!(f, "rmdir  {}", path.display()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

#[derive(Clone, Debug, Default)]
pub struct SyncStats {
    /// Source files covered by the pass, written or already current.
    pub files: usize,
    pub copied: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub failures: Vec<FileFailure>,
}

/// The operations needed to bring a target in line with its source, computed
/// against the current state of both trees.
#[derive(Clone, Debug, Default)]
pub struct TreeDiff {
    pub ops: Vec<FileOp>,
    pub files: usize,
    pub unchanged: usize,
    pub failures: Vec<FileFailure>,
}

/// A package subtree to overlay: `source` lands at `<dst>/<id>`.
#[derive(Clone, Debug)]
pub struct PackageTree {
    pub id: String,
    pub source: PathBuf,
}

/// Recursive copy/prune backend used by the executor.
pub trait TreeSyncer: Sync {
    /// Makes `dst` an exact copy of `src`, leaving excluded paths alone.
    fn mirror(&self, src: &Path, dst: &Path, exclude: &ExcludeRules) -> SyncStats;

    /// Copies each package into `dst/<id>` without deleting anything.
    fn overlay_copy(
        &self,
        packages: &[PackageTree],
        dst: &Path,
        exclude: &ExcludeRules,
    ) -> SyncStats;
}

/// Native filesystem implementation built on `walkdir`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsTreeSyncer;

impl TreeSyncer for FsTreeSyncer {
    fn mirror(&self, src: &Path, dst: &Path, exclude: &ExcludeRules) -> SyncStats {
        apply_diff(diff_mirror(src, dst, exclude))
    }

    fn overlay_copy(
        &self,
        packages: &[PackageTree],
        dst: &Path,
        exclude: &ExcludeRules,
    ) -> SyncStats {
        apply_diff(diff_overlay(packages, dst, exclude))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntryKind {
    File,
    Dir,
    Other,
}

fn kind_of(path: &Path) -> io::Result<Option<EntryKind>> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(kind_from(meta.file_type()))),
        Err(err) if is_missing(&err) => Ok(None),
        Err(err) => Err(err),
    }
}

// A file standing where a parent directory should be also means "absent";
// the mirror removes it before writing.
fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

fn kind_from(file_type: fs::FileType) -> EntryKind {
    if file_type.is_symlink() {
        EntryKind::Other
    } else if file_type.is_dir() {
        EntryKind::Dir
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

fn file_differs(src: &Path, dst: &Path) -> io::Result<bool> {
    let dst_meta = match fs::symlink_metadata(dst) {
        Ok(meta) => meta,
        Err(err) if is_missing(&err) => return Ok(true),
        Err(err) => return Err(err),
    };
    if !dst_meta.is_file() {
        return Ok(true);
    }
    let src_meta = fs::metadata(src)?;
    if src_meta.len() != dst_meta.len() || src_meta.permissions() != dst_meta.permissions() {
        return Ok(true);
    }
    Ok(fs::read(src)? != fs::read(dst)?)
}

fn failure(path: &Path, error: impl fmt::Display) -> FileFailure {
    FileFailure {
        path: path.to_path_buf(),
        error: error.to_string(),
    }
}

fn unsupported(path: &Path) -> FileFailure {
    failure(path, t!("skills.sync.unsupported_entry"))
}

fn walk_failure(err: walkdir::Error, fallback: &Path) -> FileFailure {
    let path = err.path().unwrap_or(fallback).to_path_buf();
    FileFailure {
        path,
        error: err.to_string(),
    }
}

/// Plans a pruning mirror of `src` into `dst`.
///
/// Removals come first (children before parents), then directory creation and
/// copies in walk order. Excluded paths are skipped on both sides.
pub fn diff_mirror(src: &Path, dst: &Path, exclude: &ExcludeRules) -> TreeDiff {
    let mut diff = TreeDiff::default();
    let mut source_kinds: HashMap<PathBuf, EntryKind> = HashMap::new();
    // Source entries that could not be mirrored; their target side is left alone.
    let mut unmirrored: Vec<PathBuf> = Vec::new();
    let mut writes = Vec::new();

    let walker = WalkDir::new(src)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded_under(entry.path(), src, exclude));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                diff.failures.push(walk_failure(err, src));
                continue;
            }
        };
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let rel = rel.to_path_buf();
        let dest = dst.join(&rel);
        match kind_from(entry.file_type()) {
            EntryKind::Dir => {
                source_kinds.insert(rel, EntryKind::Dir);
                match kind_of(&dest) {
                    Ok(Some(EntryKind::Dir)) => {}
                    Ok(_) => writes.push(FileOp::CreateDir(dest)),
                    Err(err) => diff.failures.push(failure(&dest, err)),
                }
            }
            EntryKind::File => {
                source_kinds.insert(rel, EntryKind::File);
                diff.files += 1;
                match file_differs(entry.path(), &dest) {
                    Ok(true) => writes.push(FileOp::CopyFile {
                        from: entry.path().to_path_buf(),
                        to: dest,
                    }),
                    Ok(false) => diff.unchanged += 1,
                    Err(err) => diff.failures.push(failure(&dest, err)),
                }
            }
            EntryKind::Other => {
                diff.failures.push(unsupported(entry.path()));
                unmirrored.push(rel);
            }
        }
    }

    // `contents_first` yields a directory after its children, so filtering
    // has to match whole subtrees by prefix.
    if dst.is_dir() {
        let walker = WalkDir::new(dst)
            .min_depth(1)
            .follow_links(false)
            .contents_first(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let held = entry
                    .path()
                    .strip_prefix(dst)
                    .is_ok_and(|rel| unmirrored.iter().any(|held| rel.starts_with(held)));
                !held && !is_excluded_under(entry.path(), dst, exclude)
            });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    diff.failures.push(walk_failure(err, dst));
                    continue;
                }
            };
            let Ok(rel) = entry.path().strip_prefix(dst) else {
                continue;
            };
            let kind = kind_from(entry.file_type());
            if source_kinds.get(rel) == Some(&kind) {
                continue;
            }
            let path = entry.path().to_path_buf();
            if kind == EntryKind::Dir {
                diff.ops.push(FileOp::RemoveDir(path));
            } else {
                diff.ops.push(FileOp::RemoveFile(path));
            }
        }
    }

    diff.ops.extend(writes);
    diff
}

/// Plans an additive copy of `packages` into `dst`. Never plans a removal;
/// an entry of the wrong kind in the way is reported as a failure instead.
pub fn diff_overlay(packages: &[PackageTree], dst: &Path, exclude: &ExcludeRules) -> TreeDiff {
    let mut diff = TreeDiff::default();

    for package in packages {
        let mut walker = WalkDir::new(&package.source)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !entry
                    .path()
                    .strip_prefix(&package.source)
                    .map(|rel| exclude.is_excluded(&Path::new(&package.id).join(rel)))
                    .unwrap_or(false)
            });

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    diff.failures.push(walk_failure(err, &package.source));
                    continue;
                }
            };
            let Ok(rel) = entry.path().strip_prefix(&package.source) else {
                continue;
            };
            let dest = dst.join(&package.id).join(rel);
            let existing = match kind_of(&dest) {
                Ok(existing) => existing,
                Err(err) => {
                    diff.failures.push(failure(&dest, err));
                    if entry.file_type().is_dir() {
                        walker.skip_current_dir();
                    }
                    continue;
                }
            };

            match kind_from(entry.file_type()) {
                EntryKind::Dir => match existing {
                    Some(EntryKind::Dir) => {}
                    None => diff.ops.push(FileOp::CreateDir(dest)),
                    Some(_) => {
                        diff.failures
                            .push(failure(&dest, t!("skills.sync.blocked_by_file")));
                        walker.skip_current_dir();
                    }
                },
                EntryKind::File => {
                    diff.files += 1;
                    match existing {
                        None | Some(EntryKind::File) => match file_differs(entry.path(), &dest) {
                            Ok(true) => diff.ops.push(FileOp::CopyFile {
                                from: entry.path().to_path_buf(),
                                to: dest,
                            }),
                            Ok(false) => diff.unchanged += 1,
                            Err(err) => diff.failures.push(failure(&dest, err)),
                        },
                        Some(_) => diff
                            .failures
                            .push(failure(&dest, t!("skills.sync.blocked_by_other"))),
                    }
                }
                EntryKind::Other => diff.failures.push(unsupported(entry.path())),
            }
        }
    }

    diff
}

fn is_excluded_under(path: &Path, root: &Path, exclude: &ExcludeRules) -> bool {
    path.strip_prefix(root)
        .map(|rel| exclude.is_excluded(rel))
        .unwrap_or(false)
}

/// Applies every planned operation, continuing past individual failures.
pub fn apply_diff(diff: TreeDiff) -> SyncStats {
    let mut stats = SyncStats {
        files: diff.files,
        unchanged: diff.unchanged,
        failures: diff.failures,
        ..SyncStats::default()
    };

    for op in diff.ops {
        tracing::debug!("{op}");
        match op {
            FileOp::CreateDir(path) => {
                if let Err(err) = fs::create_dir_all(&path) {
                    stats.failures.push(failure(&path, err));
                }
            }
            FileOp::CopyFile { from, to } => {
                let result = match to.parent() {
                    Some(parent) => fs::create_dir_all(parent),
                    None => Ok(()),
                }
                .and_then(|_| fs::copy(&from, &to));
                match result {
                    Ok(_) => stats.copied += 1,
                    Err(err) => stats.failures.push(failure(&to, err)),
                }
            }
            FileOp::RemoveFile(path) => match fs::remove_file(&path) {
                Ok(()) => stats.removed += 1,
                Err(err) => stats.failures.push(failure(&path, err)),
            },
            FileOp::RemoveDir(path) => match fs::remove_dir(&path) {
                Ok(()) => stats.removed += 1,
                Err(err) if err.kind() == io::ErrorKind::DirectoryNotEmpty => {
                    tracing::debug!("keeping {}: still holds excluded entries", path.display());
                }
                Err(err) => stats.failures.push(failure(&path, err)),
            },
        }
    }

    stats
}
