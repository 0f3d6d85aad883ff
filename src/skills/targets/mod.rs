pub mod plan;
pub mod sync;
pub mod tree;

use crate::error::{Result, SkillsError};
use glob::{MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Paths under a target root that skillsync must never write or prune.
///
/// A pattern without `/` matches any single path component. A pattern with
/// `/` matches the leading components of the path, anchored at the root.
#[derive(Clone, Debug, Default)]
pub struct ExcludeRules {
    patterns: Vec<ExcludePattern>,
}

#[derive(Clone, Debug)]
struct ExcludePattern {
    raw: String,
    pattern: Pattern,
    depth: Option<usize>,
}

impl ExcludeRules {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut compiled = Vec::new();
        for raw in patterns {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            let trimmed = raw.trim_matches('/');
            let depth = if raw.contains('/') {
                Some(trimmed.split('/').count())
            } else {
                None
            };
            compiled.push(ExcludePattern {
                raw: raw.to_string(),
                pattern: Pattern::new(trimmed)?,
                depth,
            });
        }
        Ok(Self { patterns: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.raw.as_str()).collect()
    }

    /// `rel_path` is relative to the target root.
    pub fn is_excluded(&self, rel_path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let components: Vec<String> = rel_path
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        self.patterns.iter().any(|p| match p.depth {
            None => components
                .iter()
                .any(|name| p.pattern.matches_with(name, options)),
            Some(depth) => {
                components.len() >= depth
                    && p.pattern
                        .matches_with(&components[..depth].join("/"), options)
            }
        })
    }
}

/// One destination root for skill packages.
#[derive(Clone, Debug)]
pub struct Target {
    pub id: String,
    pub root: PathBuf,
    pub exclude: ExcludeRules,
    /// Whether the target takes part when no target is named explicitly.
    pub enabled: bool,
}

/// The ordered table of known targets for this run.
#[derive(Clone, Debug, Default)]
pub struct TargetRegistry {
    targets: Vec<Target>,
}

impl TargetRegistry {
    pub fn new(targets: Vec<Target>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for target in &targets {
            if !seen.insert(target.id.as_str()) {
                return Err(SkillsError::Config {
                    message: t!("skills.config.duplicate_target", id = target.id).to_string(),
                });
            }
        }
        Ok(Self { targets })
    }

    pub fn get(&self, id: &str) -> Option<&Target> {
        self.targets.iter().find(|target| target.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.targets.iter().map(|target| target.id.as_str()).collect()
    }
}

/// Target flags exactly as given on the command line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetFlags {
    pub names: Vec<String>,
    pub all: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EffectiveTargets {
    All,
    Named(BTreeSet<String>),
}

/// No named target means every target.
pub fn expand_defaults(flags: &TargetFlags) -> EffectiveTargets {
    if flags.all || flags.names.is_empty() {
        return EffectiveTargets::All;
    }
    EffectiveTargets::Named(flags.names.iter().map(|name| name.trim().to_string()).collect())
}

pub fn enabled_targets(
    registry: &TargetRegistry,
    effective: &EffectiveTargets,
) -> Result<Vec<Target>> {
    let targets: Vec<Target> = match effective {
        EffectiveTargets::All => registry
            .iter()
            .filter(|target| target.enabled)
            .cloned()
            .collect(),
        EffectiveTargets::Named(names) => {
            if let Some(unknown) = names.iter().find(|name| registry.get(name).is_none()) {
                return Err(SkillsError::UnknownTarget {
                    name: unknown.clone(),
                });
            }
            registry
                .iter()
                .filter(|target| names.contains(&target.id))
                .cloned()
                .collect()
        }
    };

    if targets.is_empty() {
        return Err(SkillsError::NoTargetsEnabled);
    }
    Ok(targets)
}
