use crate::error::SkillsError;
use crate::skills::targets::plan::{SyncMode, SyncPlan};
use crate::skills::targets::tree::{FileFailure, SyncStats, TreeSyncer};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::thread;

#[derive(Clone, Debug)]
pub enum TargetFailure {
    /// The target root could not be created; nothing was attempted.
    RootUnavailable { error: String },
    /// The pass ran to the end but some file operations failed.
    Partial { stats: SyncStats },
    /// The worker for this target panicked.
    Panicked,
}

impl fmt::Display for TargetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetFailure::RootUnavailable { error } => {
                write!(f, "{}", t!("skills.sync.root_unavailable", error = error))
            }
            TargetFailure::Partial { stats } => {
                let first = stats
                    .failures
                    .first()
                    .map(FileFailure::to_string)
                    .unwrap_or_default();
                write!(
                    f,
                    "{}",
                    t!(
                        "skills.sync.partial_failure",
                        count = stats.failures.len(),
                        first = first
                    )
                )
            }
            TargetFailure::Panicked => write!(f, "{}", t!("skills.sync.worker_panicked")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TargetOutcome {
    pub target_id: String,
    pub root: PathBuf,
    pub mode: SyncMode,
    pub result: Result<SyncStats, TargetFailure>,
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs one plan. Failures stay inside the returned outcome.
pub fn execute(plan: &SyncPlan, syncer: &dyn TreeSyncer) -> TargetOutcome {
    let target = &plan.target;
    tracing::info!(
        "syncing target {} ({}) into {}",
        target.id,
        plan.mode,
        target.root.display()
    );

    let result = match fs::create_dir_all(&target.root) {
        Err(err) => Err(TargetFailure::RootUnavailable {
            error: err.to_string(),
        }),
        Ok(()) => {
            let stats = match plan.mode {
                SyncMode::Mirror => syncer.mirror(&plan.source_root, &target.root, &target.exclude),
                SyncMode::Overlay => {
                    syncer.overlay_copy(&plan.packages, &target.root, &target.exclude)
                }
            };
            for failure in &stats.failures {
                tracing::warn!("{}: {}", target.id, failure);
            }
            if stats.failures.is_empty() {
                Ok(stats)
            } else {
                Err(TargetFailure::Partial { stats })
            }
        }
    };

    TargetOutcome {
        target_id: target.id.clone(),
        root: target.root.clone(),
        mode: plan.mode,
        result,
    }
}

/// Executes every plan on its own scoped thread. Target roots are disjoint,
/// so workers share only read-only state.
pub fn execute_all(plans: &[SyncPlan], syncer: &dyn TreeSyncer) -> Vec<TargetOutcome> {
    thread::scope(|scope| {
        let handles: Vec<_> = plans
            .iter()
            .map(|plan| scope.spawn(move || execute(plan, syncer)))
            .collect();

        handles
            .into_iter()
            .zip(plans)
            .map(|(handle, plan)| {
                handle.join().unwrap_or_else(|_| TargetOutcome {
                    target_id: plan.target.id.clone(),
                    root: plan.target.root.clone(),
                    mode: plan.mode,
                    result: Err(TargetFailure::Panicked),
                })
            })
            .collect()
    })
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub packages: Vec<String>,
    pub outcomes: Vec<TargetOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.is_success())
            .map(|outcome| outcome.target_id.clone())
            .collect()
    }

    pub fn failed(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.is_success())
            .map(|outcome| outcome.target_id.clone())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(TargetOutcome::is_success)
    }

    pub fn into_result(self) -> Result<Self, SkillsError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(SkillsError::SyncFailed {
            failed: self.failed(),
            succeeded: self.succeeded(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::catalog::{Selection, list_packages};
    use crate::skills::targets::plan::plan;
    use crate::skills::targets::tree::{FsTreeSyncer, PackageTree};
    use crate::skills::targets::{ExcludeRules, Target};
    use std::path::Path;
    use tempfile::TempDir;

    fn target(id: &str, root: PathBuf) -> Target {
        Target {
            id: id.to_string(),
            root,
            exclude: ExcludeRules::default(),
            enabled: true,
        }
    }

    fn source(temp: &TempDir) -> PathBuf {
        let source = temp.path().join("skills");
        fs::create_dir_all(source.join("alpha")).expect("alpha");
        fs::write(source.join("alpha/SKILL.md"), "alpha").expect("alpha file");
        source
    }

    #[test]
    fn test_execute_creates_missing_root() {
        let temp = TempDir::new().expect("temp dir");
        let catalog = list_packages(&source(&temp)).expect("catalog");
        let root = temp.path().join("deep/nested/target");
        let plan = plan(&Selection::All, &target("claude", root.clone()), &catalog);

        let outcome = execute(&plan, &FsTreeSyncer);

        let stats = outcome.result.expect("success");
        assert_eq!(stats.copied, 1);
        assert!(root.join("alpha/SKILL.md").exists());
    }

    #[test]
    fn test_uncreatable_root_fails_only_that_target() {
        let temp = TempDir::new().expect("temp dir");
        let catalog = list_packages(&source(&temp)).expect("catalog");
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "a file, not a directory").expect("blocker");
        let plans = vec![
            plan(&Selection::All, &target("broken", blocker.join("skills")), &catalog),
            plan(&Selection::All, &target("ok", temp.path().join("ok")), &catalog),
        ];

        let outcomes = execute_all(&plans, &FsTreeSyncer);

        assert!(matches!(
            outcomes[0].result,
            Err(TargetFailure::RootUnavailable { .. })
        ));
        assert!(outcomes[1].is_success());
        assert!(temp.path().join("ok/alpha/SKILL.md").exists());
    }

    struct PanickingSyncer;

    impl TreeSyncer for PanickingSyncer {
        fn mirror(&self, _src: &Path, dst: &Path, _exclude: &ExcludeRules) -> SyncStats {
            if dst.ends_with("bad") {
                panic!("boom");
            }
            SyncStats::default()
        }

        fn overlay_copy(
            &self,
            _packages: &[PackageTree],
            _dst: &Path,
            _exclude: &ExcludeRules,
        ) -> SyncStats {
            SyncStats::default()
        }
    }

    #[test]
    fn test_panicking_worker_does_not_stop_siblings() {
        let temp = TempDir::new().expect("temp dir");
        let catalog = list_packages(&source(&temp)).expect("catalog");
        let plans = vec![
            plan(&Selection::All, &target("bad", temp.path().join("bad")), &catalog),
            plan(&Selection::All, &target("good", temp.path().join("good")), &catalog),
        ];

        let outcomes = execute_all(&plans, &PanickingSyncer);

        assert!(matches!(outcomes[0].result, Err(TargetFailure::Panicked)));
        assert!(outcomes[1].is_success());
    }

    #[test]
    fn test_report_with_partial_failure_is_error() {
        let report = RunReport {
            packages: vec!["alpha".to_string()],
            outcomes: vec![
                TargetOutcome {
                    target_id: "claude".to_string(),
                    root: PathBuf::from("/claude"),
                    mode: SyncMode::Mirror,
                    result: Ok(SyncStats::default()),
                },
                TargetOutcome {
                    target_id: "codex".to_string(),
                    root: PathBuf::from("/codex"),
                    mode: SyncMode::Mirror,
                    result: Err(TargetFailure::Panicked),
                },
            ],
        };

        match report.into_result() {
            Err(SkillsError::SyncFailed { failed, succeeded }) => {
                assert_eq!(failed, vec!["codex".to_string()]);
                assert_eq!(succeeded, vec!["claude".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
