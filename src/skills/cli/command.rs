use crate::error::SkillsError;
use crate::skills::catalog::{Catalog, Selection, list_packages, resolve};
use crate::skills::cli::interactive::{
    AssumeYes, Confirmer, LineConfirmer, TerminalConfirmer, is_interactive, pick_packages,
};
use crate::skills::config::{SkillsConfig, load_config, resolve_source_root};
use crate::skills::refresh::{CatalogRefresh, GitRefresh, RefreshReport};
use crate::skills::targets::plan::{SyncPlan, plan};
use crate::skills::targets::sync::{RunReport, TargetFailure, execute_all};
use crate::skills::targets::tree::{FsTreeSyncer, SyncStats, TreeSyncer};
use crate::skills::targets::{TargetFlags, TargetRegistry, enabled_targets, expand_defaults};
use anyhow::Result;
use clap::Args;
use std::io;
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Install only this skill; repeat for more (targets are overlaid, nothing is deleted)
    #[arg(short = 's', long = "skill", value_name = "NAME", conflicts_with = "pick")]
    pub skills: Vec<String>,

    /// Choose skills interactively
    #[arg(long)]
    pub pick: bool,

    /// Install into this target only; repeat for more
    #[arg(short = 't', long = "target", value_name = "ID")]
    pub targets: Vec<String>,

    /// Install into every enabled target (default when no --target is given)
    #[arg(long = "all-targets")]
    pub all_targets: bool,

    /// Refresh upstream skills listed in sources.json before installing
    #[arg(short = 'u', long)]
    pub update: bool,

    /// List available skills and exit
    #[arg(short = 'l', long, conflicts_with = "list_targets")]
    pub list: bool,

    /// List configured targets and exit
    #[arg(long = "list-targets")]
    pub list_targets: bool,

    /// Do not ask for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Show the file operations for each target without changing anything
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Skills source directory (env: SKILLSYNC_SOURCE_DIR, default: ./skills)
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PackageRequest {
    All,
    Named(Vec<String>),
    Pick,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Install,
    List,
    ListTargets,
}

/// Everything a run needs, fixed once the command line is parsed.
#[derive(Clone, Debug)]
pub struct InstallOptions {
    pub config_dir: PathBuf,
    pub source: Option<PathBuf>,
    pub packages: PackageRequest,
    pub targets: TargetFlags,
    pub action: Action,
    pub update: bool,
    pub assume_yes: bool,
    pub dry_run: bool,
}

impl InstallOptions {
    pub fn from_args(args: &InstallArgs, config_dir: PathBuf) -> Self {
        let packages = if args.pick {
            PackageRequest::Pick
        } else if args.skills.is_empty() {
            PackageRequest::All
        } else {
            PackageRequest::Named(args.skills.clone())
        };
        let action = if args.list {
            Action::List
        } else if args.list_targets {
            Action::ListTargets
        } else {
            Action::Install
        };
        Self {
            config_dir,
            source: args.source.clone(),
            packages,
            targets: TargetFlags {
                names: args.targets.clone(),
                all: args.all_targets,
            },
            action,
            update: args.update,
            assume_yes: args.yes,
            dry_run: args.dry_run,
        }
    }
}

pub fn run(options: &InstallOptions) -> Result<()> {
    let refresher = GitRefresh::new();
    let syncer = FsTreeSyncer;
    if options.assume_yes {
        return run_with(options, &mut AssumeYes, &refresher, &syncer).map(|_| ());
    }
    if is_interactive() {
        return run_with(options, &mut TerminalConfirmer, &refresher, &syncer).map(|_| ());
    }
    let mut confirmer = LineConfirmer::new(io::stdin().lock(), io::stdout());
    run_with(options, &mut confirmer, &refresher, &syncer).map(|_| ())
}

/// Runs the install pipeline. Returns the report of an executed sync, or
/// `None` for listing and dry-run modes.
pub fn run_with(
    options: &InstallOptions,
    confirmer: &mut dyn Confirmer,
    refresher: &dyn CatalogRefresh,
    syncer: &dyn TreeSyncer,
) -> Result<Option<RunReport>> {
    let config = load_config(&options.config_dir)?;
    if options.action == Action::ListTargets {
        print_targets(&config.registry);
        return Ok(None);
    }

    let source_root = resolve_source_root(options.source.as_deref(), &config)?;
    tracing::debug!("source root: {}", source_root.display());

    if options.update {
        let report = refresher.refresh(&source_root)?;
        print_refresh_report(&report);
    }

    let catalog = list_packages(&source_root)?;
    if options.action == Action::List {
        print_packages(&catalog);
        return Ok(None);
    }

    let selection = select_packages(&options.packages, &catalog)?;
    let plans = build_plans(&config, &options.targets, &selection, &catalog)?;

    if options.dry_run {
        print_dry_run(&plans);
        return Ok(None);
    }

    if !confirmer.confirm(&selection, &plans)? {
        return Err(SkillsError::Declined.into());
    }

    let report = RunReport {
        packages: selection
            .package_ids(&catalog)
            .into_iter()
            .map(str::to_string)
            .collect(),
        outcomes: execute_all(&plans, syncer),
    };
    print_run_report(&report);
    Ok(Some(report.into_result()?))
}

fn select_packages(request: &PackageRequest, catalog: &Catalog) -> Result<Selection> {
    let selection = match request {
        PackageRequest::All => Selection::All,
        PackageRequest::Named(names) => resolve(names, catalog)?,
        PackageRequest::Pick => match pick_packages(catalog)? {
            Some(picked) if !picked.is_empty() => resolve(&picked, catalog)?,
            _ => return Err(SkillsError::Declined.into()),
        },
    };
    Ok(selection)
}

fn build_plans(
    config: &SkillsConfig,
    flags: &TargetFlags,
    selection: &Selection,
    catalog: &Catalog,
) -> Result<Vec<SyncPlan>> {
    let effective = expand_defaults(flags);
    let targets = enabled_targets(&config.registry, &effective)?;
    Ok(targets
        .iter()
        .map(|target| plan(selection, target, catalog))
        .collect())
}

fn print_packages(catalog: &Catalog) {
    for id in &catalog.packages {
        println!("{id}");
    }
    println!("{}", t!("skills.list.total", count = catalog.len()));
}

fn print_targets(registry: &TargetRegistry) {
    for target in registry.iter() {
        let mut line = format!("{:<12} {}", target.id, target.root.display());
        if !target.exclude.is_empty() {
            line.push_str(&format!(
                "  {}",
                t!(
                    "skills.list.excluded",
                    patterns = target.exclude.patterns().join(", ")
                )
            ));
        }
        if !target.enabled {
            line.push_str(&format!("  {}", t!("skills.list.disabled")));
        }
        println!("{line}");
    }
}

fn print_refresh_report(report: &RefreshReport) {
    let Some(path) = &report.sources_file else {
        println!("{}", t!("skills.refresh.no_sources"));
        return;
    };
    println!("{}", t!("skills.refresh.found", path = path.display()));
    for id in &report.updated {
        println!("  ✅ {}", t!("skills.refresh.updated", id = id));
    }
    for id in &report.skipped {
        println!("  ⏭️  {}", t!("skills.refresh.skipped", id = id));
    }
    for failure in &report.failures {
        eprintln!(
            "  ❌ {}",
            t!(
                "skills.refresh.failed",
                id = failure.id,
                reason = failure.reason
            )
        );
    }
}

fn print_dry_run(plans: &[SyncPlan]) {
    for plan in plans {
        let diff = plan.operations();
        println!(
            "{}",
            t!(
                "skills.dry_run.header",
                target = plan.target.id,
                root = plan.target.root.display(),
                mode = plan.mode
            )
        );
        if diff.ops.is_empty() {
            println!("  {}", t!("skills.dry_run.up_to_date"));
        }
        for op in &diff.ops {
            println!("  {op}");
        }
        for failure in &diff.failures {
            println!("  ! {failure}");
        }
    }
}

fn print_run_report(report: &RunReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(stats) => println!(
                "✅ {}",
                t!(
                    "skills.report.target_ok",
                    target = outcome.target_id,
                    root = outcome.root.display(),
                    mode = outcome.mode,
                    summary = stats_summary(stats)
                )
            ),
            Err(failure) => {
                eprintln!(
                    "❌ {}",
                    t!(
                        "skills.report.target_failed",
                        target = outcome.target_id,
                        root = outcome.root.display(),
                        reason = failure
                    )
                );
                if let TargetFailure::Partial { stats } = failure {
                    for file in stats.failures.iter().skip(1) {
                        eprintln!("    {file}");
                    }
                }
            }
        }
    }
}

fn stats_summary(stats: &SyncStats) -> String {
    t!(
        "skills.report.summary",
        copied = stats.copied,
        removed = stats.removed,
        unchanged = stats.unchanged
    )
    .to_string()
}
