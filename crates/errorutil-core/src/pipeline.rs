//! The analyze / update run.
//!
//! ```text
//! walk ─► extract (parallel) ─► bind ─┬─────────────────────────────► validate ─► artifacts
//!                                     └─ update: assign ─► rewrite ─► commit counter ─► re-walk ─┘
//! ```
//!
//! In update mode the report is always built from a second, read-only walk so
//! the artifacts describe what is on disk, not what was planned.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::adapter::LanguageAdapter;
use crate::assign::{plan_assignments, AssignmentPlan};
use crate::binding::bind_details;
use crate::component::{ComponentError, ComponentRegistry};
use crate::config::{Mode, RunConfig};
use crate::error::{ErrorUtilError, OutputErrorCode};
use crate::export::{
    build_export, errors_file_name, export_file_name, summary_file_name, write_json,
    ComponentExport,
};
use crate::info::InfoAll;
use crate::rewrite::{rewrite_all, RewriteOutcome};
use crate::summary::AnalysisSummary;
use crate::walker::{TreeWalker, WalkError};

/// Fallback component name when neither metadata nor the root path names one.
const UNNAMED_COMPONENT: &str = "root";

// ============================================================================
// Report
// ============================================================================

/// Overall outcome, separate from process errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Clean,
    /// Convention violations present.
    Violations,
    /// Some files could not be read, parsed or rewritten.
    FileErrors,
}

impl RunStatus {
    /// Exit code for the status; `None` when clean.
    pub fn error_code(&self) -> Option<OutputErrorCode> {
        match self {
            RunStatus::Clean => None,
            RunStatus::Violations => Some(OutputErrorCode::Violations),
            RunStatus::FileErrors => Some(OutputErrorCode::FileErrors),
        }
    }
}

/// What the update phase did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateReport {
    pub plan: AssignmentPlan,
    pub committed_files: Vec<String>,
    pub unchanged_files: Vec<String>,
    pub failed_files: Vec<(String, String)>,
    /// Counter value before and after the run.
    pub counter_before: u64,
    pub counter_after: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub component: String,
    pub info: InfoAll,
    pub summary: AnalysisSummary,
    pub export: Option<ComponentExport>,
    pub update: Option<UpdateReport>,
    pub artifacts: Vec<PathBuf>,
}

impl RunReport {
    pub fn status(&self) -> RunStatus {
        if self.summary.file_error_count() > 0 {
            RunStatus::FileErrors
        } else if self.summary.violation_count() > 0 {
            RunStatus::Violations
        } else {
            RunStatus::Clean
        }
    }
}

// ============================================================================
// Run
// ============================================================================

/// Execute one run.
///
/// Fatal conditions (unreadable root, metadata required but unusable, artifact
/// write failure, counter inconsistency) are returned as errors. Violations and
/// per-file failures are carried in the report.
pub fn run<A: LanguageAdapter>(config: &RunConfig, adapter: &A) -> Result<RunReport, ErrorUtilError> {
    let walker = TreeWalker::new(&config.root_dir, config.effective_skip_dirs())?
        .follow_links(config.follow_links);

    let mut deferred_component_error = None;
    let mut registry = match (ComponentRegistry::load(&config.info_dir), config.mode) {
        (Ok(registry), Mode::Analyze) => registry,
        (Ok(Some(registry)), Mode::Update(_)) => Some(registry),
        (Ok(None), Mode::Update(_)) => {
            return Err(ComponentError::NotFound {
                path: ComponentRegistry::file_path(&config.info_dir),
            }
            .into())
        }
        (Err(err), Mode::Analyze) => {
            warn!(
                error = %err,
                path = ?err.path(),
                "component metadata unusable, export will fail"
            );
            deferred_component_error = Some(err);
            None
        }
        (Err(err), Mode::Update(_)) => return Err(err.into()),
    };

    let component = component_name(&config.root_dir, registry.as_ref());
    info!(
        component = %component,
        root = %config.root_dir.display(),
        language = adapter.language(),
        "scanning"
    );
    let mut info = scan(&walker, adapter, config, &component);

    let mut update = None;
    let mut inconsistency = None;
    if let (Mode::Update(policy), Some(registry)) = (config.mode, registry.as_mut()) {
        let mut counter = registry.counter();
        let plan = plan_assignments(&info, &component, policy, &config.conventions, &mut counter)?;
        info!(
            assignments = plan.assignments.len(),
            from = plan.start,
            to = plan.next,
            ?policy,
            "planned code assignment"
        );

        let outcome = rewrite_all(&plan.rewrites(&config.root_dir));
        let finished = finish_update(plan, outcome, registry, &component, || {
            scan(&walker, adapter, config, &component)
        })?;
        info = finished.info;
        update = Some(finished.report);
        inconsistency = finished.inconsistency;
    }

    let counters: BTreeMap<String, u64> = registry
        .iter()
        .map(|r| (component.clone(), r.next_error_code()))
        .collect();
    let summary = AnalysisSummary::compute(&info, &config.conventions, &counters);

    fs::create_dir_all(&config.out_dir).map_err(|e| ErrorUtilError::ArtifactWrite {
        path: config.out_dir.clone(),
        message: e.to_string(),
    })?;
    let mut artifacts = Vec::new();
    let errors_path = config.out_dir.join(errors_file_name());
    write_json(&errors_path, &info)?;
    artifacts.push(errors_path);
    let summary_path = config.out_dir.join(summary_file_name());
    write_json(&summary_path, &summary)?;
    artifacts.push(summary_path);

    // Missing metadata only fails the export, after the other artifacts exist.
    let Some(registry) = registry else {
        return Err(deferred_component_error
            .unwrap_or_else(|| ComponentError::NotFound {
                path: ComponentRegistry::file_path(&config.info_dir),
            })
            .into());
    };
    let export = build_export(&info, &component, registry.info(), &config.conventions);
    let export_path = config.out_dir.join(export_file_name());
    write_json(&export_path, &export)?;
    artifacts.push(export_path);

    if let Some(err) = inconsistency {
        return Err(err);
    }

    let report = RunReport {
        component,
        info,
        summary,
        export: Some(export),
        update,
        artifacts,
    };
    info!(status = ?report.status(), "run complete");
    Ok(report)
}

/// Result of [`finish_update`].
#[derive(Debug)]
pub struct FinishedUpdate {
    pub report: UpdateReport,
    /// Snapshot re-scanned from disk, with rewrite failures recorded.
    pub info: InfoAll,
    /// Raised by the caller once the artifacts are written.
    pub inconsistency: Option<ErrorUtilError>,
}

/// Persist the counter for the rewrites that reached disk, then re-scan.
///
/// The counter moves past the last code whose file is on disk and never past
/// a code whose file failed. If persisting fails before any file was written
/// the error is returned directly; after a write it becomes a
/// [`ErrorUtilError::CounterInconsistent`] naming the committed range.
pub fn finish_update(
    plan: AssignmentPlan,
    outcome: RewriteOutcome,
    registry: &mut ComponentRegistry,
    component: &str,
    rescan: impl FnOnce() -> InfoAll,
) -> Result<FinishedUpdate, ErrorUtilError> {
    let target = if outcome.failed.is_empty() {
        plan.next
    } else {
        plan.committed_next(|f| outcome.is_applied(f))
    };

    let counter_before = registry.next_error_code();
    let mut inconsistency = None;
    if let Err(err) = registry.commit(target) {
        if outcome.committed.is_empty() {
            return Err(err.into());
        }
        let written: Vec<u64> = plan
            .committed(|f| outcome.committed.iter().any(|c| c == f))
            .map(|a| a.code)
            .collect();
        let first = written.iter().copied().min().unwrap_or(plan.start);
        let last = written.iter().copied().max().unwrap_or(plan.start);
        error!(
            first,
            last,
            files = outcome.committed.len(),
            expected_next = target,
            error = %err,
            "sources rewritten but counter not persisted"
        );
        inconsistency = Some(ErrorUtilError::CounterInconsistent {
            first,
            last,
            files: outcome.committed.len(),
            expected_next: target,
            message: err.to_string(),
        });
    }

    // Post-update truth comes from disk.
    info!("re-scanning after update");
    let mut info = rescan();
    for (file, err) in &outcome.failed {
        info.insert_file_error(component, file, format!("rewrite failed: {}", err));
    }

    let report = UpdateReport {
        counter_before,
        counter_after: registry.next_error_code(),
        committed_files: outcome.committed,
        unchanged_files: outcome.unchanged,
        failed_files: outcome
            .failed
            .into_iter()
            .map(|(f, e)| (f, e.to_string()))
            .collect(),
        plan,
    };
    Ok(FinishedUpdate {
        report,
        info,
        inconsistency,
    })
}

/// One read-only walk: extract every candidate file in parallel, then bind.
pub fn scan<A: LanguageAdapter>(
    walker: &TreeWalker,
    adapter: &A,
    config: &RunConfig,
    component: &str,
) -> InfoAll {
    let mut info = InfoAll::new();
    info.ensure_component(component);

    let mut candidates = Vec::new();
    for entry in walker.files() {
        match entry {
            Ok(file) if adapter.can_handle(&file.path) => candidates.push(file),
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "walk error");
                let path = match &err {
                    WalkError::Entry { path, .. } => path.clone(),
                    WalkError::RootUnreadable { path, .. } => path.display().to_string(),
                };
                info.insert_file_error(component, &path, err.to_string());
            }
        }
    }
    debug!(files = candidates.len(), "extracting");

    let results: Vec<_> = candidates
        .par_iter()
        .map(|file| {
            let outcome = fs::read_to_string(&file.path)
                .map_err(|e| format!("read failed: {}", e))
                .and_then(|content| {
                    adapter
                        .extract(&file.rel_path, &content, &config.conventions)
                        .map_err(|e| format!("parse failed: {}", e))
                });
            (file.rel_path.as_str(), outcome)
        })
        .collect();

    for (rel_path, outcome) in results {
        match outcome {
            Ok(extraction) => {
                debug!(
                    file = rel_path,
                    declarations = extraction.declarations.len(),
                    details = extraction.details.len(),
                    "extracted"
                );
                info.insert_extraction(component, rel_path, extraction);
            }
            Err(message) => {
                warn!(file = rel_path, error = %message, "skipping file");
                info.insert_file_error(component, rel_path, message);
            }
        }
    }

    let bound = bind_details(&mut info);
    debug!(bound, "bound detail calls");
    info
}

/// Component name from metadata, else the root directory's name.
fn component_name(root: &Path, registry: Option<&ComponentRegistry>) -> String {
    if let Some(registry) = registry {
        return registry.name().to_string();
    }
    let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNNAMED_COMPONENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::testing::LineAdapter;
    use crate::assign::AssignPolicy;
    use crate::component::{ComponentInfo, COMPONENT_INFO_FILE};
    use crate::config::ConventionConfig;
    use crate::rewrite::RewriteError;
    use crate::types::Span;
    use tempfile::TempDir;

    const PLACEHOLDER: &str = "ErrAaCode = \"replace_me\"\n";

    /// Two placeholder files, a source root and a separate info directory.
    struct Fixture {
        _tmp: TempDir,
        config: RunConfig,
    }

    impl Fixture {
        fn new(next: u64) -> Self {
            let tmp = TempDir::new().unwrap();
            let root = tmp.path().join("src");
            let info_dir = tmp.path().join("meta");
            fs::create_dir_all(&root).unwrap();
            fs::create_dir_all(&info_dir).unwrap();
            fs::write(root.join("a.txt"), PLACEHOLDER).unwrap();
            fs::write(root.join("b.txt"), PLACEHOLDER.replace("Aa", "Bb")).unwrap();
            let info = ComponentInfo::new("comp", "library", next);
            fs::write(
                info_dir.join(COMPONENT_INFO_FILE),
                serde_json::to_string_pretty(&info).unwrap(),
            )
            .unwrap();
            let mut config = RunConfig::new(root.clone(), Mode::Update(AssignPolicy::Incremental));
            config.info_dir = info_dir;
            Fixture { _tmp: tmp, config }
        }

        fn registry(&self) -> ComponentRegistry {
            ComponentRegistry::load(&self.config.info_dir).unwrap().unwrap()
        }

        fn scan(&self) -> InfoAll {
            let walker =
                TreeWalker::new(&self.config.root_dir, self.config.effective_skip_dirs()).unwrap();
            scan(&walker, &LineAdapter, &self.config, "comp")
        }

        fn plan(&self, registry: &ComponentRegistry) -> AssignmentPlan {
            let mut counter = registry.counter();
            plan_assignments(
                &self.scan(),
                "comp",
                AssignPolicy::Incremental,
                &self.config.conventions,
                &mut counter,
            )
            .unwrap()
        }

        /// Rewrite only `a.txt` and report `b.txt` as failed.
        fn partial_outcome(&self, plan: &AssignmentPlan) -> RewriteOutcome {
            let rewrites: Vec<_> = plan
                .rewrites(&self.config.root_dir)
                .into_iter()
                .filter(|r| r.rel_path == "a.txt")
                .collect();
            let mut outcome = rewrite_all(&rewrites);
            outcome.failed.push((
                "b.txt".to_string(),
                RewriteError::AnchorMismatch {
                    span: Span::new(12, 24),
                    expected: "\"replace_me\"".to_string(),
                    actual: "\"edited\"".to_string(),
                },
            ));
            outcome
        }

        fn persisted_next(&self) -> u64 {
            self.registry().next_error_code()
        }
    }

    fn status_of(info: InfoAll, update: UpdateReport) -> RunStatus {
        let summary =
            AnalysisSummary::compute(&info, &ConventionConfig::default(), &BTreeMap::new());
        RunReport {
            component: "comp".to_string(),
            info,
            summary,
            export: None,
            update: Some(update),
            artifacts: Vec::new(),
        }
        .status()
    }

    mod partial_rewrite {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn counter_stops_after_the_last_written_code() {
            let fx = Fixture::new(10);
            let mut registry = fx.registry();
            let plan = fx.plan(&registry);
            assert_eq!((plan.start, plan.next), (10, 12));
            let outcome = fx.partial_outcome(&plan);

            let finished =
                finish_update(plan, outcome, &mut registry, "comp", || fx.scan()).unwrap();

            assert!(finished.inconsistency.is_none());
            assert_eq!(finished.report.counter_before, 10);
            assert_eq!(finished.report.counter_after, 11);
            assert_eq!(finished.report.committed_files, vec!["a.txt".to_string()]);
            assert_eq!(finished.report.failed_files.len(), 1);
            assert_eq!(finished.report.failed_files[0].0, "b.txt");
            assert_eq!(fx.persisted_next(), 11);
        }

        #[test]
        fn rescan_reflects_disk_and_records_the_failure() {
            let fx = Fixture::new(10);
            let mut registry = fx.registry();
            let plan = fx.plan(&registry);
            let outcome = fx.partial_outcome(&plan);

            let finished =
                finish_update(plan, outcome, &mut registry, "comp", || fx.scan()).unwrap();

            let values: Vec<_> = finished
                .info
                .declarations("comp")
                .into_iter()
                .map(|d| (d.file.as_str(), d.value.as_str()))
                .collect();
            assert_eq!(values, vec![("a.txt", "10"), ("b.txt", "replace_me")]);

            let errors = finished.info.file_errors();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].0, "b.txt");
            assert!(errors[0].1.starts_with("rewrite failed: "));

            let status = status_of(finished.info, finished.report);
            assert_eq!(status, RunStatus::FileErrors);
            assert_eq!(status.error_code().unwrap().code(), 3);
        }

        #[test]
        fn all_written_commits_the_plan() {
            let fx = Fixture::new(10);
            let mut registry = fx.registry();
            let plan = fx.plan(&registry);
            let outcome = rewrite_all(&plan.rewrites(&fx.config.root_dir));

            let finished =
                finish_update(plan, outcome, &mut registry, "comp", || fx.scan()).unwrap();

            assert_eq!(finished.report.counter_after, 12);
            assert_eq!(fx.persisted_next(), 12);
            assert_eq!(status_of(finished.info, finished.report), RunStatus::Clean);
        }
    }

    mod counter_persistence {
        use super::*;
        use pretty_assertions::assert_eq;

        /// Replace the metadata file with a directory so the atomic rename fails.
        fn block_metadata(fx: &Fixture) {
            let path = fx.config.info_dir.join(COMPONENT_INFO_FILE);
            fs::remove_file(&path).unwrap();
            fs::create_dir(&path).unwrap();
        }

        #[test]
        fn failed_commit_after_a_write_is_inconsistent() {
            let fx = Fixture::new(10);
            let mut registry = fx.registry();
            let plan = fx.plan(&registry);
            let outcome = fx.partial_outcome(&plan);
            block_metadata(&fx);

            let finished =
                finish_update(plan, outcome, &mut registry, "comp", || fx.scan()).unwrap();

            let err = finished.inconsistency.unwrap();
            assert_eq!(err.error_code().code(), 5);
            match err {
                ErrorUtilError::CounterInconsistent {
                    first,
                    last,
                    files,
                    expected_next,
                    ..
                } => assert_eq!((first, last, files, expected_next), (10, 10, 1, 11)),
                other => panic!("unexpected error: {}", other),
            }
            assert_eq!(finished.report.counter_after, 10);
        }

        #[test]
        fn failed_commit_without_writes_is_returned() {
            let fx = Fixture::new(10);
            let mut registry = fx.registry();
            let plan = fx.plan(&registry);
            let mut outcome = RewriteOutcome::default();
            outcome.failed.push((
                "a.txt".to_string(),
                RewriteError::SpanOutOfBounds {
                    span: Span::new(0, 99),
                    len: 24,
                },
            ));
            outcome.unchanged.push("b.txt".to_string());
            block_metadata(&fx);

            let err = finish_update(plan, outcome, &mut registry, "comp", || fx.scan())
                .err()
                .unwrap();
            assert!(matches!(err, ErrorUtilError::Component(_)));
        }
    }
}
