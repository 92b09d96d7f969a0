//! Sequential code assignment.
//!
//! Assignment walks a component's declarations in a fixed order (file path,
//! then byte offset) and takes one code per selected declaration from a
//! [`CodeCounter`]. Given identical input and the same starting counter the
//! plan is identical, so re-running never produces a diff.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::component::CodeCounter;
use crate::config::ConventionConfig;
use crate::info::InfoAll;
use crate::model::CodeValue;
use crate::rewrite::{Edit, FileRewrite};
use crate::types::{Location, Span};

/// Which declarations receive a new code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignPolicy {
    /// Only placeholder declarations.
    #[default]
    Incremental,
    /// Every declaration in the component.
    Force,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignError {
    #[error("code counter exhausted at {next}")]
    CounterExhausted { next: u64 },
}

/// One declaration's new code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub file: String,
    pub name: String,
    pub span: Span,
    pub location: Location,
    /// Literal as written before assignment, quotes included.
    pub old_literal: String,
    pub code: u64,
}

impl Assignment {
    /// Replacement literal. Codes stay string constants.
    pub fn new_literal(&self) -> String {
        format!("\"{}\"", self.code)
    }
}

/// Ordered assignments for one component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentPlan {
    pub assignments: Vec<Assignment>,
    /// Counter value before the plan.
    pub start: u64,
    /// Counter value if every assignment lands.
    pub next: u64,
}

impl AssignmentPlan {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Group edits by file, in path order.
    pub fn rewrites(&self, root: &Path) -> Vec<FileRewrite> {
        let mut by_file: BTreeMap<&str, Vec<Edit>> = BTreeMap::new();
        for a in &self.assignments {
            by_file
                .entry(a.file.as_str())
                .or_default()
                .push(Edit::replace(a.span, a.old_literal.clone(), a.new_literal()));
        }
        by_file
            .into_iter()
            .map(|(file, edits)| FileRewrite {
                rel_path: file.to_string(),
                path: root.join(file),
                edits,
            })
            .collect()
    }

    /// Counter value justified by the files that actually landed.
    ///
    /// One past the highest code written to an applied file, never below
    /// `start`.
    pub fn committed_next(&self, applied: impl Fn(&str) -> bool) -> u64 {
        self.assignments
            .iter()
            .filter(|a| applied(&a.file))
            .map(|a| a.code.saturating_add(1))
            .max()
            .unwrap_or(self.start)
            .max(self.start)
    }

    /// Assignments whose file satisfies `applied`.
    pub fn committed<'a>(
        &'a self,
        applied: impl Fn(&str) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.assignments.iter().filter(move |a| applied(&a.file))
    }
}

/// Plan code assignments for `component`, consuming codes from `counter`.
pub fn plan_assignments(
    info: &InfoAll,
    component: &str,
    policy: AssignPolicy,
    conventions: &ConventionConfig,
    counter: &mut CodeCounter,
) -> Result<AssignmentPlan, AssignError> {
    let start = counter.peek();
    let mut assignments = Vec::new();

    for decl in info.declarations(component) {
        let selected = match policy {
            AssignPolicy::Incremental => {
                decl.code_value(&conventions.placeholder) == CodeValue::Placeholder
            }
            AssignPolicy::Force => true,
        };
        if !selected {
            continue;
        }
        let code = counter
            .allocate()
            .ok_or_else(|| AssignError::CounterExhausted {
                next: counter.peek(),
            })?;
        debug!(file = %decl.file, name = %decl.name, code, "assigning code");
        assignments.push(Assignment {
            file: decl.file.clone(),
            name: decl.name.clone(),
            span: decl.span,
            location: decl.location.clone(),
            old_literal: decl.literal.clone(),
            code,
        });
    }

    Ok(AssignmentPlan {
        assignments,
        start,
        next: counter.peek(),
    })
}
