//! Bulk import with typed skip-and-continue.
//!
//! Import runs under the tracker's write lock: every issue is inserted first,
//! then every edge, so edges may point at issues that appear later in the
//! batch. The Created events are written last as a single batch. Item-level rejections are counted by kind and the
//! import carries on; any other error reverts everything the import did.

use super::{TrackerState, event};
use crate::cancel::Cancel;
use crate::domain::{Dependency, EventKind, Issue, IssueId};
use crate::error::{Error, Result};
use crate::graph::EdgeOutcome;
use crate::store::EntityStore;
use tracing::warn;

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Issues inserted
    pub issues_imported: usize,

    /// Edges inserted
    pub edges_imported: usize,

    /// Issues skipped because their ID already exists
    pub duplicate_issues: usize,

    /// Edges skipped because an identical edge already exists
    pub duplicate_edges: usize,

    /// Edges skipped because they would close a cycle
    pub cycles: usize,

    /// Edges skipped because they point from an issue to itself
    pub self_references: usize,

    /// Edges skipped because their target is unknown
    pub orphaned_edges: usize,
}

impl ImportReport {
    /// Total number of skipped items.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.duplicate_issues
            + self.duplicate_edges
            + self.cycles
            + self.self_references
            + self.orphaned_edges
    }

    /// Count a skippable edge error, or hand back an error that must abort.
    fn skip_edge(&mut self, err: Error) -> Result<()> {
        match err {
            Error::DuplicateEdge { .. } => self.duplicate_edges += 1,
            Error::CycleDetected { .. } => self.cycles += 1,
            Error::SelfReference(_) => self.self_references += 1,
            Error::IssueNotFound(_) => self.orphaned_edges += 1,
            other => return Err(other),
        }
        Ok(())
    }
}

pub(super) fn import<S: EntityStore>(
    state: &mut TrackerState<S>,
    issues: Vec<Issue>,
    actor: &str,
    cancel: &Cancel,
) -> Result<ImportReport> {
    // Validate everything up front so a malformed record changes nothing
    for issue in &issues {
        issue.validate()?;
    }

    let mut report = ImportReport::default();
    let mut inserted: Vec<IssueId> = Vec::new();

    let outcome = insert_all(state, issues, actor, cancel, &mut report, &mut inserted);
    if let Err(err) = outcome {
        revert(state, &inserted);
        return Err(err);
    }
    Ok(report)
}

fn insert_all<S: EntityStore>(
    state: &mut TrackerState<S>,
    issues: Vec<Issue>,
    actor: &str,
    cancel: &Cancel,
    report: &mut ImportReport,
    inserted: &mut Vec<IssueId>,
) -> Result<()> {
    let mut edges: Vec<Dependency> = Vec::new();

    // === Pass 1: issues ===
    for (i, mut issue) in issues.into_iter().enumerate() {
        cancel.check_every(i)?;

        let id = issue.id.clone();
        if state.index.contains(&id) {
            report.duplicate_issues += 1;
            continue;
        }

        // The index owns edges; the stored record never carries them
        let dependencies = std::mem::take(&mut issue.dependencies);
        match state.store.insert(issue) {
            Ok(()) => {}
            Err(err) => match Error::from(err) {
                Error::DuplicateIssue(_) => {
                    report.duplicate_issues += 1;
                    continue;
                }
                other => return Err(other),
            },
        }
        state.index.add_node(id.clone());
        state.ids.register(id.clone());
        inserted.push(id.clone());
        report.issues_imported += 1;

        edges.extend(dependencies.into_iter().map(|dep| Dependency {
            issue_id: id.clone(),
            ..dep
        }));
    }

    // === Pass 2: edges ===
    for (i, dep) in edges.iter().enumerate() {
        cancel.check_every(i)?;
        match state.index.restore_edge(dep, cancel) {
            Ok(EdgeOutcome::Added) => report.edges_imported += 1,
            Ok(EdgeOutcome::AlreadyPresent) => report.duplicate_edges += 1,
            Err(err) => report.skip_edge(err)?,
        }
    }

    // === Pass 3: audit trail ===
    let now = chrono::Utc::now();
    let created = inserted
        .iter()
        .map(|id| event(id, EventKind::Created, actor, now))
        .collect();
    state.store.record_events(created)?;

    Ok(())
}

/// Undo every insertion made by a failed import.
fn revert<S: EntityStore>(state: &mut TrackerState<S>, inserted: &[IssueId]) {
    for id in inserted {
        state.index.remove_node(id);
        state.ids.release(id);
        if let Err(err) = state.store.remove(id) {
            warn!(%id, error = %err, "Failed to revert imported issue");
        }
    }
}
