//! Filtered search: predicate evaluation over issue attributes.
//!
//! Predicates never look at the dependency graph. The ready-work resolver
//! reuses [`matches_filter`] for the attribute part of a work filter.
//!
//! Label semantics: `labels` requires every listed label, `labels_any`
//! requires at least one. Free text is a case-insensitive substring match
//! over the title, description and ID.

use crate::cancel::Cancel;
use crate::domain::{Issue, IssueFilter};
use crate::error::Result;
use crate::sorting::sort_search_results;
use crate::store::EntityStore;
use std::ops::ControlFlow;
use tracing::trace;

/// Returns true if `issue` satisfies every populated field of `filter`.
///
/// The filter's `limit` is not a predicate and is ignored here.
#[must_use]
pub fn matches_filter(issue: &Issue, filter: &IssueFilter) -> bool {
    if filter.status.is_some_and(|status| issue.status != status) {
        return false;
    }
    if filter.priority_min.is_some_and(|min| issue.priority < min) {
        return false;
    }
    if filter.priority_max.is_some_and(|max| issue.priority > max) {
        return false;
    }
    if filter.issue_type.is_some_and(|t| issue.issue_type != t) {
        return false;
    }
    if let Some(assignee) = &filter.assignee
        && issue.assignee.as_ref() != Some(assignee)
    {
        return false;
    }
    if !filter.labels.iter().all(|label| issue.labels.contains(label)) {
        return false;
    }
    if !filter.labels_any.is_empty()
        && !filter.labels_any.iter().any(|label| issue.labels.contains(label))
    {
        return false;
    }
    true
}

/// Returns true if the lowercased `needle` occurs in the title, description or ID.
#[must_use]
pub fn matches_text(issue: &Issue, needle: &str) -> bool {
    issue.title.to_lowercase().contains(needle)
        || issue.description.to_lowercase().contains(needle)
        || issue.id.as_str().to_lowercase().contains(needle)
}

/// Run a filtered search against `store`.
///
/// Blank `text` imposes no constraint. Results are ordered by priority,
/// then newest first, then ID, and truncated to `filter.limit`.
pub(crate) fn search<S: EntityStore + ?Sized>(
    store: &S,
    text: Option<&str>,
    filter: &IssueFilter,
    cancel: &Cancel,
) -> Result<Vec<Issue>> {
    let needle = text
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase);

    let mut matches = Vec::new();
    let scanned = scan_issues(store, cancel, |issue| {
        if matches_filter(issue, filter)
            && needle.as_deref().is_none_or(|n| matches_text(issue, n))
        {
            matches.push(issue.clone());
        }
        Ok(())
    })?;
    trace!(scanned, matched = matches.len(), "search scan complete");

    sort_search_results(&mut matches);
    if let Some(limit) = filter.limit {
        matches.truncate(limit);
    }
    Ok(matches)
}

/// Visit every stored issue, polling `cancel` periodically.
///
/// Stops at the first error from `visit`, from the store or from
/// cancellation. Returns the number of issues visited.
pub(crate) fn scan_issues<S, F>(store: &S, cancel: &Cancel, mut visit: F) -> Result<usize>
where
    S: EntityStore + ?Sized,
    F: FnMut(&Issue) -> Result<()>,
{
    let mut outcome = Ok(());
    let mut scanned = 0usize;

    store.scan(&mut |issue: &Issue| {
        let step = cancel.check_every(scanned).and_then(|()| visit(issue));
        scanned += 1;
        match step {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                outcome = Err(e);
                ControlFlow::Break(())
            }
        }
    })?;

    outcome.map(|()| scanned)
}
