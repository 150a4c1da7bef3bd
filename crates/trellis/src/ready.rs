//! Ready-work resolution.
//!
//! An issue is *ready* when it is not closed, matches the caller's work
//! filter, and has no outgoing `Blocks` edge whose target is still open.
//! Blocking is direct only: the status of each direct target is looked up
//! in O(1) and blocking chains are never walked, so a full resolution costs
//! O(issues + Blocks edges).

use crate::cancel::Cancel;
use crate::domain::{DependencyType, Issue, IssueId, IssueStatus, SortPolicy, WorkFilter};
use crate::error::Result;
use crate::graph::DependencyIndex;
use crate::search::{matches_filter, scan_issues};
use crate::sorting::sort_by_policy;
use crate::store::EntityStore;
use chrono::Utc;
use tracing::trace;

/// A non-closed issue together with the open issues blocking it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedIssue {
    /// The blocked issue
    pub issue: Issue,

    /// Direct `Blocks` targets that are not closed
    pub blocked_by: Vec<IssueId>,
}

/// Direct `Blocks` targets of `id` that are not closed.
///
/// A target missing from the store does not block.
fn open_blockers<S: EntityStore + ?Sized>(
    store: &S,
    index: &DependencyIndex,
    id: &IssueId,
) -> Result<Vec<IssueId>> {
    let mut blockers = Vec::new();
    for target in index.targets(id, DependencyType::Blocks) {
        if store
            .status(target)?
            .is_some_and(|status| status != IssueStatus::Closed)
        {
            blockers.push(target.clone());
        }
    }
    Ok(blockers)
}

fn is_blocked<S: EntityStore + ?Sized>(
    store: &S,
    index: &DependencyIndex,
    id: &IssueId,
) -> Result<bool> {
    for target in index.targets(id, DependencyType::Blocks) {
        if store
            .status(target)?
            .is_some_and(|status| status != IssueStatus::Closed)
        {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Issues that are ready for work under `filter`.
///
/// The result reflects a single snapshot of store and index. It is ordered
/// by `filter.sort_policy`, or by `default_sort` when the filter sets none,
/// and truncated to `filter.limit`.
pub(crate) fn ready_work<S: EntityStore + ?Sized>(
    store: &S,
    index: &DependencyIndex,
    filter: &WorkFilter,
    default_sort: SortPolicy,
    cancel: &Cancel,
) -> Result<Vec<Issue>> {
    let attributes = filter.to_issue_filter();

    let mut ready = Vec::new();
    let scanned = scan_issues(store, cancel, |issue| {
        if issue.is_closed() || !matches_filter(issue, &attributes) {
            return Ok(());
        }
        if !is_blocked(store, index, &issue.id)? {
            ready.push(issue.clone());
        }
        Ok(())
    })?;
    trace!(scanned, ready = ready.len(), "ready-work scan complete");

    sort_by_policy(
        &mut ready,
        filter.sort_policy.unwrap_or(default_sort),
        Utc::now(),
    );
    if let Some(limit) = filter.limit {
        ready.truncate(limit);
    }
    Ok(ready)
}

/// Every non-closed issue with at least one open direct blocker.
///
/// Ordered by priority, then ID.
pub(crate) fn blocked_issues<S: EntityStore + ?Sized>(
    store: &S,
    index: &DependencyIndex,
    cancel: &Cancel,
) -> Result<Vec<BlockedIssue>> {
    let mut blocked = Vec::new();
    scan_issues(store, cancel, |issue| {
        if issue.is_closed() {
            return Ok(());
        }
        let blocked_by = open_blockers(store, index, &issue.id)?;
        if !blocked_by.is_empty() {
            blocked.push(BlockedIssue {
                issue: issue.clone(),
                blocked_by,
            });
        }
        Ok(())
    })?;

    blocked.sort_by(|a, b| {
        a.issue
            .priority
            .cmp(&b.issue.priority)
            .then(a.issue.id.cmp(&b.issue.id))
    });
    Ok(blocked)
}
