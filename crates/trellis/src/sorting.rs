//! Result ordering for ready work and search.

use crate::domain::{Issue, SortPolicy};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;

/// Time window (in hours) for the hybrid sort policy.
///
/// Issues created within this window are "recent" and sorted by priority.
/// Older issues are sorted by age (oldest first) so they are not starved by
/// a steady stream of new high-priority work.
pub const HYBRID_SORT_RECENT_WINDOW_HOURS: i64 = 48;

/// Sort ready work according to `policy`, relative to the instant `now`.
///
/// # Sort Policies
///
/// - `Hybrid`: recent issues (< 48h) first, by priority then age; older
///   issues after them, by age
/// - `Priority`: strict priority ordering (P0 -> P4), oldest first within a level
/// - `Oldest`: creation date ascending
///
/// The issue ID is the final tiebreaker in every policy so equal timestamps
/// still produce a deterministic order.
pub(crate) fn sort_by_policy(issues: &mut [Issue], policy: SortPolicy, now: DateTime<Utc>) {
    match policy {
        SortPolicy::Hybrid => {
            let cutoff = now - Duration::hours(HYBRID_SORT_RECENT_WINDOW_HOURS);

            issues.sort_by(|a, b| {
                match (a.created_at > cutoff, b.created_at > cutoff) {
                    (true, true) => by_priority(a, b),
                    (false, false) => by_age(a, b),
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                }
            });
        }
        SortPolicy::Priority => issues.sort_by(by_priority),
        SortPolicy::Oldest => issues.sort_by(by_age),
    }
}

/// Order search results: priority ascending, newest first, then ID.
pub(crate) fn sort_search_results(issues: &mut [Issue]) {
    issues.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(b.created_at.cmp(&a.created_at))
            .then(a.id.cmp(&b.id))
    });
}

fn by_priority(a: &Issue, b: &Issue) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

fn by_age(a: &Issue, b: &Issue) -> Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}
