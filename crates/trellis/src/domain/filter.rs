//! Query descriptors: attribute filters, ready-work filters and sort policies.

use super::{IssueStatus, IssueType};
use serde::{Deserialize, Serialize};

/// Attribute filter for searching issues.
///
/// Every populated field is a constraint and all constraints are combined
/// with a logical AND. An unset field imposes no constraint, so
/// `IssueFilter::default()` matches every issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    /// Filter by exact status
    pub status: Option<IssueStatus>,

    /// Lowest priority value accepted (inclusive)
    pub priority_min: Option<u8>,

    /// Highest priority value accepted (inclusive)
    pub priority_max: Option<u8>,

    /// Filter by issue type
    pub issue_type: Option<IssueType>,

    /// Filter by exact assignee
    pub assignee: Option<String>,

    /// The issue must carry every one of these labels
    pub labels: Vec<String>,

    /// The issue must carry at least one of these labels (ignored when empty)
    pub labels_any: Vec<String>,

    /// Limit number of results
    pub limit: Option<usize>,
}

impl IssueFilter {
    /// Filter on a single status.
    #[must_use]
    pub fn with_status(status: IssueStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Restrict to the inclusive priority range `min..=max`.
    #[must_use]
    pub fn priority_range(mut self, min: u8, max: u8) -> Self {
        self.priority_min = Some(min);
        self.priority_max = Some(max);
        self
    }
}

/// Filter for ready-work queries.
///
/// Ready work is never closed and never blocked; this filter narrows the
/// remaining candidates further.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkFilter {
    /// Only issues in this status (e.g. only `Open`, excluding `InProgress`)
    pub status: Option<IssueStatus>,

    /// Lowest priority value accepted (inclusive)
    pub priority_min: Option<u8>,

    /// Highest priority value accepted (inclusive)
    pub priority_max: Option<u8>,

    /// Filter by issue type
    pub issue_type: Option<IssueType>,

    /// Filter by exact assignee
    pub assignee: Option<String>,

    /// The issue must carry every one of these labels
    pub labels: Vec<String>,

    /// The issue must carry at least one of these labels (ignored when empty)
    pub labels_any: Vec<String>,

    /// Result ordering. `None` falls back to the configured default.
    pub sort_policy: Option<SortPolicy>,

    /// Limit number of results
    pub limit: Option<usize>,
}

impl WorkFilter {
    /// The attribute part of this filter, evaluated by filtered search.
    #[must_use]
    pub fn to_issue_filter(&self) -> IssueFilter {
        IssueFilter {
            status: self.status,
            priority_min: self.priority_min,
            priority_max: self.priority_max,
            issue_type: self.issue_type,
            assignee: self.assignee.clone(),
            labels: self.labels.clone(),
            labels_any: self.labels_any.clone(),
            limit: None,
        }
    }
}

/// Sort policy for ready work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortPolicy {
    /// Issues created in the last 48 hours by priority, older ones by age
    #[default]
    Hybrid,

    /// Strict priority ordering (P0 first)
    Priority,

    /// Creation date ascending (oldest first)
    Oldest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_filter_projection_drops_limit() {
        let filter = WorkFilter {
            assignee: Some("alice".to_string()),
            labels: vec!["backend".to_string()],
            priority_max: Some(1),
            limit: Some(3),
            ..Default::default()
        };

        let projected = filter.to_issue_filter();
        assert_eq!(projected.assignee.as_deref(), Some("alice"));
        assert_eq!(projected.labels, vec!["backend".to_string()]);
        assert_eq!(projected.priority_max, Some(1));
        assert_eq!(projected.limit, None);
    }

    #[test]
    fn test_issue_filter_builders() {
        let filter = IssueFilter::with_status(IssueStatus::Open).priority_range(0, 2);
        assert_eq!(filter.status, Some(IssueStatus::Open));
        assert_eq!(filter.priority_min, Some(0));
        assert_eq!(filter.priority_max, Some(2));
    }
}
