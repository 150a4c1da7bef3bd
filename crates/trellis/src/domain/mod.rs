//! Domain types for issue tracking.
//!
//! This module contains the core domain types: issues, their identifiers,
//! dependency edges between them, and the descriptors used to create and
//! update them.

pub mod filter;

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub use filter::{IssueFilter, SortPolicy, WorkFilter};

/// Maximum length of an issue title, in characters.
pub const MAX_TITLE_LENGTH: usize = 500;

/// Highest (least urgent) priority value. Priority 0 is the most urgent.
pub const MAX_PRIORITY: u8 = 4;

/// Unique identifier for an issue
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(String);

impl IssueId {
    /// Create a new issue ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for IssueId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IssueId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Represents an issue in the tracking system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Unique identifier, assigned at creation and never changed
    pub id: IssueId,

    /// Issue title (non-empty)
    pub title: String,

    /// Issue description
    #[serde(default)]
    pub description: String,

    /// Current status
    pub status: IssueStatus,

    /// Priority level (0 = highest, 4 = lowest)
    pub priority: u8,

    /// Issue type
    pub issue_type: IssueType,

    /// Assignee (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// Label set. Inserting an existing label is a no-op.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub labels: BTreeSet<String>,

    /// Outgoing dependency edges.
    ///
    /// The dependency index owns the edge set; this list is only populated on
    /// demand (see `IssueTracker::get_with_dependencies` and `export_all`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Closed timestamp, present if and only if the status is `Closed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Issue {
    /// Validate the attribute invariants of a stored issue.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant: empty or over-long title,
    /// out-of-range priority, an empty label, or `closed_at` disagreeing
    /// with the status.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_priority(self.priority)?;
        for label in &self.labels {
            validate_label(label)?;
        }
        if self.closed_at.is_some() != (self.status == IssueStatus::Closed) {
            return Err(ValidationError::ClosedAtMismatch {
                status: self.status,
            });
        }
        Ok(())
    }

    /// Returns true if the issue is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == IssueStatus::Closed
    }

    /// Move the issue to `status`, keeping `closed_at` consistent with it.
    pub(crate) fn set_status(&mut self, status: IssueStatus, now: DateTime<Utc>) {
        match (self.status == IssueStatus::Closed, status == IssueStatus::Closed) {
            (false, true) => self.closed_at = Some(now),
            (true, false) => self.closed_at = None,
            _ => {}
        }
        self.status = status;
    }
}

/// Status of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Issue is open and ready to work on
    Open,

    /// Issue is currently being worked on
    InProgress,

    /// Issue is marked blocked by hand
    Blocked,

    /// Issue has been completed
    Closed,
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IssueStatus::Open => "open",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Blocked => "blocked",
            IssueStatus::Closed => "closed",
        })
    }
}

/// Type of issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    /// Bug fix
    Bug,

    /// New feature
    Feature,

    /// General task
    Task,

    /// Epic (parent issue)
    Epic,

    /// Maintenance/chore
    Chore,
}

/// Type of dependency relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyType {
    /// Hard blocker: the source is not ready until the target is closed
    Blocks,

    /// Soft link - informational
    Related,

    /// Hierarchical: the target is the parent of the source
    ParentChild,

    /// Found during work
    DiscoveredFrom,
}

impl DependencyType {
    /// Whether edges of this kind must keep their subgraph acyclic.
    #[must_use]
    pub fn is_acyclic(self) -> bool {
        matches!(self, DependencyType::Blocks | DependencyType::ParentChild)
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DependencyType::Blocks => "blocks",
            DependencyType::Related => "related",
            DependencyType::ParentChild => "parent-child",
            DependencyType::DiscoveredFrom => "discovered-from",
        })
    }
}

/// A directed dependency edge: `issue_id` depends on `depends_on_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Source of the edge (the dependent issue)
    pub issue_id: IssueId,

    /// Target of the edge (the issue being depended upon)
    pub depends_on_id: IssueId,

    /// Type of dependency
    #[serde(rename = "type")]
    pub dep_type: DependencyType,

    /// When the edge was recorded
    pub created_at: DateTime<Utc>,

    /// Actor that recorded the edge
    pub created_by: String,
}

/// Data for creating a new issue
#[derive(Debug, Clone)]
pub struct NewIssue {
    /// Issue title
    pub title: String,

    /// Issue description
    pub description: String,

    /// Initial status. Creating an issue as `Closed` stamps `closed_at`.
    pub status: IssueStatus,

    /// Priority level (0-4)
    pub priority: u8,

    /// Issue type
    pub issue_type: IssueType,

    /// Assignee (optional)
    pub assignee: Option<String>,

    /// Initial labels
    pub labels: Vec<String>,
}

impl NewIssue {
    /// A new open task with the given title, priority 2 and no other attributes.
    pub fn task(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: IssueStatus::Open,
            priority: 2,
            issue_type: IssueType::Task,
            assignee: None,
            labels: Vec::new(),
        }
    }

    /// Validate the creation data.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field: title, priority or label.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_priority(self.priority)?;
        for label in &self.labels {
            validate_label(label)?;
        }
        Ok(())
    }
}

/// Data for updating an existing issue.
///
/// Only fields that are `Some` are modified.
#[derive(Debug, Clone, Default)]
pub struct IssueUpdate {
    /// New title (if updating)
    pub title: Option<String>,

    /// New description (if updating)
    pub description: Option<String>,

    /// New status (if updating)
    pub status: Option<IssueStatus>,

    /// New priority (if updating)
    pub priority: Option<u8>,

    /// New issue type (if updating)
    pub issue_type: Option<IssueType>,

    /// New assignee (if updating, `Some(None)` to clear)
    pub assignee: Option<Option<String>>,
}

impl IssueUpdate {
    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.issue_type.is_none()
            && self.assignee.is_none()
    }

    /// Names of the fields this update touches, for the audit trail.
    pub(crate) fn field_names(&self) -> Vec<&'static str> {
        [
            ("title", self.title.is_some()),
            ("description", self.description.is_some()),
            ("status", self.status.is_some()),
            ("priority", self.priority.is_some()),
            ("issue_type", self.issue_type.is_some()),
            ("assignee", self.assignee.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    /// Apply the update to `issue`, stamping `updated_at` with `now`.
    pub(crate) fn apply_to(self, issue: &mut Issue, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            issue.title = title;
        }
        if let Some(description) = self.description {
            issue.description = description;
        }
        if let Some(status) = self.status {
            issue.set_status(status, now);
        }
        if let Some(priority) = self.priority {
            issue.priority = priority;
        }
        if let Some(issue_type) = self.issue_type {
            issue.issue_type = issue_type;
        }
        if let Some(assignee) = self.assignee {
            issue.assignee = assignee;
        }
        issue.updated_at = now;
    }
}

/// Kind of an audit event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// Issue was created
    Created,

    /// Issue fields were updated
    Updated {
        /// Names of the changed fields
        fields: Vec<String>,
    },

    /// Issue status changed
    StatusChanged {
        /// Previous status
        from: IssueStatus,
        /// New status
        to: IssueStatus,
    },

    /// A label was added
    LabelAdded {
        /// The label
        label: String,
    },

    /// A label was removed
    LabelRemoved {
        /// The label
        label: String,
    },
}

/// Audit trail entry recorded for every issue mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Issue the event belongs to
    pub issue_id: IssueId,

    /// What happened
    #[serde(flatten)]
    pub kind: EventKind,

    /// Who did it
    pub actor: String,

    /// When it happened
    pub at: DateTime<Utc>,
}

/// Validate an issue title.
///
/// # Errors
///
/// Returns `EmptyTitle` for a blank title and `TitleTooLong` past
/// [`MAX_TITLE_LENGTH`] characters.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong {
            len,
            max: MAX_TITLE_LENGTH,
        });
    }
    Ok(())
}

/// Validate a priority value.
///
/// # Errors
///
/// Returns `PriorityOutOfRange` if `priority` exceeds [`MAX_PRIORITY`].
pub fn validate_priority(priority: u8) -> Result<(), ValidationError> {
    if priority > MAX_PRIORITY {
        return Err(ValidationError::PriorityOutOfRange(priority));
    }
    Ok(())
}

/// Validate a label.
///
/// # Errors
///
/// Returns `EmptyLabel` for a blank label.
pub fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.trim().is_empty() {
        return Err(ValidationError::EmptyLabel);
    }
    Ok(())
}

/// Validate the actor identity carried by a mutation.
///
/// # Errors
///
/// Returns `EmptyActor` for a blank actor.
pub fn validate_actor(actor: &str) -> Result<(), ValidationError> {
    if actor.trim().is_empty() {
        return Err(ValidationError::EmptyActor);
    }
    Ok(())
}
