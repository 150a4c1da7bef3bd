//! Error types for trellis operations.
//!
//! Every failure the tracker can report has its own variant so callers can
//! branch on the kind of failure instead of inspecting message text.

use crate::domain::{DependencyType, IssueId, IssueStatus};
use crate::id_generation::IdGenerationError;
use crate::store::StoreError;
use std::io;
use thiserror::Error;

/// The error type for trellis operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Issue not found.
    #[error("Issue not found: {0}")]
    IssueNotFound(IssueId),

    /// The dependency edge to remove does not exist.
    #[error("Dependency not found: {from} -> {to} ({dep_type})")]
    DependencyNotFound {
        /// Source of the edge
        from: IssueId,
        /// Target of the edge
        to: IssueId,
        /// Kind of the edge
        dep_type: DependencyType,
    },

    /// An edge from an issue to itself.
    #[error("Issue {0} cannot depend on itself")]
    SelfReference(IssueId),

    /// The edge would introduce a directed cycle in its subgraph.
    #[error("Adding {dep_type} dependency {from} -> {to} would create a cycle")]
    CycleDetected {
        /// Source of the rejected edge
        from: IssueId,
        /// Target of the rejected edge
        to: IssueId,
        /// Kind of the rejected edge
        dep_type: DependencyType,
    },

    /// An identical edge already exists and duplicates are rejected.
    #[error("Dependency already exists: {from} -> {to} ({dep_type})")]
    DuplicateEdge {
        /// Source of the edge
        from: IssueId,
        /// Target of the edge
        to: IssueId,
        /// Kind of the edge
        dep_type: DependencyType,
    },

    /// The child already has a parent and single-parent mode is on.
    #[error("Issue {child} already has parent {parent}")]
    ParentAlreadySet {
        /// The child issue
        child: IssueId,
        /// Its existing parent
        parent: IssueId,
    },

    /// An issue with this ID already exists.
    #[error("Issue already exists: {0}")]
    DuplicateIssue(IssueId),

    /// The caller's cancellation token fired or its deadline passed.
    #[error("Operation canceled")]
    Canceled,

    /// No unique ID could be generated.
    #[error("ID generation failed: {0}")]
    IdGeneration(#[from] IdGenerationError),

    /// The entity store failed.
    #[error("Storage error: {0}")]
    Storage(StoreError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(id) => Error::DuplicateIssue(id),
            other => Error::Storage(other),
        }
    }
}

/// Discriminant of [`Error`], for callers that branch on the failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Validation`]
    Validation,
    /// See [`Error::IssueNotFound`] and [`Error::DependencyNotFound`]
    NotFound,
    /// See [`Error::SelfReference`]
    SelfReference,
    /// See [`Error::CycleDetected`]
    CycleDetected,
    /// See [`Error::DuplicateEdge`]
    DuplicateEdge,
    /// See [`Error::DuplicateIssue`] and [`Error::ParentAlreadySet`]
    Conflict,
    /// See [`Error::Canceled`]
    Canceled,
    /// See [`Error::Storage`], [`Error::Io`] and [`Error::IdGeneration`]
    Storage,
    /// See [`Error::Config`]
    Config,
}

impl Error {
    /// The kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::IssueNotFound(_) | Error::DependencyNotFound { .. } => ErrorKind::NotFound,
            Error::SelfReference(_) => ErrorKind::SelfReference,
            Error::CycleDetected { .. } => ErrorKind::CycleDetected,
            Error::DuplicateEdge { .. } => ErrorKind::DuplicateEdge,
            Error::ParentAlreadySet { .. } | Error::DuplicateIssue(_) => ErrorKind::Conflict,
            Error::Canceled => ErrorKind::Canceled,
            Error::Storage(_) | Error::Io(_) | Error::IdGeneration(_) => ErrorKind::Storage,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether a bulk caller may skip this error and continue with the batch.
    ///
    /// True for cycle, duplicate-edge and duplicate-issue rejections, which
    /// leave state untouched and concern only the rejected item.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::CycleDetected { .. } | Error::DuplicateEdge { .. } | Error::DuplicateIssue(_)
        )
    }
}

/// Invalid input rejected before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Title is empty or whitespace.
    #[error("title cannot be empty")]
    EmptyTitle,

    /// Title exceeds the maximum length.
    #[error("title is {len} characters, maximum is {max}")]
    TitleTooLong {
        /// Actual length in characters
        len: usize,
        /// Maximum length in characters
        max: usize,
    },

    /// Priority outside 0-4.
    #[error("priority {0} is out of range (expected 0-4)")]
    PriorityOutOfRange(u8),

    /// Label is empty or whitespace.
    #[error("label cannot be empty")]
    EmptyLabel,

    /// Actor identity is empty.
    #[error("actor cannot be empty")]
    EmptyActor,

    /// Issue ID prefix is malformed.
    #[error("invalid prefix '{prefix}': {reason}")]
    InvalidPrefix {
        /// The rejected prefix
        prefix: String,
        /// Why it was rejected
        reason: String,
    },

    /// `closed_at` is set on a non-closed issue or missing on a closed one.
    #[error("closed_at must be set if and only if status is closed (status: {status})")]
    ClosedAtMismatch {
        /// Status of the offending record
        status: IssueStatus,
    },
}

/// A specialized Result type for trellis operations.
pub type Result<T> = std::result::Result<T, Error>;
