//! Entity store abstraction.
//!
//! The entity store is the durable home of issue attribute state (including
//! labels) and the audit trail. It knows nothing about dependency edges,
//! which are owned by the [`DependencyIndex`](crate::graph::DependencyIndex).
//!
//! The tracker calls the store while holding its own lock, so implementations
//! do not need internal synchronization; they only need to be `Send + Sync`
//! to live inside the shared tracker state.
//!
//! # Implementations
//!
//! - [`MemoryStore`]: HashMap-backed, ephemeral. The default backend.
//!
//! Durable backends implement the same trait and report failures through
//! [`StoreError::Backend`]; the tracker propagates them as
//! [`Error::Storage`](crate::error::Error::Storage).

use crate::domain::{Event, Issue, IssueId, IssueStatus};
use std::ops::ControlFlow;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

/// Errors reported by an entity store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An issue with this ID is already stored.
    #[error("issue {0} already exists")]
    AlreadyExists(IssueId),

    /// An issue expected to exist is missing from the store.
    #[error("issue {0} is missing from the store")]
    Missing(IssueId),

    /// The underlying backend failed.
    #[error("{0}")]
    Backend(String),
}

/// A specialized Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Keyed storage for issues and their audit trail.
pub trait EntityStore: Send + Sync {
    /// Insert a new issue.
    ///
    /// # Errors
    ///
    /// `StoreError::AlreadyExists` if the ID is taken.
    fn insert(&mut self, issue: Issue) -> StoreResult<()>;

    /// Get a copy of an issue.
    fn get(&self, id: &IssueId) -> StoreResult<Option<Issue>>;

    /// Status of an issue, without copying the record.
    fn status(&self, id: &IssueId) -> StoreResult<Option<IssueStatus>>;

    /// Replace an existing issue.
    ///
    /// # Errors
    ///
    /// `StoreError::Missing` if no issue has this ID.
    fn replace(&mut self, issue: Issue) -> StoreResult<()>;

    /// Remove an issue together with its audit trail, returning the issue if
    /// it existed.
    fn remove(&mut self, id: &IssueId) -> StoreResult<Option<Issue>>;

    /// Visit every stored issue, in no particular order, until `visit` breaks.
    fn scan(&self, visit: &mut dyn FnMut(&Issue) -> ControlFlow<()>) -> StoreResult<()>;

    /// Number of stored issues.
    fn len(&self) -> StoreResult<usize>;

    /// Whether the store holds no issues.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Append a batch of audit events.
    ///
    /// The batch is stored whole or not at all.
    fn record_events(&mut self, events: Vec<Event>) -> StoreResult<()>;

    /// Audit events of one issue, oldest first.
    fn events(&self, id: &IssueId) -> StoreResult<Vec<Event>>;
}
