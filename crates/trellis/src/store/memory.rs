//! In-memory entity store backed by `HashMap`.
//!
//! All data is held in RAM and lost when the process exits. Lookups by ID
//! are O(1) and a full scan is O(n) without copying records.

use super::{EntityStore, StoreError, StoreResult};
use crate::domain::{Event, Issue, IssueId, IssueStatus};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::ops::ControlFlow;

/// HashMap-backed [`EntityStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Issues indexed by ID for O(1) lookups
    issues: HashMap<IssueId, Issue>,

    /// Audit trail per issue, oldest first
    events: HashMap<IssueId, Vec<Event>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for MemoryStore {
    fn insert(&mut self, issue: Issue) -> StoreResult<()> {
        match self.issues.entry(issue.id.clone()) {
            Entry::Occupied(entry) => Err(StoreError::AlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(issue);
                Ok(())
            }
        }
    }

    fn get(&self, id: &IssueId) -> StoreResult<Option<Issue>> {
        Ok(self.issues.get(id).cloned())
    }

    fn status(&self, id: &IssueId) -> StoreResult<Option<IssueStatus>> {
        Ok(self.issues.get(id).map(|issue| issue.status))
    }

    fn replace(&mut self, issue: Issue) -> StoreResult<()> {
        let slot = self
            .issues
            .get_mut(&issue.id)
            .ok_or_else(|| StoreError::Missing(issue.id.clone()))?;
        *slot = issue;
        Ok(())
    }

    fn remove(&mut self, id: &IssueId) -> StoreResult<Option<Issue>> {
        let removed = self.issues.remove(id);
        if removed.is_some() {
            self.events.remove(id);
        }
        Ok(removed)
    }

    fn scan(&self, visit: &mut dyn FnMut(&Issue) -> ControlFlow<()>) -> StoreResult<()> {
        for issue in self.issues.values() {
            if visit(issue).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.issues.len())
    }

    fn record_events(&mut self, events: Vec<Event>) -> StoreResult<()> {
        for event in events {
            self.events
                .entry(event.issue_id.clone())
                .or_default()
                .push(event);
        }
        Ok(())
    }

    fn events(&self, id: &IssueId) -> StoreResult<Vec<Event>> {
        Ok(self.events.get(id).cloned().unwrap_or_default())
    }
}
