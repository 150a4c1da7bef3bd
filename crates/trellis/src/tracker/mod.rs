//! The tracker: entity store plus dependency index behind one lock.
//!
//! [`IssueTracker`] is the operation contract consumed by command surfaces,
//! import/export tooling and benchmark harnesses. [`Tracker`] implements it
//! over any [`EntityStore`].
//!
//! # Concurrency
//!
//! The store, the dependency index and the ID generator live together in a
//! single `tokio::sync::RwLock`. Every mutation holds the write lock for its
//! whole duration, including the cycle check, so check-then-insert is atomic
//! and two concurrent `add_dependency` calls can never jointly close a cycle.
//! Reads (`ready_work`, `search`, adjacency lookups) share the read lock and
//! always observe either the state before or after any single mutation.
//!
//! # Atomicity
//!
//! Each mutation validates everything before touching state and commits to
//! the store before the index, so a failed call leaves both exactly as they
//! were. Audit events are written last; if that write fails the store change
//! is reverted before the error is returned.
//!
//! # Example
//!
//! ```no_run
//! use trellis::{DependencyType, IssueTracker, NewIssue, Tracker, TrackerConfig, WorkFilter};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let tracker = Tracker::new(TrackerConfig::new("app"))?;
//!
//!     let parser = tracker.create(NewIssue::task("Write parser"), "alice").await?;
//!     let lexer = tracker.create(NewIssue::task("Write lexer"), "alice").await?;
//!     tracker
//!         .add_dependency(&parser.id, &lexer.id, DependencyType::Blocks, "alice")
//!         .await?;
//!
//!     let ready = tracker.ready_work(&WorkFilter::default()).await?;
//!     assert_eq!(ready.len(), 1);
//!     Ok(())
//! }
//! ```

mod import;

pub use import::ImportReport;

use crate::cancel::Cancel;
use crate::config::TrackerConfig;
use crate::domain::{
    Dependency, DependencyType, Event, EventKind, Issue, IssueFilter, IssueId, IssueStatus,
    IssueUpdate, NewIssue, WorkFilter, validate_actor, validate_label,
};
use crate::error::{Error, Result};
use crate::graph::{DependencyIndex, EdgeOutcome};
use crate::id_generation::IdGenerator;
use crate::ready::{self, BlockedIssue};
use crate::search;
use crate::store::{EntityStore, MemoryStore, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Operation contract of the issue tracker.
///
/// The trait is object-safe, so callers can hold an `Arc<dyn IssueTracker>`.
///
/// # Method Categories
///
/// - **Issues**: `create`, `get`, `get_with_dependencies`, `update`, `delete`
/// - **Dependencies**: `add_dependency`, `remove_dependency`, `edges_from`,
///   `edges_to`, `dependency_tree`, `all_dependency_records`, `find_cycle`
/// - **Labels**: `add_label`, `remove_label`, `labels`
/// - **Queries**: `search`, `ready_work`, `blocked_issues`, `events`
/// - **Batch Operations**: `import`, `export_all`
///
/// # Error Handling
///
/// Every error is a typed [`Error`]; callers branch on [`Error::kind`] or
/// [`Error::is_recoverable`], never on message text. Any operation may also
/// fail with `Error::Canceled` if the handle's cancellation signal fired, and
/// with `Error::Storage` if the entity store fails.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    // ========== Issues ==========

    /// Create a new issue and return it with its assigned ID.
    ///
    /// # Errors
    ///
    /// `Error::Validation` for a bad title, priority, label or empty actor.
    async fn create(&self, new_issue: NewIssue, actor: &str) -> Result<Issue>;

    /// Get an issue by ID, without its dependency list.
    ///
    /// Returns `None` if the issue doesn't exist.
    async fn get(&self, id: &IssueId) -> Result<Option<Issue>>;

    /// Get an issue by ID with its outgoing edges populated.
    async fn get_with_dependencies(&self, id: &IssueId) -> Result<Option<Issue>>;

    /// Apply a field update and return the updated issue.
    ///
    /// Setting the status to `Closed` stamps `closed_at`; leaving `Closed`
    /// clears it.
    ///
    /// # Errors
    ///
    /// `Error::IssueNotFound`, or `Error::Validation` if the updated record
    /// would be invalid (nothing is changed in that case).
    async fn update(&self, id: &IssueId, updates: IssueUpdate, actor: &str) -> Result<Issue>;

    /// Delete an issue and every edge that references it.
    ///
    /// # Errors
    ///
    /// `Error::IssueNotFound` if the issue doesn't exist.
    async fn delete(&self, id: &IssueId) -> Result<()>;

    // ========== Dependencies ==========

    /// Record that `from` depends on `to` with the given kind.
    ///
    /// Adding an edge that already exists succeeds without change unless the
    /// configuration rejects duplicates.
    ///
    /// # Errors
    ///
    /// `Error::IssueNotFound`, `Error::SelfReference`, `Error::CycleDetected`,
    /// `Error::DuplicateEdge` or `Error::ParentAlreadySet`.
    async fn add_dependency(
        &self,
        from: &IssueId,
        to: &IssueId,
        dep_type: DependencyType,
        actor: &str,
    ) -> Result<()>;

    /// Remove the edge `from -> to` of the given kind.
    ///
    /// # Errors
    ///
    /// `Error::IssueNotFound` or `Error::DependencyNotFound`.
    async fn remove_dependency(
        &self,
        from: &IssueId,
        to: &IssueId,
        dep_type: DependencyType,
    ) -> Result<()>;

    /// Edges out of `id` (what it depends on), optionally of one kind.
    async fn edges_from(
        &self,
        id: &IssueId,
        dep_type: Option<DependencyType>,
    ) -> Result<Vec<Dependency>>;

    /// Edges into `id` (what depends on it), optionally of one kind.
    async fn edges_to(&self, id: &IssueId, dep_type: Option<DependencyType>)
    -> Result<Vec<Dependency>>;

    /// Transitive dependencies of `id` with their depth, breadth first.
    ///
    /// # Errors
    ///
    /// `Error::IssueNotFound` if the issue doesn't exist.
    async fn dependency_tree(
        &self,
        id: &IssueId,
        max_depth: Option<usize>,
    ) -> Result<Vec<(Dependency, usize)>>;

    /// Every edge, grouped by source issue.
    async fn all_dependency_records(&self) -> Result<BTreeMap<IssueId, Vec<Dependency>>>;

    /// Full scan of one edge kind for a directed cycle.
    ///
    /// Returns an issue on a cycle, or `None` if the subgraph is acyclic.
    async fn find_cycle(&self, dep_type: DependencyType) -> Result<Option<IssueId>>;

    // ========== Labels ==========

    /// Add a label. Adding a label the issue already carries is a no-op.
    ///
    /// # Errors
    ///
    /// `Error::IssueNotFound` or `Error::Validation` for a blank label.
    async fn add_label(&self, id: &IssueId, label: &str, actor: &str) -> Result<()>;

    /// Remove a label. Removing an absent label is a no-op.
    ///
    /// # Errors
    ///
    /// `Error::IssueNotFound` if the issue doesn't exist.
    async fn remove_label(&self, id: &IssueId, label: &str, actor: &str) -> Result<()>;

    /// Labels of an issue.
    ///
    /// # Errors
    ///
    /// `Error::IssueNotFound` if the issue doesn't exist.
    async fn labels(&self, id: &IssueId) -> Result<BTreeSet<String>>;

    // ========== Queries ==========

    /// Issues matching free text and an attribute filter.
    ///
    /// Ordered by priority, newest first, then ID.
    async fn search(&self, text: Option<&str>, filter: &IssueFilter) -> Result<Vec<Issue>>;

    /// Issues that are not closed, match `filter`, and have no open direct blocker.
    async fn ready_work(&self, filter: &WorkFilter) -> Result<Vec<Issue>>;

    /// Non-closed issues with at least one open direct blocker.
    async fn blocked_issues(&self) -> Result<Vec<BlockedIssue>>;

    /// Audit trail of an issue, oldest first.
    async fn events(&self, id: &IssueId) -> Result<Vec<Event>>;

    // ========== Batch Operations ==========

    /// Import issues with their labels and dependencies.
    ///
    /// Issues are inserted before edges. Duplicate issues, duplicate edges,
    /// cycles, self-references and edges to unknown issues are skipped and
    /// counted; any other error aborts the import and reverts it entirely.
    async fn import(&self, issues: Vec<Issue>, actor: &str) -> Result<ImportReport>;

    /// Every issue with its outgoing edges populated, ordered by ID.
    async fn export_all(&self) -> Result<Vec<Issue>>;
}

/// Lock-guarded tracker state.
#[derive(Debug)]
pub(crate) struct TrackerState<S> {
    pub(crate) store: S,
    pub(crate) index: DependencyIndex,
    pub(crate) ids: IdGenerator,
}

impl<S: EntityStore> TrackerState<S> {
    fn require(&self, id: &IssueId) -> Result<Issue> {
        self.store
            .get(id)?
            .ok_or_else(|| Error::IssueNotFound(id.clone()))
    }

    /// Append `events` as one batch, reverting the store with `undo` if the
    /// write fails.
    fn commit_events(
        &mut self,
        events: Vec<Event>,
        undo: impl FnOnce(&mut S) -> StoreResult<()>,
    ) -> Result<()> {
        if let Err(err) = self.store.record_events(events) {
            if let Err(undo_err) = undo(&mut self.store) {
                warn!(error = %undo_err, "Failed to revert store after audit write failure");
            }
            return Err(err.into());
        }
        Ok(())
    }
}

fn event(issue_id: &IssueId, kind: EventKind, actor: &str, at: DateTime<Utc>) -> Event {
    Event {
        issue_id: issue_id.clone(),
        kind,
        actor: actor.to_string(),
        at,
    }
}

/// Issue tracker over an [`EntityStore`].
///
/// Cloning is cheap and every clone shares the same state.
pub struct Tracker<S: EntityStore = MemoryStore> {
    state: Arc<RwLock<TrackerState<S>>>,
    config: Arc<TrackerConfig>,
    cancel: Cancel,
}

impl<S: EntityStore> Clone for Tracker<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: Arc::clone(&self.config),
            cancel: self.cancel.clone(),
        }
    }
}

impl Tracker<MemoryStore> {
    /// Create a tracker over an empty in-memory store.
    ///
    /// # Errors
    ///
    /// `Error::Validation` if the configuration is invalid.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        Self::with_store(MemoryStore::new(), config)
    }
}

impl<S: EntityStore> Tracker<S> {
    /// Create a tracker over `store`.
    ///
    /// Issues already in the store become known to the dependency index and
    /// the ID generator. Edges are not part of the store and start empty.
    ///
    /// # Errors
    ///
    /// `Error::Validation` if the configuration is invalid, `Error::Storage`
    /// if the store cannot be scanned.
    pub fn with_store(store: S, config: TrackerConfig) -> Result<Self> {
        config.validate()?;

        let mut index = DependencyIndex::with_policy(config.dependencies.clone());
        let mut ids = IdGenerator::new(config.issue_prefix.clone());
        store.scan(&mut |issue: &Issue| {
            index.add_node(issue.id.clone());
            ids.register(issue.id.clone());
            ControlFlow::Continue(())
        })?;
        debug!(issues = index.node_count(), prefix = %config.issue_prefix, "Tracker opened");

        Ok(Self {
            state: Arc::new(RwLock::new(TrackerState { store, index, ids })),
            config: Arc::new(config),
            cancel: Cancel::never(),
        })
    }

    /// A handle sharing this tracker's state whose operations honor `cancel`.
    #[must_use]
    pub fn with_cancel(&self, cancel: Cancel) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: Arc::clone(&self.config),
            cancel,
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

#[async_trait]
impl<S: EntityStore + 'static> IssueTracker for Tracker<S> {
    async fn create(&self, new_issue: NewIssue, actor: &str) -> Result<Issue> {
        // === Phase 1: Validation (no mutations) ===
        validate_actor(actor)?;
        new_issue.validate()?;

        let mut guard = self.state.write().await;
        self.cancel.check()?;
        let state = &mut *guard;

        // === Phase 2: ID generation ===
        let id = state
            .ids
            .generate(&new_issue.title, &new_issue.description, actor)?;

        // === Phase 3: Commit ===
        let now = Utc::now();
        let mut issue = Issue {
            id: id.clone(),
            title: new_issue.title,
            description: new_issue.description,
            status: IssueStatus::Open,
            priority: new_issue.priority,
            issue_type: new_issue.issue_type,
            assignee: new_issue.assignee,
            labels: new_issue.labels.into_iter().collect(),
            dependencies: vec![],
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        issue.set_status(new_issue.status, now);

        if let Err(err) = state.store.insert(issue.clone()) {
            state.ids.release(&id);
            return Err(err.into());
        }
        let created = vec![event(&id, EventKind::Created, actor, now)];
        if let Err(err) = state.commit_events(created, |store| store.remove(&id).map(|_| ())) {
            state.ids.release(&id);
            return Err(err);
        }
        state.index.add_node(id.clone());

        debug!(%id, actor, "Created issue");
        Ok(issue)
    }

    async fn get(&self, id: &IssueId) -> Result<Option<Issue>> {
        let state = self.state.read().await;
        self.cancel.check()?;
        Ok(state.store.get(id)?)
    }

    async fn get_with_dependencies(&self, id: &IssueId) -> Result<Option<Issue>> {
        let state = self.state.read().await;
        self.cancel.check()?;
        Ok(state.store.get(id)?.map(|mut issue| {
            issue.dependencies = state.index.edges_from(id, None);
            issue
        }))
    }

    async fn update(&self, id: &IssueId, updates: IssueUpdate, actor: &str) -> Result<Issue> {
        validate_actor(actor)?;

        let mut guard = self.state.write().await;
        self.cancel.check()?;
        let state = &mut *guard;

        let previous = state.require(id)?;
        if updates.is_empty() {
            return Ok(previous);
        }

        // Build and validate the new record before anything is written
        let now = Utc::now();
        let fields: Vec<String> = updates
            .field_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut updated = previous.clone();
        updates.apply_to(&mut updated, now);
        updated.validate()?;

        state.store.replace(updated.clone())?;

        let mut events = vec![event(id, EventKind::Updated { fields }, actor, now)];
        if updated.status != previous.status {
            events.push(event(
                id,
                EventKind::StatusChanged {
                    from: previous.status,
                    to: updated.status,
                },
                actor,
                now,
            ));
        }
        state.commit_events(events, |store| store.replace(previous))?;

        debug!(%id, actor, status = %updated.status, "Updated issue");
        Ok(updated)
    }

    async fn delete(&self, id: &IssueId) -> Result<()> {
        let mut guard = self.state.write().await;
        self.cancel.check()?;
        let state = &mut *guard;

        // Store first: if it fails the index still matches it
        if state.store.remove(id)?.is_none() {
            return Err(Error::IssueNotFound(id.clone()));
        }
        let removed = state.index.remove_node(id);
        state.ids.release(id);

        debug!(%id, edges = removed.len(), "Deleted issue");
        Ok(())
    }

    async fn add_dependency(
        &self,
        from: &IssueId,
        to: &IssueId,
        dep_type: DependencyType,
        actor: &str,
    ) -> Result<()> {
        validate_actor(actor)?;

        let mut state = self.state.write().await;
        self.cancel.check()?;

        let outcome = state.index.add_edge(from, to, dep_type, actor, &self.cancel)?;
        if outcome == EdgeOutcome::Added {
            debug!(%from, %to, %dep_type, actor, "Added dependency");
        }
        Ok(())
    }

    async fn remove_dependency(
        &self,
        from: &IssueId,
        to: &IssueId,
        dep_type: DependencyType,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        self.cancel.check()?;

        state.index.remove_edge(from, to, dep_type)?;
        debug!(%from, %to, %dep_type, "Removed dependency");
        Ok(())
    }

    async fn edges_from(
        &self,
        id: &IssueId,
        dep_type: Option<DependencyType>,
    ) -> Result<Vec<Dependency>> {
        let state = self.state.read().await;
        self.cancel.check()?;
        Ok(state.index.edges_from(id, dep_type))
    }

    async fn edges_to(
        &self,
        id: &IssueId,
        dep_type: Option<DependencyType>,
    ) -> Result<Vec<Dependency>> {
        let state = self.state.read().await;
        self.cancel.check()?;
        Ok(state.index.edges_to(id, dep_type))
    }

    async fn dependency_tree(
        &self,
        id: &IssueId,
        max_depth: Option<usize>,
    ) -> Result<Vec<(Dependency, usize)>> {
        let state = self.state.read().await;
        self.cancel.check()?;
        state.index.dependency_tree(id, max_depth)
    }

    async fn all_dependency_records(&self) -> Result<BTreeMap<IssueId, Vec<Dependency>>> {
        let state = self.state.read().await;
        self.cancel.check()?;
        Ok(state.index.records())
    }

    async fn find_cycle(&self, dep_type: DependencyType) -> Result<Option<IssueId>> {
        let state = self.state.read().await;
        self.cancel.check()?;
        Ok(state.index.find_cycle(dep_type))
    }

    async fn add_label(&self, id: &IssueId, label: &str, actor: &str) -> Result<()> {
        validate_label(label)?;
        validate_actor(actor)?;

        let mut guard = self.state.write().await;
        self.cancel.check()?;
        let state = &mut *guard;

        let previous = state.require(id)?;
        if previous.labels.contains(label) {
            return Ok(());
        }

        let now = Utc::now();
        let mut updated = previous.clone();
        updated.labels.insert(label.to_string());
        updated.updated_at = now;
        state.store.replace(updated)?;
        state.commit_events(
            vec![event(
                id,
                EventKind::LabelAdded {
                    label: label.to_string(),
                },
                actor,
                now,
            )],
            |store| store.replace(previous),
        )?;

        debug!(%id, label, actor, "Added label");
        Ok(())
    }

    async fn remove_label(&self, id: &IssueId, label: &str, actor: &str) -> Result<()> {
        validate_actor(actor)?;

        let mut guard = self.state.write().await;
        self.cancel.check()?;
        let state = &mut *guard;

        let previous = state.require(id)?;
        if !previous.labels.contains(label) {
            return Ok(());
        }

        let now = Utc::now();
        let mut updated = previous.clone();
        updated.labels.remove(label);
        updated.updated_at = now;
        state.store.replace(updated)?;
        state.commit_events(
            vec![event(
                id,
                EventKind::LabelRemoved {
                    label: label.to_string(),
                },
                actor,
                now,
            )],
            |store| store.replace(previous),
        )?;

        debug!(%id, label, actor, "Removed label");
        Ok(())
    }

    async fn labels(&self, id: &IssueId) -> Result<BTreeSet<String>> {
        let state = self.state.read().await;
        self.cancel.check()?;
        Ok(state.require(id)?.labels)
    }

    async fn search(&self, text: Option<&str>, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let state = self.state.read().await;
        self.cancel.check()?;
        search::search(&state.store, text, filter, &self.cancel)
    }

    async fn ready_work(&self, filter: &WorkFilter) -> Result<Vec<Issue>> {
        let state = self.state.read().await;
        self.cancel.check()?;
        ready::ready_work(
            &state.store,
            &state.index,
            filter,
            self.config.ready.default_sort,
            &self.cancel,
        )
    }

    async fn blocked_issues(&self) -> Result<Vec<BlockedIssue>> {
        let state = self.state.read().await;
        self.cancel.check()?;
        ready::blocked_issues(&state.store, &state.index, &self.cancel)
    }

    async fn events(&self, id: &IssueId) -> Result<Vec<Event>> {
        let state = self.state.read().await;
        self.cancel.check()?;
        Ok(state.store.events(id)?)
    }

    async fn import(&self, issues: Vec<Issue>, actor: &str) -> Result<ImportReport> {
        validate_actor(actor)?;

        let mut guard = self.state.write().await;
        self.cancel.check()?;
        let report = import::import(&mut guard, issues, actor, &self.cancel)?;

        debug!(
            issues = report.issues_imported,
            edges = report.edges_imported,
            skipped = report.skipped(),
            "Imported issues"
        );
        Ok(report)
    }

    async fn export_all(&self) -> Result<Vec<Issue>> {
        let state = self.state.read().await;
        self.cancel.check()?;

        let mut issues = Vec::new();
        search::scan_issues(&state.store, &self.cancel, |issue| {
            let mut issue = issue.clone();
            issue.dependencies = state.index.edges_from(&issue.id, None);
            issues.push(issue);
            Ok(())
        })?;
        issues.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IssueType;
    use crate::error::ErrorKind;

    fn tracker() -> Tracker {
        Tracker::new(TrackerConfig::new("test")).unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_prefixed_id_and_records_event() {
        let tracker = tracker();
        let issue = tracker.create(NewIssue::task("First"), "alice").await.unwrap();

        assert!(issue.id.as_str().starts_with("test-"));
        assert_eq!(issue.status, IssueStatus::Open);
        assert_eq!(issue.closed_at, None);

        let events = tracker.events(&issue.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Created);
        assert_eq!(events[0].actor, "alice");
    }

    #[tokio::test]
    async fn test_create_closed_stamps_closed_at() {
        let tracker = tracker();
        let new_issue = NewIssue {
            status: IssueStatus::Closed,
            ..NewIssue::task("Already done")
        };
        let issue = tracker.create(new_issue, "alice").await.unwrap();
        assert!(issue.closed_at.is_some());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let tracker = tracker();

        let err = tracker.create(NewIssue::task("  "), "alice").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = tracker
            .create(NewIssue { priority: 7, ..NewIssue::task("x") }, "alice")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = tracker.create(NewIssue::task("x"), "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(tracker.search(None, &IssueFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_status_round_trip_keeps_closed_at_consistent() {
        let tracker = tracker();
        let issue = tracker.create(NewIssue::task("Task"), "alice").await.unwrap();

        let closed = tracker
            .update(
                &issue.id,
                IssueUpdate {
                    status: Some(IssueStatus::Closed),
                    ..Default::default()
                },
                "bob",
            )
            .await
            .unwrap();
        assert!(closed.closed_at.is_some());

        let reopened = tracker
            .update(
                &issue.id,
                IssueUpdate {
                    status: Some(IssueStatus::Open),
                    ..Default::default()
                },
                "bob",
            )
            .await
            .unwrap();
        assert_eq!(reopened.closed_at, None);

        let kinds: Vec<EventKind> = tracker
            .events(&issue.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert!(kinds.contains(&EventKind::StatusChanged {
            from: IssueStatus::Open,
            to: IssueStatus::Closed,
        }));
        assert!(kinds.contains(&EventKind::StatusChanged {
            from: IssueStatus::Closed,
            to: IssueStatus::Open,
        }));
    }

    #[tokio::test]
    async fn test_invalid_update_changes_nothing() {
        let tracker = tracker();
        let issue = tracker.create(NewIssue::task("Task"), "alice").await.unwrap();

        let err = tracker
            .update(
                &issue.id,
                IssueUpdate {
                    title: Some("Renamed".to_string()),
                    priority: Some(9),
                    ..Default::default()
                },
                "bob",
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let stored = tracker.get(&issue.id).await.unwrap().unwrap();
        assert_eq!(stored, issue);
        assert_eq!(tracker.events(&issue.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_issue() {
        let tracker = tracker();
        let err = tracker
            .update(&IssueId::new("test-none"), IssueUpdate::default(), "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IssueNotFound(_)));
    }

    #[tokio::test]
    async fn test_labels_are_a_set() {
        let tracker = tracker();
        let issue = tracker.create(NewIssue::task("Task"), "alice").await.unwrap();

        tracker.add_label(&issue.id, "backend", "alice").await.unwrap();
        tracker.add_label(&issue.id, "backend", "alice").await.unwrap();
        tracker.add_label(&issue.id, "api", "alice").await.unwrap();

        let labels = tracker.labels(&issue.id).await.unwrap();
        assert_eq!(labels.into_iter().collect::<Vec<_>>(), ["api", "backend"]);

        tracker.remove_label(&issue.id, "api", "alice").await.unwrap();
        tracker.remove_label(&issue.id, "api", "alice").await.unwrap();
        assert_eq!(tracker.labels(&issue.id).await.unwrap().len(), 1);

        // Created + two LabelAdded + one LabelRemoved
        assert_eq!(tracker.events(&issue.id).await.unwrap().len(), 4);

        assert!(matches!(
            tracker.add_label(&issue.id, " ", "alice").await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            tracker.labels(&IssueId::new("test-none")).await,
            Err(Error::IssueNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_with_dependencies_populates_edges() {
        let tracker = tracker();
        let a = tracker.create(NewIssue::task("A"), "alice").await.unwrap();
        let b = tracker.create(NewIssue::task("B"), "alice").await.unwrap();
        tracker
            .add_dependency(&a.id, &b.id, DependencyType::Blocks, "alice")
            .await
            .unwrap();

        let plain = tracker.get(&a.id).await.unwrap().unwrap();
        assert!(plain.dependencies.is_empty());

        let full = tracker.get_with_dependencies(&a.id).await.unwrap().unwrap();
        assert_eq!(full.dependencies.len(), 1);
        assert_eq!(full.dependencies[0].depends_on_id, b.id);
        assert_eq!(full.dependencies[0].created_by, "alice");
    }

    #[tokio::test]
    async fn test_with_store_registers_existing_issues() {
        let mut store = MemoryStore::new();
        let now = Utc::now();
        let existing = Issue {
            id: IssueId::new("test-seed"),
            title: "Seeded".to_string(),
            description: String::new(),
            status: IssueStatus::Open,
            priority: 1,
            issue_type: IssueType::Bug,
            assignee: None,
            labels: BTreeSet::new(),
            dependencies: vec![],
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        store.insert(existing.clone()).unwrap();

        let tracker = Tracker::with_store(store, TrackerConfig::new("test")).unwrap();
        let other = tracker.create(NewIssue::task("New"), "alice").await.unwrap();
        tracker
            .add_dependency(&other.id, &existing.id, DependencyType::Blocks, "alice")
            .await
            .unwrap();

        let ready = tracker.ready_work(&WorkFilter::default()).await.unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, existing.id);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        assert!(matches!(
            Tracker::new(TrackerConfig::new("x")),
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_canceled_handle_fails_without_mutation() {
        let tracker = tracker();
        let token = tokio_util::sync::CancellationToken::new();
        let canceled = tracker.with_cancel(Cancel::from_token(token.clone()));
        token.cancel();

        let err = canceled.create(NewIssue::task("Never"), "alice").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Canceled);
        assert!(tracker.export_all().await.unwrap().is_empty());

        // The original handle is unaffected
        tracker.create(NewIssue::task("Fine"), "alice").await.unwrap();
    }
}
