//! Trellis - an issue datastore with a cycle-checked dependency graph.
//!
//! Issues form a directed graph of `Blocks`, `ParentChild` and informational
//! edges. The tracker keeps the blocking and hierarchy subgraphs acyclic as
//! edges are added concurrently, and answers which issues are ready to work
//! on: not closed, matching a filter, and with no open direct blocker.
//!
//! The entry points are the [`IssueTracker`] trait and its [`Tracker`]
//! implementation over a pluggable [`EntityStore`].

#![forbid(unsafe_code)]

pub mod cancel;
pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod id_generation;
pub mod ready;
pub mod search;
pub mod sorting;
pub mod store;
pub mod tracker;

pub use cancel::Cancel;
pub use config::{DependencyConfig, DuplicateEdgePolicy, ReadyConfig, TrackerConfig};
pub use domain::{
    Dependency, DependencyType, Event, EventKind, Issue, IssueFilter, IssueId, IssueStatus,
    IssueType, IssueUpdate, NewIssue, SortPolicy, WorkFilter,
};
pub use error::{Error, ErrorKind, Result, ValidationError};
pub use graph::{DependencyIndex, EdgeOutcome};
pub use ready::BlockedIssue;
pub use store::{EntityStore, MemoryStore, StoreError, StoreResult};
pub use tracker::{ImportReport, IssueTracker, Tracker};
