//! Dependency index: the authoritative edge set between issues.
//!
//! # Graph Representation and Edge Direction Convention
//!
//! Edges are stored in a petgraph `StableDiGraph` and point from the
//! **dependent** to the **dependency**:
//!
//! - **Blocks**: if issue A is blocked by issue B, the edge is `A -> B`
//! - **ParentChild**: if task C is a child of epic E, the edge is `C -> E`
//! - **Related** / **DiscoveredFrom**: informational, `X -> Y`
//!
//! Several edges of different kinds may connect the same pair; an edge is
//! identified by `(from, to, kind)`.
//!
//! `StableDiGraph` keeps node and edge indices valid across removals, so the
//! `IssueId -> NodeIndex` map never needs rebuilding when an issue is deleted.
//! petgraph keeps per-node outgoing and incoming edge lists, which makes both
//! "what does X depend on" and "what depends on X" O(degree) lookups that are
//! maintained incrementally as edges come and go.
//!
//! The index holds issues by identifier only; it never references issue
//! records, which live in the entity store.

mod cycle;

use crate::cancel::Cancel;
use crate::config::{DependencyConfig, DuplicateEdgePolicy};
use crate::domain::{Dependency, DependencyType, IssueId};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use petgraph::Direction;
use petgraph::algo;
use petgraph::stable_graph::{EdgeIndex, EdgeReference, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeFiltered, EdgeRef, IntoEdgeReferences};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Edge weight: kind plus provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EdgeMeta {
    dep_type: DependencyType,
    created_at: DateTime<Utc>,
    created_by: String,
}

/// Result of a successful [`DependencyIndex::add_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// The edge was recorded
    Added,
    /// An identical edge already existed; nothing changed
    AlreadyPresent,
}

/// In-memory adjacency structure over issue dependencies.
#[derive(Debug, Default)]
pub struct DependencyIndex {
    /// Nodes contain `IssueId` values, edges contain `EdgeMeta`.
    graph: StableDiGraph<IssueId, EdgeMeta>,

    /// Mapping from IssueId to graph NodeIndex.
    ///
    /// Every known issue has exactly one entry.
    node_map: HashMap<IssueId, NodeIndex>,

    policy: DependencyConfig,
}

impl DependencyIndex {
    /// Create an empty index with the default dependency policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with the given dependency policy.
    #[must_use]
    pub fn with_policy(policy: DependencyConfig) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Register an issue as a node. Returns false if it was already known.
    pub fn add_node(&mut self, id: IssueId) -> bool {
        if self.node_map.contains_key(&id) {
            return false;
        }
        let node = self.graph.add_node(id.clone());
        self.node_map.insert(id, node);
        true
    }

    /// Whether the issue is a known node.
    #[must_use]
    pub fn contains(&self, id: &IssueId) -> bool {
        self.node_map.contains_key(id)
    }

    /// Number of known issues.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Total number of edges of every kind.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Add the edge `from -> to` of the given kind.
    ///
    /// For acyclic kinds (`Blocks`, `ParentChild`) the cycle guard runs before
    /// anything is written; a rejected edge leaves the index untouched.
    ///
    /// # Errors
    ///
    /// - `Error::IssueNotFound` if either endpoint is unknown
    /// - `Error::SelfReference` if `from == to`
    /// - `Error::DuplicateEdge` if the edge exists and duplicates are rejected
    /// - `Error::ParentAlreadySet` if single-parent mode is on and `from` has a parent
    /// - `Error::CycleDetected` if the edge would close a cycle
    /// - `Error::Canceled` if `cancel` fires during the cycle check
    pub fn add_edge(
        &mut self,
        from: &IssueId,
        to: &IssueId,
        dep_type: DependencyType,
        actor: &str,
        cancel: &Cancel,
    ) -> Result<EdgeOutcome> {
        self.insert_edge(
            from,
            to,
            EdgeMeta {
                dep_type,
                created_at: Utc::now(),
                created_by: actor.to_string(),
            },
            cancel,
        )
    }

    /// Add a previously recorded edge, keeping its timestamp and actor.
    ///
    /// Subject to the same checks as [`Self::add_edge`].
    pub(crate) fn restore_edge(
        &mut self,
        dependency: &Dependency,
        cancel: &Cancel,
    ) -> Result<EdgeOutcome> {
        self.insert_edge(
            &dependency.issue_id,
            &dependency.depends_on_id,
            EdgeMeta {
                dep_type: dependency.dep_type,
                created_at: dependency.created_at,
                created_by: dependency.created_by.clone(),
            },
            cancel,
        )
    }

    fn insert_edge(
        &mut self,
        from: &IssueId,
        to: &IssueId,
        meta: EdgeMeta,
        cancel: &Cancel,
    ) -> Result<EdgeOutcome> {
        let dep_type = meta.dep_type;
        let from_node = self.node(from)?;
        let to_node = self.node(to)?;

        if from_node == to_node {
            return Err(Error::SelfReference(from.clone()));
        }

        if self.find_edge(from_node, to_node, dep_type).is_some() {
            return match self.policy.duplicate_edges {
                DuplicateEdgePolicy::Ignore => Ok(EdgeOutcome::AlreadyPresent),
                DuplicateEdgePolicy::Reject => Err(Error::DuplicateEdge {
                    from: from.clone(),
                    to: to.clone(),
                    dep_type,
                }),
            };
        }

        if dep_type == DependencyType::ParentChild
            && self.policy.single_parent
            && let Some(parent) = self.neighbors(from_node, Direction::Outgoing, dep_type).next()
        {
            return Err(Error::ParentAlreadySet {
                child: from.clone(),
                parent: self.graph[parent].clone(),
            });
        }

        if dep_type.is_acyclic()
            && cycle::creates_cycle(&self.graph, from_node, to_node, dep_type, cancel)?
        {
            return Err(Error::CycleDetected {
                from: from.clone(),
                to: to.clone(),
                dep_type,
            });
        }

        self.graph.add_edge(from_node, to_node, meta);
        Ok(EdgeOutcome::Added)
    }

    /// Remove the edge `from -> to` of the given kind and return it.
    ///
    /// Removing an edge can never create a cycle, so no check runs.
    ///
    /// # Errors
    ///
    /// - `Error::IssueNotFound` if either endpoint is unknown
    /// - `Error::DependencyNotFound` if no such edge exists
    pub fn remove_edge(
        &mut self,
        from: &IssueId,
        to: &IssueId,
        dep_type: DependencyType,
    ) -> Result<Dependency> {
        let from_node = self.node(from)?;
        let to_node = self.node(to)?;

        let (edge, dependency) = self
            .find_edge(from_node, to_node, dep_type)
            .map(|edge| (edge.id(), self.dependency(edge)))
            .ok_or_else(|| Error::DependencyNotFound {
                from: from.clone(),
                to: to.clone(),
                dep_type,
            })?;
        self.graph.remove_edge(edge);
        Ok(dependency)
    }

    /// Outgoing edges of `id` ("what does `id` depend on"), optionally of one kind.
    ///
    /// Unknown issues have no edges.
    #[must_use]
    pub fn edges_from(&self, id: &IssueId, dep_type: Option<DependencyType>) -> Vec<Dependency> {
        self.edges_directed(id, Direction::Outgoing, dep_type)
    }

    /// Incoming edges of `id` ("what depends on `id`"), optionally of one kind.
    ///
    /// Unknown issues have no edges.
    #[must_use]
    pub fn edges_to(&self, id: &IssueId, dep_type: Option<DependencyType>) -> Vec<Dependency> {
        self.edges_directed(id, Direction::Incoming, dep_type)
    }

    /// IDs of the direct targets of `id`'s outgoing edges of one kind.
    pub(crate) fn targets<'a>(
        &'a self,
        id: &IssueId,
        dep_type: DependencyType,
    ) -> impl Iterator<Item = &'a IssueId> + 'a {
        self.node_map.get(id).into_iter().flat_map(move |&node| {
            self.neighbors(node, Direction::Outgoing, dep_type)
                .map(|target| &self.graph[target])
        })
    }

    /// Remove every edge that has `id` as an endpoint, in either direction
    /// and of any kind, returning the removed edges.
    pub fn remove_all_edges_for(&mut self, id: &IssueId) -> Vec<Dependency> {
        let Some(&node) = self.node_map.get(id) else {
            return Vec::new();
        };

        let edges: Vec<(EdgeIndex, Dependency)> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .chain(self.graph.edges_directed(node, Direction::Incoming))
            .map(|edge| (edge.id(), self.dependency(edge)))
            .collect();

        edges
            .into_iter()
            .map(|(edge, dependency)| {
                self.graph.remove_edge(edge);
                dependency
            })
            .collect()
    }

    /// Forget an issue entirely, removing all its edges first.
    pub fn remove_node(&mut self, id: &IssueId) -> Vec<Dependency> {
        let removed = self.remove_all_edges_for(id);
        if let Some(node) = self.node_map.remove(id) {
            self.graph.remove_node(node);
        }
        removed
    }

    /// Whether adding `from -> to` of the given kind would close a cycle.
    ///
    /// # Errors
    ///
    /// - `Error::IssueNotFound` if either endpoint is unknown
    /// - `Error::Canceled` if `cancel` fires during the traversal
    pub fn would_create_cycle(
        &self,
        from: &IssueId,
        to: &IssueId,
        dep_type: DependencyType,
        cancel: &Cancel,
    ) -> Result<bool> {
        let from_node = self.node(from)?;
        let to_node = self.node(to)?;
        cycle::creates_cycle(&self.graph, from_node, to_node, dep_type, cancel)
    }

    /// Every edge, grouped by source issue.
    ///
    /// Issues without outgoing edges are absent from the map.
    #[must_use]
    pub fn records(&self) -> BTreeMap<IssueId, Vec<Dependency>> {
        let mut records: BTreeMap<IssueId, Vec<Dependency>> = BTreeMap::new();
        for edge in self.graph.edge_references() {
            let dependency = self.dependency(edge);
            records
                .entry(dependency.issue_id.clone())
                .or_default()
                .push(dependency);
        }
        records
    }

    /// Transitive dependencies of `id`, breadth first, each with its depth
    /// (1 for direct dependencies).
    ///
    /// # Errors
    ///
    /// `Error::IssueNotFound` if the issue is unknown.
    pub fn dependency_tree(
        &self,
        id: &IssueId,
        max_depth: Option<usize>,
    ) -> Result<Vec<(Dependency, usize)>> {
        let start = self.node(id)?;

        let mut result = Vec::new();
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([(start, 0usize)]);

        while let Some((node, depth)) = queue.pop_front() {
            if max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            for edge in self.graph.edges(node) {
                if visited.insert(edge.target()) {
                    queue.push_back((edge.target(), depth + 1));
                    result.push((self.dependency(edge), depth + 1));
                }
            }
        }

        Ok(result)
    }

    /// Scan the whole subgraph of one kind for a directed cycle.
    ///
    /// Returns an issue that lies on a cycle, or `None` if the subgraph is a DAG.
    #[must_use]
    pub fn find_cycle(&self, dep_type: DependencyType) -> Option<IssueId> {
        let filtered = EdgeFiltered::from_fn(&self.graph, |edge| edge.weight().dep_type == dep_type);
        algo::toposort(&filtered, None)
            .err()
            .map(|cycle| self.graph[cycle.node_id()].clone())
    }

    fn node(&self, id: &IssueId) -> Result<NodeIndex> {
        self.node_map
            .get(id)
            .copied()
            .ok_or_else(|| Error::IssueNotFound(id.clone()))
    }

    fn find_edge(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        dep_type: DependencyType,
    ) -> Option<EdgeReference<'_, EdgeMeta>> {
        self.graph
            .edges(from)
            .find(|edge| edge.target() == to && edge.weight().dep_type == dep_type)
    }

    fn neighbors(
        &self,
        node: NodeIndex,
        direction: Direction,
        dep_type: DependencyType,
    ) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .edges_directed(node, direction)
            .filter(move |edge| edge.weight().dep_type == dep_type)
            .map(move |edge| match direction {
                Direction::Outgoing => edge.target(),
                Direction::Incoming => edge.source(),
            })
    }

    fn edges_directed(
        &self,
        id: &IssueId,
        direction: Direction,
        dep_type: Option<DependencyType>,
    ) -> Vec<Dependency> {
        let Some(&node) = self.node_map.get(id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(node, direction)
            .filter(|edge| dep_type.is_none_or(|kind| edge.weight().dep_type == kind))
            .map(|edge| self.dependency(edge))
            .collect()
    }

    fn dependency(&self, edge: EdgeReference<'_, EdgeMeta>) -> Dependency {
        let meta = edge.weight();
        Dependency {
            issue_id: self.graph[edge.source()].clone(),
            depends_on_id: self.graph[edge.target()].clone(),
            dep_type: meta.dep_type,
            created_at: meta.created_at,
            created_by: meta.created_by.clone(),
        }
    }
}
