//! Cycle guard for acyclic edge kinds.
//!
//! Adding `from -> to` closes a cycle exactly when `from` is already
//! reachable from `to` through edges of the same kind. The search is a
//! breadth-first walk from `to` over outgoing edges of that kind, so its
//! cost is bounded by the part of the subgraph reachable from `to` and not
//! by the size of the whole graph.

use super::EdgeMeta;
use crate::cancel::Cancel;
use crate::domain::{DependencyType, IssueId};
use crate::error::Result;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::{HashSet, VecDeque};
use tracing::trace;

/// Whether `from` is reachable from `to` over edges of `dep_type`.
///
/// The visited set guarantees termination even if the stored subgraph were
/// somehow cyclic. Cancellation is polled every few hundred expanded nodes.
pub(super) fn creates_cycle(
    graph: &StableDiGraph<IssueId, EdgeMeta>,
    from: NodeIndex,
    to: NodeIndex,
    dep_type: DependencyType,
    cancel: &Cancel,
) -> Result<bool> {
    if from == to {
        return Ok(true);
    }

    let mut visited = HashSet::from([to]);
    let mut queue = VecDeque::from([to]);
    let mut expanded = 0usize;

    while let Some(node) = queue.pop_front() {
        cancel.check_every(expanded)?;
        expanded += 1;

        for edge in graph.edges(node) {
            if edge.weight().dep_type != dep_type {
                continue;
            }
            let next = edge.target();
            if next == from {
                trace!(%dep_type, expanded, "cycle guard found a path back to source");
                return Ok(true);
            }
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    trace!(%dep_type, expanded, "cycle guard found no path");
    Ok(false)
}
