use super::error::EngineError;
use super::heap::NodeHeap;
use crate::core::graph::{EdgeWeight, Graph};
use crate::core::models::topology::edge_key;
use std::collections::HashSet;
use tracing::trace;

/// Per-pass mutable search data, kept out of the shared [`Graph`].
///
/// One state is owned by each worker and reset before every search, so repeated searches
/// reuse the same allocations.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    cost: Vec<f64>,
    predecessor: Vec<Option<usize>>,
    heap: NodeHeap,
    pops: usize,
}

impl SearchState {
    pub fn new(nodes: usize) -> Self {
        Self {
            cost: vec![f64::INFINITY; nodes],
            predecessor: vec![None; nodes],
            heap: NodeHeap::with_capacity(nodes),
            pops: 0,
        }
    }

    pub fn reset(&mut self, nodes: usize) {
        self.cost.clear();
        self.cost.resize(nodes, f64::INFINITY);
        self.predecessor.clear();
        self.predecessor.resize(nodes, None);
        self.heap.reset();
        self.pops = 0;
    }

    pub fn cost(&self, node: usize) -> f64 {
        self.cost.get(node).copied().unwrap_or(f64::INFINITY)
    }

    pub fn predecessor(&self, node: usize) -> Option<usize> {
        self.predecessor.get(node).copied().flatten()
    }

    /// Number of heap pops performed by the last search.
    pub fn pops(&self) -> usize {
        self.pops
    }

    /// Walks predecessor links back from `end` to `start`.
    pub fn reconstruct(&self, start: usize, end: usize) -> Result<Vec<usize>, EngineError> {
        if !self.cost(end).is_finite() {
            return Err(EngineError::NoPathFound { start, end });
        }
        let mut nodes = vec![end];
        let mut current = end;
        while current != start {
            current = self.predecessor(current).ok_or_else(|| {
                EngineError::Internal(format!(
                    "predecessor chain from {end} breaks at node {current} before reaching {start}"
                ))
            })?;
            nodes.push(current);
            if nodes.len() > self.cost.len() {
                return Err(EngineError::Internal(format!(
                    "predecessor chain from {end} contains a cycle"
                )));
            }
        }
        nodes.reverse();
        Ok(nodes)
    }
}

/// Set of undirected edges excluded from a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeMask {
    removed: HashSet<(usize, usize)>,
}

impl EdgeMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, a: usize, b: usize) {
        self.removed.insert(edge_key(a, b));
    }

    /// Excludes every edge along `nodes`.
    pub fn remove_walk(&mut self, nodes: &[usize]) {
        for w in nodes.windows(2) {
            self.insert(w[0], w[1]);
        }
    }

    pub fn contains(&self, a: usize, b: usize) -> bool {
        self.removed.contains(&edge_key(a, b))
    }

    pub fn len(&self) -> usize {
        self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

/// A reconstructed node sequence and its total cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub nodes: Vec<usize>,
    pub cost: f64,
}

/// Rejects pairs that cannot be searched.
pub fn validate_pair(graph: &Graph, start: usize, end: usize) -> Result<(), EngineError> {
    if !graph.contains(start) || !graph.contains(end) {
        return Err(EngineError::InvalidPair {
            start,
            end,
            reason: "atom index out of range",
        });
    }
    if start == end {
        return Err(EngineError::InvalidPair {
            start,
            end,
            reason: "start and end are the same atom",
        });
    }
    Ok(())
}

/// Dijkstra's shortest path from `start` to `end`, skipping masked edges.
///
/// Stops as soon as `end` is settled. Exceeding `max_heap_pops` aborts with
/// [`EngineError::SearchLimit`]; a negative or NaN edge cost aborts with
/// [`EngineError::Internal`].
pub fn dijkstra(
    graph: &Graph,
    state: &mut SearchState,
    start: usize,
    end: usize,
    weight: EdgeWeight,
    mask: &EdgeMask,
    max_heap_pops: Option<usize>,
) -> Result<Route, EngineError> {
    validate_pair(graph, start, end)?;
    state.reset(graph.len());
    state.cost[start] = 0.0;
    state.heap.push(start, 0.0);

    while let Some((node, cost)) = state.heap.pop_min() {
        state.pops += 1;
        if let Some(limit) = max_heap_pops {
            if state.pops > limit {
                return Err(EngineError::SearchLimit { limit });
            }
        }
        if node == end {
            break;
        }
        for edge in graph.edges(node) {
            if mask.contains(node, edge.to) || state.heap.is_settled(edge.to) {
                continue;
            }
            let step = weight.cost(edge);
            if step.is_nan() || step < 0.0 {
                return Err(EngineError::Internal(format!(
                    "edge {node}-{} has invalid weight {step}",
                    edge.to
                )));
            }
            let candidate = cost + step;
            if candidate < state.cost[edge.to] {
                state.cost[edge.to] = candidate;
                state.predecessor[edge.to] = Some(node);
                state.heap.decrease_key(edge.to, candidate);
            }
        }
    }

    let nodes = state.reconstruct(start, end)?;
    trace!(
        start,
        end,
        pops = state.pops,
        hops = nodes.len() - 1,
        "Shortest route reconstructed."
    );
    Ok(Route {
        nodes,
        cost: state.cost[end],
    })
}
