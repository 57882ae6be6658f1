//! Graph Scheduler
//!
//! The [`Graph`] classifies registered nodes, propagates dirty state along
//! their edges, and evaluates dirty nodes so that dependencies are always
//! evaluated before their dependents.
//!
//! # Algorithm
//!
//! Registered nodes live in exactly one of three sets, derived from their
//! edges (first match wins):
//!
//! 1. no ancestors: **source**
//! 2. no descendants: **terminal**
//! 3. otherwise: **intermediate**
//!
//! A pass walks every dirty terminal node downstream and every dirty source
//! node upstream. Evaluating a node first descends into each of its dirty
//! dependencies (ancestors when downstream, descendants when upstream), then
//! calls [`GraphNode::do_evaluate`]. Because `do_evaluate` cleans the node,
//! a dependency shared by several dependents is evaluated once per pass.
//!
//! Both walks keep their own stack on the heap, so chain depth is not
//! limited by the thread stack. Dirtying stops at nodes that are already
//! dirty, which keeps it linear in the size of the graph and safe against
//! caller-introduced cycles.

use std::time::Instant;

use indexmap::IndexSet;
use tracing::{debug, info, trace, warn};

use super::events::{EvaluatedListeners, GraphEvaluatedArgs, ListenerId};
use super::node::{
    GraphDirection, GraphId, GraphNode, NodeArena, NodeId, NodeList, NodeRole, NodeState,
};
use super::result::EvaluateResult;
use super::visited::{Advance, VisitedIds};
use crate::config::GraphConfig;
use crate::error::GraphError;

/// The scene dependency graph.
///
/// The graph holds [`NodeId`] handles only. Node data lives in a
/// caller-owned [`NodeArena`] that is passed to each operation.
#[derive(Debug)]
pub struct Graph {
    /// Identity nodes use for their back-reference.
    id: GraphId,

    config: GraphConfig,

    /// Registered nodes without ancestors.
    source_nodes: IndexSet<NodeId>,

    /// Registered nodes with both ancestors and descendants.
    intermediate_nodes: IndexSet<NodeId>,

    /// Registered nodes without descendants.
    terminal_nodes: IndexSet<NodeId>,

    visited: VisitedIds,

    /// Nodes evaluated by the most recent pass.
    evaluated_nodes: IndexSet<NodeId>,

    /// Roots queued by edit operations for post-pass cleanup.
    cleanup_roots: IndexSet<NodeId>,

    listeners: EvaluatedListeners,
}

impl Graph {
    /// Create a new empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Create a new empty graph.
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            id: GraphId::new(),
            config,
            source_nodes: IndexSet::new(),
            intermediate_nodes: IndexSet::new(),
            terminal_nodes: IndexSet::new(),
            visited: VisitedIds::new(),
            evaluated_nodes: IndexSet::new(),
            cleanup_roots: IndexSet::new(),
            listeners: EvaluatedListeners::default(),
        }
    }

    /// This graph's identity.
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// The active configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.source_nodes.len() + self.intermediate_nodes.len() + self.terminal_nodes.len()
    }

    /// Whether no nodes are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: NodeId) -> bool {
        self.role_of(id).is_some()
    }

    /// The classification set `id` currently lives in.
    pub fn role_of(&self, id: NodeId) -> Option<NodeRole> {
        if self.source_nodes.contains(&id) {
            Some(NodeRole::Source)
        } else if self.intermediate_nodes.contains(&id) {
            Some(NodeRole::Intermediate)
        } else if self.terminal_nodes.contains(&id) {
            Some(NodeRole::Terminal)
        } else {
            None
        }
    }

    /// Registered nodes without ancestors.
    pub fn source_nodes(&self) -> &IndexSet<NodeId> {
        &self.source_nodes
    }

    /// Registered nodes with both ancestors and descendants.
    pub fn intermediate_nodes(&self) -> &IndexSet<NodeId> {
        &self.intermediate_nodes
    }

    /// Registered nodes without descendants.
    pub fn terminal_nodes(&self) -> &IndexSet<NodeId> {
        &self.terminal_nodes
    }

    /// Every registered node: sources, then intermediates, then terminals.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.source_nodes
            .iter()
            .chain(&self.intermediate_nodes)
            .chain(&self.terminal_nodes)
            .copied()
    }

    /// Nodes evaluated by the most recent pass, in evaluation order.
    pub fn evaluated_nodes(&self) -> &IndexSet<NodeId> {
        &self.evaluated_nodes
    }

    /// Re-derive which classification set `id` belongs to.
    ///
    /// Must be called whenever the node's edges change. Only nodes attached
    /// to this graph are classified; use [`Graph::add_node`] to register one.
    pub fn classify<N: GraphNode>(
        &mut self,
        nodes: &NodeArena<N>,
        id: NodeId,
    ) -> Result<NodeRole, GraphError> {
        let node = nodes.get(id).ok_or(GraphError::UnknownNode(id))?;
        if node.graph() != Some(self.id) {
            return Err(GraphError::NotRegistered(id));
        }

        let role = if node.ancestors().is_empty() {
            NodeRole::Source
        } else if node.descendants().is_empty() {
            NodeRole::Terminal
        } else {
            NodeRole::Intermediate
        };

        let (home, other_a, other_b) = match role {
            NodeRole::Source => (
                &mut self.source_nodes,
                &mut self.intermediate_nodes,
                &mut self.terminal_nodes,
            ),
            NodeRole::Intermediate => (
                &mut self.intermediate_nodes,
                &mut self.source_nodes,
                &mut self.terminal_nodes,
            ),
            NodeRole::Terminal => (
                &mut self.terminal_nodes,
                &mut self.source_nodes,
                &mut self.intermediate_nodes,
            ),
        };
        home.insert(id);
        other_a.shift_remove(&id);
        other_b.shift_remove(&id);

        Ok(role)
    }

    /// Register a node.
    ///
    /// The node is classified, attached to this graph, marked dirty in both
    /// directions and its visited stamp cleared. Adding a node that is
    /// already registered is the caller's mistake and is not detected.
    pub fn add_node<N: GraphNode>(
        &mut self,
        nodes: &mut NodeArena<N>,
        id: NodeId,
    ) -> Result<(), GraphError> {
        let node = nodes.get_mut(id).ok_or(GraphError::UnknownNode(id))?;

        node.set_graph(Some(self.id));
        for direction in GraphDirection::ALL {
            node.set_node_state(direction, NodeState::Dirty);
        }
        node.set_visited_id(0);

        let role = self.classify(nodes, id)?;

        debug!(graph = %self.id, node = ?id, ?role, "added node");
        Ok(())
    }

    /// Unregister a node.
    ///
    /// The handle is dropped from the classification sets even when the node
    /// has already left the arena; that case is still reported as
    /// [`GraphError::UnknownNode`].
    pub fn remove_node<N: GraphNode>(
        &mut self,
        nodes: &mut NodeArena<N>,
        id: NodeId,
    ) -> Result<(), GraphError> {
        let was_registered = self.source_nodes.shift_remove(&id)
            | self.intermediate_nodes.shift_remove(&id)
            | self.terminal_nodes.shift_remove(&id);

        let node = nodes.get_mut(id).ok_or(GraphError::UnknownNode(id))?;
        if node.graph() == Some(self.id) {
            node.set_graph(None);
        }

        debug!(graph = %self.id, node = ?id, was_registered, "removed node");
        Ok(())
    }

    /// Unregister every node and restart the visited-id counter.
    ///
    /// Each node runs its own [`GraphNode::reset`] hook and is returned to
    /// the unregistered default: no graph, visited id 0, clean both ways.
    pub fn reset<N: GraphNode>(&mut self, nodes: &mut NodeArena<N>) {
        let count = self.len();

        for &id in self
            .source_nodes
            .iter()
            .chain(&self.intermediate_nodes)
            .chain(&self.terminal_nodes)
        {
            let Some(node) = nodes.get_mut(id) else {
                warn!(graph = %self.id, node = ?id, "registered node missing from arena");
                continue;
            };
            node.reset();
            node.set_graph(None);
            node.set_visited_id(0);
            for direction in GraphDirection::ALL {
                node.set_node_state(direction, NodeState::Clean);
            }
        }

        self.source_nodes.clear();
        self.intermediate_nodes.clear();
        self.terminal_nodes.clear();
        self.evaluated_nodes.clear();
        self.cleanup_roots.clear();
        self.visited.reset();

        debug!(graph = %self.id, count, "reset graph");
    }

    /// Hand out a fresh, non-zero visited id.
    ///
    /// When the counter wraps, every registered node's stamp is cleared first
    /// so no stale stamp can collide with the new id.
    pub fn assign_visited_id<N: GraphNode>(&mut self, nodes: &mut NodeArena<N>) -> u32 {
        match self.visited.advance() {
            Advance::Fresh(id) => id,
            Advance::Wrapped(id) => {
                warn!(graph = %self.id, "visited id counter wrapped, clearing stamps");
                self.reset_visited_ids(nodes);
                id
            }
        }
    }

    /// Clear the visited stamp of every registered node.
    pub fn reset_visited_ids<N: GraphNode>(&self, nodes: &mut NodeArena<N>) {
        for id in self.nodes() {
            if let Some(node) = nodes.get_mut(id) {
                node.set_visited_id(0);
            }
        }
    }

    /// Mark `id` dirty in `direction` and propagate to everything reachable
    /// in that direction.
    ///
    /// Returns how many nodes went from clean to dirty, `id` included.
    /// Nodes that are already dirty are not walked through again, so a
    /// repeated call with nothing cleaned in between returns 0.
    pub fn dirty_node<N: GraphNode>(
        &self,
        nodes: &mut NodeArena<N>,
        id: NodeId,
        direction: GraphDirection,
    ) -> Result<usize, GraphError> {
        let node = nodes.get_mut(id).ok_or(GraphError::UnknownNode(id))?;

        let mut count = 0;
        if node.node_state(direction) != NodeState::Dirty {
            node.set_node_state(direction, NodeState::Dirty);
            count += 1;
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = nodes.get(current) else {
                continue;
            };
            let next: NodeList = dependents(node, direction).iter().copied().collect();

            for next_id in next {
                let Some(next_node) = nodes.get_mut(next_id) else {
                    warn!(graph = %self.id, node = ?next_id, "stale edge while dirtying");
                    continue;
                };
                if next_node.node_state(direction) == NodeState::Dirty {
                    continue;
                }

                next_node.set_node_state(direction, NodeState::Dirty);
                trace!(node = ?next_id, ?direction, "dirtied");
                count += 1;
                stack.push(next_id);
            }
        }

        Ok(count)
    }

    /// Run one evaluation pass.
    ///
    /// Dirty terminal nodes are evaluated downstream, then dirty source nodes
    /// upstream. Listeners receive the evaluated set once the pass is done;
    /// `silent` only lowers the log level of the pass summary.
    pub fn evaluate_graph<N: GraphNode>(
        &mut self,
        nodes: &mut NodeArena<N>,
        silent: bool,
    ) -> EvaluateResult {
        self.evaluated_nodes.clear();
        let start = Instant::now();

        for (roots, direction) in [
            (&self.terminal_nodes, GraphDirection::Downstream),
            (&self.source_nodes, GraphDirection::Upstream),
        ] {
            for &id in roots {
                match nodes.get(id) {
                    Some(node) if node.node_state(direction) == NodeState::Dirty => {
                        evaluate(nodes, &mut self.evaluated_nodes, id, direction);
                    }
                    Some(_) => {}
                    None => {
                        warn!(graph = %self.id, node = ?id, "registered node missing from arena")
                    }
                }
            }
        }

        let result = EvaluateResult {
            node_count: self.evaluated_nodes.len(),
            total_time: start.elapsed(),
        };
        self.report(&result, silent);

        self.listeners.raise(&GraphEvaluatedArgs {
            graph: self.id,
            nodes: &self.evaluated_nodes,
        });

        self.cleanup_roots.clear();

        result
    }

    /// Queue a node for cleanup after the next pass.
    ///
    /// Returns `false` if it was already queued.
    pub fn add_cleanup_root(&mut self, id: NodeId) -> bool {
        self.cleanup_roots.insert(id)
    }

    /// Nodes queued for cleanup since the last pass.
    pub fn cleanup_roots(&self) -> &IndexSet<NodeId> {
        &self.cleanup_roots
    }

    /// Register a callback raised after every pass.
    pub fn add_evaluated_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&GraphEvaluatedArgs<'_>) + 'static,
    {
        self.listeners.add(listener)
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn remove_evaluated_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn report(&self, result: &EvaluateResult, silent: bool) {
        let elapsed_ms = result.total_time_ms();
        let nodes = result.node_count;

        if self.config.log_passes && !silent {
            info!(graph = %self.id, nodes, elapsed_ms, "evaluated scene graph");
        } else {
            debug!(graph = %self.id, nodes, elapsed_ms, "evaluated scene graph");
        }

        if let Some(threshold) = self.config.slow_pass_threshold() {
            if result.total_time > threshold {
                warn!(
                    graph = %self.id,
                    nodes,
                    elapsed_ms,
                    threshold_ms = threshold.as_millis() as u64,
                    "slow scene graph evaluation"
                );
            }
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// Nodes a change to `node` flows into.
fn dependents<N: GraphNode>(node: &N, direction: GraphDirection) -> &[NodeId] {
    match direction {
        GraphDirection::Downstream => node.descendants(),
        GraphDirection::Upstream => node.ancestors(),
    }
}

/// Nodes that must be evaluated before `node`.
fn dependencies<N: GraphNode>(node: &N, direction: GraphDirection) -> &[NodeId] {
    match direction {
        GraphDirection::Downstream => node.ancestors(),
        GraphDirection::Upstream => node.descendants(),
    }
}

/// A node whose dependencies are being evaluated.
struct Frame {
    id: NodeId,
    pending: NodeList,
    next: usize,
}

impl Frame {
    fn enter<N: GraphNode>(
        nodes: &NodeArena<N>,
        id: NodeId,
        direction: GraphDirection,
    ) -> Option<Self> {
        let node = nodes.get(id)?;
        Some(Self {
            id,
            pending: dependencies(node, direction).iter().copied().collect(),
            next: 0,
        })
    }
}

/// Evaluate every dirty dependency of `id`, then `id` itself.
///
/// Dependencies are re-checked for dirtiness right before descending, so one
/// evaluated (and cleaned) by an earlier sibling is skipped. Nothing else
/// guards against re-evaluation: a node whose `do_evaluate` leaves it dirty
/// is evaluated again by each dependent that reaches it.
fn evaluate<N: GraphNode>(
    nodes: &mut NodeArena<N>,
    evaluated: &mut IndexSet<NodeId>,
    id: NodeId,
    direction: GraphDirection,
) {
    let Some(root) = Frame::enter(nodes, id, direction) else {
        return;
    };
    let mut stack = vec![root];

    while let Some(frame) = stack.last_mut() {
        if let Some(&dependency) = frame.pending.get(frame.next) {
            frame.next += 1;

            let dirty = nodes
                .get(dependency)
                .is_some_and(|n| n.node_state(direction) == NodeState::Dirty);
            if dirty {
                if let Some(child) = Frame::enter(nodes, dependency, direction) {
                    stack.push(child);
                }
            }
            continue;
        }

        // All dependencies are done.
        let id = frame.id;
        stack.pop();
        if let Some(node) = nodes.get_mut(id) {
            node.do_evaluate(direction);
        }
        evaluated.insert(id);
    }
}
