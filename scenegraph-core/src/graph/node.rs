//! Graph Nodes
//!
//! This module defines the handle types, per-direction state and the node
//! capability trait that the graph schedules over.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use slotmap::SlotMap;
use smallvec::SmallVec;

slotmap::new_key_type! {
    /// Handle to a node stored in a [`NodeArena`].
    ///
    /// Handles are cheap to copy and hash. A handle whose node has been
    /// removed from the arena stays stale forever; it never aliases a node
    /// inserted later.
    pub struct NodeId;
}

/// Caller-owned storage for scene nodes.
///
/// The [`Graph`](super::Graph) never owns node memory; it only records
/// [`NodeId`]s and borrows the arena for the duration of each operation.
pub type NodeArena<N> = SlotMap<NodeId, N>;

/// Edge list type used by [`NodeLinks`].
pub type NodeList = SmallVec<[NodeId; 4]>;

/// Unique identifier for a [`Graph`](super::Graph).
///
/// Nodes hold this as their non-owning back-reference to the graph they are
/// registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphId(u64);

impl GraphId {
    /// Generate a new unique graph ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph#{}", self.0)
    }
}

/// Direction of a traversal through the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphDirection {
    /// Towards descendants: a change flows into everything that depends on
    /// the node.
    Downstream,

    /// Towards ancestors: a change flows into everything the node depends on.
    Upstream,
}

impl GraphDirection {
    /// Both directions, in the order their state is stored.
    pub const ALL: [GraphDirection; 2] = [GraphDirection::Downstream, GraphDirection::Upstream];

    fn index(self) -> usize {
        match self {
            GraphDirection::Downstream => 0,
            GraphDirection::Upstream => 1,
        }
    }
}

/// Dirty state of a node in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeState {
    /// The node's data is up-to-date.
    #[default]
    Clean,

    /// The node needs to be evaluated before its data can be trusted.
    Dirty,
}

/// The classification set a registered node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// No ancestors. Roots of upstream evaluation.
    Source,

    /// Both ancestors and descendants.
    Intermediate,

    /// No descendants. Roots of downstream evaluation.
    Terminal,
}

/// Connectivity and bookkeeping state every graph node carries.
///
/// Node types embed one of these and expose it through
/// [`GraphNode::links`] / [`GraphNode::links_mut`].
#[derive(Debug, Clone, Default)]
pub struct NodeLinks {
    /// Nodes this node depends on (upstream inputs).
    ancestors: NodeList,

    /// Nodes that depend on this node (downstream outputs).
    descendants: NodeList,

    /// Dirty state, indexed by direction.
    states: [NodeState; 2],

    /// Traversal stamp. Zero means "never visited".
    visited_id: u32,

    /// The graph this node is registered with, if any.
    graph: Option<GraphId>,
}

impl NodeLinks {
    /// Create links for an unconnected, clean, unregistered node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Upstream nodes, in connection order.
    pub fn ancestors(&self) -> &[NodeId] {
        &self.ancestors
    }

    /// Downstream nodes, in connection order.
    pub fn descendants(&self) -> &[NodeId] {
        &self.descendants
    }

    /// Add an ancestor. Returns `false` if it was already present.
    pub fn add_ancestor(&mut self, id: NodeId) -> bool {
        push_unique(&mut self.ancestors, id)
    }

    /// Remove an ancestor. Returns `false` if it was not present.
    pub fn remove_ancestor(&mut self, id: NodeId) -> bool {
        remove_ordered(&mut self.ancestors, id)
    }

    /// Add a descendant. Returns `false` if it was already present.
    pub fn add_descendant(&mut self, id: NodeId) -> bool {
        push_unique(&mut self.descendants, id)
    }

    /// Remove a descendant. Returns `false` if it was not present.
    pub fn remove_descendant(&mut self, id: NodeId) -> bool {
        remove_ordered(&mut self.descendants, id)
    }

    /// Drop every edge.
    pub fn clear_edges(&mut self) {
        self.ancestors.clear();
        self.descendants.clear();
    }

    /// Get the state for one direction.
    pub fn state(&self, direction: GraphDirection) -> NodeState {
        self.states[direction.index()]
    }

    /// Set the state for one direction.
    pub fn set_state(&mut self, direction: GraphDirection, state: NodeState) {
        self.states[direction.index()] = state;
    }

    /// Get the traversal stamp.
    pub fn visited_id(&self) -> u32 {
        self.visited_id
    }

    /// Set the traversal stamp.
    pub fn set_visited_id(&mut self, id: u32) {
        self.visited_id = id;
    }

    /// The graph this node is registered with.
    pub fn graph(&self) -> Option<GraphId> {
        self.graph
    }

    /// Attach to or detach from a graph.
    pub fn set_graph(&mut self, graph: Option<GraphId>) {
        self.graph = graph;
    }
}

fn push_unique(list: &mut NodeList, id: NodeId) -> bool {
    if list.contains(&id) {
        return false;
    }
    list.push(id);
    true
}

fn remove_ordered(list: &mut NodeList, id: NodeId) -> bool {
    match list.iter().position(|&n| n == id) {
        Some(pos) => {
            list.remove(pos);
            true
        }
        None => false,
    }
}

/// The capability set a node must offer for the graph to schedule it.
///
/// Only [`links`](Self::links), [`links_mut`](Self::links_mut) and
/// [`do_evaluate`](Self::do_evaluate) are required; the accessors default to
/// reading and writing the embedded [`NodeLinks`].
///
/// # Contract
///
/// `do_evaluate` must set the node's state for `direction` back to
/// [`NodeState::Clean`]. The evaluator relies on it: a node that stays dirty
/// is descended into again by every other dependent in the same pass.
pub trait GraphNode {
    /// Connectivity and bookkeeping state.
    fn links(&self) -> &NodeLinks;

    /// Mutable connectivity and bookkeeping state.
    fn links_mut(&mut self) -> &mut NodeLinks;

    /// Bring this node's data up to date for `direction`.
    fn do_evaluate(&mut self, direction: GraphDirection);

    /// Upstream nodes this node depends on.
    fn ancestors(&self) -> &[NodeId] {
        self.links().ancestors()
    }

    /// Downstream nodes that depend on this node.
    fn descendants(&self) -> &[NodeId] {
        self.links().descendants()
    }

    /// Dirty state in `direction`.
    fn node_state(&self, direction: GraphDirection) -> NodeState {
        self.links().state(direction)
    }

    /// Set the dirty state in `direction`.
    fn set_node_state(&mut self, direction: GraphDirection, state: NodeState) {
        self.links_mut().set_state(direction, state);
    }

    /// Traversal stamp.
    fn visited_id(&self) -> u32 {
        self.links().visited_id()
    }

    /// Set the traversal stamp.
    fn set_visited_id(&mut self, id: u32) {
        self.links_mut().set_visited_id(id);
    }

    /// The graph this node is registered with.
    fn graph(&self) -> Option<GraphId> {
        self.links().graph()
    }

    /// Attach to or detach from a graph.
    fn set_graph(&mut self, graph: Option<GraphId>) {
        self.links_mut().set_graph(graph);
    }

    /// Node-defined reset hook, invoked by [`Graph::reset`](super::Graph::reset).
    ///
    /// The default drops every edge.
    fn reset(&mut self) {
        self.links_mut().clear_edges();
    }
}

type EvaluateFn = Box<dyn FnMut(GraphDirection)>;

/// A general purpose scene node driven by a callback.
pub struct SceneNode {
    name: String,
    links: NodeLinks,
    evaluator: Option<EvaluateFn>,
    evaluation_count: usize,
}

impl SceneNode {
    /// Create a node that does no work when evaluated.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            links: NodeLinks::new(),
            evaluator: None,
            evaluation_count: 0,
        }
    }

    /// Create a node that runs `evaluator` each time it is evaluated.
    pub fn with_evaluator<F>(name: impl Into<String>, evaluator: F) -> Self
    where
        F: FnMut(GraphDirection) + 'static,
    {
        Self {
            evaluator: Some(Box::new(evaluator)),
            ..Self::new(name)
        }
    }

    /// The node's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How many times this node has been evaluated, across all passes.
    pub fn evaluation_count(&self) -> usize {
        self.evaluation_count
    }
}

impl fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneNode")
            .field("name", &self.name)
            .field("links", &self.links)
            .field("has_evaluator", &self.evaluator.is_some())
            .field("evaluation_count", &self.evaluation_count)
            .finish()
    }
}

impl GraphNode for SceneNode {
    fn links(&self) -> &NodeLinks {
        &self.links
    }

    fn links_mut(&mut self) -> &mut NodeLinks {
        &mut self.links
    }

    fn do_evaluate(&mut self, direction: GraphDirection) {
        let _span = tracing::trace_span!("evaluate", node = %self.name, ?direction).entered();

        if let Some(evaluator) = self.evaluator.as_mut() {
            evaluator(direction);
        }
        self.evaluation_count += 1;

        self.links.set_state(direction, NodeState::Clean);
    }
}
