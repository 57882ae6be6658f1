//! Dependency Graph
//!
//! This module implements the scene dependency graph: the bookkeeping that
//! decides which scene nodes need re-evaluation after an edit, and in what
//! order.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are scene objects (transforms, meshes, cameras, ...)
//! - Edges are dependencies: if B reads from A, A is an ancestor of B and B
//!   is a descendant of A
//!
//! Edits mark nodes dirty in a direction; dirtiness spreads to every node
//! reachable in that direction. An evaluation pass then re-evaluates dirty
//! nodes, dependencies first.
//!
//! # Design Decisions
//!
//! 1. Nodes live in a caller-owned slot map. The graph stores handles only,
//!    so removing a node from the graph never destroys it.
//!
//! 2. Edges are kept on the nodes in both directions, so traversal is cheap
//!    either way and the graph only has to track classification.
//!
//! 3. Classification sets are insertion-ordered, which keeps the order of
//!    evaluation deterministic between runs.

mod events;
mod node;
mod result;
mod scheduler;
mod visited;

pub use events::{GraphEvaluatedArgs, ListenerId};
pub use node::{
    GraphDirection, GraphId, GraphNode, NodeArena, NodeId, NodeLinks, NodeList, NodeRole,
    NodeState, SceneNode,
};
pub use result::EvaluateResult;
pub use scheduler::Graph;
