//! Error types.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors reported by graph and edit operations.
///
/// Classification, propagation and evaluation never fail on their own; these
/// only signal bad handles, invalid edits or bad configuration.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The handle does not refer to a node in the arena.
    #[error("node {0:?} is not present in the node arena")]
    UnknownNode(NodeId),

    /// The node exists but is not registered with the graph being edited.
    #[error("node {0:?} is not registered with this graph")]
    NotRegistered(NodeId),

    /// A node cannot be its own ancestor.
    #[error("node {0:?} cannot depend on itself")]
    SelfDependency(NodeId),

    /// The edge would make `ancestor` reachable downstream of itself.
    #[error("making {descendant:?} depend on {ancestor:?} would create a cycle")]
    Cycle {
        /// The upstream end of the rejected edge.
        ancestor: NodeId,
        /// The downstream end of the rejected edge.
        descendant: NodeId,
    },

    /// Configuration could not be parsed.
    #[error("invalid graph configuration: {0}")]
    Config(#[from] serde_json::Error),
}
