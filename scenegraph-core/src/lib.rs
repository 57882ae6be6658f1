//! Scene Graph Core
//!
//! This crate provides the dependency graph that keeps a scene editor's
//! derived data up to date. It implements:
//!
//! - Classification of nodes into source, intermediate and terminal sets
//! - Directional dirty propagation
//! - Dependency-ordered evaluation passes with an evaluated notification
//! - Edit operations that wire nodes together and prune/insert branches
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: node handles, the node capability trait and the graph itself
//! - `edit`: edge maintenance used by scene editing code
//! - `config`: graph configuration
//! - `error`: error types
//!
//! # Example
//!
//! ```rust
//! use scenegraph_core::edit::create_dependency;
//! use scenegraph_core::graph::{Graph, GraphDirection, NodeArena, SceneNode};
//!
//! let mut nodes = NodeArena::with_key();
//! let mut graph = Graph::new();
//!
//! let transform = nodes.insert(SceneNode::new("transform"));
//! let mesh = nodes.insert(SceneNode::new("mesh"));
//! graph.add_node(&mut nodes, transform)?;
//! graph.add_node(&mut nodes, mesh)?;
//! create_dependency(&mut graph, &mut nodes, mesh, transform)?;
//!
//! // Newly added nodes start dirty.
//! let result = graph.evaluate_graph(&mut nodes, false);
//! assert_eq!(result.node_count, 2);
//!
//! // Moving the transform invalidates the mesh.
//! let dirtied = graph.dirty_node(&mut nodes, transform, GraphDirection::Downstream)?;
//! assert_eq!(dirtied, 2);
//! # Ok::<(), scenegraph_core::GraphError>(())
//! ```

pub mod config;
pub mod edit;
pub mod error;
pub mod graph;

pub use config::GraphConfig;
pub use error::GraphError;
pub use graph::{EvaluateResult, Graph, GraphDirection, GraphNode, NodeArena, NodeId, SceneNode};
