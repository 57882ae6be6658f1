//! Scene Edit Operations
//!
//! The [`Graph`] never changes edges itself. The operations here are what
//! scene editing code uses to wire nodes together and to take whole branches
//! in and out of the graph (delete and undo), keeping the graph's
//! classification and dirty state in step with the edges.
//!
//! # Prune and insert
//!
//! [`prune`] unregisters a node and everything downstream of it. Edges from
//! nodes outside the branch are cut on the outside node only; the branch
//! nodes keep their own edge lists, so [`insert`] can later restore the
//! branch exactly. Both walks stamp branch members with a fresh visited id to
//! tell them apart from outsiders.

use tracing::debug;

use crate::error::GraphError;
use crate::graph::{Graph, GraphDirection, GraphNode, NodeArena, NodeId, NodeList};

/// Add `descendant` to `ancestor`'s descendant list.
///
/// Both nodes are re-classified and `ancestor` is dirtied downstream if they
/// are registered with `graph`.
pub fn connect_descendant<N: GraphNode>(
    graph: &mut Graph,
    nodes: &mut NodeArena<N>,
    ancestor: NodeId,
    descendant: NodeId,
) -> Result<(), GraphError> {
    ensure_exists(nodes, descendant)?;
    let node = nodes.get_mut(ancestor).ok_or(GraphError::UnknownNode(ancestor))?;
    node.links_mut().add_descendant(descendant);

    reclassify(graph, nodes, ancestor)?;
    reclassify(graph, nodes, descendant)?;
    dirty_downstream(graph, nodes, ancestor)
}

/// Remove `descendant` from `ancestor`'s descendant list.
pub fn disconnect_descendant<N: GraphNode>(
    graph: &mut Graph,
    nodes: &mut NodeArena<N>,
    ancestor: NodeId,
    descendant: NodeId,
) -> Result<(), GraphError> {
    ensure_exists(nodes, descendant)?;
    let node = nodes.get_mut(ancestor).ok_or(GraphError::UnknownNode(ancestor))?;
    node.links_mut().remove_descendant(descendant);

    reclassify(graph, nodes, ancestor)?;
    reclassify(graph, nodes, descendant)?;
    dirty_downstream(graph, nodes, ancestor)
}

/// Add `ancestor` to `descendant`'s ancestor list and re-classify both.
pub fn connect_ancestor<N: GraphNode>(
    graph: &mut Graph,
    nodes: &mut NodeArena<N>,
    descendant: NodeId,
    ancestor: NodeId,
) -> Result<(), GraphError> {
    ensure_exists(nodes, ancestor)?;
    let node = nodes.get_mut(descendant).ok_or(GraphError::UnknownNode(descendant))?;
    node.links_mut().add_ancestor(ancestor);

    reclassify(graph, nodes, descendant)?;
    reclassify(graph, nodes, ancestor)
}

/// Remove `ancestor` from `descendant`'s ancestor list and re-classify both.
pub fn disconnect_ancestor<N: GraphNode>(
    graph: &mut Graph,
    nodes: &mut NodeArena<N>,
    descendant: NodeId,
    ancestor: NodeId,
) -> Result<(), GraphError> {
    ensure_exists(nodes, ancestor)?;
    let node = nodes.get_mut(descendant).ok_or(GraphError::UnknownNode(descendant))?;
    node.links_mut().remove_ancestor(ancestor);

    reclassify(graph, nodes, descendant)?;
    reclassify(graph, nodes, ancestor)
}

/// Make `descendant` depend on `ancestor`.
///
/// Both nodes must be registered with `graph`. Edges that would close a
/// cycle are rejected, since evaluation assumes a DAG.
pub fn create_dependency<N: GraphNode>(
    graph: &mut Graph,
    nodes: &mut NodeArena<N>,
    descendant: NodeId,
    ancestor: NodeId,
) -> Result<(), GraphError> {
    if descendant == ancestor {
        return Err(GraphError::SelfDependency(descendant));
    }
    ensure_registered(graph, nodes, ancestor)?;
    ensure_registered(graph, nodes, descendant)?;

    if reaches(graph, nodes, descendant, ancestor) {
        return Err(GraphError::Cycle {
            ancestor,
            descendant,
        });
    }

    connect_descendant(graph, nodes, ancestor, descendant)?;
    connect_ancestor(graph, nodes, descendant, ancestor)?;

    debug!(graph = %graph.id(), ?ancestor, ?descendant, "created dependency");
    Ok(())
}

/// Drop the dependency of `descendant` on `ancestor`.
///
/// `descendant` is dirtied downstream as well, since one of its inputs went
/// away.
pub fn remove_dependency<N: GraphNode>(
    graph: &mut Graph,
    nodes: &mut NodeArena<N>,
    descendant: NodeId,
    ancestor: NodeId,
) -> Result<(), GraphError> {
    disconnect_descendant(graph, nodes, ancestor, descendant)?;
    disconnect_ancestor(graph, nodes, descendant, ancestor)?;
    dirty_downstream(graph, nodes, descendant)?;

    debug!(graph = %graph.id(), ?ancestor, ?descendant, "removed dependency");
    Ok(())
}

/// Unregister `root` and every node downstream of it.
///
/// Returns the unregistered descendants in visit order (`root` excluded).
pub fn prune<N: GraphNode>(
    graph: &mut Graph,
    nodes: &mut NodeArena<N>,
    root: NodeId,
) -> Result<Vec<NodeId>, GraphError> {
    let (ancestors, descendants) = edges(nodes, root)?;
    let mut pruned = Vec::new();

    if !ancestors.is_empty() || !descendants.is_empty() {
        let stamp = graph.assign_visited_id(nodes);
        for ancestor in ancestors {
            if nodes.contains_key(ancestor) {
                disconnect_descendant(graph, nodes, ancestor, root)?;
            }
        }

        pruned = collect_branch(nodes, root, stamp);
        for &current in &pruned {
            let (ancestors, _) = edges(nodes, current)?;

            // Edges from inside the branch survive for a later insert.
            for ancestor in ancestors {
                if unvisited(nodes, ancestor, stamp) {
                    disconnect_descendant(graph, nodes, ancestor, current)?;
                }
            }
            graph.remove_node(nodes, current)?;
        }
    }

    graph.remove_node(nodes, root)?;

    debug!(graph = %graph.id(), ?root, descendants = pruned.len(), "pruned branch");
    Ok(pruned)
}

/// Re-register a branch previously taken out with [`prune`].
///
/// Returns the re-registered descendants in visit order (`root` excluded).
pub fn insert<N: GraphNode>(
    graph: &mut Graph,
    nodes: &mut NodeArena<N>,
    root: NodeId,
) -> Result<Vec<NodeId>, GraphError> {
    graph.add_node(nodes, root)?;

    let (ancestors, descendants) = edges(nodes, root)?;
    if ancestors.is_empty() && descendants.is_empty() {
        return Ok(Vec::new());
    }

    let stamp = graph.assign_visited_id(nodes);
    for ancestor in ancestors {
        if nodes.contains_key(ancestor) {
            connect_descendant(graph, nodes, ancestor, root)?;
        }
    }

    let inserted = collect_branch(nodes, root, stamp);
    for &current in &inserted {
        // Registering clears the stamp; the node is still a branch member.
        graph.add_node(nodes, current)?;
        stamp_node(nodes, current, stamp);

        let (ancestors, _) = edges(nodes, current)?;
        for ancestor in ancestors {
            if unvisited(nodes, ancestor, stamp) {
                connect_descendant(graph, nodes, ancestor, current)?;
            }
        }
    }

    debug!(graph = %graph.id(), ?root, descendants = inserted.len(), "inserted branch");
    Ok(inserted)
}

fn ensure_exists<N: GraphNode>(nodes: &NodeArena<N>, id: NodeId) -> Result<(), GraphError> {
    if nodes.contains_key(id) {
        Ok(())
    } else {
        Err(GraphError::UnknownNode(id))
    }
}

fn ensure_registered<N: GraphNode>(
    graph: &Graph,
    nodes: &NodeArena<N>,
    id: NodeId,
) -> Result<(), GraphError> {
    let node = nodes.get(id).ok_or(GraphError::UnknownNode(id))?;
    if node.graph() != Some(graph.id()) {
        return Err(GraphError::NotRegistered(id));
    }
    Ok(())
}

fn is_registered<N: GraphNode>(graph: &Graph, nodes: &NodeArena<N>, id: NodeId) -> bool {
    nodes.get(id).is_some_and(|n| n.graph() == Some(graph.id()))
}

fn reclassify<N: GraphNode>(
    graph: &mut Graph,
    nodes: &NodeArena<N>,
    id: NodeId,
) -> Result<(), GraphError> {
    if is_registered(graph, nodes, id) {
        graph.classify(nodes, id)?;
    }
    Ok(())
}

fn dirty_downstream<N: GraphNode>(
    graph: &Graph,
    nodes: &mut NodeArena<N>,
    id: NodeId,
) -> Result<(), GraphError> {
    if is_registered(graph, nodes, id) {
        graph.dirty_node(nodes, id, GraphDirection::Downstream)?;
    }
    Ok(())
}

fn edges<N: GraphNode>(
    nodes: &NodeArena<N>,
    id: NodeId,
) -> Result<(NodeList, NodeList), GraphError> {
    let node = nodes.get(id).ok_or(GraphError::UnknownNode(id))?;
    Ok((
        node.ancestors().iter().copied().collect(),
        node.descendants().iter().copied().collect(),
    ))
}

/// Whether `id` exists and has not been stamped with `stamp`.
fn unvisited<N: GraphNode>(nodes: &NodeArena<N>, id: NodeId, stamp: u32) -> bool {
    nodes.get(id).is_some_and(|n| n.visited_id() != stamp)
}

fn stamp_node<N: GraphNode>(nodes: &mut NodeArena<N>, id: NodeId, stamp: u32) {
    if let Some(node) = nodes.get_mut(id) {
        node.set_visited_id(stamp);
    }
}

/// Stamp `root` and everything downstream of it with `stamp`.
///
/// Returns the downstream nodes in visit order, `root` excluded. The whole
/// branch is stamped before callers touch any edge.
fn collect_branch<N: GraphNode>(
    nodes: &mut NodeArena<N>,
    root: NodeId,
    stamp: u32,
) -> Vec<NodeId> {
    stamp_node(nodes, root, stamp);

    let mut branch = Vec::new();
    let mut stack: Vec<NodeId> = nodes
        .get(root)
        .map(|node| node.descendants().to_vec())
        .unwrap_or_default();

    while let Some(current) = stack.pop() {
        let Some(node) = nodes.get_mut(current) else {
            continue;
        };
        if node.visited_id() == stamp {
            continue;
        }
        node.set_visited_id(stamp);
        stack.extend(node.descendants().iter().copied());
        branch.push(current);
    }

    branch
}

/// Whether `target` is reachable downstream from `from`.
fn reaches<N: GraphNode>(
    graph: &mut Graph,
    nodes: &mut NodeArena<N>,
    from: NodeId,
    target: NodeId,
) -> bool {
    let stamp = graph.assign_visited_id(nodes);
    let mut stack = vec![from];

    while let Some(current) = stack.pop() {
        if current == target {
            return true;
        }
        let Some(node) = nodes.get_mut(current) else {
            continue;
        };
        if node.visited_id() == stamp {
            continue;
        }
        node.set_visited_id(stamp);
        stack.extend(node.descendants().iter().copied());
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeRole, NodeState, SceneNode};

    fn setup(names: &[&str]) -> (Graph, NodeArena<SceneNode>, Vec<NodeId>) {
        let mut graph = Graph::new();
        let mut nodes = NodeArena::with_key();
        let ids: Vec<_> = names
            .iter()
            .map(|name| nodes.insert(SceneNode::new(*name)))
            .collect();
        for &id in &ids {
            graph.add_node(&mut nodes, id).unwrap();
        }
        (graph, nodes, ids)
    }

    #[test]
    fn create_dependency_reclassifies_both_ends() {
        let (mut graph, mut nodes, ids) = setup(&["a", "b", "c"]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        create_dependency(&mut graph, &mut nodes, b, a).unwrap();
        create_dependency(&mut graph, &mut nodes, c, b).unwrap();

        assert_eq!(graph.role_of(a), Some(NodeRole::Source));
        assert_eq!(graph.role_of(b), Some(NodeRole::Intermediate));
        assert_eq!(graph.role_of(c), Some(NodeRole::Terminal));
        assert_eq!(nodes[b].ancestors(), &[a]);
        assert_eq!(nodes[b].descendants(), &[c]);
    }

    #[test]
    fn create_dependency_rejects_invalid_edges() {
        let (mut graph, mut nodes, ids) = setup(&["a", "b", "c"]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        create_dependency(&mut graph, &mut nodes, b, a).unwrap();
        create_dependency(&mut graph, &mut nodes, c, b).unwrap();

        assert!(matches!(
            create_dependency(&mut graph, &mut nodes, a, a),
            Err(GraphError::SelfDependency(n)) if n == a
        ));
        assert!(matches!(
            create_dependency(&mut graph, &mut nodes, a, c),
            Err(GraphError::Cycle { ancestor, descendant }) if ancestor == c && descendant == a
        ));

        let outsider = nodes.insert(SceneNode::new("outsider"));
        assert!(matches!(
            create_dependency(&mut graph, &mut nodes, outsider, a),
            Err(GraphError::NotRegistered(n)) if n == outsider
        ));

        // Rejected edits leave the edges alone.
        assert!(nodes[a].ancestors().is_empty());
        assert!(nodes[c].descendants().is_empty());
    }

    #[test]
    fn connecting_dirties_the_ancestor_downstream() {
        let (mut graph, mut nodes, ids) = setup(&["a", "b", "c"]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        create_dependency(&mut graph, &mut nodes, b, a).unwrap();
        graph.evaluate_graph(&mut nodes, true);
        assert_eq!(nodes[b].node_state(GraphDirection::Downstream), NodeState::Clean);

        create_dependency(&mut graph, &mut nodes, c, b).unwrap();

        assert_eq!(nodes[a].node_state(GraphDirection::Downstream), NodeState::Clean);
        assert_eq!(nodes[b].node_state(GraphDirection::Downstream), NodeState::Dirty);
        assert_eq!(nodes[c].node_state(GraphDirection::Downstream), NodeState::Dirty);
        assert_eq!(nodes[b].node_state(GraphDirection::Upstream), NodeState::Clean);
    }

    #[test]
    fn remove_dependency_dirties_the_former_descendant() {
        let (mut graph, mut nodes, ids) = setup(&["a", "b"]);
        let (a, b) = (ids[0], ids[1]);
        create_dependency(&mut graph, &mut nodes, b, a).unwrap();
        graph.evaluate_graph(&mut nodes, true);

        remove_dependency(&mut graph, &mut nodes, b, a).unwrap();

        assert_eq!(graph.role_of(a), Some(NodeRole::Source));
        assert_eq!(graph.role_of(b), Some(NodeRole::Source));
        assert_eq!(nodes[b].node_state(GraphDirection::Downstream), NodeState::Dirty);
        assert!(nodes[a].descendants().is_empty());
        assert!(nodes[b].ancestors().is_empty());
    }

    #[test]
    fn prune_and_insert_restore_a_branch() {
        // outside -> d, root -> b, root -> c, b -> d, c -> d
        let (mut graph, mut nodes, ids) = setup(&["outside", "root", "b", "c", "d"]);
        let (outside, root, b, c, d) = (ids[0], ids[1], ids[2], ids[3], ids[4]);
        create_dependency(&mut graph, &mut nodes, b, root).unwrap();
        create_dependency(&mut graph, &mut nodes, c, root).unwrap();
        create_dependency(&mut graph, &mut nodes, d, b).unwrap();
        create_dependency(&mut graph, &mut nodes, d, c).unwrap();
        create_dependency(&mut graph, &mut nodes, d, outside).unwrap();

        let pruned = prune(&mut graph, &mut nodes, root).unwrap();

        assert_eq!(pruned.len(), 3);
        for id in [b, c, d] {
            assert!(pruned.contains(&id));
        }
        assert_eq!(graph.len(), 1);
        assert!(graph.contains(outside));
        assert!(nodes[outside].descendants().is_empty());
        assert_eq!(graph.role_of(outside), Some(NodeRole::Source));
        for id in [root, b, c, d] {
            assert!(nodes[id].graph().is_none());
        }
        // The branch keeps its own view of its inputs.
        assert_eq!(nodes[d].ancestors(), &[b, c, outside]);
        assert_eq!(nodes[b].descendants(), &[d]);
        assert_eq!(nodes[c].descendants(), &[d]);
        assert_eq!(nodes[root].descendants(), &[b, c]);

        let inserted = insert(&mut graph, &mut nodes, root).unwrap();

        assert_eq!(inserted.len(), 3);
        assert_eq!(graph.len(), 5);
        assert_eq!(graph.role_of(root), Some(NodeRole::Source));
        assert_eq!(graph.role_of(b), Some(NodeRole::Intermediate));
        assert_eq!(graph.role_of(c), Some(NodeRole::Intermediate));
        assert_eq!(graph.role_of(d), Some(NodeRole::Terminal));
        assert_eq!(nodes[outside].descendants(), &[d]);
        assert_eq!(nodes[b].descendants(), &[d]);
        assert_eq!(nodes[c].descendants(), &[d]);
        assert_eq!(nodes[root].descendants(), &[b, c]);
    }

    #[test]
    fn prune_keeps_edges_inside_the_branch() {
        // root -> b, root -> c, b -> d, c -> d
        let (mut graph, mut nodes, ids) = setup(&["root", "b", "c", "d"]);
        let (root, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        create_dependency(&mut graph, &mut nodes, b, root).unwrap();
        create_dependency(&mut graph, &mut nodes, c, root).unwrap();
        create_dependency(&mut graph, &mut nodes, d, b).unwrap();
        create_dependency(&mut graph, &mut nodes, d, c).unwrap();

        let pruned = prune(&mut graph, &mut nodes, root).unwrap();

        assert_eq!(pruned.len(), 3);
        assert!(graph.is_empty());
        assert_eq!(nodes[root].descendants(), &[b, c]);
        assert_eq!(nodes[b].ancestors(), &[root]);
        assert_eq!(nodes[c].ancestors(), &[root]);
        assert_eq!(nodes[b].descendants(), &[d]);
        assert_eq!(nodes[c].descendants(), &[d]);
        assert_eq!(nodes[d].ancestors(), &[b, c]);
    }

    #[test]
    fn prune_lone_node_just_unregisters_it() {
        let (mut graph, mut nodes, ids) = setup(&["a"]);

        let pruned = prune(&mut graph, &mut nodes, ids[0]).unwrap();

        assert!(pruned.is_empty());
        assert!(graph.is_empty());
        assert!(nodes[ids[0]].graph().is_none());
    }
}
