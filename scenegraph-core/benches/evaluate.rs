//! Evaluation benchmarks.
//!
//! Measures a dirty + evaluate cycle on layered graphs, where every node
//! depends on every node of the previous layer.
//!
//! ```sh
//! cargo bench --package scenegraph-core --bench evaluate
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scenegraph_core::edit::create_dependency;
use scenegraph_core::graph::{Graph, GraphDirection, NodeArena, NodeId, SceneNode};

fn layered(layers: usize, width: usize) -> (Graph, NodeArena<SceneNode>, Vec<NodeId>) {
    let mut graph = Graph::new();
    let mut nodes = NodeArena::with_key();
    let mut previous: Vec<NodeId> = Vec::new();
    let mut roots = Vec::new();

    for layer in 0..layers {
        let mut current = Vec::with_capacity(width);
        for _ in 0..width {
            let id = nodes.insert(SceneNode::new(format!("layer{layer}")));
            graph.add_node(&mut nodes, id).expect("node is in the arena");
            for &ancestor in &previous {
                create_dependency(&mut graph, &mut nodes, id, ancestor)
                    .expect("layered graph is acyclic");
            }
            current.push(id);
        }
        if layer == 0 {
            roots = current.clone();
        }
        previous = current;
    }

    graph.evaluate_graph(&mut nodes, true);
    (graph, nodes, roots)
}

fn dirty_and_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("dirty_and_evaluate");

    for &(layers, width) in &[(8, 8), (16, 16), (32, 8)] {
        let (mut graph, mut nodes, roots) = layered(layers, width);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{layers}x{width}")),
            &roots,
            |b, roots| {
                b.iter(|| {
                    graph
                        .dirty_node(&mut nodes, roots[0], GraphDirection::Downstream)
                        .expect("root is in the arena");
                    black_box(graph.evaluate_graph(&mut nodes, true))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, dirty_and_evaluate);
criterion_main!(benches);
