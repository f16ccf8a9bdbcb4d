//! Graph cleanup and topological ordering
//!
//! After the rewrite passes, the graph contains nodes whose outputs nothing
//! consumes anymore (the size-computation chains, orphaned constants) and a
//! node order that no longer lists producers before consumers. Cleanup
//! removes everything not reachable from a graph output, re-sorts the rest,
//! and drops initializers and value_info no surviving node references.
//!
//! Both steps are idempotent: running cleanup on an already-clean graph
//! returns it unchanged.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};

use rustc_hash::FxHashMap;

use crate::error::{ConvertError, ConvertResult};
use crate::proto::GraphProto;

/// Statistics from a cleanup run
#[derive(Debug, Default, Clone)]
pub struct CleanupStats {
    /// Number of nodes removed as unreachable
    pub nodes_removed: usize,
    /// Number of initializers removed
    pub initializers_removed: usize,
    /// Number of value_info entries removed
    pub value_info_removed: usize,
}

/// Remove every node not backward-reachable from a graph output
///
/// Returns the number of nodes removed.
pub fn prune_unreachable(graph: &mut GraphProto) -> usize {
    let producer_of: FxHashMap<&str, usize> = graph
        .node
        .iter()
        .enumerate()
        .flat_map(|(i, n)| n.output.iter().map(move |o| (o.as_str(), i)))
        .collect();

    let mut reachable = vec![false; graph.node.len()];
    let mut queue: VecDeque<usize> = graph
        .output
        .iter()
        .filter_map(|vi| producer_of.get(vi.name.as_str()).copied())
        .collect();

    while let Some(i) = queue.pop_front() {
        if std::mem::replace(&mut reachable[i], true) {
            continue;
        }
        for input in &graph.node[i].input {
            if let Some(&producer) = producer_of.get(input.as_str()) {
                if !reachable[producer] {
                    queue.push_back(producer);
                }
            }
        }
    }

    let before = graph.node.len();
    let mut keep = reachable.into_iter();
    graph.node.retain(|_| keep.next().unwrap_or(false));
    before - graph.node.len()
}

/// Re-order nodes so every producer precedes its consumers
///
/// Kahn's algorithm with ready nodes taken in original-index order, so an
/// already-sorted graph comes back unchanged. A cycle is a malformed model
/// and fails the conversion.
pub fn toposort(graph: &mut GraphProto) -> ConvertResult<()> {
    let producer_of: FxHashMap<&str, usize> = graph
        .node
        .iter()
        .enumerate()
        .flat_map(|(i, n)| n.output.iter().map(move |o| (o.as_str(), i)))
        .collect();

    let mut indegree = vec![0usize; graph.node.len()];
    let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); graph.node.len()];

    for (i, node) in graph.node.iter().enumerate() {
        for input in &node.input {
            if let Some(&producer) = producer_of.get(input.as_str()) {
                if producer != i {
                    indegree[i] += 1;
                    consumers[producer].push(i);
                }
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(graph.node.len());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for &consumer in &consumers[i] {
            indegree[consumer] -= 1;
            if indegree[consumer] == 0 {
                ready.push(Reverse(consumer));
            }
        }
    }

    if order.len() != graph.node.len() {
        let stuck = indegree
            .iter()
            .position(|&d| d > 0)
            .map(|i| graph.node[i].name.clone())
            .unwrap_or_default();
        return Err(ConvertError::GraphCycle(stuck));
    }

    let mut position = vec![0usize; order.len()];
    for (rank, &i) in order.iter().enumerate() {
        position[i] = rank;
    }

    let mut indexed: Vec<_> = std::mem::take(&mut graph.node).into_iter().enumerate().collect();
    indexed.sort_by_key(|&(i, _)| position[i]);
    graph.node = indexed.into_iter().map(|(_, n)| n).collect();

    Ok(())
}

/// Remove initializers no node references
pub fn remove_unused_initializers(graph: &mut GraphProto) -> usize {
    let used: HashSet<String> = graph
        .node
        .iter()
        .flat_map(|n| n.input.iter().cloned())
        .collect();

    let before = graph.initializer.len();
    graph.initializer.retain(|t| used.contains(&t.name));
    before - graph.initializer.len()
}

/// Remove value_info entries for tensors that no longer exist
///
/// Graph inputs and outputs keep their own lists and are untouched.
pub fn remove_unused_value_info(graph: &mut GraphProto) -> usize {
    let mut used: HashSet<String> = HashSet::new();
    for node in &graph.node {
        used.extend(node.input.iter().cloned());
        used.extend(node.output.iter().cloned());
    }

    let before = graph.value_info.len();
    graph.value_info.retain(|vi| used.contains(&vi.name));
    before - graph.value_info.len()
}

/// Full cleanup: prune, toposort, drop unused initializers and value_info
pub fn cleanup_graph(graph: &mut GraphProto) -> ConvertResult<CleanupStats> {
    let nodes_removed = prune_unreachable(graph);
    toposort(graph)?;
    let initializers_removed = remove_unused_initializers(graph);
    let value_info_removed = remove_unused_value_info(graph);

    Ok(CleanupStats {
        nodes_removed,
        initializers_removed,
        value_info_removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::make_node;
    use crate::proto::{TensorProto, ValueInfoProto};

    fn make_graph_with_orphans() -> GraphProto {
        GraphProto {
            node: vec![
                make_node("Conv", &["X", "W"], &["conv_out"], "conv_0"),
                make_node("Shape", &["X"], &["dims"], "shape_0"), // orphaned
                make_node("Relu", &["conv_out"], &["Y"], "relu_0"),
            ],
            input: vec![ValueInfoProto {
                name: "X".to_string(),
                ..Default::default()
            }],
            output: vec![ValueInfoProto {
                name: "Y".to_string(),
                ..Default::default()
            }],
            initializer: vec![
                TensorProto {
                    name: "W".to_string(),
                    ..Default::default()
                },
                TensorProto {
                    name: "stale".to_string(),
                    ..Default::default()
                },
            ],
            value_info: vec![
                ValueInfoProto {
                    name: "conv_out".to_string(),
                    ..Default::default()
                },
                ValueInfoProto {
                    name: "dims".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_prune_unreachable() {
        let mut graph = make_graph_with_orphans();

        let removed = prune_unreachable(&mut graph);

        assert_eq!(removed, 1);
        assert!(graph.node.iter().all(|n| n.name != "shape_0"));
        assert_eq!(graph.node.len(), 2);
    }

    #[test]
    fn test_toposort_reorders() {
        let mut graph = GraphProto {
            node: vec![
                make_node("Relu", &["conv_out"], &["Y"], "relu_0"),
                make_node("Conv", &["X", "W"], &["conv_out"], "conv_0"),
            ],
            ..Default::default()
        };

        toposort(&mut graph).unwrap();

        let names: Vec<_> = graph.node.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["conv_0", "relu_0"]);
    }

    #[test]
    fn test_toposort_detects_cycle() {
        let mut graph = GraphProto {
            node: vec![
                make_node("Add", &["b"], &["a"], "n0"),
                make_node("Add", &["a"], &["b"], "n1"),
            ],
            ..Default::default()
        };

        assert!(matches!(
            toposort(&mut graph),
            Err(ConvertError::GraphCycle(_))
        ));
    }

    #[test]
    fn test_cleanup_idempotent() {
        let mut graph = make_graph_with_orphans();

        cleanup_graph(&mut graph).unwrap();
        let once = graph.clone();

        let stats = cleanup_graph(&mut graph).unwrap();

        assert_eq!(stats.nodes_removed, 0);
        assert_eq!(stats.initializers_removed, 0);
        assert_eq!(stats.value_info_removed, 0);
        assert_eq!(graph, once);
    }

    #[test]
    fn test_cleanup_removes_unused_support_tensors() {
        let mut graph = make_graph_with_orphans();

        let stats = cleanup_graph(&mut graph).unwrap();

        assert_eq!(stats.nodes_removed, 1);
        assert_eq!(stats.initializers_removed, 1);
        assert_eq!(stats.value_info_removed, 1);
        assert!(graph.initializer.iter().all(|t| t.name == "W"));
        assert!(graph.value_info.iter().all(|vi| vi.name == "conv_out"));
    }

    #[test]
    fn test_all_nodes_reach_output_after_cleanup() {
        let mut graph = make_graph_with_orphans();
        cleanup_graph(&mut graph).unwrap();

        // Walk back from the output and check every node is visited
        let mut live: HashSet<String> = graph.output.iter().map(|o| o.name.clone()).collect();
        for node in graph.node.iter().rev() {
            if node.output.iter().any(|o| live.contains(o)) {
                live.extend(node.input.iter().cloned());
            } else {
                panic!("node {} does not reach any output", node.name);
            }
        }
    }

    #[test]
    fn test_parallel_branches_keep_valid_order() {
        let mut graph = GraphProto {
            node: vec![
                make_node("Concat", &["a", "b"], &["Y"], "concat_0"),
                make_node("Relu", &["X"], &["a"], "relu_a"),
                make_node("Sigmoid", &["X"], &["b"], "relu_b"),
            ],
            output: vec![ValueInfoProto {
                name: "Y".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };

        toposort(&mut graph).unwrap();

        let pos: FxHashMap<&str, usize> = graph
            .node
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.as_str(), i))
            .collect();
        assert!(pos["relu_a"] < pos["concat_0"]);
        assert!(pos["relu_b"] < pos["concat_0"]);
    }
}
