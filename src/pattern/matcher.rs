//! Chain matching
//!
//! The subgraphs this tool collapses are all linear chains, so matching
//! walks backwards from an anchor node: each pattern element after the
//! first must be the producer of the previous node's first input.

use crate::graph::GraphContext;
use crate::proto::NodeProto;

/// A successfully matched chain
///
/// `nodes[0]` is the anchor; `nodes.last()` is the earliest node in the
/// graph. Passes index into `nodes` by pattern position.
#[derive(Debug, Clone)]
pub struct ChainMatch<'a> {
    /// Name of the anchor node the walk started from
    pub anchor: &'a str,
    /// Matched nodes, anchor first
    pub nodes: Vec<&'a NodeProto>,
}

/// Walks chains of op types backwards through a graph
pub struct PatternMatcher<'a> {
    ctx: &'a GraphContext,
}

impl<'a> PatternMatcher<'a> {
    /// Create a matcher over the given graph
    pub fn new(ctx: &'a GraphContext) -> Self {
        Self { ctx }
    }

    /// Try to match a chain of op types anchored at `node`
    ///
    /// ```ignore
    /// // Add <- Mul <- Reshape <- InstanceNormalization <- Reshape
    /// let found = matcher.match_chain(add_node, GROUP_NORM);
    /// ```
    pub fn match_chain(&self, node: &'a NodeProto, pattern: &[&str]) -> Option<ChainMatch<'a>> {
        let (&anchor_op, rest) = pattern.split_first()?;
        if node.op_type != anchor_op {
            return None;
        }

        let mut nodes = Vec::with_capacity(pattern.len());
        nodes.push(node);

        for &op_type in rest {
            let prev = self.ctx.prev_node(nodes[nodes.len() - 1])?;
            if prev.op_type != op_type {
                return None;
            }
            nodes.push(prev);
        }

        Some(ChainMatch {
            anchor: &node.name,
            nodes,
        })
    }

    /// All chains in the graph matching the pattern, in graph order of
    /// their anchors
    pub fn find_all(&self, pattern: &[&str]) -> Vec<ChainMatch<'a>> {
        let Some(&anchor_op) = pattern.first() else {
            return Vec::new();
        };

        self.ctx
            .nodes_with_op(anchor_op)
            .filter_map(|node| self.match_chain(node, pattern))
            .collect()
    }

    /// Whether the tensor from `producer` to `consumer` is read only there
    ///
    /// Collapsing across an edge is only safe when the consumer is the sole
    /// observer of the producer's output.
    pub fn is_exclusive_edge(&self, producer: &NodeProto, consumer: &NodeProto) -> bool {
        match producer.output.first() {
            Some(out) if consumer.input.contains(out) => self.ctx.is_single_use(out),
            _ => false,
        }
    }
}
