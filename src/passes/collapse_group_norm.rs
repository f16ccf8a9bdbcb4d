//! Group-normalization subgraph collapse pass
//!
//! `GroupNorm(num_groups, eps)` has no single-op representation before opset
//! 18, so the exporter lowers it through InstanceNormalization:
//!
//! ```text
//!   x ─► Reshape([0, G, -1]) ─► InstanceNormalization(eps)
//!          ─► Reshape ─► Mul(γ) ─► Add(β) ─► y
//! ```
//!
//! The runtime ships a dedicated kernel for this, so the whole chain is
//! replaced with one opaque plugin node:
//!
//! ```text
//!   GroupNormalizationPlugin(x, γ, β) with num_groups and eps
//! ```
//!
//! The group count is read from the leading Reshape's constant target shape;
//! a dynamic target shape means the count cannot be determined and the match
//! is skipped with a warning.

use log::{debug, warn};

use crate::error::ConvertResult;
use crate::graph::GraphContext;
use crate::passes::common::{
    float_attr, get_constant_tensor, int_attr, RewritePass, RewriteResult,
};
use crate::pattern::{PatternMatcher, GROUP_NORM};
use crate::proto::extensions::make_node;
use crate::proto::NodeProto;
use crate::tensor::convert::tensor_to_array_i64;

/// Op type of the emitted plugin node
pub const GROUP_NORM_PLUGIN_OP: &str = "GroupNormalizationPlugin";

/// Collapses decomposed group-normalization chains into plugin nodes
#[derive(Debug, Default)]
pub struct CollapseGroupNorm;

/// One collapsible group-norm chain, fully resolved
#[derive(Debug)]
struct GroupNormMatch {
    /// Chain node names, anchor (Add) first
    doomed: Vec<String>,
    /// Input tensor of the leading Reshape
    input: String,
    /// Scale tensor (γ)
    scale: String,
    /// Bias tensor (β)
    bias: String,
    /// Output tensor of the trailing Add
    output: String,
    /// Number of normalization groups
    num_groups: i64,
    /// Variance epsilon
    eps: f32,
}

impl CollapseGroupNorm {
    /// Create a new CollapseGroupNorm pass
    pub fn new() -> Self {
        Self
    }

    /// The operand of a two-input node that is not the chain tensor
    fn other_operand(node: &NodeProto, chain_tensor: &str) -> Option<String> {
        if node.input.len() != 2 {
            return None;
        }
        if node.input[0] == chain_tensor {
            Some(node.input[1].clone())
        } else if node.input[1] == chain_tensor {
            Some(node.input[0].clone())
        } else {
            None
        }
    }

    fn resolve(&self, ctx: &GraphContext, nodes: &[&NodeProto]) -> Option<GroupNormMatch> {
        let &[add, mul, reshape_back, instnorm, reshape_in] = nodes else {
            return None;
        };

        let matcher = PatternMatcher::new(ctx);
        if !matcher.is_exclusive_edge(reshape_in, instnorm)
            || !matcher.is_exclusive_edge(instnorm, reshape_back)
            || !matcher.is_exclusive_edge(reshape_back, mul)
            || !matcher.is_exclusive_edge(mul, add)
        {
            return None;
        }

        let input = reshape_in.input.first().filter(|s| !s.is_empty())?.clone();

        // num_groups is element 1 of the grouping Reshape's target shape
        let shape_input = reshape_in.input.get(1)?;
        let shape_tensor = get_constant_tensor(ctx, shape_input)?;
        let target: Vec<i64> = tensor_to_array_i64(shape_tensor)
            .ok()?
            .iter()
            .copied()
            .collect();
        let num_groups = *target.get(1).filter(|&&g| g > 0)?;

        let scale = Self::other_operand(mul, reshape_back.output.first()?)?;
        let bias = Self::other_operand(add, mul.output.first()?)?;

        Some(GroupNormMatch {
            doomed: nodes.iter().map(|n| n.name.clone()).collect(),
            input,
            scale,
            bias,
            output: add.output.first()?.clone(),
            num_groups,
            eps: instnorm.attr_float("epsilon", 1e-5),
        })
    }
}

impl RewritePass for CollapseGroupNorm {
    fn name(&self) -> &'static str {
        "CollapseGroupNorm"
    }

    fn apply(&self, ctx: &mut GraphContext) -> ConvertResult<RewriteResult> {
        let mut result = RewriteResult::new();

        let resolved: Vec<Option<GroupNormMatch>> = {
            let matcher = PatternMatcher::new(ctx);
            let matches = matcher.find_all(GROUP_NORM);
            result.matched = matches.len();
            matches.iter().map(|m| self.resolve(ctx, &m.nodes)).collect()
        };

        for (i, m) in resolved.into_iter().enumerate() {
            let Some(m) = m else {
                warn!("group-norm chain {} cannot be statically resolved, leaving it", i);
                result.skipped += 1;
                continue;
            };

            // A later chain may overlap one already rewritten
            if m.doomed.iter().any(|n| !ctx.has_node(n)) {
                result.skipped += 1;
                continue;
            }

            let mut name = format!("group_norm_{}", i);
            while ctx.has_node(&name) {
                name.push('_');
            }

            let mut node = make_node(
                GROUP_NORM_PLUGIN_OP,
                &[&m.input, &m.scale, &m.bias],
                &[&m.output],
                &name,
            );
            node.attribute.push(int_attr("num_groups", m.num_groups));
            node.attribute.push(float_attr("eps", m.eps));

            for doomed in &m.doomed {
                ctx.remove_node(doomed);
            }
            ctx.insert_node(node);

            debug!(
                "collapsed group-norm chain into {} (groups={}, eps={})",
                name, m.num_groups, m.eps
            );
            result.record_collapse(5);
        }

        Ok(result)
    }

    fn is_applicable(&self, ctx: &GraphContext) -> bool {
        ctx.nodes().any(|n| n.op_type == "InstanceNormalization")
    }
}
