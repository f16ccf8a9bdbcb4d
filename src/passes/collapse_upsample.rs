//! Upsample subgraph collapse pass
//!
//! `F.interpolate(scale_factor=s)` exports at opset 11 as a size-computation
//! subgraph feeding the Resize node's `sizes` input:
//!
//! ```text
//!   x ──┬─────────────────────────────► Resize(x, roi, scales, sizes) ─► y
//!       └─► Shape ─► Slice ─► Concat ──────────────────────┘
//!                               ▲
//!                     constant spatial sizes
//! ```
//!
//! The TensorRT converter wants one node with an explicit scale factor, so
//! the whole subgraph is replaced by:
//!
//! ```text
//!   Resize(x) with scales=[sh, sw] and the original mode
//! ```
//!
//! The scale factor is `target_size / input_size` per spatial axis, which
//! requires both the Concat's size operand and the data tensor's spatial
//! shape to be statically known. A match where either is dynamic is skipped
//! with a warning; guessing a scale would silently change the network.
//!
//! At opset 9 the anchor op is `Upsample` carrying a constant `scales`
//! input, which collapses to the same single-node form.

use log::{debug, warn};

use crate::error::ConvertResult;
use crate::graph::GraphContext;
use crate::passes::common::{
    floats_attr, get_constant_tensor, str_attr, RewritePass, RewriteResult,
};
use crate::pattern::{resize_anchor_op, PatternMatcher, RESIZE_SIZES_CHAIN};
use crate::proto::extensions::make_node;
use crate::tensor::convert::{tensor_to_array_f32, tensor_to_array_i64};
use crate::tensor::shape::spatial_dims;

/// Collapses exporter-generated upsample subgraphs into single resize nodes
#[derive(Debug)]
pub struct CollapseUpsample {
    opset: i64,
}

/// One collapsible upsample subgraph, fully resolved
#[derive(Debug)]
struct UpsampleMatch {
    /// Nodes to delete, anchor first
    doomed: Vec<String>,
    /// Data tensor feeding the subgraph
    data: String,
    /// Output tensor of the anchor node
    output: String,
    /// Interpolation mode carried over from the anchor
    mode: Vec<u8>,
    /// Per-spatial-axis scale factor
    scales: Vec<f32>,
}

impl CollapseUpsample {
    /// Create a new pass for the given opset
    pub fn new(opset: i64) -> Self {
        Self { opset }
    }

    /// Resolve a Resize anchor whose sizes input is computed by the
    /// Shape → Slice → Concat chain (opset 11 form)
    fn resolve_sizes_chain(&self, ctx: &GraphContext, anchor_name: &str) -> Option<UpsampleMatch> {
        let anchor = ctx.node(anchor_name)?;
        let data = anchor.input.first().filter(|s| !s.is_empty())?.clone();
        let sizes = anchor.input.get(3).filter(|s| !s.is_empty())?;

        let concat = ctx.producer_of(sizes)?;
        let matcher = PatternMatcher::new(ctx);
        let chain = matcher.match_chain(concat, RESIZE_SIZES_CHAIN)?;
        let (concat, slice, shape) = (chain.nodes[0], chain.nodes[1], chain.nodes[2]);

        // The chain must measure the tensor being resized
        if shape.input.first() != Some(&data) {
            return None;
        }

        // Every intermediate must be private to the subgraph
        if !matcher.is_exclusive_edge(shape, slice)
            || !matcher.is_exclusive_edge(slice, concat)
            || !matcher.is_exclusive_edge(concat, anchor)
        {
            return None;
        }

        // Concat appends the constant target spatial sizes to the N,C dims
        if concat.input.len() != 2 {
            return None;
        }
        let sizes_tensor = get_constant_tensor(ctx, &concat.input[1])?;
        let target: Vec<i64> = tensor_to_array_i64(sizes_tensor)
            .ok()?
            .iter()
            .copied()
            .collect();

        let input_shape = ctx.tensor_shape(&data)?;
        let input_spatial = spatial_dims(&input_shape)?;

        if target.len() != input_spatial.len() || target.iter().any(|&d| d <= 0) {
            return None;
        }

        let scales: Vec<f32> = target
            .iter()
            .zip(input_spatial)
            .map(|(&t, &i)| t as f32 / i as f32)
            .collect();

        Some(UpsampleMatch {
            doomed: vec![
                anchor.name.clone(),
                concat.name.clone(),
                slice.name.clone(),
                shape.name.clone(),
            ],
            data,
            output: anchor.output.first()?.clone(),
            mode: anchor.attr_bytes("mode").unwrap_or(b"nearest").to_vec(),
            scales,
        })
    }

    /// Resolve an Upsample anchor with a constant scales input (opset 9 form)
    fn resolve_scales_input(&self, ctx: &GraphContext, anchor_name: &str) -> Option<UpsampleMatch> {
        let anchor = ctx.node(anchor_name)?;
        let data = anchor.input.first().filter(|s| !s.is_empty())?.clone();
        let scales_input = anchor.input.get(1).filter(|s| !s.is_empty())?;

        let scales_tensor = get_constant_tensor(ctx, scales_input)?;
        let full: Vec<f32> = tensor_to_array_f32(scales_tensor)
            .ok()?
            .iter()
            .copied()
            .collect();

        // Full-rank scales [1, 1, sh, sw]; batch and channel must stay 1
        if full.len() < 3 || full[0] != 1.0 || full[1] != 1.0 {
            return None;
        }

        Some(UpsampleMatch {
            doomed: vec![anchor.name.clone()],
            data,
            output: anchor.output.first()?.clone(),
            mode: anchor.attr_bytes("mode").unwrap_or(b"nearest").to_vec(),
            scales: full[2..].to_vec(),
        })
    }

    fn resolve(&self, ctx: &GraphContext, anchor_name: &str) -> Option<UpsampleMatch> {
        if self.opset >= 11 {
            self.resolve_sizes_chain(ctx, anchor_name)
        } else {
            self.resolve_scales_input(ctx, anchor_name)
        }
    }
}

impl RewritePass for CollapseUpsample {
    fn name(&self) -> &'static str {
        "CollapseUpsample"
    }

    fn apply(&self, ctx: &mut GraphContext) -> ConvertResult<RewriteResult> {
        let mut result = RewriteResult::new();
        let anchor_op = resize_anchor_op(self.opset);

        let anchors: Vec<String> = ctx
            .nodes_with_op(anchor_op)
            .map(|n| n.name.clone())
            .collect();

        for (i, anchor_name) in anchors.iter().enumerate() {
            if !ctx.has_node(anchor_name) {
                continue;
            }
            result.matched += 1;

            let Some(m) = self.resolve(ctx, anchor_name) else {
                warn!(
                    "upsample at {} has no statically known scale factor, leaving it",
                    anchor_name
                );
                result.skipped += 1;
                continue;
            };

            let mut name = format!("upsample_{}", i);
            while ctx.has_node(&name) {
                name.push('_');
            }

            let mut node = make_node(anchor_op, &[&m.data], &[&m.output], &name);
            node.attribute.push(str_attr("mode", &m.mode));
            node.attribute.push(floats_attr("scales", &m.scales));

            let removed = m.doomed.len();
            for doomed in &m.doomed {
                ctx.remove_node(doomed);
            }
            ctx.insert_node(node);

            debug!(
                "collapsed upsample at {} with scales {:?}",
                anchor_name, m.scales
            );
            result.record_collapse(removed);
        }

        Ok(result)
    }

    fn is_applicable(&self, ctx: &GraphContext) -> bool {
        let anchor_op = resize_anchor_op(self.opset);
        ctx.nodes().any(|n| n.op_type == anchor_op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::{make_node, make_tensor_value_info};
    use crate::proto::{GraphProto, ValueInfoProto};
    use crate::tensor::{vec_to_tensor_f32, vec_to_tensor_i64};

    /// The exported form of a 2x nearest upsample of a 192x640 feature map
    fn make_upsample_graph() -> GraphProto {
        let mut resize = make_node(
            "Resize",
            &["X", "", "", "size_out"],
            &["Y"],
            "resize_0",
        );
        resize.attribute.push(str_attr("mode", b"nearest"));

        GraphProto {
            node: vec![
                make_node("Shape", &["X"], &["dims"], "shape_0"),
                make_node("Slice", &["dims", "starts", "ends"], &["nc"], "slice_0"),
                make_node("Concat", &["nc", "target_hw"], &["size_out"], "concat_0"),
                resize,
            ],
            input: vec![make_tensor_value_info("X", &[1, 3, 192, 640])],
            output: vec![ValueInfoProto {
                name: "Y".to_string(),
                ..Default::default()
            }],
            initializer: vec![
                vec_to_tensor_i64(&[0], "starts"),
                vec_to_tensor_i64(&[2], "ends"),
                vec_to_tensor_i64(&[384, 1280], "target_hw"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_collapse_to_single_resize() {
        let graph = make_upsample_graph();
        let mut ctx = GraphContext::new(&graph);

        let result = CollapseUpsample::new(11).apply(&mut ctx).unwrap();

        assert_eq!(result.applied, 1);
        assert_eq!(result.nodes_removed, 4);
        assert_eq!(ctx.node_count(), 1);

        let node = ctx.nodes().next().unwrap();
        assert_eq!(node.op_type, "Resize");
        assert_eq!(node.input, vec!["X"]);
        assert_eq!(node.output, vec!["Y"]);
        assert_eq!(node.attr_bytes("mode"), Some(&b"nearest"[..]));

        let scales = &node.get_attribute("scales").unwrap().floats;
        assert_eq!(scales, &vec![2.0, 2.0]);
    }

    #[test]
    fn test_boundary_tensors_preserved() {
        let graph = make_upsample_graph();
        let mut ctx = GraphContext::new(&graph);

        CollapseUpsample::new(11).apply(&mut ctx).unwrap();

        assert!(ctx.is_graph_output("Y"));
        assert_eq!(ctx.producer_of("Y").unwrap().input[0], "X");
    }

    #[test]
    fn test_no_op_without_pattern() {
        let graph = GraphProto {
            node: vec![
                make_node("Conv", &["X", "W"], &["conv_out"], "conv_0"),
                make_node("Relu", &["conv_out"], &["Y"], "relu_0"),
            ],
            output: vec![ValueInfoProto {
                name: "Y".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut ctx = GraphContext::new(&graph);

        let pass = CollapseUpsample::new(11);
        assert!(!pass.is_applicable(&ctx));

        let result = pass.apply(&mut ctx).unwrap();
        assert_eq!(result.applied, 0);
        assert_eq!(ctx.node_count(), 2);
    }

    #[test]
    fn test_dynamic_input_shape_skipped() {
        let mut graph = make_upsample_graph();
        // Height unknown at export time
        graph.input[0] = make_tensor_value_info("X", &[1, 3, -1, 640]);

        let mut ctx = GraphContext::new(&graph);
        let result = CollapseUpsample::new(11).apply(&mut ctx).unwrap();

        assert_eq!(result.applied, 0);
        assert_eq!(result.skipped, 1);
        assert_eq!(ctx.node_count(), 4);
    }

    #[test]
    fn test_dynamic_target_sizes_skipped() {
        let mut graph = make_upsample_graph();
        // Target sizes produced by some upstream node instead of a constant
        graph.initializer.retain(|t| t.name != "target_hw");
        graph
            .node
            .insert(0, make_node("Mul", &["a", "b"], &["target_hw"], "mul_0"));

        let mut ctx = GraphContext::new(&graph);
        let result = CollapseUpsample::new(11).apply(&mut ctx).unwrap();

        assert_eq!(result.applied, 0);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_shared_intermediate_skipped() {
        let mut graph = make_upsample_graph();
        // Something else inspects the Shape output
        graph
            .node
            .push(make_node("Cast", &["dims"], &["dims_f"], "cast_0"));

        let mut ctx = GraphContext::new(&graph);
        let result = CollapseUpsample::new(11).apply(&mut ctx).unwrap();

        assert_eq!(result.applied, 0);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_multiple_matches_collapse_independently() {
        let mut graph = make_upsample_graph();

        let mut resize = make_node(
            "Resize",
            &["X2", "", "", "size_out2"],
            &["Y2"],
            "resize_1",
        );
        resize.attribute.push(str_attr("mode", b"nearest"));
        graph.node.extend(vec![
            make_node("Shape", &["X2"], &["dims2"], "shape_1"),
            make_node("Slice", &["dims2", "starts", "ends"], &["nc2"], "slice_1"),
            make_node("Concat", &["nc2", "target_hw2"], &["size_out2"], "concat_1"),
            resize,
        ]);
        graph.input.push(make_tensor_value_info("X2", &[1, 3, 96, 320]));
        graph.output.push(ValueInfoProto {
            name: "Y2".to_string(),
            ..Default::default()
        });
        graph
            .initializer
            .push(vec_to_tensor_i64(&[192, 640], "target_hw2"));

        let mut ctx = GraphContext::new(&graph);
        let result = CollapseUpsample::new(11).apply(&mut ctx).unwrap();

        assert_eq!(result.applied, 2);
        assert_eq!(ctx.node_count(), 2);
    }

    #[test]
    fn test_opset9_constant_scales() {
        let mut upsample = make_node("Upsample", &["X", "scales_const"], &["Y"], "upsample_0");
        upsample.attribute.push(str_attr("mode", b"nearest"));

        let graph = GraphProto {
            node: vec![upsample],
            input: vec![make_tensor_value_info("X", &[1, 3, 192, 640])],
            output: vec![ValueInfoProto {
                name: "Y".to_string(),
                ..Default::default()
            }],
            initializer: vec![vec_to_tensor_f32(&[1.0, 1.0, 2.0, 2.0], "scales_const")],
            ..Default::default()
        };

        let mut ctx = GraphContext::new(&graph);
        let result = CollapseUpsample::new(9).apply(&mut ctx).unwrap();

        assert_eq!(result.applied, 1);
        let node = ctx.nodes().next().unwrap();
        assert_eq!(node.op_type, "Upsample");
        assert_eq!(node.input, vec!["X"]);
        assert_eq!(node.get_attribute("scales").unwrap().floats, vec![2.0, 2.0]);
    }
}
