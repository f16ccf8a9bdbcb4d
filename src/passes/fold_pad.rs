//! Pad folding pass
//!
//! At opset 11 the exporter emits padding as a standalone `Pad` node with the
//! pad amounts in a constant second input:
//!
//! ```text
//!   Pad(x, pads, value) -> Conv(w)
//! ```
//!
//! TensorRT expects the padding on the convolution itself, so the spatial pad
//! amounts are added into the consumer's `pads` attribute and the `Pad` node
//! is removed:
//!
//! ```text
//!   Conv(x, w) with pads += spatial(pads)
//! ```
//!
//! Only zero-filled constant-mode pads that touch no batch or channel axis
//! are folded; anything else would change the result and is left alone.

use log::{debug, warn};

use crate::error::{ConvertError, ConvertResult};
use crate::graph::GraphContext;
use crate::passes::common::{
    get_constant_tensor, set_attr_ints, RewritePass, RewriteResult,
};
use crate::pattern::{PatternMatcher, PAD_CONV, PAD_CONV_TRANSPOSE};
use crate::tensor::convert::tensor_to_array_i64;

/// Folds standalone Pad nodes into the convolution they feed
#[derive(Debug, Default)]
pub struct FoldPad;

impl FoldPad {
    /// Create a new FoldPad pass
    pub fn new() -> Self {
        Self
    }

    /// Extract the pad amounts from a Pad node, if statically known
    fn pad_amounts(&self, ctx: &GraphContext, pad_name: &str) -> ConvertResult<Option<Vec<i64>>> {
        let pad_node = ctx
            .node(pad_name)
            .ok_or_else(|| ConvertError::InvalidNode(pad_name.to_string()))?;

        // Opset 11 carries pads in input[1]; earlier opsets in an attribute
        if pad_node.input.len() >= 2 {
            match get_constant_tensor(ctx, &pad_node.input[1]) {
                Some(tensor) => {
                    let array = tensor_to_array_i64(tensor)?;
                    Ok(Some(array.iter().copied().collect()))
                }
                None => Ok(None), // dynamic pads
            }
        } else {
            Ok(pad_node.attr_ints("pads").map(|p| p.to_vec()))
        }
    }

    /// Check the optional constant fill value is zero
    fn fill_is_zero(&self, ctx: &GraphContext, pad_name: &str) -> bool {
        let Some(pad_node) = ctx.node(pad_name) else {
            return false;
        };

        let Some(value_input) = pad_node.input.get(2).filter(|s| !s.is_empty()) else {
            return true; // missing input defaults to 0
        };

        match get_constant_tensor(ctx, value_input) {
            Some(tensor) => {
                tensor.float_data.iter().all(|&v| v == 0.0)
                    && tensor.int64_data.iter().all(|&v| v == 0)
                    && tensor.int32_data.iter().all(|&v| v == 0)
                    && tensor.raw_data.iter().all(|&b| b == 0)
            }
            None => false, // dynamic fill value
        }
    }

    fn fold_pair(
        &self,
        ctx: &mut GraphContext,
        pad_name: &str,
        conv_name: &str,
    ) -> ConvertResult<bool> {
        let pad_node = ctx
            .node(pad_name)
            .ok_or_else(|| ConvertError::InvalidNode(pad_name.to_string()))?;

        let mode = pad_node.attr_bytes("mode").unwrap_or(b"constant");
        if mode != b"constant" {
            return Ok(false);
        }

        let data_input = match pad_node.input.first() {
            Some(name) if !name.is_empty() => name.clone(),
            _ => return Ok(false),
        };

        if !self.fill_is_zero(ctx, pad_name) {
            return Ok(false);
        }

        let Some(pads) = self.pad_amounts(ctx, pad_name)? else {
            return Ok(false);
        };

        // Pad lists begins for every axis, then ends: [x1_b, .., xn_b, x1_e, .., xn_e]
        if pads.len() % 2 != 0 || pads.len() < 6 {
            return Ok(false);
        }
        let rank = pads.len() / 2;
        let spatial_rank = rank - 2;

        // Batch and channel axes must be untouched
        if pads[0] != 0 || pads[1] != 0 || pads[rank] != 0 || pads[rank + 1] != 0 {
            return Ok(false);
        }

        let conv_node = ctx
            .node(conv_name)
            .ok_or_else(|| ConvertError::InvalidNode(conv_name.to_string()))?;

        // Conv pads cover spatial axes only: [x1_b..xn_b, x1_e..xn_e]
        let mut conv_pads = conv_node
            .attr_ints("pads")
            .map(|p| p.to_vec())
            .unwrap_or_else(|| vec![0; 2 * spatial_rank]);

        if conv_pads.len() != 2 * spatial_rank {
            return Ok(false);
        }

        for i in 0..spatial_rank {
            conv_pads[i] += pads[2 + i];
            conv_pads[spatial_rank + i] += pads[rank + 2 + i];
        }

        if let Some(conv) = ctx.node_mut(conv_name) {
            set_attr_ints(conv, "pads", conv_pads);
        }
        ctx.rewire_input(conv_name, 0, &data_input);
        ctx.remove_node(pad_name);

        debug!("folded pad {} into {}", pad_name, conv_name);
        Ok(true)
    }
}

impl RewritePass for FoldPad {
    fn name(&self) -> &'static str {
        "FoldPad"
    }

    fn apply(&self, ctx: &mut GraphContext) -> ConvertResult<RewriteResult> {
        let mut result = RewriteResult::new();

        loop {
            let matches: Vec<(String, String)> = {
                let matcher = PatternMatcher::new(ctx);
                [PAD_CONV, PAD_CONV_TRANSPOSE]
                    .iter()
                    .flat_map(|pattern| matcher.find_all(pattern))
                    .filter(|m| matcher.is_exclusive_edge(m.nodes[1], m.nodes[0]))
                    .map(|m| (m.nodes[1].name.clone(), m.nodes[0].name.clone()))
                    .collect()
            };

            if matches.is_empty() {
                break;
            }

            let mut any_folded = false;
            for (pad_name, conv_name) in matches {
                if !ctx.has_node(&pad_name) || !ctx.has_node(&conv_name) {
                    continue;
                }

                result.matched += 1;
                if self.fold_pair(ctx, &pad_name, &conv_name)? {
                    result.record_collapse(1);
                    any_folded = true;
                } else {
                    warn!("pad {} cannot be folded into {}, leaving it", pad_name, conv_name);
                    result.skipped += 1;
                }
            }

            if !any_folded {
                break;
            }
        }

        Ok(result)
    }

    fn is_applicable(&self, ctx: &GraphContext) -> bool {
        ctx.nodes().any(|n| n.op_type == "Pad")
    }
}
