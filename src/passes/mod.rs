//! Graph rewrite passes
//!
//! The three rewrites that prepare the exported graph for plugin execution:
//!
//! - [`FoldPad`]: folds standalone `Pad` nodes into their consuming
//!   convolutions (opset 11 emits padding as separate nodes)
//! - [`CollapseUpsample`]: replaces the exporter's size-computation subgraph
//!   with a single resize node carrying an explicit scale factor
//! - [`CollapseGroupNorm`]: replaces the decomposed group-normalization
//!   chain with one opaque plugin node
//!
//! Each pass implements [`RewritePass`] and can be applied individually;
//! [`PostProcessPipeline`] runs them in the required order.

/// Collapse decomposed group normalization
pub mod collapse_group_norm;
/// Collapse upsample subgraphs
pub mod collapse_upsample;
/// Common pass utilities
pub mod common;
/// Fold Pad nodes into convolutions
pub mod fold_pad;

pub use collapse_group_norm::{CollapseGroupNorm, GROUP_NORM_PLUGIN_OP};
pub use collapse_upsample::CollapseUpsample;
pub use common::{
    float_attr, floats_attr, get_constant_tensor, int_attr, ints_attr, set_attr_ints, str_attr,
    RewritePass, RewriteResult,
};
pub use fold_pad::FoldPad;

use log::debug;

use crate::error::ConvertResult;
use crate::graph::GraphContext;

/// The full post-processing pipeline
///
/// Runs the pad fold first (the collapsers assume padding is already
/// normalized), then the two collapsers. The pad fold only applies at
/// opset 11, where the exporter emits standalone Pad nodes.
#[derive(Debug)]
pub struct PostProcessPipeline {
    /// Opset version the model was exported with
    pub opset: i64,
}

impl PostProcessPipeline {
    /// Create a pipeline for the given opset
    pub fn new(opset: i64) -> Self {
        Self { opset }
    }

    /// Run all passes over the graph
    pub fn run(&self, ctx: &mut GraphContext) -> ConvertResult<RewriteResult> {
        let mut total = RewriteResult::new();

        let mut passes: Vec<Box<dyn RewritePass>> = Vec::new();
        if self.opset >= 11 {
            passes.push(Box::new(FoldPad::new()));
        }
        passes.push(Box::new(CollapseUpsample::new(self.opset)));
        passes.push(Box::new(CollapseGroupNorm::new()));

        for pass in &passes {
            if !pass.is_applicable(ctx) {
                continue;
            }
            let result = pass.apply(ctx)?;
            debug!(
                "{}: {} applied, {} skipped, {} nodes removed",
                pass.name(),
                result.applied,
                result.skipped,
                result.nodes_removed
            );
            total.merge(result);
        }

        Ok(total)
    }
}

impl Default for PostProcessPipeline {
    fn default() -> Self {
        Self::new(crate::DEFAULT_OPSET)
    }
}
