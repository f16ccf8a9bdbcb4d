//! Model I/O and the post-processing driver
//!
//! Loading, saving, validation, and the one-shot entry points that run the
//! whole pipeline over a file or an in-memory model.
//!
//! # Example
//!
//! ```ignore
//! use packnet_onnx::io::{post_process_file, PostProcessOptions};
//!
//! let stats = post_process_file("model.onnx", &PostProcessOptions::default())?;
//! println!("removed {} nodes", stats.nodes_removed());
//! ```

pub mod reader;
pub mod validation;
pub mod writer;

pub use reader::{decode_model, load_model, ModelInfo};
pub use validation::{ensure_valid, is_opset_supported, validate, ValidationReport};
pub use writer::{model_to_bytes, save_model};

use std::path::Path;

use log::{info, warn};

use crate::builder::{build_model_with_stats, CleanupStats};
use crate::error::{ConvertError, ConvertResult};
use crate::graph::GraphContext;
use crate::passes::{PostProcessPipeline, RewriteResult};
use crate::proto::ModelProto;
use crate::{DEFAULT_OPSET, SUPPORTED_OPSET_MAX, SUPPORTED_OPSET_MIN};

/// Post-processing options
#[derive(Debug, Clone)]
pub struct PostProcessOptions {
    /// Opset version the model was exported with
    pub opset: i64,
    /// Validate the model before rewriting
    pub validate_input: bool,
    /// Validate the model after rewriting
    pub validate_output: bool,
}

impl Default for PostProcessOptions {
    fn default() -> Self {
        Self {
            opset: DEFAULT_OPSET,
            validate_input: true,
            validate_output: true,
        }
    }
}

/// Post-processing statistics
#[derive(Debug, Clone, Default)]
pub struct PostProcessStats {
    /// Node count before rewriting
    pub original_nodes: usize,
    /// Node count after rewriting and cleanup
    pub final_nodes: usize,
    /// Rewrite pass statistics
    pub rewrites: RewriteResult,
    /// Cleanup statistics
    pub cleanup: CleanupStats,
}

impl PostProcessStats {
    /// Total nodes removed by rewrites and cleanup
    pub fn nodes_removed(&self) -> usize {
        self.original_nodes.saturating_sub(self.final_nodes)
    }
}

/// Post-process an in-memory model
///
/// Runs the rewrite pipeline and rebuilds the model with a clean,
/// topologically sorted graph.
pub fn post_process_model(
    model: &ModelProto,
    options: &PostProcessOptions,
) -> ConvertResult<(ModelProto, PostProcessStats)> {
    if !is_opset_supported(options.opset) {
        return Err(ConvertError::UnsupportedOpset {
            version: options.opset,
            min: SUPPORTED_OPSET_MIN,
            max: SUPPORTED_OPSET_MAX,
        });
    }

    if options.validate_input {
        ensure_valid(model)?;
    }

    if let Some(declared) = model.opset_version() {
        if declared != options.opset {
            warn!(
                "model declares opset {} but post-processing targets opset {}",
                declared, options.opset
            );
        }
    }

    let graph = model
        .graph
        .as_ref()
        .ok_or_else(|| ConvertError::MissingField("model.graph".to_string()))?;
    let original_nodes = graph.node.len();

    let mut ctx = GraphContext::new(graph);
    let rewrites = PostProcessPipeline::new(options.opset).run(&mut ctx)?;

    let (rewritten, cleanup) = build_model_with_stats(&ctx, model)?;

    if options.validate_output {
        ensure_valid(&rewritten)?;
    }

    let final_nodes = rewritten.graph.as_ref().map(|g| g.node.len()).unwrap_or(0);
    Ok((
        rewritten,
        PostProcessStats {
            original_nodes,
            final_nodes,
            rewrites,
            cleanup,
        },
    ))
}

/// Post-process an exported model file in place
///
/// This is the main entry point: the file the exporter wrote is loaded,
/// rewritten, and saved back to the same path.
pub fn post_process_file<P: AsRef<Path>>(
    path: P,
    options: &PostProcessOptions,
) -> ConvertResult<PostProcessStats> {
    let path = path.as_ref();

    let model = load_model(path)?;
    let (rewritten, stats) = post_process_model(&model, options)?;
    save_model(&rewritten, path)?;

    info!(
        "rewrote {}: {} -> {} nodes ({} subgraphs collapsed, {} skipped)",
        path.display(),
        stats.original_nodes,
        stats.final_nodes,
        stats.rewrites.applied,
        stats.rewrites.skipped
    );

    Ok(stats)
}
