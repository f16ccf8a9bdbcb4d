//! # PackNet ONNX post-processor
//!
//! Rewrites the ONNX export of the PackNet monocular depth-estimation model
//! so a TensorRT-style runtime can execute it through custom plugins.
//!
//! The exporter lowers upsampling and group normalization into chains of
//! primitive nodes. This crate loads the exported model, collapses those
//! chains back into single nodes, folds standalone `Pad` nodes into their
//! consuming convolutions, prunes unreachable nodes, and re-sorts the graph
//! topologically before saving it back.
//!
//! ## Example
//!
//! ```ignore
//! use packnet_onnx::prelude::*;
//!
//! let stats = post_process_file("model.onnx", &PostProcessOptions::default())?;
//! println!("collapsed {} subgraphs", stats.rewrites.applied);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod builder;
pub mod error;
pub mod graph;
pub mod io;
pub mod passes;
pub mod pattern;
pub mod proto;
pub mod tensor;

/// Prelude module - import commonly used types with `use packnet_onnx::prelude::*`
pub mod prelude {
    pub use crate::builder::{build_model, cleanup_graph, CleanupStats};
    pub use crate::error::{ConvertError, ConvertResult};
    pub use crate::graph::GraphContext;
    pub use crate::io::{
        load_model, post_process_file, post_process_model, save_model, PostProcessOptions,
        PostProcessStats,
    };
    pub use crate::passes::{PostProcessPipeline, RewritePass, RewriteResult};
    pub use crate::pattern::{ChainMatch, PatternMatcher};
    pub use crate::proto::onnx::*;
}

pub use error::{ConvertError, ConvertResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Opset the exporter targets by default
pub const DEFAULT_OPSET: i64 = 11;

/// Oldest opset this tool knows how to rewrite
pub const SUPPORTED_OPSET_MIN: i64 = 9;
/// Newest opset this tool knows how to rewrite
pub const SUPPORTED_OPSET_MAX: i64 = 11;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_opset_range() {
        assert!(SUPPORTED_OPSET_MIN <= DEFAULT_OPSET);
        assert!(DEFAULT_OPSET <= SUPPORTED_OPSET_MAX);
    }
}
