//! Model assembly and cleanup
//!
//! Turns a mutated [`crate::graph::GraphContext`] back into a `ModelProto`:
//! unreachable nodes are pruned, the node list is re-sorted topologically,
//! and unused initializers and value_info are dropped.

pub mod cleanup;
pub mod model;

pub use cleanup::{
    cleanup_graph, prune_unreachable, remove_unused_initializers, remove_unused_value_info,
    toposort, CleanupStats,
};
pub use model::{build_graph_from_context, build_model, build_model_with_stats};
