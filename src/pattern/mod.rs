//! Structural pattern matching
//!
//! [`PatternMatcher`] walks linear op-type chains backwards from an anchor
//! node; [`ops`] lists the fixed chains the rewrite passes look for.

pub mod matcher;
pub mod ops;

pub use matcher::{ChainMatch, PatternMatcher};
pub use ops::{resize_anchor_op, GROUP_NORM, PAD_CONV, PAD_CONV_TRANSPOSE, RESIZE_SIZES_CHAIN};
