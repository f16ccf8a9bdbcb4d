//! Node patterns recognized by the rewrite passes
//!
//! All patterns are matched structurally, by op type and adjacency; node
//! names never participate in matching.

/// Pad feeding a Conv (reverse order: anchor first)
pub const PAD_CONV: &[&str] = &["Conv", "Pad"];

/// Pad feeding a ConvTranspose
pub const PAD_CONV_TRANSPOSE: &[&str] = &["ConvTranspose", "Pad"];

/// The size-computation chain feeding a Resize node's `sizes` input
///
/// `F.interpolate` exports as Shape → Slice → Concat, with the Concat
/// appending the constant target spatial sizes to the sliced N,C dims.
pub const RESIZE_SIZES_CHAIN: &[&str] = &["Concat", "Slice", "Shape"];

/// The decomposed group-normalization chain, anchored on the bias Add
///
/// GroupNorm exports as Reshape → InstanceNormalization → Reshape → Mul → Add,
/// linear along first inputs.
pub const GROUP_NORM: &[&str] = &["Add", "Mul", "Reshape", "InstanceNormalization", "Reshape"];

/// The op that anchors an upsample subgraph at the given opset
///
/// Opset 11 renamed Upsample to Resize and moved the target size into a
/// dedicated `sizes` input.
pub fn resize_anchor_op(opset: i64) -> &'static str {
    if opset >= 11 {
        "Resize"
    } else {
        "Upsample"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_shapes() {
        assert_eq!(PAD_CONV, &["Conv", "Pad"]);
        assert_eq!(GROUP_NORM.len(), 5);
        assert_eq!(GROUP_NORM[0], "Add");
        assert_eq!(RESIZE_SIZES_CHAIN[2], "Shape");
    }

    #[test]
    fn test_resize_anchor_op() {
        assert_eq!(resize_anchor_op(11), "Resize");
        assert_eq!(resize_anchor_op(9), "Upsample");
    }
}
