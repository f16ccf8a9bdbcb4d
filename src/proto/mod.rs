//! Generated ONNX protobuf types
//!
//! `prost-build` compiles `proto/onnx.proto` (a subset of the upstream ONNX
//! schema) at build time; this module re-exports the generated types and
//! hosts the [`extensions`] helpers on them.

/// Types generated from `proto/onnx.proto`
#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod onnx {
    include!(concat!(env!("OUT_DIR"), "/onnx.rs"));
}

pub use onnx::{
    tensor_shape_proto, type_proto, AttributeProto, GraphProto, ModelProto, NodeProto,
    OperatorSetIdProto, TensorProto, TensorShapeProto, TypeProto, ValueInfoProto,
};

/// Helpers on the generated types
pub mod extensions;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_empty() {
        let model = ModelProto::default();
        assert_eq!(model.ir_version, 0);
        assert!(model.graph.is_none());

        let node = NodeProto::default();
        assert!(node.input.is_empty() && node.output.is_empty());
    }
}
