//! Helpers on the generated protobuf types
//!
//! Attribute and metadata accessors the passes lean on, plus the two
//! constructors used when assembling nodes and shape annotations.

use super::onnx::tensor_shape_proto::dimension;
use super::onnx::*;

impl ModelProto {
    /// Opset version declared for the default ONNX domain
    pub fn opset_version(&self) -> Option<i64> {
        self.opset_import
            .iter()
            .find(|op| op.domain.is_empty())
            .map(|op| op.version)
    }
}

impl NodeProto {
    /// Attribute by name
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeProto> {
        self.attribute.iter().find(|attr| attr.name == name)
    }

    /// Integer attribute, falling back to the op's documented default
    pub fn attr_int(&self, name: &str, default: i64) -> i64 {
        self.get_attribute(name).map_or(default, |a| a.i)
    }

    /// Float attribute, falling back to the op's documented default
    pub fn attr_float(&self, name: &str, default: f32) -> f32 {
        self.get_attribute(name).map_or(default, |a| a.f)
    }

    /// Repeated-integer attribute
    pub fn attr_ints(&self, name: &str) -> Option<&[i64]> {
        self.get_attribute(name).map(|a| a.ints.as_slice())
    }

    /// String attribute, as the raw bytes ONNX stores
    pub fn attr_bytes(&self, name: &str) -> Option<&[u8]> {
        self.get_attribute(name).map(|a| a.s.as_slice())
    }
}

impl ValueInfoProto {
    /// Dimensions recorded for this tensor, symbolic dims as -1
    pub fn get_shape(&self) -> Option<Vec<i64>> {
        let type_proto::Value::TensorType(tensor) = self.r#type.as_ref()?.value.as_ref()?;
        let shape = tensor.shape.as_ref()?;

        Some(shape.dim.iter().map(dim_or_symbolic).collect())
    }
}

fn dim_or_symbolic(dim: &tensor_shape_proto::Dimension) -> i64 {
    match dim.value {
        Some(dimension::Value::DimValue(v)) => v,
        _ => -1,
    }
}

/// Assemble a node from its op type, tensor names, and node name
pub fn make_node(op_type: &str, inputs: &[&str], outputs: &[&str], name: &str) -> NodeProto {
    NodeProto {
        name: name.to_string(),
        op_type: op_type.to_string(),
        input: inputs.iter().map(|s| s.to_string()).collect(),
        output: outputs.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

/// Annotate a float tensor with a static shape
pub fn make_tensor_value_info(name: &str, shape: &[i64]) -> ValueInfoProto {
    let dims = shape
        .iter()
        .map(|&d| tensor_shape_proto::Dimension {
            value: Some(dimension::Value::DimValue(d)),
            denotation: String::new(),
        })
        .collect();

    let tensor = type_proto::Tensor {
        elem_type: tensor_proto::DataType::Float as i32,
        shape: Some(TensorShapeProto { dim: dims }),
    };

    ValueInfoProto {
        name: name.to_string(),
        r#type: Some(TypeProto {
            value: Some(type_proto::Value::TensorType(tensor)),
            denotation: String::new(),
        }),
        ..Default::default()
    }
}
