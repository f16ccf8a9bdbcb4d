//! Constant tensor decoding
//!
//! The rewrite passes read small constant tensors out of the graph: pad
//! vectors, target sizes, group shapes, epsilons. These helpers decode a
//! `TensorProto` payload (typed fields or little-endian `raw_data`) into an
//! ndarray, and build small constant tensors for fixtures.

use ndarray::{ArrayD, IxDyn};

use crate::error::{ConvertError, ConvertResult};
use crate::proto::onnx::tensor_proto::DataType;
use crate::proto::TensorProto;

use super::dtype::{dtype_size, i32_to_dtype};
use super::shape::numel;

/// Decode an integer tensor into an i64 ndarray
pub fn tensor_to_array_i64(tensor: &TensorProto) -> ConvertResult<ArrayD<i64>> {
    let dtype = i32_to_dtype(tensor.data_type)?;

    let data: Vec<i64> = if tensor.raw_data.is_empty() {
        match dtype {
            DataType::Int64 => tensor.int64_data.clone(),
            DataType::Int32 => tensor.int32_data.iter().map(|&v| v as i64).collect(),
            DataType::Uint64 => tensor.uint64_data.iter().map(|&v| v as i64).collect(),
            _ => return Err(ConvertError::InvalidDataType(tensor.data_type)),
        }
    } else {
        check_raw_len(tensor, dtype)?;
        match dtype {
            DataType::Int64 => decode_le(&tensor.raw_data, i64::from_le_bytes),
            DataType::Int32 => decode_le(&tensor.raw_data, |b| i32::from_le_bytes(b) as i64),
            _ => return Err(ConvertError::InvalidDataType(tensor.data_type)),
        }
    };

    shaped(tensor, data)
}

/// Decode a floating-point (or integer) tensor into an f32 ndarray
pub fn tensor_to_array_f32(tensor: &TensorProto) -> ConvertResult<ArrayD<f32>> {
    let dtype = i32_to_dtype(tensor.data_type)?;

    let data: Vec<f32> = if tensor.raw_data.is_empty() {
        match dtype {
            DataType::Float => tensor.float_data.clone(),
            DataType::Double => tensor.double_data.iter().map(|&v| v as f32).collect(),
            DataType::Int32 => tensor.int32_data.iter().map(|&v| v as f32).collect(),
            DataType::Int64 => tensor.int64_data.iter().map(|&v| v as f32).collect(),
            _ => return Err(ConvertError::InvalidDataType(tensor.data_type)),
        }
    } else {
        check_raw_len(tensor, dtype)?;
        match dtype {
            DataType::Float => decode_le(&tensor.raw_data, f32::from_le_bytes),
            DataType::Double => decode_le(&tensor.raw_data, |b| f64::from_le_bytes(b) as f32),
            DataType::Int64 => decode_le(&tensor.raw_data, |b| i64::from_le_bytes(b) as f32),
            _ => return Err(ConvertError::InvalidDataType(tensor.data_type)),
        }
    };

    shaped(tensor, data)
}

/// Read a scalar (or single-element) tensor as f32
pub fn tensor_scalar_f32(tensor: &TensorProto) -> ConvertResult<f32> {
    tensor_to_array_f32(tensor)?
        .first()
        .copied()
        .ok_or_else(|| ConvertError::ShapeMismatch(format!("tensor '{}' is empty", tensor.name)))
}

/// A 1-D int64 constant
pub fn vec_to_tensor_i64(data: &[i64], name: &str) -> TensorProto {
    TensorProto {
        name: name.to_string(),
        dims: vec![data.len() as i64],
        data_type: DataType::Int64 as i32,
        int64_data: data.to_vec(),
        ..Default::default()
    }
}

/// A 1-D float constant
pub fn vec_to_tensor_f32(data: &[f32], name: &str) -> TensorProto {
    TensorProto {
        name: name.to_string(),
        dims: vec![data.len() as i64],
        data_type: DataType::Float as i32,
        float_data: data.to_vec(),
        ..Default::default()
    }
}

/// A scalar float constant
pub fn scalar_to_tensor_f32(value: f32, name: &str) -> TensorProto {
    TensorProto {
        name: name.to_string(),
        data_type: DataType::Float as i32,
        float_data: vec![value],
        ..Default::default()
    }
}

/// Split `raw` into W-byte little-endian words and convert each
fn decode_le<T, const W: usize>(raw: &[u8], convert: fn([u8; W]) -> T) -> Vec<T> {
    raw.chunks_exact(W)
        .map(|chunk| {
            let mut word = [0u8; W];
            word.copy_from_slice(chunk);
            convert(word)
        })
        .collect()
}

fn check_raw_len(tensor: &TensorProto, dtype: DataType) -> ConvertResult<()> {
    let expected = numel(&tensor.dims) * dtype_size(dtype)?;
    if tensor.raw_data.len() != expected {
        return Err(ConvertError::ShapeMismatch(format!(
            "tensor '{}': raw payload is {} bytes, dims {:?} need {}",
            tensor.name,
            tensor.raw_data.len(),
            tensor.dims,
            expected
        )));
    }
    Ok(())
}

fn shaped<T>(tensor: &TensorProto, data: Vec<T>) -> ConvertResult<ArrayD<T>> {
    if data.len() != numel(&tensor.dims) {
        return Err(ConvertError::ShapeMismatch(format!(
            "tensor '{}': {} elements for dims {:?}",
            tensor.name,
            data.len(),
            tensor.dims
        )));
    }

    let shape: Vec<usize> = tensor.dims.iter().map(|&d| d.max(0) as usize).collect();
    ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|e| ConvertError::Internal(e.to_string()))
}
