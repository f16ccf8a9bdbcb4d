//! ONNX element types

use crate::error::{ConvertError, ConvertResult};
use crate::proto::onnx::tensor_proto::DataType;

/// Interpret a raw `data_type` field
pub fn i32_to_dtype(value: i32) -> ConvertResult<DataType> {
    DataType::from_i32(value).ok_or(ConvertError::InvalidDataType(value))
}

/// Bytes per element in `raw_data` for the given type
pub fn dtype_size(dtype: DataType) -> ConvertResult<usize> {
    match dtype {
        DataType::Uint8 | DataType::Int8 | DataType::Bool => Ok(1),
        DataType::Uint16 | DataType::Int16 | DataType::Float16 | DataType::Bfloat16 => Ok(2),
        DataType::Float | DataType::Int32 | DataType::Uint32 => Ok(4),
        DataType::Double | DataType::Int64 | DataType::Uint64 => Ok(8),
        // String, complex, undefined: no fixed-width raw encoding
        other => Err(ConvertError::InvalidDataType(other as i32)),
    }
}
