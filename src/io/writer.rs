//! Model saving

use std::fs;
use std::path::Path;

use prost::Message;

use crate::error::{ConvertError, ConvertResult};
use crate::proto::ModelProto;

/// Write an ONNX model to disk, replacing any existing file
pub fn save_model<P: AsRef<Path>>(model: &ModelProto, path: P) -> ConvertResult<()> {
    let path = path.as_ref();
    fs::write(path, model.encode_to_vec()).map_err(|source| ConvertError::ModelWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Encode an ONNX model to its protobuf bytes
pub fn model_to_bytes(model: &ModelProto) -> Vec<u8> {
    model.encode_to_vec()
}
