//! Model loading

use std::fs;
use std::path::Path;

use prost::Message;

use crate::error::{ConvertError, ConvertResult};
use crate::proto::ModelProto;

/// Load an ONNX model from disk
pub fn load_model<P: AsRef<Path>>(path: P) -> ConvertResult<ModelProto> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| ConvertError::ModelRead {
        path: path.to_path_buf(),
        source,
    })?;

    decode_model(&bytes)
}

/// Decode an ONNX model from its protobuf bytes
pub fn decode_model(bytes: &[u8]) -> ConvertResult<ModelProto> {
    Ok(ModelProto::decode(bytes)?)
}

/// Summary of a model's metadata and graph dimensions
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// IR version
    pub ir_version: i64,
    /// Producer name
    pub producer_name: String,
    /// Producer version
    pub producer_version: String,
    /// Opset imports as (domain, version)
    pub opsets: Vec<(String, i64)>,
    /// Graph name
    pub graph_name: String,
    /// Number of nodes
    pub node_count: usize,
    /// Number of initializers
    pub initializer_count: usize,
    /// Graph input names
    pub inputs: Vec<String>,
    /// Graph output names
    pub outputs: Vec<String>,
}

impl ModelInfo {
    /// Summarize an in-memory model
    pub fn from_model(model: &ModelProto) -> Self {
        let names = |vis: &[crate::proto::ValueInfoProto]| -> Vec<String> {
            vis.iter().map(|vi| vi.name.clone()).collect()
        };
        let graph = model.graph.as_ref();

        Self {
            ir_version: model.ir_version,
            producer_name: model.producer_name.clone(),
            producer_version: model.producer_version.clone(),
            opsets: model
                .opset_import
                .iter()
                .map(|op| (op.domain.clone(), op.version))
                .collect(),
            graph_name: graph.map(|g| g.name.clone()).unwrap_or_default(),
            node_count: graph.map_or(0, |g| g.node.len()),
            initializer_count: graph.map_or(0, |g| g.initializer.len()),
            inputs: graph.map(|g| names(&g.input)).unwrap_or_default(),
            outputs: graph.map(|g| names(&g.output)).unwrap_or_default(),
        }
    }

    /// Summarize a model file without keeping it in memory
    pub fn probe<P: AsRef<Path>>(path: P) -> ConvertResult<Self> {
        Ok(Self::from_model(&load_model(path)?))
    }
}
