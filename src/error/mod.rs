//! Error types for the PackNet conversion pipeline.
//!
//! Everything fatal funnels into [`ConvertError`]; pattern matches that
//! merely fail to resolve are not errors (the passes skip those and log).

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, rewriting, or saving a model
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The model file could not be opened or read
    #[error("cannot read model file {}: {source}", .path.display())]
    ModelRead {
        /// Path that failed to load
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// The rewritten model could not be written back
    #[error("cannot write model file {}: {source}", .path.display())]
    ModelWrite {
        /// Path that failed to save
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// The file is not a decodable ONNX protobuf
    #[error("malformed ONNX protobuf: {0}")]
    ProtoDecode(#[from] prost::DecodeError),

    /// A required protobuf field is absent
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A node referenced during rewriting does not exist or is malformed
    #[error("invalid node: {0}")]
    InvalidNode(String),

    /// The requested opset is outside the supported range
    #[error("unsupported opset {version}, this tool handles {min}..={max}")]
    UnsupportedOpset {
        /// Requested version
        version: i64,
        /// Minimum supported
        min: i64,
        /// Maximum supported
        max: i64,
    },

    /// A tensor carries an unknown or unusable element type
    #[error("unusable tensor data type: {0}")]
    InvalidDataType(i32),

    /// A tensor payload disagrees with its declared dims
    #[error("tensor shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The node graph is cyclic and cannot be ordered
    #[error("graph contains a cycle through node {0}")]
    GraphCycle(String),

    /// Structural validation rejected the model
    #[error("model failed validation: {0}")]
    ValidationFailed(String),

    /// Bug guard for conditions that should be unreachable
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the crate
pub type ConvertResult<T> = Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = ConvertError::InvalidNode("resize_0".to_string());
        assert!(err.to_string().contains("resize_0"));

        let err = ConvertError::GraphCycle("add_3".to_string());
        assert!(err.to_string().contains("add_3"));
    }

    #[test]
    fn opset_error_names_supported_range() {
        let err = ConvertError::UnsupportedOpset {
            version: 13,
            min: 9,
            max: 11,
        };
        let msg = err.to_string();
        assert!(msg.contains("13"));
        assert!(msg.contains("9..=11"));
    }
}
