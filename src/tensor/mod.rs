//! Tensor utilities
//!
//! Decoding of constant tensor payloads and shape helpers used by the
//! rewrite passes when they read pad amounts, target sizes, and epsilons
//! out of the graph.

pub mod convert;
pub mod dtype;
pub mod shape;

pub use convert::{
    scalar_to_tensor_f32, tensor_scalar_f32, tensor_to_array_f32, tensor_to_array_i64,
    vec_to_tensor_f32, vec_to_tensor_i64,
};
pub use dtype::{dtype_size, i32_to_dtype};
pub use shape::{numel, spatial_dims};
