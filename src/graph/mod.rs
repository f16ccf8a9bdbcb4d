//! Mutable in-memory graph
//!
//! [`GraphContext`] is the structure every rewrite pass works against: the
//! node table in graph order plus name-keyed maps answering "who produces
//! this tensor", "who reads it", and "what do we know about its shape".
//! Mutation goes through the methods in [`mutators`], which keep the maps
//! consistent with the table.

pub mod context;
pub mod mutators;

pub use context::{ConsumerList, GraphContext};
