//! Shared machinery for the rewrite passes

use crate::error::ConvertResult;
use crate::graph::GraphContext;
use crate::proto::onnx::attribute_proto::AttributeType;
use crate::proto::{AttributeProto, NodeProto, TensorProto};

fn attr(name: &str, kind: AttributeType) -> AttributeProto {
    AttributeProto {
        name: name.to_string(),
        r#type: kind as i32,
        ..Default::default()
    }
}

/// An INT attribute
pub fn int_attr(name: &str, value: i64) -> AttributeProto {
    AttributeProto {
        i: value,
        ..attr(name, AttributeType::Int)
    }
}

/// A FLOAT attribute
pub fn float_attr(name: &str, value: f32) -> AttributeProto {
    AttributeProto {
        f: value,
        ..attr(name, AttributeType::Float)
    }
}

/// A FLOATS attribute
pub fn floats_attr(name: &str, values: &[f32]) -> AttributeProto {
    AttributeProto {
        floats: values.to_vec(),
        ..attr(name, AttributeType::Floats)
    }
}

/// An INTS attribute
pub fn ints_attr(name: &str, values: &[i64]) -> AttributeProto {
    AttributeProto {
        ints: values.to_vec(),
        ..attr(name, AttributeType::Ints)
    }
}

/// A STRING attribute (ONNX strings are byte strings)
pub fn str_attr(name: &str, value: &[u8]) -> AttributeProto {
    AttributeProto {
        s: value.to_vec(),
        ..attr(name, AttributeType::String)
    }
}

/// Set an INTS attribute, replacing any existing value
pub fn set_attr_ints(node: &mut NodeProto, name: &str, values: Vec<i64>) {
    if let Some(existing) = node.attribute.iter_mut().find(|a| a.name == name) {
        existing.ints = values;
    } else {
        node.attribute.push(ints_attr(name, &values));
    }
}

/// Resolve an input name to a constant payload, if it has one
///
/// Constants reach the passes two ways: as graph initializers, and as the
/// `value` attribute of a `Constant` producer node.
pub fn get_constant_tensor<'a>(ctx: &'a GraphContext, name: &str) -> Option<&'a TensorProto> {
    ctx.initializer(name).or_else(|| {
        let producer = ctx.producer_of(name)?;
        if producer.op_type != "Constant" {
            return None;
        }
        producer.get_attribute("value")?.t.as_ref()
    })
}

/// What a pass did to the graph
#[derive(Debug, Default, Clone)]
pub struct RewriteResult {
    /// Pattern instances found
    pub matched: usize,
    /// Rewrites actually applied
    pub applied: usize,
    /// Matches skipped because an attribute was not statically resolvable
    pub skipped: usize,
    /// Nodes removed from the graph
    pub nodes_removed: usize,
}

impl RewriteResult {
    /// An empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one applied rewrite that removed `removed` nodes
    pub fn record_collapse(&mut self, removed: usize) {
        self.applied += 1;
        self.nodes_removed += removed;
    }

    /// Fold another pass's result into this one
    pub fn merge(&mut self, other: RewriteResult) {
        self.matched += other.matched;
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.nodes_removed += other.nodes_removed;
    }
}

/// One rewrite over the whole graph
pub trait RewritePass {
    /// Name of the pass, for logging
    fn name(&self) -> &'static str;

    /// Apply the rewrite to the graph
    fn apply(&self, ctx: &mut GraphContext) -> ConvertResult<RewriteResult>;

    /// Cheap probe for whether the pass could match anything here
    fn is_applicable(&self, _ctx: &GraphContext) -> bool {
        true
    }
}
