//! In-memory graph representation
//!
//! [`GraphContext`] mirrors a `GraphProto` into a node table plus tensor
//! lookup maps, built in one pass over the node list. The rewrite passes
//! traverse and mutate the context; the builder turns it back into a
//! `GraphProto` at the end.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{ConvertError, ConvertResult};
use crate::proto::{GraphProto, ModelProto, NodeProto, TensorProto, ValueInfoProto};

/// Consumers of one tensor; nearly always one or two nodes
pub type ConsumerList = SmallVec<[String; 4]>;

/// Lookup view of one ONNX graph
///
/// The node table preserves graph order. All other maps are keyed by tensor
/// name and kept consistent with the table by the mutation methods in
/// `mutators`.
#[derive(Debug)]
pub struct GraphContext {
    /// node name → node, in graph order
    pub(super) nodes: IndexMap<String, NodeProto>,
    /// tensor name → name of the node producing it
    pub(super) producers: FxHashMap<String, String>,
    /// tensor name → names of the nodes reading it
    pub(super) consumers: FxHashMap<String, ConsumerList>,
    /// tensor name → constant payload
    pub(super) initializers: FxHashMap<String, TensorProto>,
    /// tensor name → type/shape annotation (inputs, outputs, value_info)
    pub(super) value_infos: FxHashMap<String, ValueInfoProto>,
    /// declared graph inputs
    pub(super) inputs: FxHashMap<String, ValueInfoProto>,
    /// declared graph outputs
    pub(super) outputs: FxHashMap<String, ValueInfoProto>,
    /// tensor name → how many node inputs reference it
    pub(super) uses: FxHashMap<String, usize>,
}

impl GraphContext {
    /// Mirror a `GraphProto` into lookup maps
    ///
    /// Exporters may leave node names empty; the table is keyed by name, so
    /// anonymous nodes are assigned `{op_type}_{index}` on the way in. Names
    /// carry no semantics in ONNX and matching stays purely structural.
    pub fn new(graph: &GraphProto) -> Self {
        let mut ctx = Self {
            nodes: IndexMap::with_capacity(graph.node.len()),
            producers: FxHashMap::default(),
            consumers: FxHashMap::default(),
            initializers: FxHashMap::default(),
            value_infos: FxHashMap::default(),
            inputs: FxHashMap::default(),
            outputs: FxHashMap::default(),
            uses: FxHashMap::default(),
        };

        for (index, node) in graph.node.iter().enumerate() {
            let mut node = node.clone();
            if node.name.is_empty() {
                node.name = format!("{}_{}", node.op_type, index);
            }
            ctx.link_node(&node);
            ctx.nodes.insert(node.name.clone(), node);
        }

        for tensor in &graph.initializer {
            ctx.initializers.insert(tensor.name.clone(), tensor.clone());
        }
        for vi in &graph.input {
            ctx.inputs.insert(vi.name.clone(), vi.clone());
            ctx.value_infos.insert(vi.name.clone(), vi.clone());
        }
        for vi in &graph.output {
            ctx.outputs.insert(vi.name.clone(), vi.clone());
            ctx.value_infos.insert(vi.name.clone(), vi.clone());
        }
        for vi in &graph.value_info {
            ctx.value_infos.insert(vi.name.clone(), vi.clone());
        }

        ctx
    }

    /// Mirror the graph of a `ModelProto`
    pub fn from_model(model: &ModelProto) -> ConvertResult<Self> {
        let graph = model
            .graph
            .as_ref()
            .ok_or_else(|| ConvertError::MissingField("model.graph".to_string()))?;

        Ok(Self::new(graph))
    }

    /// Record a node's edges in the producer/consumer/use maps
    pub(super) fn link_node(&mut self, node: &NodeProto) {
        for output in &node.output {
            if !output.is_empty() {
                self.producers.insert(output.clone(), node.name.clone());
            }
        }
        for input in &node.input {
            if !input.is_empty() {
                self.consumers
                    .entry(input.clone())
                    .or_default()
                    .push(node.name.clone());
                *self.uses.entry(input.clone()).or_insert(0) += 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Look up a node by name
    pub fn node(&self, name: &str) -> Option<&NodeProto> {
        self.nodes.get(name)
    }

    /// Look up a node mutably
    ///
    /// Callers must not change the node's inputs or outputs through this
    /// reference; use the rewire methods, which keep the maps in sync.
    pub fn node_mut(&mut self, name: &str) -> Option<&mut NodeProto> {
        self.nodes.get_mut(name)
    }

    /// Whether a node with this name exists
    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Number of nodes in the graph
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes, in graph order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeProto> {
        self.nodes.values()
    }

    /// All nodes of one op type, in graph order
    pub fn nodes_with_op(&self, op_type: &str) -> impl Iterator<Item = &NodeProto> + '_ {
        let op_type = op_type.to_string();
        self.nodes.values().filter(move |n| n.op_type == op_type)
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    /// The node producing a tensor, if any (graph inputs and initializers
    /// have no producer)
    pub fn producer_of(&self, tensor: &str) -> Option<&NodeProto> {
        self.nodes.get(self.producers.get(tensor)?)
    }

    /// Name of the node producing a tensor
    pub fn producer_name_of(&self, tensor: &str) -> Option<&str> {
        self.producers.get(tensor).map(String::as_str)
    }

    /// Names of the nodes reading a tensor; empty if none
    pub fn consumers_of(&self, tensor: &str) -> &[String] {
        self.consumers.get(tensor).map_or(&[], |c| c.as_slice())
    }

    /// The node feeding this node's first input
    pub fn prev_node(&self, node: &NodeProto) -> Option<&NodeProto> {
        self.producer_of(node.input.first()?)
    }

    /// Whether a tensor is a declared graph input
    pub fn is_graph_input(&self, tensor: &str) -> bool {
        self.inputs.contains_key(tensor)
    }

    /// Whether a tensor is a declared graph output
    pub fn is_graph_output(&self, tensor: &str) -> bool {
        self.outputs.contains_key(tensor)
    }

    /// Whether a tensor is a constant initializer
    pub fn is_initializer(&self, tensor: &str) -> bool {
        self.initializers.contains_key(tensor)
    }

    /// Whether exactly one node reads the tensor and nothing else observes it
    ///
    /// Collapsing across a tensor is only sound under this condition.
    pub fn is_single_use(&self, tensor: &str) -> bool {
        self.consumers_of(tensor).len() == 1 && !self.is_graph_output(tensor)
    }

    // ------------------------------------------------------------------
    // Tensors
    // ------------------------------------------------------------------

    /// Constant payload of an initializer tensor
    pub fn initializer(&self, tensor: &str) -> Option<&TensorProto> {
        self.initializers.get(tensor)
    }

    /// Type/shape annotation recorded for a tensor
    pub fn value_info(&self, tensor: &str) -> Option<&ValueInfoProto> {
        self.value_infos.get(tensor)
    }

    /// Static shape of a tensor, symbolic dims as -1
    pub fn tensor_shape(&self, tensor: &str) -> Option<Vec<i64>> {
        self.value_info(tensor)?.get_shape()
    }

    /// Declared graph inputs
    pub fn graph_inputs(&self) -> impl Iterator<Item = &ValueInfoProto> {
        self.inputs.values()
    }

    /// Declared graph outputs
    pub fn graph_outputs(&self) -> impl Iterator<Item = &ValueInfoProto> {
        self.outputs.values()
    }

    /// All initializer tensors
    pub fn initializers(&self) -> impl Iterator<Item = &TensorProto> {
        self.initializers.values()
    }

    /// All recorded tensor annotations
    pub fn value_infos(&self) -> impl Iterator<Item = &ValueInfoProto> {
        self.value_infos.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::{make_node, make_tensor_value_info};

    fn two_node_graph() -> GraphProto {
        GraphProto {
            node: vec![
                make_node("Conv", &["X", "W"], &["conv_out"], "conv_0"),
                make_node("Relu", &["conv_out"], &["Y"], "relu_0"),
            ],
            input: vec![make_tensor_value_info("X", &[1, 3, 192, 640])],
            output: vec![ValueInfoProto {
                name: "Y".to_string(),
                ..Default::default()
            }],
            initializer: vec![TensorProto {
                name: "W".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn mirrors_nodes_in_order() {
        let ctx = GraphContext::new(&two_node_graph());

        assert_eq!(ctx.node_count(), 2);
        let names: Vec<_> = ctx.nodes().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["conv_0", "relu_0"]);
        assert_eq!(ctx.node("conv_0").unwrap().op_type, "Conv");
        assert!(ctx.node("missing").is_none());
    }

    #[test]
    fn names_anonymous_nodes() {
        let mut graph = two_node_graph();
        graph.node[1].name = String::new();

        let ctx = GraphContext::new(&graph);
        assert!(ctx.has_node("Relu_1"));
        assert_eq!(ctx.producer_name_of("Y"), Some("Relu_1"));
    }

    #[test]
    fn tracks_producers_and_consumers() {
        let ctx = GraphContext::new(&two_node_graph());

        assert_eq!(ctx.producer_of("conv_out").unwrap().name, "conv_0");
        assert!(ctx.producer_of("X").is_none());
        assert_eq!(ctx.consumers_of("conv_out"), ["relu_0".to_string()]);
        assert!(ctx.consumers_of("Y").is_empty());

        let relu = ctx.node("relu_0").unwrap();
        assert_eq!(ctx.prev_node(relu).unwrap().name, "conv_0");
    }

    #[test]
    fn classifies_tensor_roles() {
        let ctx = GraphContext::new(&two_node_graph());

        assert!(ctx.is_graph_input("X"));
        assert!(ctx.is_graph_output("Y"));
        assert!(ctx.is_initializer("W"));
        assert!(!ctx.is_graph_input("conv_out"));
        assert!(!ctx.is_graph_output("conv_out"));
    }

    #[test]
    fn single_use_excludes_outputs_and_unknowns() {
        let ctx = GraphContext::new(&two_node_graph());

        assert!(ctx.is_single_use("conv_out"));
        assert!(!ctx.is_single_use("Y"));
        assert!(!ctx.is_single_use("unknown"));
    }

    #[test]
    fn shared_tensor_is_not_single_use() {
        let mut graph = two_node_graph();
        graph
            .node
            .push(make_node("Sigmoid", &["conv_out"], &["Z"], "sig_0"));

        let ctx = GraphContext::new(&graph);
        assert_eq!(ctx.consumers_of("conv_out").len(), 2);
        assert!(!ctx.is_single_use("conv_out"));
    }

    #[test]
    fn reads_static_shapes_from_value_info() {
        let ctx = GraphContext::new(&two_node_graph());

        assert_eq!(ctx.tensor_shape("X"), Some(vec![1, 3, 192, 640]));
        assert!(ctx.tensor_shape("conv_out").is_none());
    }

    #[test]
    fn filters_nodes_by_op() {
        let ctx = GraphContext::new(&two_node_graph());

        assert_eq!(ctx.nodes_with_op("Conv").count(), 1);
        assert_eq!(ctx.nodes_with_op("Pad").count(), 0);
    }

    #[test]
    fn from_model_requires_a_graph() {
        assert!(GraphContext::from_model(&ModelProto::default()).is_err());
    }
}
