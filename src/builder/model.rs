//! Model assembly
//!
//! Once the passes have mutated the context, this turns it back into a
//! `ModelProto`: the node table becomes the node list, the tensor maps are
//! filtered to what the surviving nodes still reference, cleanup prunes and
//! re-sorts, and the original model's metadata and opsets are carried over.

use std::collections::HashSet;

use crate::error::ConvertResult;
use crate::graph::GraphContext;
use crate::proto::{GraphProto, ModelProto};

use super::cleanup::{cleanup_graph, CleanupStats};

/// Assemble a GraphProto from a graph context
pub fn build_graph_from_context(ctx: &GraphContext, name: &str) -> GraphProto {
    let mut referenced: HashSet<&str> = HashSet::new();
    for node in ctx.nodes() {
        referenced.extend(node.input.iter().map(String::as_str));
        referenced.extend(node.output.iter().map(String::as_str));
    }
    referenced.remove("");

    let boundary: HashSet<&str> = ctx
        .graph_inputs()
        .chain(ctx.graph_outputs())
        .map(|vi| vi.name.as_str())
        .collect();

    GraphProto {
        name: name.to_string(),
        node: ctx.nodes().cloned().collect(),
        initializer: ctx
            .initializers()
            .filter(|t| referenced.contains(t.name.as_str()))
            .cloned()
            .collect(),
        input: ctx.graph_inputs().cloned().collect(),
        output: ctx.graph_outputs().cloned().collect(),
        // Inputs and outputs keep their own lists; value_info holds the rest
        value_info: ctx
            .value_infos()
            .filter(|vi| {
                referenced.contains(vi.name.as_str()) && !boundary.contains(vi.name.as_str())
            })
            .cloned()
            .collect(),
        ..Default::default()
    }
}

/// Build the rewritten model from a context and the original model
pub fn build_model(ctx: &GraphContext, original: &ModelProto) -> ConvertResult<ModelProto> {
    let (model, _) = build_model_with_stats(ctx, original)?;
    Ok(model)
}

/// Build the rewritten model, reporting what cleanup removed
pub fn build_model_with_stats(
    ctx: &GraphContext,
    original: &ModelProto,
) -> ConvertResult<(ModelProto, CleanupStats)> {
    let graph_name = original
        .graph
        .as_ref()
        .map(|g| g.name.as_str())
        .unwrap_or_default();

    let mut graph = build_graph_from_context(ctx, graph_name);
    let stats = cleanup_graph(&mut graph)?;

    let mut model = original.clone();
    model.graph = Some(graph);
    Ok((model, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::make_node;
    use crate::proto::{OperatorSetIdProto, TensorProto, ValueInfoProto};

    fn conv_relu_model() -> ModelProto {
        ModelProto {
            ir_version: 7,
            producer_name: "pytorch".to_string(),
            opset_import: vec![OperatorSetIdProto {
                domain: String::new(),
                version: 11,
            }],
            graph: Some(GraphProto {
                name: "packnet".to_string(),
                node: vec![
                    make_node("Conv", &["X", "W"], &["conv_out"], "conv_0"),
                    make_node("Relu", &["conv_out"], &["Y"], "relu_0"),
                ],
                input: vec![ValueInfoProto {
                    name: "X".to_string(),
                    ..Default::default()
                }],
                output: vec![ValueInfoProto {
                    name: "Y".to_string(),
                    ..Default::default()
                }],
                initializer: vec![TensorProto {
                    name: "W".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn rebuilds_every_section() {
        let model = conv_relu_model();
        let ctx = GraphContext::from_model(&model).unwrap();

        let graph = build_graph_from_context(&ctx, "packnet");

        assert_eq!(graph.name, "packnet");
        assert_eq!(graph.node.len(), 2);
        assert_eq!(graph.initializer.len(), 1);
        assert_eq!(graph.input.len(), 1);
        assert_eq!(graph.output.len(), 1);
    }

    #[test]
    fn carries_model_metadata() {
        let model = conv_relu_model();
        let ctx = GraphContext::from_model(&model).unwrap();

        let built = build_model(&ctx, &model).unwrap();

        assert_eq!(built.ir_version, 7);
        assert_eq!(built.producer_name, "pytorch");
        assert_eq!(built.opset_version(), Some(11));
        assert_eq!(built.graph.as_ref().unwrap().name, "packnet");
    }

    #[test]
    fn drops_nodes_and_tensors_cleanup_finds_dead() {
        let model = conv_relu_model();
        let mut ctx = GraphContext::from_model(&model).unwrap();

        // Rewire relu to read X directly; conv and its weight go dead
        ctx.rewire_input("relu_0", 0, "X");

        let (built, stats) = build_model_with_stats(&ctx, &model).unwrap();

        let graph = built.graph.as_ref().unwrap();
        assert_eq!(graph.node.len(), 1);
        assert_eq!(graph.node[0].name, "relu_0");
        assert!(graph.initializer.is_empty());
        assert_eq!(stats.nodes_removed, 1);
    }
}
