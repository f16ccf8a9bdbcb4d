//! Graph mutation
//!
//! The rewrite passes change the graph only through these methods, which
//! keep the node table and the tensor maps consistent with each other.

use crate::proto::{NodeProto, TensorProto};

use super::context::GraphContext;

impl GraphContext {
    /// Add a node to the end of the node table
    pub fn insert_node(&mut self, node: NodeProto) {
        self.link_node(&node);
        self.nodes.insert(node.name.clone(), node);
    }

    /// Remove a node, returning it
    ///
    /// The relative order of the remaining nodes is preserved. Consumers of
    /// the removed node's outputs are left dangling; callers rewire them
    /// first or rely on cleanup to prune them.
    pub fn remove_node(&mut self, name: &str) -> Option<NodeProto> {
        let node = self.nodes.shift_remove(name)?;
        self.unlink_node(&node);
        Some(node)
    }

    /// Point a node's input at a different tensor
    ///
    /// Returns false if the node or the input slot does not exist.
    pub fn rewire_input(&mut self, node_name: &str, slot: usize, tensor: &str) -> bool {
        let Some(old) = self
            .nodes
            .get_mut(node_name)
            .and_then(|n| n.input.get_mut(slot))
        else {
            return false;
        };
        let old = std::mem::replace(old, tensor.to_string());

        if !old.is_empty() {
            self.forget_use(&old, node_name);
        }
        if !tensor.is_empty() {
            self.consumers
                .entry(tensor.to_string())
                .or_default()
                .push(node_name.to_string());
            *self.uses.entry(tensor.to_string()).or_insert(0) += 1;
        }
        true
    }

    /// Rename a node's output tensor
    ///
    /// Returns false if the node or the output slot does not exist.
    pub fn rewire_output(&mut self, node_name: &str, slot: usize, tensor: &str) -> bool {
        let Some(old) = self
            .nodes
            .get_mut(node_name)
            .and_then(|n| n.output.get_mut(slot))
        else {
            return false;
        };
        let old = std::mem::replace(old, tensor.to_string());

        self.producers.remove(&old);
        if !tensor.is_empty() {
            self.producers
                .insert(tensor.to_string(), node_name.to_string());
        }
        true
    }

    /// Add or replace a constant initializer
    pub fn set_initializer(&mut self, tensor: TensorProto) {
        self.initializers.insert(tensor.name.clone(), tensor);
    }

    /// Drop a constant initializer
    pub fn remove_initializer(&mut self, name: &str) -> Option<TensorProto> {
        self.initializers.remove(name)
    }

    /// Erase a node's edges from the producer/consumer/use maps
    fn unlink_node(&mut self, node: &NodeProto) {
        for output in &node.output {
            self.producers.remove(output);
        }
        for input in &node.input {
            if !input.is_empty() {
                self.forget_use(input, &node.name);
            }
        }
    }

    fn forget_use(&mut self, tensor: &str, node_name: &str) {
        if let Some(readers) = self.consumers.get_mut(tensor) {
            readers.retain(|n| n != node_name);
        }
        if let Some(count) = self.uses.get_mut(tensor) {
            *count = count.saturating_sub(1);
        }
    }
}
