use std::collections::HashMap;

use crate::foundation::ids::{NodeId, OperationId};
use crate::memory::buffer::DataType;
use crate::node::graph::{NodeInput, NodeOutput};
use crate::operation::graph::OperationGraph;
use crate::operation::traits::Operation;
use crate::ops::constant::{SetColorOperation, SetValueOperation, SetVectorOperation};
use crate::ops::output::{OutputImage, PreviewOperation};
use crate::ops::proxy::ProxyOperation;

/// Operation graph under construction plus the node-to-operation socket maps.
#[derive(Debug, Default)]
pub(crate) struct ConvertState {
    pub(crate) graph: OperationGraph,
    /// Operation input -> node input it stands for.
    pub(crate) input_map: HashMap<(OperationId, usize), NodeInput>,
    /// Node output -> operation producing it.
    pub(crate) output_map: HashMap<NodeOutput, OperationId>,
}

/// Registration surface handed to
/// [`Node::convert_to_operations`](crate::Node::convert_to_operations).
///
/// Socket indices passed to the `map_*` and `add_*_proxy` methods refer to the node being
/// converted.
pub struct NodeConverter<'a> {
    state: &'a mut ConvertState,
    node: NodeId,
    input_types: &'a [DataType],
    output_types: &'a [DataType],
    linked_inputs: &'a [bool],
}

impl<'a> NodeConverter<'a> {
    pub(crate) fn new(
        state: &'a mut ConvertState,
        node: NodeId,
        input_types: &'a [DataType],
        output_types: &'a [DataType],
        linked_inputs: &'a [bool],
    ) -> Self {
        Self {
            state,
            node,
            input_types,
            output_types,
            linked_inputs,
        }
    }

    /// Node being converted.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Return `true` when node input `index` has an incoming link.
    pub fn is_input_linked(&self, index: usize) -> bool {
        self.linked_inputs.get(index).copied().unwrap_or(false)
    }

    /// Add an operation to the graph.
    pub fn add_operation(&mut self, op: impl Operation + 'static) -> OperationId {
        self.state.graph.add_operation(Box::new(op))
    }

    /// Make operation input `op_input` of `op` stand for node input `node_input`.
    ///
    /// One node input may be mapped to several operation inputs.
    pub fn map_input_socket(&mut self, node_input: usize, op: OperationId, op_input: usize) {
        self.state
            .input_map
            .insert((op, op_input), self.node.input(node_input));
    }

    /// Make `op`'s output stand for node output `node_output`.
    pub fn map_output_socket(&mut self, node_output: usize, op: OperationId) {
        self.state
            .output_map
            .insert(self.node.output(node_output), op);
    }

    /// Link two operations of this conversion.
    pub fn add_link(&mut self, from: OperationId, to: OperationId, input: usize) -> bool {
        self.state.graph.add_link(from, to, input)
    }

    /// Passthrough standing for node input `node_input`; link its output to internal consumers.
    pub fn add_input_proxy(&mut self, node_input: usize, use_conversion: bool) -> OperationId {
        let dt = self.input_type(node_input);
        let proxy = self.add_operation(ProxyOperation::new(dt, dt, use_conversion));
        self.map_input_socket(node_input, proxy, 0);
        proxy
    }

    /// Passthrough standing for node output `node_output`; link internal producers to its input.
    pub fn add_output_proxy(&mut self, node_output: usize, use_conversion: bool) -> OperationId {
        let dt = self.output_type(node_output);
        let proxy = self.add_operation(ProxyOperation::new(dt, dt, use_conversion));
        self.map_output_socket(node_output, proxy);
        proxy
    }

    /// Feed a constant value into input `input` of `op`.
    pub fn add_input_value(&mut self, op: OperationId, input: usize, value: f32) -> OperationId {
        let c = self.add_operation(SetValueOperation::new(value));
        self.add_link(c, op, input);
        c
    }

    /// Feed a constant color into input `input` of `op`.
    pub fn add_input_color(
        &mut self,
        op: OperationId,
        input: usize,
        rgba: [f32; 4],
    ) -> OperationId {
        let c = self.add_operation(SetColorOperation::new(rgba));
        self.add_link(c, op, input);
        c
    }

    /// Feed a constant vector into input `input` of `op`.
    pub fn add_input_vector(
        &mut self,
        op: OperationId,
        input: usize,
        xyz: [f32; 3],
    ) -> OperationId {
        let c = self.add_operation(SetVectorOperation::new(xyz));
        self.add_link(c, op, input);
        c
    }

    /// Produce node output `node_output` from a constant value.
    pub fn add_output_value(&mut self, node_output: usize, value: f32) -> OperationId {
        let c = self.add_operation(SetValueOperation::new(value));
        self.map_output_socket(node_output, c);
        c
    }

    /// Produce node output `node_output` from a constant color.
    pub fn add_output_color(&mut self, node_output: usize, rgba: [f32; 4]) -> OperationId {
        let c = self.add_operation(SetColorOperation::new(rgba));
        self.map_output_socket(node_output, c);
        c
    }

    /// Produce node output `node_output` from a constant vector.
    pub fn add_output_vector(&mut self, node_output: usize, xyz: [f32; 3]) -> OperationId {
        let c = self.add_operation(SetVectorOperation::new(xyz));
        self.map_output_socket(node_output, c);
        c
    }

    /// Preview `op`'s output into `image`.
    pub fn add_preview(&mut self, op: OperationId, image: OutputImage) -> OperationId {
        let preview = self.add_operation(PreviewOperation::new(image));
        self.add_link(op, preview, 0);
        preview
    }

    fn input_type(&self, index: usize) -> DataType {
        self.input_types
            .get(index)
            .copied()
            .unwrap_or(DataType::Value)
    }

    fn output_type(&self, index: usize) -> DataType {
        self.output_types
            .get(index)
            .copied()
            .unwrap_or(DataType::Value)
    }
}
