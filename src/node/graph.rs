use std::fmt;

use smallvec::SmallVec;
use tracing::warn;

use crate::config::CompositorContext;
use crate::foundation::ids::NodeId;
use crate::memory::buffer::DataType;
use crate::node::converter::NodeConverter;
use crate::node::nodes::SocketProxyNode;
use crate::ops::output::OutputImage;

/// Declared input of a node with its editor default value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeInputDecl {
    /// Socket layout.
    pub data_type: DataType,
    /// Value used when the socket is unconnected.
    pub default: [f32; 4],
}

/// Socket declaration of a node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeSockets {
    pub(crate) inputs: SmallVec<[NodeInputDecl; 4]>,
    pub(crate) outputs: SmallVec<[DataType; 2]>,
}

impl NodeSockets {
    /// Empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input with a default value (missing channels are zero).
    pub fn input(mut self, data_type: DataType, default: &[f32]) -> Self {
        let mut d = [0.0f32; 4];
        let n = default.len().min(4);
        d[..n].copy_from_slice(&default[..n]);
        self.inputs.push(NodeInputDecl {
            data_type,
            default: d,
        });
        self
    }

    /// Append an output.
    pub fn output(mut self, data_type: DataType) -> Self {
        self.outputs.push(data_type);
        self
    }

    /// Declared inputs.
    pub fn inputs(&self) -> &[NodeInputDecl] {
        &self.inputs
    }

    /// Declared outputs.
    pub fn outputs(&self) -> &[DataType] {
        &self.outputs
    }
}

/// An editor-level node converted into operations when the graph is built.
pub trait Node: Send + Sync + fmt::Debug {
    /// Kind name.
    fn name(&self) -> &'static str;

    /// Socket declaration.
    fn sockets(&self) -> NodeSockets;

    /// Register operations, socket mappings and links for this node.
    fn convert_to_operations(&self, converter: &mut NodeConverter<'_>, context: &CompositorContext);
}

/// Input socket `index` of `node`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeInput {
    /// Owning node.
    pub node: NodeId,
    /// Socket index.
    pub index: usize,
}

/// Output socket `index` of `node`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeOutput {
    /// Owning node.
    pub node: NodeId,
    /// Socket index.
    pub index: usize,
}

impl NodeId {
    /// Input socket `index` of this node.
    pub fn input(self, index: usize) -> NodeInput {
        NodeInput { node: self, index }
    }

    /// Output socket `index` of this node.
    pub fn output(self, index: usize) -> NodeOutput {
        NodeOutput { node: self, index }
    }
}

/// Editor-level edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeLink {
    /// Producer socket.
    pub from: NodeOutput,
    /// Consumer socket.
    pub to: NodeInput,
}

#[derive(Debug)]
pub(crate) struct NodeEntry {
    pub(crate) node: Box<dyn Node>,
    pub(crate) sockets: NodeSockets,
    pub(crate) input_values: SmallVec<[[f32; 4]; 4]>,
    pub(crate) muted: bool,
    pub(crate) preview: Option<OutputImage>,
}

/// Abstract node graph handed to the builder.
///
/// Each input holds at most one link; a link that would close a cycle is rejected.
#[derive(Debug, Default)]
pub struct NodeGraph {
    pub(crate) nodes: Vec<NodeEntry>,
    links: Vec<NodeLink>,
}

impl NodeGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its handle.
    pub fn add_node(&mut self, node: impl Node + 'static) -> NodeId {
        self.add_boxed(Box::new(node))
    }

    fn add_boxed(&mut self, node: Box<dyn Node>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let sockets = node.sockets();
        let input_values = sockets.inputs.iter().map(|d| d.default).collect();
        self.nodes.push(NodeEntry {
            node,
            sockets,
            input_values,
            muted: false,
            preview: None,
        });
        id
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return `true` for a graph without nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Links in insertion order.
    pub fn links(&self) -> &[NodeLink] {
        &self.links
    }

    /// Kind name of `node`.
    pub fn node_name(&self, node: NodeId) -> Option<&'static str> {
        self.nodes.get(node.index()).map(|e| e.node.name())
    }

    /// Socket declaration of `node`.
    pub fn sockets(&self, node: NodeId) -> Option<&NodeSockets> {
        self.nodes.get(node.index()).map(|e| &e.sockets)
    }

    fn input_type(&self, input: NodeInput) -> Option<DataType> {
        self.sockets(input.node)?
            .inputs
            .get(input.index)
            .map(|d| d.data_type)
    }

    fn has_output(&self, output: NodeOutput) -> bool {
        self.sockets(output.node)
            .is_some_and(|s| output.index < s.outputs.len())
    }

    /// Link `from` to `to`, replacing the link previously feeding `to`.
    ///
    /// Returns `false` when a socket does not exist or the link would close a cycle.
    pub fn add_link(&mut self, from: NodeOutput, to: NodeInput) -> bool {
        if !self.has_output(from) || self.input_type(to).is_none() {
            warn!(?from, ?to, "dropping link to a missing socket");
            return false;
        }
        if self.reaches(to.node, from.node) {
            warn!(?from, ?to, "dropping link that closes a cycle");
            return false;
        }
        self.links.retain(|l| l.to != to);
        self.links.push(NodeLink { from, to });
        true
    }

    /// Remove the link feeding `to`.
    pub fn remove_link(&mut self, to: NodeInput) -> bool {
        let before = self.links.len();
        self.links.retain(|l| l.to != to);
        before != self.links.len()
    }

    /// Link feeding `to`.
    pub fn input_link(&self, to: NodeInput) -> Option<NodeOutput> {
        self.links.iter().find(|l| l.to == to).map(|l| l.from)
    }

    /// Return `true` when `to` can be reached from `from` following links downstream.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(n) = stack.pop() {
            if n == to {
                return true;
            }
            if std::mem::replace(&mut seen[n.index()], true) {
                continue;
            }
            stack.extend(
                self.links
                    .iter()
                    .filter(|l| l.from.node == n)
                    .map(|l| l.to.node),
            );
        }
        false
    }

    /// Override the unconnected value of `input`.
    pub fn set_input_value(&mut self, input: NodeInput, value: &[f32]) -> bool {
        let Some(slot) = self
            .nodes
            .get_mut(input.node.index())
            .and_then(|e| e.input_values.get_mut(input.index))
        else {
            return false;
        };
        let n = value.len().min(4);
        *slot = [0.0; 4];
        slot[..n].copy_from_slice(&value[..n]);
        true
    }

    /// Value used when `input` is unconnected.
    pub fn input_value(&self, input: NodeInput) -> Option<[f32; 4]> {
        self.nodes
            .get(input.node.index())
            .and_then(|e| e.input_values.get(input.index))
            .copied()
    }

    /// Mute or unmute `node`. Muted nodes pass their inputs through.
    pub fn set_muted(&mut self, node: NodeId, muted: bool) {
        if let Some(e) = self.nodes.get_mut(node.index()) {
            e.muted = muted;
        }
    }

    /// Render a preview of `node`'s first output into `image`.
    pub fn enable_preview(&mut self, node: NodeId, image: OutputImage) {
        if let Some(e) = self.nodes.get_mut(node.index()) {
            e.preview = Some(image);
        }
    }

    /// Inline `group`, returning the sockets standing for its interface.
    ///
    /// Each interface socket becomes a passthrough proxy node; link outer sockets to the returned
    /// handles.
    pub fn add_group(&mut self, group: NodeGroup) -> GroupInstance {
        let offset = self.nodes.len() as u32;
        let remap = |id: NodeId| NodeId(id.0 + offset);
        let NodeGroup {
            graph,
            inputs,
            outputs,
        } = group;
        self.nodes.extend(graph.nodes);
        self.links.extend(graph.links.iter().map(|l| NodeLink {
            from: remap(l.from.node).output(l.from.index),
            to: remap(l.to.node).input(l.to.index),
        }));

        let mut instance = GroupInstance::default();
        for socket in inputs {
            let proxy = self.add_node(SocketProxyNode::new(
                socket.data_type,
                socket.data_type,
                false,
            ));
            self.set_input_value(proxy.input(0), &socket.default);
            for target in socket.targets {
                self.add_link(proxy.output(0), remap(target.node).input(target.index));
            }
            instance.inputs.push(proxy.input(0));
        }
        for socket in outputs {
            let proxy = self.add_node(SocketProxyNode::new(
                socket.data_type,
                socket.data_type,
                false,
            ));
            self.add_link(
                remap(socket.source.node).output(socket.source.index),
                proxy.input(0),
            );
            instance.outputs.push(proxy.output(0));
        }
        instance
    }
}

#[derive(Debug)]
struct GroupInputSocket {
    data_type: DataType,
    default: [f32; 4],
    targets: Vec<NodeInput>,
}

#[derive(Debug)]
struct GroupOutputSocket {
    data_type: DataType,
    source: NodeOutput,
}

/// A reusable sub-graph with an explicit socket interface.
#[derive(Debug)]
pub struct NodeGroup {
    graph: NodeGraph,
    inputs: Vec<GroupInputSocket>,
    outputs: Vec<GroupOutputSocket>,
}

impl NodeGroup {
    /// Group around `graph` with an empty interface.
    pub fn new(graph: NodeGraph) -> Self {
        Self {
            graph,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Expose an input feeding `targets` inside the group.
    pub fn add_input(&mut self, data_type: DataType, default: &[f32], targets: &[NodeInput]) {
        let mut d = [0.0f32; 4];
        let n = default.len().min(4);
        d[..n].copy_from_slice(&default[..n]);
        self.inputs.push(GroupInputSocket {
            data_type,
            default: d,
            targets: targets.to_vec(),
        });
    }

    /// Expose `source` inside the group as an output.
    pub fn add_output(&mut self, data_type: DataType, source: NodeOutput) {
        self.outputs.push(GroupOutputSocket { data_type, source });
    }
}

/// Interface sockets of an inlined [`NodeGroup`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupInstance {
    /// One input per group input, in declaration order.
    pub inputs: Vec<NodeInput>,
    /// One output per group output, in declaration order.
    pub outputs: Vec<NodeOutput>,
}

#[cfg(test)]
#[path = "../../tests/unit/node/graph.rs"]
mod tests;
