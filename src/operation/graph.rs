use smallvec::SmallVec;

use crate::foundation::ids::{OperationId, ProxyId};
use crate::foundation::rect::Rect;
use crate::memory::buffer::DataType;
use crate::memory::proxy::MemoryProxy;
use crate::operation::socket::{InputSocket, Link};
use crate::operation::traits::{Operation, OperationFlags};

/// An operation together with its sockets and build state.
#[derive(Debug)]
pub struct OperationNode {
    id: OperationId,
    op: Box<dyn Operation>,
    flags: OperationFlags,
    inputs: SmallVec<[InputSocket; 4]>,
    output: Option<DataType>,
    canvas: Rect,
    canvas_set: bool,
    memory_proxy: Option<ProxyId>,
}

impl OperationNode {
    /// Handle of this node.
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Kind name of the operation.
    pub fn name(&self) -> &'static str {
        self.op.name()
    }

    /// The operation implementation.
    pub fn operation(&self) -> &dyn Operation {
        self.op.as_ref()
    }

    /// Static flags captured when the operation was added.
    pub fn flags(&self) -> OperationFlags {
        self.flags
    }

    /// Input sockets.
    pub fn inputs(&self) -> &[InputSocket] {
        &self.inputs
    }

    /// Producer linked to input `index`.
    pub fn input_link(&self, index: usize) -> Option<OperationId> {
        self.inputs.get(index).and_then(|s| s.link)
    }

    /// Output type, `None` for sinks.
    pub fn output_type(&self) -> Option<DataType> {
        self.output
    }

    /// Determined canvas, [`Rect::NONE`] until determined.
    pub fn canvas(&self) -> Rect {
        self.canvas
    }

    /// Return `true` once a non-empty canvas was determined or forced.
    pub fn is_canvas_set(&self) -> bool {
        self.canvas_set
    }

    /// Proxy written or read by a buffer operation.
    pub fn memory_proxy(&self) -> Option<ProxyId> {
        self.memory_proxy
    }

    /// Return `true` when this node leaves results outside the engine.
    pub fn is_output(&self, is_rendering: bool) -> bool {
        self.op.is_output_operation(is_rendering)
    }

    pub(crate) fn set_canvas(&mut self, canvas: Rect) {
        self.canvas = canvas;
        self.canvas_set = true;
    }
}

/// Arena of operations addressed by stable [`OperationId`]s.
///
/// Removed operations leave tombstones so ids stay valid for the lifetime of the graph. Links are
/// stored on input sockets only; [`OperationGraph::links`] derives the edge list.
#[derive(Debug, Default)]
pub struct OperationGraph {
    nodes: Vec<Option<OperationNode>>,
    proxies: Vec<Option<MemoryProxy>>,
}

impl OperationGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation, returning its handle.
    pub fn add_operation(&mut self, op: Box<dyn Operation>) -> OperationId {
        let id = OperationId(self.nodes.len() as u32);
        let decl = op.sockets();
        let inputs = decl
            .inputs()
            .iter()
            .map(|&(data_type, resize_mode)| InputSocket {
                data_type,
                resize_mode,
                link: None,
            })
            .collect();
        let flags = op.flags();
        self.nodes.push(Some(OperationNode {
            id,
            op,
            flags,
            inputs,
            output: decl.output_type(),
            canvas: Rect::NONE,
            canvas_set: false,
            memory_proxy: None,
        }));
        id
    }

    /// Remove an operation. Links of its inputs vanish with it; consumers keep dangling links
    /// until the caller relinks them.
    pub fn remove_operation(&mut self, id: OperationId) -> Option<OperationNode> {
        self.nodes.get_mut(id.index()).and_then(Option::take)
    }

    /// Live operation by id.
    pub fn node(&self, id: OperationId) -> Option<&OperationNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn node_mut(&mut self, id: OperationId) -> Option<&mut OperationNode> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Return `true` when `id` refers to a live operation.
    pub fn contains(&self, id: OperationId) -> bool {
        self.node(id).is_some()
    }

    /// Live operations in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &OperationNode> {
        self.nodes.iter().filter_map(Option::as_ref)
    }

    /// Ids of live operations in insertion order.
    pub fn operation_ids(&self) -> Vec<OperationId> {
        self.nodes().map(|n| n.id).collect()
    }

    /// Number of live operations.
    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    /// Return `true` when no operation is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Link `from`'s output to input `input` of `to`, replacing any previous link.
    ///
    /// Returns `false` (and changes nothing) when either end does not exist, `from` has no output
    /// or `to` has no such input.
    pub fn add_link(&mut self, from: OperationId, to: OperationId, input: usize) -> bool {
        let from_type = self.node(from).and_then(OperationNode::output_type);
        if from_type.is_none() {
            return false;
        }
        match self.node_mut(to).and_then(|n| n.inputs.get_mut(input)) {
            Some(socket) => {
                socket.link = Some(from);
                true
            }
            None => false,
        }
    }

    /// Unlink input `input` of `to`, returning the former producer.
    pub fn remove_input_link(&mut self, to: OperationId, input: usize) -> Option<OperationId> {
        self.node_mut(to)
            .and_then(|n| n.inputs.get_mut(input))
            .and_then(|s| s.link.take())
    }

    /// Every edge of the graph, ordered by consumer then input index.
    pub fn links(&self) -> Vec<Link> {
        self.nodes()
            .flat_map(|n| {
                n.inputs.iter().enumerate().filter_map(move |(input, s)| {
                    s.link.map(|from| Link {
                        from,
                        to: n.id,
                        input,
                    })
                })
            })
            .collect()
    }

    /// Consumers of `id`'s output as `(operation, input)` pairs.
    pub fn consumers(&self, id: OperationId) -> Vec<(OperationId, usize)> {
        self.nodes()
            .flat_map(|n| {
                n.inputs
                    .iter()
                    .enumerate()
                    .filter(move |(_, s)| s.link == Some(id))
                    .map(move |(input, _)| (n.id, input))
            })
            .collect()
    }

    /// Drop every input link of `unlinked` and move its consumers over to `linked`.
    pub fn unlink_inputs_and_relink_outputs(&mut self, unlinked: OperationId, linked: OperationId) {
        if let Some(n) = self.node_mut(unlinked) {
            for s in n.inputs.iter_mut() {
                s.link = None;
            }
        }
        for slot in self.nodes.iter_mut().flatten() {
            for s in slot.inputs.iter_mut() {
                if s.link == Some(unlinked) {
                    s.link = Some(linked);
                }
            }
        }
    }

    /// Operations that are outputs in the given context, in insertion order.
    pub fn output_operations(&self, is_rendering: bool) -> Vec<OperationId> {
        self.nodes()
            .filter(|n| n.is_output(is_rendering))
            .map(|n| n.id)
            .collect()
    }

    /// Create a proxy written by `write_operation` and attach it to that operation.
    pub(crate) fn add_memory_proxy(
        &mut self,
        write_operation: OperationId,
        data_type: DataType,
    ) -> ProxyId {
        let id = ProxyId(self.proxies.len() as u32);
        self.proxies
            .push(Some(MemoryProxy::new(id, write_operation, data_type)));
        if let Some(n) = self.node_mut(write_operation) {
            n.memory_proxy = Some(id);
        }
        id
    }

    pub(crate) fn set_memory_proxy(&mut self, op: OperationId, proxy: ProxyId) {
        if let Some(n) = self.node_mut(op) {
            n.memory_proxy = Some(proxy);
        }
    }

    /// Proxy by id.
    pub fn proxy(&self, id: ProxyId) -> Option<&MemoryProxy> {
        self.proxies.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn proxy_mut(&mut self, id: ProxyId) -> Option<&mut MemoryProxy> {
        self.proxies.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Live proxies.
    pub fn proxies(&self) -> impl Iterator<Item = &MemoryProxy> {
        self.proxies.iter().filter_map(Option::as_ref)
    }

    pub(crate) fn remove_proxy(&mut self, id: ProxyId) {
        if let Some(slot) = self.proxies.get_mut(id.index()) {
            *slot = None;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/operation/graph.rs"]
mod tests;
