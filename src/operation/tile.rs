use crate::foundation::ids::{OperationId, ProxyId};
use crate::foundation::rect::Rect;
use crate::memory::buffer::{MemoryBuffer, MemoryBufferExtend, PixelSampler};
use crate::operation::graph::{OperationGraph, OperationNode};

/// Read-only state shared by every pixel evaluated for one chunk.
pub(crate) struct TileContext<'a> {
    pub(crate) graph: &'a OperationGraph,
    /// Consolidated input buffers of the chunk, keyed by the proxy they were copied from.
    pub(crate) buffers: &'a [(ProxyId, MemoryBuffer)],
}

impl TileContext<'_> {
    fn buffer(&self, proxy: ProxyId) -> Option<&MemoryBuffer> {
        self.buffers
            .iter()
            .find(|(id, _)| *id == proxy)
            .map(|(_, b)| b)
    }
}

/// Input access handed to [`PixelProducer`](crate::PixelProducer) implementations.
///
/// Reading an input evaluates the linked producer at the requested position; buffer reads sample
/// the chunk's consolidated copy of the proxy. Unconnected inputs read as zero.
pub struct TileInputs<'a> {
    ctx: &'a TileContext<'a>,
    node: &'a OperationNode,
}

impl<'a> TileInputs<'a> {
    pub(crate) fn new(ctx: &'a TileContext<'a>, node: &'a OperationNode) -> Self {
        Self { ctx, node }
    }

    /// Number of input sockets of the evaluated operation.
    pub fn len(&self) -> usize {
        self.node.inputs().len()
    }

    /// Return `true` when the evaluated operation has no inputs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Canvas of the producer linked to `input`, [`Rect::NONE`] when unconnected.
    pub fn input_canvas(&self, input: usize) -> Rect {
        self.node
            .input_link(input)
            .and_then(|id| self.ctx.graph.node(id))
            .map_or(Rect::NONE, OperationNode::canvas)
    }

    /// Sample input `input` at `(x, y)`.
    pub fn read_sampled(
        &self,
        input: usize,
        out: &mut [f32],
        x: f32,
        y: f32,
        sampler: PixelSampler,
    ) {
        match self.node.input_link(input) {
            Some(id) => evaluate_pixel(self.ctx, id, out, x, y, sampler),
            None => out.iter_mut().for_each(|v| *v = 0.0),
        }
    }
}

/// Evaluate operation `id` at `(x, y)` into `out`.
pub(crate) fn evaluate_pixel(
    ctx: &TileContext<'_>,
    id: OperationId,
    out: &mut [f32],
    x: f32,
    y: f32,
    sampler: PixelSampler,
) {
    let Some(node) = ctx.graph.node(id) else {
        out.iter_mut().for_each(|v| *v = 0.0);
        return;
    };
    if node.flags().is_read_buffer {
        match node.memory_proxy().and_then(|p| ctx.buffer(p)) {
            Some(buffer) => buffer.read(
                out,
                x,
                y,
                sampler,
                MemoryBufferExtend::Clip,
                MemoryBufferExtend::Clip,
            ),
            None => out.iter_mut().for_each(|v| *v = 0.0),
        }
        return;
    }
    let op = node.operation();
    if let Some(elem) = op.constant_elem() {
        let n = out.len().min(elem.len());
        out[..n].copy_from_slice(&elem[..n]);
        out[n..].iter_mut().for_each(|v| *v = 0.0);
        return;
    }
    match op.as_pixel_producer() {
        Some(p) => p.execute_pixel_sampled(out, x, y, sampler, &TileInputs::new(ctx, node)),
        None => out.iter_mut().for_each(|v| *v = 0.0),
    }
}
