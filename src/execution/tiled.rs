use std::sync::Arc;

use tracing::{debug, info};

use crate::config::RenderPriority;
use crate::execution::system::SystemState;
use crate::foundation::ids::{GroupId, OperationId, ProxyId};
use crate::foundation::rect::Rect;
use crate::memory::buffer::{BufferState, MemoryBuffer, PixelSampler};
use crate::operation::graph::OperationGraph;
use crate::operation::tile::{TileContext, evaluate_pixel};
use crate::scheduler::work_scheduler::WorkScheduler;

/// Area of read operation `read`'s output needed to produce `area` of `op`, or `None` when `op`
/// does not depend on `read`.
pub(crate) fn determine_depending_area(
    graph: &OperationGraph,
    op: OperationId,
    area: Rect,
    read: OperationId,
) -> Option<Rect> {
    if op == read {
        return Some(area);
    }
    let node = graph.node(op)?;
    if node.flags().is_read_buffer {
        return None;
    }
    let mut result: Option<Rect> = None;
    for (input, socket) in node.inputs().iter().enumerate() {
        let Some(from) = socket.link else {
            continue;
        };
        let input_area = node.operation().area_of_interest(input, area);
        if let Some(found) = determine_depending_area(graph, from, input_area, read) {
            result = Some(result.map_or(found, |r| r.union(&found)));
        }
    }
    result
}

/// Rendering of one chunk of one group, executed by a device.
pub(crate) struct TileJob {
    state: Arc<SystemState>,
    group: GroupId,
    chunk: usize,
}

impl TileJob {
    pub(crate) fn new(state: Arc<SystemState>, group: GroupId, chunk: usize) -> Self {
        Self {
            state,
            group,
            chunk,
        }
    }

    pub(crate) fn group(&self) -> GroupId {
        self.group
    }

    pub(crate) fn chunk(&self) -> usize {
        self.chunk
    }

    /// Render the chunk and finalize it. Consolidated input buffers live only for the call.
    pub(crate) fn execute(self) {
        let state = &*self.state;
        let Some(group) = state.group(self.group) else {
            return;
        };
        if let (Some(rect), Some(output)) =
            (group.chunk_rect(self.chunk), group.output_operation())
        {
            let buffers =
                input_memory_buffers(&state.graph, output, group.read_operations(), rect);
            render_chunk(&state.graph, output, rect, &buffers);
        }
        group.finalize_chunk_execution(self.chunk, state);
    }
}

impl std::fmt::Debug for TileJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileJob")
            .field("group", &self.group)
            .field("chunk", &self.chunk)
            .finish()
    }
}

/// Copy the part of every read proxy the chunk depends on into a temporary buffer.
fn input_memory_buffers(
    graph: &OperationGraph,
    output: OperationId,
    reads: &[OperationId],
    rect: Rect,
) -> Vec<(ProxyId, MemoryBuffer)> {
    let mut buffers = Vec::with_capacity(reads.len());
    for &read in reads {
        let Some(area) = determine_depending_area(graph, output, rect, read) else {
            continue;
        };
        let Some(proxy) = graph
            .node(read)
            .and_then(|n| n.memory_proxy())
            .and_then(|p| graph.proxy(p))
        else {
            continue;
        };
        if buffers.iter().any(|(id, _)| *id == proxy.id()) {
            continue;
        }
        let mut consolidated =
            MemoryBuffer::with_state(proxy.data_type(), area, false, BufferState::Temporary);
        if let Some(src) = proxy.buffer().as_ref() {
            consolidated.fill_from(src);
        }
        buffers.push((proxy.id(), consolidated));
    }
    buffers
}

/// Evaluate input 0 of the group output over `rect` and hand the pixels to its destination.
fn render_chunk(
    graph: &OperationGraph,
    output: OperationId,
    rect: Rect,
    buffers: &[(ProxyId, MemoryBuffer)],
) {
    let Some(node) = graph.node(output) else {
        return;
    };
    let Some(from) = node.input_link(0) else {
        return;
    };
    let Some(data_type) = node.inputs().first().map(|s| s.data_type) else {
        return;
    };
    let ctx = TileContext { graph, buffers };
    let mut out = MemoryBuffer::with_state(data_type, rect, false, BufferState::Temporary);
    let mut px = [0.0f32; 4];
    let n = data_type.num_channels();
    for y in rect.ymin..rect.ymax {
        for x in rect.xmin..rect.xmax {
            let (fx, fy) = (x as f32, y as f32);
            evaluate_pixel(&ctx, from, &mut px[..n], fx, fy, PixelSampler::Nearest);
            out.write_elem(x, y, &px[..n]);
        }
    }

    if node.flags().is_write_buffer {
        if let Some(proxy) = node.memory_proxy().and_then(|p| graph.proxy(p)) {
            proxy.write_region(&out, rect);
        }
    } else if let Some(sink) = node.operation().as_output_sink() {
        sink.write_region(&out, rect);
    }
}

/// Run the output groups of the tiled model, priority by priority.
///
/// Returns `true` when the host break callback stopped the run.
pub(crate) fn execute_tiled(state: &Arc<SystemState>, scheduler: &WorkScheduler) -> bool {
    let settings = state.context.settings();
    for proxy in state.graph.proxies() {
        let canvas = state
            .graph
            .node(proxy.write_operation())
            .map_or(Rect::NONE, |n| n.canvas());
        proxy.allocate_rect(canvas);
    }
    for group in &state.groups {
        group.reset_chunks();
    }

    let priorities: &[RenderPriority] = if settings.fast_calculation {
        &[RenderPriority::High]
    } else {
        &RenderPriority::ALL
    };
    for &priority in priorities {
        let selected = state.groups.iter().filter(|g| {
            g.flags().is_output
                && g.render_priority(&state.graph, settings.is_rendering) == priority
        });
        for group in selected {
            debug!(
                group = %group.id(),
                chunks = group.chunks_len(),
                ?priority,
                "executing group"
            );
            group.execute(state, scheduler);
            if state.context.is_breaked() {
                info!("tiled execution cancelled");
                free_proxies(state);
                return true;
            }
        }
    }
    free_proxies(state);
    false
}

fn free_proxies(state: &SystemState) {
    for proxy in state.graph.proxies() {
        proxy.free();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/execution/tiled.rs"]
mod tests;
