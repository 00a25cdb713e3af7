use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::config::{CompositorSettings, RenderPriority};
use crate::execution::system::{SystemState, output_border};
use crate::execution::tiled::{TileJob, determine_depending_area};
use crate::foundation::ids::{GroupId, OperationId};
use crate::foundation::rect::Rect;
use crate::operation::graph::{OperationGraph, OperationNode};
use crate::operation::traits::ChunkOrdering;
use crate::scheduler::work::WorkPackage;
use crate::scheduler::work_scheduler::WorkScheduler;

/// Divider of the rule-of-thirds hotspot bias.
const RULE_OF_THIRDS_DIVIDER: f32 = 100.0;

/// Lifecycle of one chunk. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum ChunkState {
    /// Not handed to the scheduler yet.
    NotScheduled,
    /// Queued or running.
    Scheduled,
    /// Rendered and finalized.
    Executed,
}

/// Properties a group inherits from its operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct GroupFlags {
    /// A non-buffer operation was added.
    pub initialized: bool,
    /// Rooted at an output operation.
    pub is_output: bool,
    /// Rooted at a complex operation.
    pub complex: bool,
    /// May run on the GPU device.
    pub open_cl: bool,
    /// Rendered as one chunk.
    pub single_threaded: bool,
}

/// A connected set of operations evaluated together, chunk by chunk, over the canvas of its
/// output operation (the first operation added).
#[derive(Debug)]
pub struct ExecutionGroup {
    id: GroupId,
    operations: Vec<OperationId>,
    read_operations: Vec<OperationId>,
    flags: GroupFlags,
    viewer_border: Rect,
    chunk_size: i32,
    x_chunks_len: usize,
    y_chunks_len: usize,
    chunk_rects: Vec<Rect>,
    chunk_states: Mutex<Vec<ChunkState>>,
    chunks_finished: AtomicUsize,
}

impl ExecutionGroup {
    pub(crate) fn new(id: GroupId) -> Self {
        Self {
            id,
            operations: Vec::new(),
            read_operations: Vec::new(),
            flags: GroupFlags::default(),
            viewer_border: Rect::NONE,
            chunk_size: 1,
            x_chunks_len: 0,
            y_chunks_len: 0,
            chunk_rects: Vec::new(),
            chunk_states: Mutex::new(Vec::new()),
            chunks_finished: AtomicUsize::new(0),
        }
    }

    /// Handle of this group.
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Member operations, output operation first.
    pub fn operations(&self) -> &[OperationId] {
        &self.operations
    }

    /// Read-buffer operations feeding this group from other groups.
    pub fn read_operations(&self) -> &[OperationId] {
        &self.read_operations
    }

    /// Operation whose canvas the group renders.
    pub fn output_operation(&self) -> Option<OperationId> {
        self.operations.first().copied()
    }

    /// Group flags.
    pub fn flags(&self) -> GroupFlags {
        self.flags
    }

    pub(crate) fn set_output(&mut self, is_output: bool) {
        self.flags.is_output = is_output;
    }

    /// Rendered area: the output canvas, narrowed by a border when the output opts in.
    pub fn viewer_border(&self) -> Rect {
        self.viewer_border
    }

    /// Number of chunks.
    pub fn chunks_len(&self) -> usize {
        self.chunk_rects.len()
    }

    /// Chunk columns.
    pub fn x_chunks_len(&self) -> usize {
        self.x_chunks_len
    }

    /// Chunk rows.
    pub fn y_chunks_len(&self) -> usize {
        self.y_chunks_len
    }

    /// Rectangle of chunk `index`.
    pub fn chunk_rect(&self, index: usize) -> Option<Rect> {
        self.chunk_rects.get(index).copied()
    }

    /// All chunk rectangles in index order.
    pub fn chunk_rects(&self) -> &[Rect] {
        &self.chunk_rects
    }

    /// State of chunk `index`.
    pub fn chunk_state(&self, index: usize) -> Option<ChunkState> {
        self.chunk_states.lock().get(index).copied()
    }

    /// States of all chunks in index order.
    pub fn chunk_states(&self) -> Vec<ChunkState> {
        self.chunk_states.lock().clone()
    }

    /// Number of finalized chunks since the last execution start.
    pub fn chunks_finished(&self) -> usize {
        self.chunks_finished.load(Ordering::Acquire)
    }

    /// Return `true` when `node` may join this group.
    pub(crate) fn can_contain(&self, node: &OperationNode) -> bool {
        let flags = node.flags();
        if !self.flags.initialized || flags.is_read_buffer {
            return true;
        }
        if flags.is_write_buffer {
            return false;
        }
        if flags.is_set_operation {
            return true;
        }
        !(self.flags.complex || flags.complex)
    }

    /// Add `node` when [`can_contain`](Self::can_contain) allows it.
    pub(crate) fn add_operation(&mut self, node: &OperationNode) -> bool {
        if !self.can_contain(node) {
            return false;
        }
        let flags = node.flags();
        if !flags.is_read_buffer && !flags.is_write_buffer {
            self.flags.complex = flags.complex;
            self.flags.open_cl = flags.open_cl;
            self.flags.single_threaded = flags.single_threaded;
            self.flags.initialized = true;
        }
        self.operations.push(node.id());
        true
    }

    /// Priority of the output operation.
    pub(crate) fn render_priority(
        &self,
        graph: &OperationGraph,
        is_rendering: bool,
    ) -> RenderPriority {
        self.output_operation()
            .and_then(|id| graph.node(id))
            .map_or(RenderPriority::Low, |n| {
                n.operation().render_priority(is_rendering)
            })
    }

    /// Resolve the rendered border and partition it into chunks.
    pub(crate) fn init_execution(&mut self, graph: &OperationGraph, settings: &CompositorSettings) {
        self.read_operations = self
            .operations
            .iter()
            .copied()
            .filter(|&id| graph.node(id).is_some_and(|n| n.flags().is_read_buffer))
            .collect();
        let Some(output) = self.output_operation().and_then(|id| graph.node(id)) else {
            self.init_chunks(Rect::NONE, settings.chunk_size);
            return;
        };
        let border = output_border(output, settings);
        self.init_chunks(border, settings.chunk_size);
    }

    /// Partition `border` into chunks of `chunk_size`, clipping the last row and column.
    pub(crate) fn init_chunks(&mut self, border: Rect, chunk_size: u32) {
        self.viewer_border = border;
        self.chunk_size = i32::try_from(chunk_size.max(1)).unwrap_or(i32::MAX);
        let cs = self.chunk_size;
        if self.flags.single_threaded {
            self.x_chunks_len = 1;
            self.y_chunks_len = 1;
            self.chunk_rects = vec![border];
        } else {
            self.x_chunks_len = (border.width() as usize).div_ceil(cs as usize);
            self.y_chunks_len = (border.height() as usize).div_ceil(cs as usize);
            self.chunk_rects = (0..self.y_chunks_len)
                .flat_map(|y| (0..self.x_chunks_len).map(move |x| (x as i32, y as i32)))
                .map(|(x, y)| {
                    let xmin = border.xmin + x * cs;
                    let ymin = border.ymin + y * cs;
                    Rect::new(
                        xmin,
                        xmin.saturating_add(cs).min(border.xmax),
                        ymin,
                        ymin.saturating_add(cs).min(border.ymax),
                    )
                })
                .collect();
        }
        self.reset_chunks();
    }

    pub(crate) fn reset_chunks(&self) {
        *self.chunk_states.lock() = vec![ChunkState::NotScheduled; self.chunk_rects.len()];
        self.chunks_finished.store(0, Ordering::Release);
    }

    /// Chunk order requested by the output operation.
    pub(crate) fn execution_order(&self, graph: &OperationGraph, seed: u64) -> Vec<usize> {
        let (ordering, center) = self
            .output_operation()
            .and_then(|id| graph.node(id))
            .map_or((ChunkOrdering::Default, [0.5, 0.5]), |n| {
                n.operation().chunk_ordering()
            });
        self.execution_order_for(ordering, center, seed)
    }

    /// Permutation of chunk indices in scheduling order.
    pub(crate) fn execution_order_for(
        &self,
        ordering: ChunkOrdering,
        center: [f32; 2],
        seed: u64,
    ) -> Vec<usize> {
        let chunks_len = self.chunks_len();
        let mut order: Vec<usize> = (0..chunks_len).collect();
        let border_w = self.viewer_border.width();
        let border_h = self.viewer_border.height();
        match ordering {
            ChunkOrdering::Default => {}
            ChunkOrdering::Random => {
                let mut rng = StdRng::seed_from_u64(seed);
                order.shuffle(&mut rng);
                order.shuffle(&mut rng);
            }
            ChunkOrdering::CenterOut => {
                let hotspot = Hotspot::new(
                    (border_w as f32 * center[0]) as i32,
                    (border_h as f32 * center[1]) as i32,
                    0.0,
                );
                order = self.sort_by_hotspots(&[hotspot]);
            }
            ChunkOrdering::RuleOfThirds => {
                let tx = border_w / 6;
                let ty = border_h / 6;
                let mx = border_w / 2;
                let my = border_h / 2;
                let bx = mx + 2 * tx;
                let by = my + 2 * ty;
                let addition = chunks_len as f32 / RULE_OF_THIRDS_DIVIDER;
                let hotspots = [
                    Hotspot::new(mx, my, addition * 0.0),
                    Hotspot::new(tx, my, addition * 1.0),
                    Hotspot::new(bx, my, addition * 2.0),
                    Hotspot::new(bx, by, addition * 3.0),
                    Hotspot::new(tx, ty, addition * 4.0),
                    Hotspot::new(bx, ty, addition * 5.0),
                    Hotspot::new(tx, by, addition * 6.0),
                    Hotspot::new(mx, ty, addition * 7.0),
                    Hotspot::new(mx, by, addition * 8.0),
                ];
                order = self.sort_by_hotspots(&hotspots);
            }
        }
        order
    }

    /// Chunk indices sorted (stably) by the distance of their origin to the nearest hotspot.
    fn sort_by_hotspots(&self, hotspots: &[Hotspot]) -> Vec<usize> {
        let mut keyed: Vec<(f32, usize)> = self
            .chunk_rects
            .iter()
            .enumerate()
            .map(|(index, r)| {
                let x = r.xmin - self.viewer_border.xmin;
                let y = r.ymin - self.viewer_border.ymin;
                let d = hotspots
                    .iter()
                    .map(|h| h.distance(x, y))
                    .fold(f32::MAX, f32::min);
                (d, index)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        keyed.into_iter().map(|(_, index)| index).collect()
    }

    /// Schedule every chunk, upstream chunks first, until all are executed or the host breaks.
    ///
    /// At most `2 * threads` pending chunks are looked at per round; each round ends at the
    /// scheduler barrier.
    pub(crate) fn execute(&self, state: &Arc<SystemState>, scheduler: &WorkScheduler) {
        let context = &state.context;
        let chunks_len = self.chunks_len();
        if self.viewer_border.is_empty() || chunks_len == 0 || context.is_breaked() {
            return;
        }
        let order = self.execution_order(&state.graph, context.settings().random_seed);
        let max_evaluated = 2 * scheduler.num_threads().max(1);
        let mut start_index = 0;
        loop {
            let mut finished = true;
            let mut start_evaluated = false;
            let mut evaluated = 0;
            let mut breaked = false;
            let mut index = start_index;
            while index < chunks_len && evaluated < max_evaluated {
                let chunk = order[index];
                match self.chunk_state(chunk) {
                    Some(ChunkState::NotScheduled) => {
                        let (x, y) = self.chunk_coords(chunk);
                        self.schedule_chunk_when_possible(state, scheduler, x, y);
                        finished = false;
                        start_evaluated = true;
                        evaluated += 1;
                        breaked |= context.is_breaked();
                    }
                    Some(ChunkState::Scheduled) => {
                        finished = false;
                        start_evaluated = true;
                        evaluated += 1;
                    }
                    Some(ChunkState::Executed) | None => {
                        if !start_evaluated {
                            start_index = index + 1;
                        }
                    }
                }
                index += 1;
            }
            scheduler.finish();
            breaked |= context.is_breaked();
            if finished || breaked {
                break;
            }
        }
    }

    fn chunk_coords(&self, chunk: usize) -> (i64, i64) {
        let x_len = self.x_chunks_len.max(1);
        ((chunk % x_len) as i64, (chunk / x_len) as i64)
    }

    /// Request every chunk intersecting `area`. Returns `true` once all of them are executed.
    pub(crate) fn schedule_area_when_possible(
        &self,
        state: &Arc<SystemState>,
        scheduler: &WorkScheduler,
        area: Rect,
    ) -> bool {
        if self.flags.single_threaded {
            return self.schedule_chunk_when_possible(state, scheduler, 0, 0);
        }
        let b = self.viewer_border;
        let cs = i64::from(self.chunk_size);
        let span = |lo: i32, hi: i32, origin: i32, len: i32| {
            let lo = (i64::from(lo) - i64::from(origin)).max(0);
            let hi = (i64::from(hi) - i64::from(origin)).min(i64::from(len)).max(0);
            (lo / cs)..(hi + cs - 1) / cs
        };
        let mut result = true;
        for x in span(area.xmin, area.xmax, b.xmin, b.width()) {
            for y in span(area.ymin, area.ymax, b.ymin, b.height()) {
                if !self.schedule_chunk_when_possible(state, scheduler, x, y) {
                    result = false;
                }
            }
        }
        result
    }

    /// Schedule chunk `(x, y)` once the upstream areas it reads are executed, requesting them
    /// first. Returns `true` only for chunks already executed or out of range.
    pub(crate) fn schedule_chunk_when_possible(
        &self,
        state: &Arc<SystemState>,
        scheduler: &WorkScheduler,
        x: i64,
        y: i64,
    ) -> bool {
        if x < 0 || x >= self.x_chunks_len as i64 || y < 0 || y >= self.y_chunks_len as i64 {
            return true;
        }
        let chunk = y as usize * self.x_chunks_len + x as usize;
        match self.chunk_state(chunk) {
            Some(ChunkState::Executed) | None => return true,
            Some(ChunkState::Scheduled) => return false,
            Some(ChunkState::NotScheduled) => {}
        }
        let Some(rect) = self.chunk_rect(chunk) else {
            return true;
        };
        let mut can_be_executed = true;
        for &read in &self.read_operations {
            let Some(area) = self
                .output_operation()
                .and_then(|out| determine_depending_area(&state.graph, out, rect, read))
            else {
                continue;
            };
            let producer = state
                .graph
                .node(read)
                .and_then(|n| n.memory_proxy())
                .and_then(|p| state.graph.proxy(p))
                .and_then(|p| p.executor())
                .and_then(|g| state.group(g));
            if let Some(producer) = producer
                && !producer.schedule_area_when_possible(state, scheduler, area)
            {
                can_be_executed = false;
            }
        }
        if can_be_executed {
            self.schedule_chunk(state, scheduler, chunk);
        }
        false
    }

    fn schedule_chunk(&self, state: &Arc<SystemState>, scheduler: &WorkScheduler, chunk: usize) {
        {
            let mut states = self.chunk_states.lock();
            match states.get_mut(chunk) {
                Some(s) if *s == ChunkState::NotScheduled => *s = ChunkState::Scheduled,
                _ => return,
            }
        }
        let job = TileJob::new(Arc::clone(state), self.id, chunk);
        scheduler.schedule(WorkPackage::tile(job, self.flags.open_cl));
    }

    /// Mark chunk `index` executed and report progress.
    pub(crate) fn finalize_chunk_execution(&self, index: usize, state: &SystemState) {
        if let Some(s) = self.chunk_states.lock().get_mut(index) {
            *s = ChunkState::Executed;
        }
        let finished = self.chunks_finished.fetch_add(1, Ordering::AcqRel) + 1;
        let chunks_len = self.chunks_len().max(1);
        state
            .context
            .update_progress(finished as f32 / chunks_len as f32);
    }
}

#[derive(Clone, Copy, Debug)]
struct Hotspot {
    x: i32,
    y: i32,
    addition: f32,
}

impl Hotspot {
    fn new(x: i32, y: i32, addition: f32) -> Self {
        Self { x, y, addition }
    }

    fn distance(&self, x: i32, y: i32) -> f32 {
        let dx = (self.x - x) as f32;
        let dy = (self.y - y) as f32;
        (dx * dx + dy * dy).sqrt() + self.addition
    }
}

#[cfg(test)]
#[path = "../../tests/unit/execution/group.rs"]
mod tests;
