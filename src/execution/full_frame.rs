use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::config::RenderPriority;
use crate::execution::system::{SystemState, output_border};
use crate::foundation::ids::OperationId;
use crate::foundation::rect::Rect;
use crate::memory::buffer::MemoryBuffer;
use crate::scheduler::work::WorkPackage;
use crate::scheduler::work_scheduler::WorkScheduler;

/// Counts finished row bands of one `execute_work` call.
#[derive(Default)]
struct BandSync {
    finished: Mutex<usize>,
    cond: Condvar,
}

impl BandSync {
    fn band_finished(&self, total: usize) {
        let mut finished = self.finished.lock();
        *finished += 1;
        if *finished == total {
            self.cond.notify_one();
        }
    }

    fn wait(&self, total: usize) {
        let mut finished = self.finished.lock();
        while *finished < total {
            self.cond.wait(&mut finished);
        }
    }
}

/// Split `area` into at most `bands` horizontal bands, spreading the remainder one row at a
/// time over the first bands.
pub(crate) fn split_rows(area: Rect, bands: usize) -> Vec<Rect> {
    let height = area.height() as usize;
    let count = bands.min(height);
    if count == 0 {
        return Vec::new();
    }
    let split = height / count;
    let mut remaining = height - split * count;
    let mut y = area.ymin;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let mut h = split;
        if remaining > 0 {
            h += 1;
            remaining -= 1;
        }
        out.push(Rect::new(area.xmin, area.xmax, y, y + h as i32));
        y += h as i32;
    }
    out
}

/// Operation-at-a-time execution: every operation renders the areas its consumers need, after
/// all of its inputs, and its buffer is released once its last reader finished.
pub(crate) struct FullFrameExecution<'a> {
    state: &'a Arc<SystemState>,
    scheduler: &'a WorkScheduler,
    areas: HashMap<OperationId, Vec<Rect>>,
    registered_reads: HashMap<OperationId, usize>,
    received_reads: HashMap<OperationId, usize>,
    buffers: HashMap<OperationId, Arc<MemoryBuffer>>,
    rendered: HashSet<OperationId>,
    operations_total: usize,
}

impl<'a> FullFrameExecution<'a> {
    pub(crate) fn new(state: &'a Arc<SystemState>, scheduler: &'a WorkScheduler) -> Self {
        Self {
            state,
            scheduler,
            areas: HashMap::new(),
            registered_reads: HashMap::new(),
            received_reads: HashMap::new(),
            buffers: HashMap::new(),
            rendered: HashSet::new(),
            operations_total: state.graph.len(),
        }
    }

    fn priorities(&self) -> &'static [RenderPriority] {
        if self.state.context.settings().fast_calculation {
            &[RenderPriority::High]
        } else {
            &RenderPriority::ALL
        }
    }

    fn priority_outputs(&self, priority: RenderPriority) -> Vec<OperationId> {
        let is_rendering = self.state.context.settings().is_rendering;
        self.state
            .graph
            .nodes()
            .filter(|n| {
                n.is_output(is_rendering) && n.operation().render_priority(is_rendering) == priority
            })
            .map(|n| n.id())
            .collect()
    }

    /// Render every output. Returns `(operations rendered, cancelled)`.
    pub(crate) fn execute(mut self) -> (usize, bool) {
        let settings = self.state.context.settings();
        for &priority in self.priorities() {
            for output in self.priority_outputs(priority) {
                let area = self
                    .state
                    .graph
                    .node(output)
                    .map_or(Rect::NONE, |n| output_border(n, settings));
                self.determine_areas_to_render(output, area);
                self.determine_reads(output);
            }
        }
        debug!(operations = self.areas.len(), "registered areas to render");

        for &priority in self.priorities() {
            for output in self.priority_outputs(priority) {
                let has_size = self
                    .state
                    .graph
                    .node(output)
                    .is_some_and(|n| !n.canvas().is_empty());
                if !has_size {
                    continue;
                }
                self.render_output_dependencies(output);
                self.render_operation(output);
                if self.state.context.is_breaked() {
                    info!("full-frame execution cancelled");
                    return (self.rendered.len(), true);
                }
            }
        }
        (self.rendered.len(), false)
    }

    fn is_area_registered(&self, op: OperationId, area: &Rect) -> bool {
        self.areas
            .get(&op)
            .is_some_and(|areas| areas.iter().any(|r| r.contains_rect(area)))
    }

    fn determine_areas_to_render(&mut self, output: OperationId, area: Rect) {
        let graph = &self.state.graph;
        let mut stack = vec![(output, area)];
        while let Some((op, area)) = stack.pop() {
            if area.is_empty() || self.is_area_registered(op, &area) {
                continue;
            }
            self.areas.entry(op).or_default().push(area);
            let Some(node) = graph.node(op) else {
                continue;
            };
            for (input, socket) in node.inputs().iter().enumerate() {
                let Some(from) = socket.link.and_then(|id| graph.node(id)) else {
                    continue;
                };
                let input_area = node
                    .operation()
                    .area_of_interest(input, area)
                    .intersect(&from.canvas());
                stack.push((from.id(), input_area));
            }
        }
    }

    fn determine_reads(&mut self, output: OperationId) {
        let graph = &self.state.graph;
        let mut stack = vec![output];
        while let Some(op) = stack.pop() {
            let Some(node) = graph.node(op) else {
                continue;
            };
            for from in node.inputs().iter().filter_map(|s| s.link) {
                if !self.registered_reads.contains_key(&from) {
                    stack.push(from);
                }
                *self.registered_reads.entry(from).or_default() += 1;
            }
        }
    }

    /// Transitive inputs of `op`, deepest first.
    fn operation_dependencies(&self, op: OperationId) -> Vec<OperationId> {
        let graph = &self.state.graph;
        let mut dependencies = Vec::new();
        let mut next = vec![op];
        while !next.is_empty() {
            let outputs = std::mem::take(&mut next);
            for id in outputs {
                if let Some(node) = graph.node(id) {
                    next.extend(node.inputs().iter().filter_map(|s| s.link));
                }
            }
            dependencies.extend_from_slice(&next);
        }
        dependencies.reverse();
        dependencies
    }

    fn render_output_dependencies(&mut self, output: OperationId) {
        for op in self.operation_dependencies(output) {
            if !self.rendered.contains(&op) {
                self.render_operation(op);
            }
        }
    }

    fn input_buffers(&self, op: OperationId) -> Vec<Arc<MemoryBuffer>> {
        let Some(node) = self.state.graph.node(op) else {
            return Vec::new();
        };
        node.inputs()
            .iter()
            .map(|s| {
                s.link
                    .and_then(|from| self.buffers.get(&from).cloned())
                    .unwrap_or_else(|| {
                        let zero = [0.0f32; 4];
                        Arc::new(MemoryBuffer::from_elem(
                            s.data_type,
                            &zero[..s.data_type.num_channels()],
                        ))
                    })
            })
            .collect()
    }

    fn render_operation(&mut self, op: OperationId) {
        let Some(node) = self.state.graph.node(op) else {
            return;
        };
        let canvas = node.canvas();
        let inputs = self.input_buffers(op);
        let areas = self.areas.get(&op).cloned().unwrap_or_default();

        if let Some(dt) = node.output_type() {
            let buffer = match node.operation().constant_elem() {
                Some(elem) if node.flags().is_constant_operation => {
                    MemoryBuffer::from_elem(dt, elem)
                }
                _ => {
                    let mut buffer = MemoryBuffer::new(dt, canvas);
                    if !canvas.is_empty() {
                        for &area in &areas {
                            for (band, out) in self.render_area(op, area, &inputs) {
                                buffer.copy_from(&out, band);
                            }
                        }
                    }
                    buffer
                }
            };
            self.buffers.insert(op, Arc::new(buffer));
        } else if !canvas.is_empty() {
            for &area in &areas {
                self.render_area(op, area, &inputs);
            }
        }
        self.rendered.insert(op);
        self.operation_finished(op);
    }

    /// Render `area` of `op` in row bands on the scheduler. Sinks write directly and return no
    /// bands.
    fn render_area(
        &self,
        op: OperationId,
        area: Rect,
        inputs: &[Arc<MemoryBuffer>],
    ) -> Vec<(Rect, MemoryBuffer)> {
        let inputs: Arc<[Arc<MemoryBuffer>]> = inputs.iter().cloned().collect();
        let state = Arc::clone(self.state);
        self.execute_work(area, move |band| {
            let node = state.graph.node(op)?;
            let refs: Vec<&MemoryBuffer> = inputs.iter().map(|b| b.as_ref()).collect();
            match node.output_type() {
                Some(dt) => {
                    let producer = node.operation().as_area_producer()?;
                    let mut out = MemoryBuffer::new(dt, band);
                    producer.update_memory_buffer_partial(&mut out, band, &refs);
                    Some(out)
                }
                None => {
                    let sink = node.operation().as_output_sink()?;
                    sink.write_region(refs.first()?, band);
                    None
                }
            }
        })
    }

    /// Split `area` into row bands, one package each, and wait for all of them.
    pub(crate) fn execute_work(
        &self,
        area: Rect,
        work: impl Fn(Rect) -> Option<MemoryBuffer> + Send + Sync + 'static,
    ) -> Vec<(Rect, MemoryBuffer)> {
        if self.state.context.is_breaked() {
            return Vec::new();
        }
        let bands = split_rows(area, self.scheduler.num_threads());
        let total = bands.len();
        let work = Arc::new(work);
        let results: Arc<Mutex<Vec<(Rect, MemoryBuffer)>>> = Arc::new(Mutex::new(Vec::new()));
        let sync = Arc::new(BandSync::default());
        for band in bands {
            let work = Arc::clone(&work);
            let results = Arc::clone(&results);
            let state = Arc::clone(self.state);
            let sync = Arc::clone(&sync);
            let package = WorkPackage::custom(move || {
                if state.context.is_breaked() {
                    return;
                }
                if let Some(out) = work(band) {
                    results.lock().push((band, out));
                }
            })
            .on_executed(move || sync.band_finished(total));
            self.scheduler.schedule(package);
        }
        self.scheduler.finish();
        sync.wait(total);
        std::mem::take(&mut *results.lock())
    }

    fn operation_finished(&mut self, op: OperationId) {
        let inputs: Vec<OperationId> = self
            .state
            .graph
            .node(op)
            .map(|n| n.inputs().iter().filter_map(|s| s.link).collect())
            .unwrap_or_default();
        for from in inputs {
            let received = self.received_reads.entry(from).or_default();
            *received += 1;
            if *received >= self.registered_reads.get(&from).copied().unwrap_or(0) {
                self.buffers.remove(&from);
            }
        }
        let finished = self.rendered.len();
        self.state
            .context
            .update_progress(finished as f32 / self.operations_total.max(1) as f32);
    }

    #[cfg(test)]
    pub(crate) fn registered_areas(&self, op: OperationId) -> &[Rect] {
        self.areas.get(&op).map(Vec::as_slice).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/execution/full_frame.rs"]
mod tests;
