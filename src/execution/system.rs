use std::sync::Arc;

use tracing::info;

use crate::builder::{BuildReport, BuiltGraph, NodeOperationBuilder};
use crate::config::{CompositorContext, CompositorSettings, ExecutionModel};
use crate::debug::{GraphSnapshot, dump_stage};
use crate::execution::full_frame::FullFrameExecution;
use crate::execution::group::{ChunkState, ExecutionGroup};
use crate::execution::tiled::execute_tiled;
use crate::foundation::error::CompositorResult;
use crate::foundation::ids::GroupId;
use crate::foundation::rect::Rect;
use crate::node::graph::NodeGraph;
use crate::operation::graph::{OperationGraph, OperationNode};
use crate::scheduler::work_scheduler::WorkScheduler;

/// Immutable state shared by every work package of a run.
#[derive(Debug)]
pub(crate) struct SystemState {
    pub(crate) context: CompositorContext,
    pub(crate) graph: OperationGraph,
    pub(crate) groups: Vec<ExecutionGroup>,
}

impl SystemState {
    pub(crate) fn group(&self, id: GroupId) -> Option<&ExecutionGroup> {
        self.groups.get(id.index())
    }
}

/// Area of output `node` to render: its canvas, narrowed by the render border and then the
/// viewer border when the operation honours them.
pub(crate) fn output_border(node: &OperationNode, settings: &CompositorSettings) -> Rect {
    let canvas = node.canvas();
    let flags = node.flags();
    let mut border = canvas;
    if flags.use_render_border
        && let Some(b) = settings.render_border
    {
        border = b.apply(canvas);
    }
    if flags.use_viewer_border
        && let Some(b) = settings.viewer_border
    {
        border = b.apply(canvas);
    }
    border
}

/// Summary of one [`ExecutionSystem::execute`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExecutionReport {
    /// Output groups with every chunk executed (tiled model).
    pub groups_executed: usize,
    /// Chunks executed across all groups (tiled model).
    pub chunks_executed: usize,
    /// Operations rendered (full-frame model).
    pub operations_rendered: usize,
    /// The host break callback stopped the run.
    pub cancelled: bool,
}

/// A compiled node graph ready to render.
///
/// Construction builds the operation graph and sizes the execution groups; every
/// [`execute`](Self::execute) renders all outputs once.
#[derive(Debug)]
pub struct ExecutionSystem {
    state: Arc<SystemState>,
    report: BuildReport,
}

impl ExecutionSystem {
    /// Compile `nodes` for `context`.
    #[tracing::instrument(skip(context, nodes))]
    pub fn new(context: CompositorContext, nodes: &NodeGraph) -> CompositorResult<Self> {
        let BuiltGraph {
            graph,
            mut groups,
            report,
        } = NodeOperationBuilder::new(&context).build(nodes)?;
        for group in &mut groups {
            group.init_execution(&graph, context.settings());
        }
        Ok(Self {
            state: Arc::new(SystemState {
                context,
                graph,
                groups,
            }),
            report,
        })
    }

    /// Run context.
    pub fn context(&self) -> &CompositorContext {
        &self.state.context
    }

    /// Compiled operation graph.
    pub fn graph(&self) -> &OperationGraph {
        &self.state.graph
    }

    /// Execution groups (tiled model only).
    pub fn groups(&self) -> &[ExecutionGroup] {
        &self.state.groups
    }

    /// Counters of the build.
    pub fn build_report(&self) -> &BuildReport {
        &self.report
    }

    /// Serializable view of the graph and group states.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::capture(&self.state.graph, &self.state.groups)
    }

    /// Render every output on a scheduler started for this call.
    pub fn execute(&self) -> CompositorResult<ExecutionReport> {
        let mut scheduler = WorkScheduler::new(self.state.context.settings());
        scheduler.start()?;
        let report = self.execute_with_scheduler(&scheduler);
        scheduler.stop();
        report
    }

    /// Render every output on a started `scheduler`.
    #[tracing::instrument(skip_all, fields(model = ?self.state.context.execution_model()))]
    pub fn execute_with_scheduler(
        &self,
        scheduler: &WorkScheduler,
    ) -> CompositorResult<ExecutionReport> {
        let state = &self.state;
        dump_stage(
            &state.context,
            "prior_rendering",
            &state.graph,
            &state.groups,
        );
        for node in state.graph.nodes() {
            node.operation().init_execution(node.canvas());
        }

        let mut report = ExecutionReport::default();
        match state.context.execution_model() {
            ExecutionModel::Tiled => {
                report.cancelled = execute_tiled(state, scheduler);
                for group in state.groups.iter().filter(|g| g.flags().is_output) {
                    let states = group.chunk_states();
                    let executed = states
                        .iter()
                        .filter(|&&s| s == ChunkState::Executed)
                        .count();
                    if executed == states.len() {
                        report.groups_executed += 1;
                    }
                }
                report.chunks_executed = state.groups.iter().map(|g| g.chunks_finished()).sum();
            }
            ExecutionModel::FullFrame => {
                let (rendered, cancelled) = FullFrameExecution::new(state, scheduler).execute();
                report.operations_rendered = rendered;
                report.cancelled = cancelled;
            }
        }

        for node in state.graph.nodes() {
            node.operation().deinit_execution();
        }
        info!(
            groups = report.groups_executed,
            chunks = report.chunks_executed,
            operations = report.operations_rendered,
            cancelled = report.cancelled,
            "execution finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/execution/system.rs"]
mod tests;
