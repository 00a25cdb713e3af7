use tracing::{info, warn};

use crate::builder::buffers::add_complex_operation_buffers;
use crate::builder::canvas::determine_canvases;
use crate::builder::convert::{
    add_datatype_conversions, add_input_constants, convert_nodes, resolve_proxies,
};
use crate::builder::fold::fold_constants;
use crate::builder::group::group_operations;
use crate::builder::merge::merge_equal_operations;
use crate::builder::prune::prune_operations;
use crate::builder::{BuildPass, BuildReport};
use crate::config::{CompositorContext, ExecutionModel};
use crate::debug::dump_stage;
use crate::execution::group::ExecutionGroup;
use crate::foundation::error::{CompositorError, CompositorResult};
use crate::node::graph::NodeGraph;
use crate::operation::graph::OperationGraph;

/// Output of [`NodeOperationBuilder::build`].
#[derive(Debug)]
pub struct BuiltGraph {
    /// Compiled operation graph.
    pub graph: OperationGraph,
    /// Execution groups; empty unless [`BuildPass::GroupOperations`] ran.
    pub groups: Vec<ExecutionGroup>,
    /// Per-stage counters.
    pub report: BuildReport,
}

/// Compiles node graphs into operation graphs for one compositor context.
#[derive(Debug)]
pub struct NodeOperationBuilder<'a> {
    context: &'a CompositorContext,
    passes: Vec<BuildPass>,
}

impl<'a> NodeOperationBuilder<'a> {
    /// Builder running the passes of the context's execution model.
    pub fn new(context: &'a CompositorContext) -> Self {
        Self {
            context,
            passes: BuildPass::for_model(context.execution_model()).to_vec(),
        }
    }

    /// Replace the optional passes.
    pub fn with_passes(mut self, passes: impl IntoIterator<Item = BuildPass>) -> Self {
        self.passes = passes.into_iter().collect();
        self
    }

    /// Optional passes that will run.
    pub fn passes(&self) -> &[BuildPass] {
        &self.passes
    }

    fn runs(&self, pass: BuildPass) -> bool {
        self.passes.contains(&pass)
    }

    /// Compile `nodes`.
    ///
    /// Broken links and missing converters are dropped with a warning and counted in the report.
    /// Fails only on invalid settings or when an operation cannot render in the selected
    /// execution model.
    #[tracing::instrument(
        skip(self, nodes),
        fields(nodes = nodes.len(), model = ?self.context.execution_model())
    )]
    pub fn build(&self, nodes: &NodeGraph) -> CompositorResult<BuiltGraph> {
        let settings = self.context.settings();
        settings.validate()?;
        let mut report = BuildReport::default();

        let (mut state, dropped) = convert_nodes(nodes, self.context);
        report.dropped_links = dropped;
        report.inserted_constants = add_input_constants(&mut state, nodes);
        let mut graph = state.graph;
        report.resolved_proxies = resolve_proxies(&mut graph);
        (report.datatype_conversions, report.missing_conversions) =
            add_datatype_conversions(&mut graph);

        if self.runs(BuildPass::ConstantFolding) {
            dump_stage(self.context, "prior_folding", &graph, &[]);
            report.folded = fold_constants(&mut graph);
        }

        report.canvas_conversions = determine_canvases(&mut graph, settings.is_rendering);

        if self.runs(BuildPass::MergeEqualOperations) {
            dump_stage(self.context, "prior_merging", &graph, &[]);
            report.merged = merge_equal_operations(&mut graph);
        }

        if self.runs(BuildPass::ComplexOperationBuffers) {
            report.buffer_pairs = add_complex_operation_buffers(&mut graph);
        }

        report.pruned = prune_operations(&mut graph, settings.is_rendering);

        let groups = if self.runs(BuildPass::GroupOperations) {
            group_operations(&mut graph, settings.is_rendering)
        } else {
            Vec::new()
        };

        report.groups = groups.len();
        report.operations = graph.len();
        report.outputs = graph.output_operations(settings.is_rendering).len();
        if report.outputs == 0 {
            warn!("compiled graph has no output operation");
        }

        self.validate_capabilities(&graph)?;
        info!(
            operations = report.operations,
            groups = report.groups,
            dropped_links = report.dropped_links,
            "built operation graph"
        );
        Ok(BuiltGraph {
            graph,
            groups,
            report,
        })
    }

    /// Check every operation exposes the capability the execution model renders it with.
    fn validate_capabilities(&self, graph: &OperationGraph) -> CompositorResult<()> {
        let model = self.context.execution_model();
        for node in graph.nodes() {
            let flags = node.flags();
            let op = node.operation();
            if node.output_type().is_none() {
                if !flags.is_write_buffer && op.as_output_sink().is_none() {
                    return Err(CompositorError::graph(format!(
                        "operation {} ({}) has no output and is not an output sink",
                        node.id(),
                        node.name()
                    )));
                }
                continue;
            }
            if flags.is_constant_operation {
                continue;
            }
            let missing = match model {
                ExecutionModel::Tiled => !flags.is_read_buffer && op.as_pixel_producer().is_none(),
                ExecutionModel::FullFrame => op.as_area_producer().is_none(),
            };
            if missing {
                return Err(CompositorError::graph(format!(
                    "operation {} ({}) cannot render in the {model:?} execution model",
                    node.id(),
                    node.name()
                )));
            }
        }
        Ok(())
    }
}
