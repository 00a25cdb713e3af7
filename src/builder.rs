//! Compile a [`NodeGraph`](crate::NodeGraph) into an executable operation graph.
//!
//! The pipeline always converts nodes, binds unconnected inputs to constants, resolves proxies,
//! inserts datatype conversions, determines canvases and prunes unreachable operations. The
//! remaining stages are [`BuildPass`]es the execution model opts into.

pub(crate) mod buffers;
pub(crate) mod canvas;
pub(crate) mod convert;
pub(crate) mod fold;
pub(crate) mod group;
pub(crate) mod merge;
pub(crate) mod pipeline;
pub(crate) mod prune;

use crate::config::ExecutionModel;

/// Optional pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPass {
    /// Replace operations whose inputs are all constant by their constant result.
    ConstantFolding,
    /// Coalesce structurally identical operations.
    MergeEqualOperations,
    /// Isolate complex operations behind read/write buffer pairs.
    ComplexOperationBuffers,
    /// Partition the graph into execution groups.
    GroupOperations,
}

impl BuildPass {
    /// Passes the given execution model runs, in pipeline order.
    pub fn for_model(model: ExecutionModel) -> &'static [BuildPass] {
        match model {
            ExecutionModel::Tiled => &[
                BuildPass::ComplexOperationBuffers,
                BuildPass::GroupOperations,
            ],
            ExecutionModel::FullFrame => &[
                BuildPass::ConstantFolding,
                BuildPass::MergeEqualOperations,
            ],
        }
    }
}

/// What each stage of a build did.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct BuildReport {
    /// Node links without a converted producer or consumer.
    pub dropped_links: usize,
    /// Constants bound to unconnected inputs.
    pub inserted_constants: usize,
    /// Links rerouted around proxy operations.
    pub resolved_proxies: usize,
    /// Datatype converters inserted.
    pub datatype_conversions: usize,
    /// Datatype mismatches without a converter.
    pub missing_conversions: usize,
    /// Canvas converters inserted.
    pub canvas_conversions: usize,
    /// Operations folded into constants.
    pub folded: usize,
    /// Operations merged into an equal operation.
    pub merged: usize,
    /// Read/write buffer pairs inserted around complex operations.
    pub buffer_pairs: usize,
    /// Operations removed as unreachable.
    pub pruned: usize,
    /// Execution groups created.
    pub groups: usize,
    /// Operations left after pruning.
    pub operations: usize,
    /// Output operations left after pruning.
    pub outputs: usize,
}

pub use pipeline::{BuiltGraph, NodeOperationBuilder};

#[cfg(test)]
#[path = "../tests/unit/builder.rs"]
mod tests;
