use smallvec::SmallVec;
use tracing::debug;

use crate::foundation::ids::OperationId;
use crate::foundation::rect::Rect;
use crate::memory::buffer::MemoryBuffer;
use crate::operation::graph::OperationGraph;
use crate::ops::constant::constant_operation;

/// Area a foldable operation is evaluated over.
const FIRST_ELEM_AREA: Rect = Rect::new(0, 1, 0, 1);

fn constant_elem(graph: &OperationGraph, id: OperationId) -> Option<SmallVec<[f32; 4]>> {
    let node = graph.node(id)?;
    if !node.flags().is_constant_operation {
        return None;
    }
    node.operation().constant_elem().map(SmallVec::from_slice)
}

fn is_foldable(graph: &OperationGraph, id: OperationId) -> bool {
    let Some(node) = graph.node(id) else {
        return false;
    };
    let flags = node.flags();
    if !flags.can_be_constant || flags.is_constant_operation || node.output_type().is_none() {
        return false;
    }
    node.operation().as_area_producer().is_some()
        && node
            .inputs()
            .iter()
            .all(|s| {
                s.link
                    .is_some_and(|from| constant_elem(graph, from).is_some())
            })
}

/// Evaluate `id` over one element and replace it with the equivalent constant operation.
fn fold_operation(graph: &mut OperationGraph, id: OperationId) -> Option<OperationId> {
    let node = graph.node(id)?;
    let data_type = node.output_type()?;
    let inputs: Vec<MemoryBuffer> = node
        .inputs()
        .iter()
        .map(|s| {
            let from = s.link?;
            let dt = graph.node(from)?.output_type()?;
            let elem = constant_elem(graph, from)?;
            Some(MemoryBuffer::from_elem(dt, &elem))
        })
        .collect::<Option<_>>()?;
    let input_refs: Vec<&MemoryBuffer> = inputs.iter().collect();
    let mut out = MemoryBuffer::new(data_type, FIRST_ELEM_AREA);
    let producer = node.operation().as_area_producer()?;
    producer.update_memory_buffer_partial(&mut out, FIRST_ELEM_AREA, &input_refs);
    let elem: SmallVec<[f32; 4]> = SmallVec::from_slice(out.elem(0, 0)?);

    let constant = graph.add_operation(constant_operation(data_type, &elem));
    graph.unlink_inputs_and_relink_outputs(id, constant);
    graph.remove_operation(id);
    Some(constant)
}

fn try_fold(graph: &mut OperationGraph, candidates: &[OperationId]) -> Vec<OperationId> {
    let foldable: Vec<_> = candidates
        .iter()
        .copied()
        .filter(|&id| is_foldable(graph, id))
        .collect();
    foldable
        .into_iter()
        .filter_map(|id| fold_operation(graph, id))
        .collect()
}

/// Fold operations whose inputs are all constant until no more fold, re-examining only the
/// consumers of the latest folds. Returns the number of folded operations.
pub(crate) fn fold_constants(graph: &mut OperationGraph) -> usize {
    let all = graph.operation_ids();
    let mut last = try_fold(graph, &all);
    let mut folded = last.len();
    while !last.is_empty() {
        let mut next: Vec<OperationId> = last
            .iter()
            .flat_map(|&c| graph.consumers(c))
            .map(|(op, _)| op)
            .collect();
        next.sort_unstable();
        next.dedup();
        last = try_fold(graph, &next);
        folded += last.len();
    }
    debug!(folded, "folded constant operations");
    folded
}

#[cfg(test)]
#[path = "../../tests/unit/builder/fold.rs"]
mod tests;
