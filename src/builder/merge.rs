use tracing::debug;

use crate::foundation::hash::StableHasher;
use crate::foundation::ids::OperationId;
use crate::operation::graph::{OperationGraph, OperationNode};
use crate::operation::traits::StructuralKey;

fn write_canvas(h: &mut StableHasher, node: &OperationNode) {
    let c = node.canvas();
    h.write_i32(c.xmin);
    h.write_i32(c.xmax);
    h.write_i32(c.ymin);
    h.write_i32(c.ymax);
}

/// Hash of an operation's own parameters, `None` for operations that opt out of merging.
fn params_hash(node: &OperationNode) -> Option<u64> {
    let StructuralKey::Params(key) = node.operation().structural_key() else {
        return None;
    };
    let mut h = StableHasher::new();
    h.write_str(node.name());
    h.write_u64(key);
    write_canvas(&mut h, node);
    match node.output_type() {
        Some(dt) => h.write_u8(dt.tag()),
        None => h.write_u8(u8::MAX),
    }
    Some(h.finish_u64())
}

/// Structural hash: own parameters plus the identity of every linked producer. Constant
/// producers contribute their parameters instead of their id so equal constants compare equal
/// before they are merged themselves.
pub(crate) fn operation_hash(graph: &OperationGraph, node: &OperationNode) -> Option<u64> {
    let params = params_hash(node)?;
    let mut h = StableHasher::new();
    h.write_u64(params);
    for (input, socket) in node.inputs().iter().enumerate() {
        let Some(from) = socket.link.and_then(|id| graph.node(id)) else {
            continue;
        };
        h.write_u32(input as u32);
        match params_hash(from).filter(|_| from.flags().is_constant_operation) {
            Some(p) => {
                h.write_u8(1);
                h.write_u64(p);
            }
            None => {
                h.write_u8(0);
                h.write_u32(from.id().0);
            }
        }
    }
    Some(h.finish_u64())
}

fn merge_once(graph: &mut OperationGraph) -> usize {
    let mut hashes: Vec<(u64, OperationId)> = graph
        .nodes()
        .filter_map(|n| operation_hash(graph, n).map(|h| (h, n.id())))
        .collect();
    hashes.sort_unstable();

    let mut merged = 0;
    for run in hashes.chunk_by(|a, b| a.0 == b.0) {
        let into = run[0].1;
        for &(_, duplicate) in &run[1..] {
            graph.unlink_inputs_and_relink_outputs(duplicate, into);
            graph.remove_operation(duplicate);
            merged += 1;
        }
    }
    merged
}

/// Coalesce structurally identical operations into the lowest id of each equal set until a
/// fixed point. Returns the number of removed duplicates.
pub(crate) fn merge_equal_operations(graph: &mut OperationGraph) -> usize {
    let mut total = 0;
    loop {
        let merged = merge_once(graph);
        if merged == 0 {
            break;
        }
        total += merged;
    }
    debug!(merged = total, "merged equal operations");
    total
}

#[cfg(test)]
#[path = "../../tests/unit/builder/merge.rs"]
mod tests;
