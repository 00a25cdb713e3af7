use tracing::debug;

use crate::foundation::ids::OperationId;
use crate::operation::graph::OperationGraph;
use crate::ops::buffer::{ReadBufferOperation, WriteBufferOperation};

/// Splice read/write buffer pairs onto every input and the output of complex operations.
///
/// Returns the number of read operations added.
pub(crate) fn add_complex_operation_buffers(graph: &mut OperationGraph) -> usize {
    let complex: Vec<OperationId> = graph
        .nodes()
        .filter(|n| n.flags().complex)
        .map(|n| n.id())
        .collect();
    let mut reads = 0;
    for op in complex {
        let inputs = graph.node(op).map_or(0, |n| n.inputs().len());
        for input in 0..inputs {
            reads += add_input_buffers(graph, op, input);
        }
        reads += add_output_buffers(graph, op);
    }
    debug!(read_buffers = reads, "added complex operation buffers");
    reads
}

/// Write operation already attached to `producer`'s output.
fn attached_write_operation(graph: &OperationGraph, producer: OperationId) -> Option<OperationId> {
    graph
        .consumers(producer)
        .into_iter()
        .map(|(op, _)| op)
        .find(|&op| graph.node(op).is_some_and(|n| n.flags().is_write_buffer))
}

fn add_write_operation(graph: &mut OperationGraph, producer: OperationId) -> Option<OperationId> {
    let node = graph.node(producer)?;
    let dt = node.output_type()?;
    let canvas = node.canvas();
    let write = graph.add_operation(Box::new(WriteBufferOperation::new(dt)));
    graph.add_link(producer, write, 0);
    graph.add_memory_proxy(write, dt);
    if let Some(n) = graph.node_mut(write) {
        n.set_canvas(canvas);
    }
    Some(write)
}

fn add_read_operation(graph: &mut OperationGraph, write: OperationId) -> Option<OperationId> {
    let node = graph.node(write)?;
    let proxy = node.memory_proxy()?;
    let canvas = node.canvas();
    let dt = graph.proxy(proxy)?.data_type();
    let read = graph.add_operation(Box::new(ReadBufferOperation::new(dt)));
    graph.set_memory_proxy(read, proxy);
    if let Some(n) = graph.node_mut(read) {
        n.set_canvas(canvas);
    }
    Some(read)
}

fn add_input_buffers(graph: &mut OperationGraph, op: OperationId, input: usize) -> usize {
    let Some(producer) = graph.node(op).and_then(|n| n.input_link(input)) else {
        return 0;
    };
    let producer_node = graph.node(producer);
    if producer_node.is_some_and(|n| n.flags().is_read_buffer) {
        return 0;
    }
    graph.remove_input_link(op, input);
    let write = match attached_write_operation(graph, producer) {
        Some(w) => Some(w),
        None => add_write_operation(graph, producer),
    };
    let Some(read) = write.and_then(|w| add_read_operation(graph, w)) else {
        return 0;
    };
    graph.add_link(read, op, input);
    1
}

fn add_output_buffers(graph: &mut OperationGraph, op: OperationId) -> usize {
    let targets = graph.consumers(op);
    if targets.is_empty() {
        return 0;
    }
    let mut write = None;
    for &(to, input) in &targets {
        if graph.node(to).is_some_and(|n| n.flags().is_write_buffer) {
            write = Some(to);
        } else {
            graph.remove_input_link(to, input);
        }
    }
    let Some(write) = write.or_else(|| add_write_operation(graph, op)) else {
        return 0;
    };
    let mut reads = 0;
    for &(to, input) in targets.iter().filter(|(to, _)| *to != write) {
        if let Some(read) = add_read_operation(graph, write) {
            graph.add_link(read, to, input);
            reads += 1;
        }
    }
    reads
}

#[cfg(test)]
#[path = "../../tests/unit/builder/buffers.rs"]
mod tests;
