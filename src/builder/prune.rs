use tracing::debug;

use crate::foundation::ids::OperationId;
use crate::operation::graph::OperationGraph;

/// Remove operations unreachable from any output, following input links and, for read-buffer
/// operations, the paired write operation. Proxies of removed writers go with them.
///
/// Returns the number of removed operations.
pub(crate) fn prune_operations(graph: &mut OperationGraph, is_rendering: bool) -> usize {
    let capacity = graph
        .nodes()
        .map(|n| n.id().index() + 1)
        .max()
        .unwrap_or(0);
    let mut reachable = vec![false; capacity];
    let mut stack = graph.output_operations(is_rendering);
    while let Some(id) = stack.pop() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        if std::mem::replace(&mut reachable[id.index()], true) {
            continue;
        }
        stack.extend(node.inputs().iter().filter_map(|s| s.link));
        if node.flags().is_read_buffer
            && let Some(proxy) = node.memory_proxy().and_then(|p| graph.proxy(p))
        {
            stack.push(proxy.write_operation());
        }
    }

    let unreachable: Vec<OperationId> = graph
        .nodes()
        .filter(|n| !reachable[n.id().index()])
        .map(|n| n.id())
        .collect();
    for &id in &unreachable {
        if let Some(node) = graph.remove_operation(id)
            && node.flags().is_write_buffer
            && let Some(proxy) = node.memory_proxy()
        {
            graph.remove_proxy(proxy);
        }
    }
    debug!(
        pruned = unreachable.len(),
        remaining = graph.len(),
        "pruned operations"
    );
    unreachable.len()
}
