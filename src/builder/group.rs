use std::collections::HashSet;

use tracing::debug;

use crate::execution::group::ExecutionGroup;
use crate::foundation::ids::{GroupId, OperationId};
use crate::operation::graph::OperationGraph;

/// Grow `group` from `id` along input links. Stops at operations the group refuses.
fn add_group_operations(
    graph: &OperationGraph,
    group: &mut ExecutionGroup,
    visited: &mut HashSet<OperationId>,
    id: OperationId,
) {
    if !visited.insert(id) {
        return;
    }
    let Some(node) = graph.node(id) else {
        return;
    };
    if !group.add_operation(node) {
        return;
    }
    // Read operations end the group; their proxy is filled by another one.
    if node.flags().is_read_buffer {
        return;
    }
    for from in node.inputs().iter().filter_map(|s| s.link) {
        add_group_operations(graph, group, visited, from);
    }
}

fn make_group(
    graph: &OperationGraph,
    groups: &mut Vec<ExecutionGroup>,
    root: OperationId,
) -> GroupId {
    let id = GroupId(groups.len() as u32);
    let mut group = ExecutionGroup::new(id);
    let mut visited = HashSet::new();
    add_group_operations(graph, &mut group, &mut visited, root);
    groups.push(group);
    id
}

/// Partition the graph into execution groups: one per output operation and one per write
/// operation feeding a read operation. Each proxy records the group that fills it.
pub(crate) fn group_operations(
    graph: &mut OperationGraph,
    is_rendering: bool,
) -> Vec<ExecutionGroup> {
    let mut groups: Vec<ExecutionGroup> = Vec::new();
    for id in graph.operation_ids() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        if node.is_output(is_rendering) {
            let group = make_group(graph, &mut groups, id);
            if let Some(g) = groups.get_mut(group.index()) {
                g.set_output(true);
            }
        }

        let Some(node) = graph.node(id) else {
            continue;
        };
        if !node.flags().is_read_buffer {
            continue;
        }
        let Some(proxy) = node.memory_proxy() else {
            continue;
        };
        let Some(write) = graph
            .proxy(proxy)
            .filter(|p| p.executor().is_none())
            .map(|p| p.write_operation())
        else {
            continue;
        };
        let group = make_group(graph, &mut groups, write);
        if let Some(p) = graph.proxy_mut(proxy) {
            p.set_executor(group);
        }
    }
    debug!(groups = groups.len(), "grouped operations");
    groups
}
