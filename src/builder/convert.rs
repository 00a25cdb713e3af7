use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::config::CompositorContext;
use crate::foundation::ids::{NodeId, OperationId};
use crate::memory::buffer::DataType;
use crate::node::converter::{ConvertState, NodeConverter};
use crate::node::graph::{NodeGraph, NodeInput, NodeSockets};
use crate::operation::graph::OperationGraph;
use crate::ops::constant::constant_operation;
use crate::ops::convert::ConvertOperation;
use crate::ops::output::PreviewOperation;
use crate::ops::proxy::ProxyOperation;

/// Run every node's conversion and translate node links into operation links.
///
/// Returns the converted state and the number of node links that had no converted end.
pub(crate) fn convert_nodes(
    nodes: &NodeGraph,
    context: &CompositorContext) -> (ConvertState, usize,
) {
    let mut state = ConvertState::default();
    for (index, entry) in nodes.nodes.iter().enumerate() {
        let id = NodeId(index as u32);
        let input_types: SmallVec<[DataType; 4]> =
            entry.sockets.inputs().iter().map(|d| d.data_type).collect();
        let output_types: SmallVec<[DataType; 2]> =
            entry.sockets.outputs().iter().copied().collect();
        let linked: SmallVec<[bool; 4]> = (0..input_types.len())
            .map(|i| nodes.input_link(id.input(i)).is_some())
            .collect();

        let mut converter =
            NodeConverter::new(&mut state, id, &input_types, &output_types, &linked);
        if entry.muted {
            add_mute_proxies(&mut converter, &entry.sockets);
        } else {
            entry.node.convert_to_operations(&mut converter, context);
        }

        if let Some(image) = &entry.preview
            && !context.settings().is_rendering
            && let Some(&op) = state.output_map.get(&id.output(0))
        {
            let preview = state
                .graph
                .add_operation(Box::new(PreviewOperation::new(image.clone())));
            state.graph.add_link(op, preview, 0);
        }
    }

    // One node input may stand for several operation inputs.
    let mut inverse: HashMap<NodeInput, Vec<(OperationId, usize)>> = HashMap::new();
    for (&op_input, &node_input) in &state.input_map {
        inverse.entry(node_input).or_default().push(op_input);
    }
    for targets in inverse.values_mut() {
        targets.sort_unstable();
    }

    let mut dropped = 0;
    for link in nodes.links() {
        let from = state.output_map.get(&link.from).copied();
        let targets = inverse.get(&link.to).map(Vec::as_slice).unwrap_or_default();
        let Some(from) = from.filter(|_| !targets.is_empty()) else {
            warn!(from = ?link.from, to = ?link.to, "dropping node link without converted sockets");
            dropped += 1;
            continue;
        };
        for &(to, input) in targets {
            state.graph.add_link(from, to, input);
        }
    }
    debug!(
        operations = state.graph.len(),
        dropped_links = dropped,
        "converted nodes to operations"
    );
    (state, dropped)
}

/// A muted node forwards, per output, the first input of the same layout (else its first input).
/// Outputs without any input produce zero.
fn add_mute_proxies(converter: &mut NodeConverter<'_>, sockets: &NodeSockets) {
    let inputs = sockets.inputs();
    for (output, &out_dt) in sockets.outputs().iter().enumerate() {
        let source = inputs
            .iter()
            .position(|d| d.data_type == out_dt)
            .or_else(|| (!inputs.is_empty()).then_some(0));
        match source {
            Some(input) => {
                let proxy = converter.add_operation(ProxyOperation::new(
                    inputs[input].data_type,
                    out_dt,
                    true,
                ));
                converter.map_input_socket(input, proxy, 0);
                converter.map_output_socket(output, proxy);
            }
            None => match out_dt {
                DataType::Value => {
                    converter.add_output_value(output, 0.0);
                }
                DataType::Vector => {
                    converter.add_output_vector(output, [0.0; 3]);
                }
                DataType::Color => {
                    converter.add_output_color(output, [0.0; 4]);
                }
            },
        }
    }
}

/// Bind every unconnected input to a constant holding the editor value of the node input it
/// stands for, or zero. Returns the number of constants added.
pub(crate) fn add_input_constants(state: &mut ConvertState, nodes: &NodeGraph) -> usize {
    let pending: Vec<(OperationId, usize, DataType)> = state
        .graph
        .nodes()
        .flat_map(|n| {
            n.inputs()
                .iter()
                .enumerate()
                .filter(|(_, s)| !s.is_connected())
                .map(move |(i, s)| (n.id(), i, s.data_type))
        })
        .collect();
    for &(op, input, dt) in &pending {
        let value = state
            .input_map
            .get(&(op, input))
            .and_then(|&node_input| nodes.input_value(node_input))
            .unwrap_or([0.0; 4]);
        let constant = state
            .graph
            .add_operation(constant_operation(dt, &value[..dt.num_channels()]));
        state.graph.add_link(constant, op, input);
    }
    debug!(constants = pending.len(), "bound unconnected inputs");
    pending.len()
}

/// Relink consumers of proxy operations to the first non-proxy producer upstream.
///
/// Links between proxies are kept while walking; chains without a real producer are dropped.
/// The bypassed proxies stay in the graph until pruning. Returns the number of rerouted links.
pub(crate) fn resolve_proxies(graph: &mut OperationGraph) -> usize {
    let is_proxy =
        |g: &OperationGraph, id: OperationId| g.node(id).is_some_and(|n| n.flags().is_proxy);
    let proxy_links: Vec<_> = graph
        .links()
        .into_iter()
        .filter(|l| is_proxy(graph, l.from) && !is_proxy(graph, l.to))
        .collect();
    for link in &proxy_links {
        let mut from = Some(link.from);
        while let Some(id) = from
            && is_proxy(graph, id)
        {
            from = graph.node(id).and_then(|n| n.input_link(0));
        }
        graph.remove_input_link(link.to, link.input);
        if let Some(from) = from {
            graph.add_link(from, link.to, link.input);
        }
    }
    debug!(links = proxy_links.len(), "resolved proxies");
    proxy_links.len()
}

/// Insert a [`ConvertOperation`] on every link joining different layouts where both ends accept
/// conversion. Returns `(inserted, missing)`.
pub(crate) fn add_datatype_conversions(graph: &mut OperationGraph) -> (usize, usize) {
    let mut pending = Vec::new();
    for link in graph.links() {
        let (Some(from), Some(to)) = (graph.node(link.from), graph.node(link.to)) else {
            continue;
        };
        if !(from.flags().use_datatype_conversion && to.flags().use_datatype_conversion) {
            continue;
        }
        let (Some(from_dt), Some(to_dt)) = (
            from.output_type(),
            to.inputs().get(link.input).map(|s| s.data_type),
        ) else {
            continue;
        };
        if from_dt != to_dt {
            pending.push((link, from_dt, to_dt));
        }
    }

    let mut inserted = 0;
    let mut missing = 0;
    for (link, from_dt, to_dt) in pending {
        let Some(converter) = ConvertOperation::new(from_dt, to_dt) else {
            warn!(?link, ?from_dt, ?to_dt, "no converter between datatypes");
            missing += 1;
            continue;
        };
        let op = graph.add_operation(Box::new(converter));
        graph.remove_input_link(link.to, link.input);
        graph.add_link(link.from, op, 0);
        graph.add_link(op, link.to, link.input);
        inserted += 1;
    }
    debug!(inserted, missing, "added datatype conversions");
    (inserted, missing)
}

#[cfg(test)]
#[path = "../../tests/unit/builder/convert.rs"]
mod tests;
