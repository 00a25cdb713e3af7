use tracing::debug;

use crate::foundation::ids::OperationId;
use crate::foundation::rect::Rect;
use crate::operation::graph::OperationGraph;
use crate::operation::socket::ResizeMode;
use crate::operation::traits::{CanvasInput, CanvasPolicy};
use crate::ops::canvas::CanvasConvertOperation;

/// Determine the canvas of every operation reachable from an output, then insert canvas
/// converters where a link joins different canvases. Returns the number of converters.
///
/// Non-preview outputs go first since a preview may share producers with them.
pub(crate) fn determine_canvases(graph: &mut OperationGraph, is_rendering: bool) -> usize {
    let outputs = graph.output_operations(is_rendering);
    let (previews, others): (Vec<_>, Vec<_>) = outputs
        .into_iter()
        .partition(|&id| graph.node(id).is_some_and(|n| n.flags().is_preview));
    for id in others.into_iter().chain(previews) {
        let canvas = determine_operation_canvas(graph, id, Rect::NONE);
        if let Some(n) = graph.node_mut(id) {
            n.set_canvas(canvas);
        }
    }
    let inserted = add_canvas_conversions(graph);
    debug!(conversions = inserted, "determined canvases");
    inserted
}

/// Canvas of `id`'s output: the cached canvas once set, else determined and cached when
/// non-empty.
fn determine_output_canvas(graph: &mut OperationGraph, id: OperationId, preferred: Rect) -> Rect {
    let Some(node) = graph.node(id) else {
        return Rect::NONE;
    };
    if node.is_canvas_set() {
        return node.canvas();
    }
    let canvas = determine_operation_canvas(graph, id, preferred);
    if !canvas.is_empty()
        && let Some(n) = graph.node_mut(id)
    {
        n.set_canvas(canvas);
    }
    canvas
}

fn determine_input_canvas(
    graph: &mut OperationGraph,
    id: OperationId,
    input: usize,
    preferred: Rect,
) -> Option<Rect> {
    let from = graph.node(id)?.input_link(input)?;
    let canvas = determine_output_canvas(graph, from, preferred);
    (!canvas.is_empty()).then_some(canvas)
}

fn determine_operation_canvas(
    graph: &mut OperationGraph,
    id: OperationId,
    preferred: Rect,
) -> Rect {
    let Some(node) = graph.node(id) else {
        return Rect::NONE;
    };
    let policy = node.operation().canvas_policy();
    let inputs_len = node.inputs().len();

    let (mut canvas, used) = match policy {
        CanvasPolicy::Preferred => (preferred, None),
        CanvasPolicy::Fixed(rect) => (rect, None),
        CanvasPolicy::Input { main, preferred: p } => {
            let preferred = p.unwrap_or(preferred);
            match main {
                CanvasInput::Any => {
                    let mut found = (Rect::NONE, None);
                    for input in 0..inputs_len {
                        if let Some(c) = determine_input_canvas(graph, id, input, preferred) {
                            found = (c, Some(input));
                            break;
                        }
                    }
                    found
                }
                CanvasInput::Index(i) if i < inputs_len => (
                    determine_input_canvas(graph, id, i, preferred).unwrap_or(Rect::NONE),
                    Some(i),
                ),
                CanvasInput::Index(_) => (Rect::NONE, None),
            }
        }
    };
    if let Some(node) = graph.node(id) {
        node.operation().modify_canvas(&mut canvas);
    }
    for input in (0..inputs_len).filter(|&i| Some(i) != used) {
        determine_input_canvas(graph, id, input, canvas);
    }
    canvas
}

fn needs_conversion(mode: ResizeMode, from: Rect, to: Rect) -> bool {
    match mode {
        ResizeMode::None => false,
        ResizeMode::Align => from.xmin != to.xmin || from.ymin != to.ymin,
        _ => from != to,
    }
}

fn add_canvas_conversions(graph: &mut OperationGraph) -> usize {
    let mut pending = Vec::new();
    for link in graph.links() {
        let (Some(from), Some(to)) = (graph.node(link.from), graph.node(link.to)) else {
            continue;
        };
        let Some(socket) = to.inputs().get(link.input) else {
            continue;
        };
        if from.canvas().is_empty() || to.canvas().is_empty() {
            continue;
        }
        if needs_conversion(socket.resize_mode, from.canvas(), to.canvas()) {
            pending.push((
                link,
                socket.resize_mode,
                socket.data_type,
                from.canvas(),
                to.canvas(),
            ));
        }
    }
    for &(link, mode, dt, from, to) in &pending {
        let op = graph.add_operation(Box::new(CanvasConvertOperation::new(mode, dt, from, to)));
        if let Some(n) = graph.node_mut(op) {
            n.set_canvas(to);
        }
        graph.remove_input_link(link.to, link.input);
        graph.add_link(link.from, op, 0);
        graph.add_link(op, link.to, link.input);
    }
    pending.len()
}

#[cfg(test)]
#[path = "../../tests/unit/builder/canvas.rs"]
mod tests;
