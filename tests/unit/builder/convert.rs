use super::*;

use crate::config::CompositorSettings;
use crate::node::nodes::{CompositeNode, MathNode, RerouteNode, RgbNode, ValueNode, ViewerNode};
use crate::ops::math::MathKind;
use crate::ops::output::OutputImage;

fn context(is_rendering: bool) -> CompositorContext {
    CompositorContext::new(CompositorSettings {
        is_rendering,
        ..CompositorSettings::default()
    })
}

fn add() -> MathNode {
    MathNode {
        kind: MathKind::Add,
        clamp: false,
    }
}

fn names(graph: &OperationGraph) -> Vec<&'static str> {
    graph.nodes().map(|n| n.name()).collect()
}

#[test]
fn links_follow_the_socket_maps() {
    let mut nodes = NodeGraph::new();
    let v = nodes.add_node(ValueNode { value: 2.0 });
    let m = nodes.add_node(add());
    nodes.add_link(v.output(0), m.input(1));

    let (state, dropped) = convert_nodes(&nodes, &context(false));
    assert_eq!(dropped, 0);
    assert_eq!(names(&state.graph), vec!["SetValue", "Math"]);
    let value_op = state.output_map[&v.output(0)];
    let math_op = state.output_map[&m.output(0)];
    let math = state.graph.node(math_op).unwrap();
    assert_eq!(math.input_link(1), Some(value_op));
    assert_eq!(math.input_link(0), None);
}

#[test]
fn links_into_unconverted_nodes_are_dropped() {
    let mut nodes = NodeGraph::new();
    let c = nodes.add_node(RgbNode { rgba: [1.0; 4] });
    let composite = nodes.add_node(CompositeNode {
        image: OutputImage::new(),
        size: (8, 8),
    });
    nodes.add_link(c.output(0), composite.input(0));

    let (state, dropped) = convert_nodes(&nodes, &context(false));
    assert_eq!(dropped, 1);
    assert_eq!(state.graph.len(), 1);

    let (state, dropped) = convert_nodes(&nodes, &context(true));
    assert_eq!(dropped, 0);
    assert_eq!(state.graph.len(), 2);
}

#[test]
fn muted_nodes_forward_their_first_matching_input() {
    let mut nodes = NodeGraph::new();
    let v = nodes.add_node(ValueNode { value: 4.0 });
    let m = nodes.add_node(add());
    nodes.add_link(v.output(0), m.input(0));
    nodes.set_muted(m, true);

    let (mut state, _) = convert_nodes(&nodes, &context(false));
    let out = state.output_map[&m.output(0)];
    assert!(state.graph.node(out).unwrap().flags().is_proxy);
    assert_eq!(resolve_proxies(&mut state.graph), 0);
    assert_eq!(
        state.graph.node(out).unwrap().input_link(0),
        Some(state.output_map[&v.output(0)])
    );
}

#[test]
fn previews_are_added_outside_final_renders() {
    let mut nodes = NodeGraph::new();
    let v = nodes.add_node(ValueNode { value: 1.0 });
    nodes.enable_preview(v, OutputImage::new());

    let (state, _) = convert_nodes(&nodes, &context(false));
    assert_eq!(names(&state.graph), vec!["SetValue", "Preview"]);
    let (state, _) = convert_nodes(&nodes, &context(true));
    assert_eq!(names(&state.graph), vec!["SetValue"]);
}

#[test]
fn unconnected_inputs_get_their_editor_values() {
    let mut nodes = NodeGraph::new();
    let m = nodes.add_node(add());
    nodes.set_input_value(m.input(1), &[7.0]);

    let (mut state, _) = convert_nodes(&nodes, &context(false));
    assert_eq!(add_input_constants(&mut state, &nodes), 2);
    let math = state.graph.node(state.output_map[&m.output(0)]).unwrap();
    let elem = |input: usize| {
        let from = math.input_link(input).unwrap();
        let node = state.graph.node(from).unwrap();
        node.operation().constant_elem().unwrap().to_vec()
    };
    assert_eq!(elem(0), vec![0.5]);
    assert_eq!(elem(1), vec![7.0]);
}

#[test]
fn proxy_chains_resolve_to_the_real_producer() {
    let mut nodes = NodeGraph::new();
    let v = nodes.add_node(ValueNode { value: 1.0 });
    let r1 = nodes.add_node(RerouteNode {
        data_type: DataType::Value,
    });
    let r2 = nodes.add_node(RerouteNode {
        data_type: DataType::Value,
    });
    let m = nodes.add_node(add());
    nodes.add_link(v.output(0), r1.input(0));
    nodes.add_link(r1.output(0), r2.input(0));
    nodes.add_link(r2.output(0), m.input(0));

    let (mut state, _) = convert_nodes(&nodes, &context(false));
    assert_eq!(resolve_proxies(&mut state.graph), 1);
    let math = state.graph.node(state.output_map[&m.output(0)]).unwrap();
    assert_eq!(math.input_link(0), Some(state.output_map[&v.output(0)]));
}

#[test]
fn proxy_chains_without_a_producer_are_unlinked() {
    let mut nodes = NodeGraph::new();
    let r = nodes.add_node(RerouteNode {
        data_type: DataType::Value,
    });
    let m = nodes.add_node(add());
    nodes.add_link(r.output(0), m.input(0));

    let (mut state, _) = convert_nodes(&nodes, &context(false));
    resolve_proxies(&mut state.graph);
    let math = state.graph.node(state.output_map[&m.output(0)]).unwrap();
    assert_eq!(math.input_link(0), None);
}

#[test]
fn datatype_mismatches_get_converters() {
    let mut nodes = NodeGraph::new();
    let v = nodes.add_node(ValueNode { value: 0.25 });
    let viewer = nodes.add_node(ViewerNode::new(OutputImage::new(), 4, 4));
    nodes.add_link(v.output(0), viewer.input(0));

    let (mut state, _) = convert_nodes(&nodes, &context(false));
    assert_eq!(add_datatype_conversions(&mut state.graph), (1, 0));
    assert_eq!(
        names(&state.graph),
        vec!["SetValue", "Viewer", "ConvertValueToColor"]
    );
    assert_eq!(add_datatype_conversions(&mut state.graph), (0, 0));
}
