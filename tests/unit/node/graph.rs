use super::*;

use crate::node::nodes::{MathNode, RerouteNode, ValueNode};
use crate::ops::math::MathKind;

fn add() -> MathNode {
    MathNode {
        kind: MathKind::Add,
        clamp: false,
    }
}

#[test]
fn defaults_come_from_socket_declarations() {
    let mut g = NodeGraph::new();
    let m = g.add_node(add());
    assert_eq!(g.input_value(m.input(0)), Some([0.5, 0.0, 0.0, 0.0]));
    assert!(g.set_input_value(m.input(1), &[2.0]));
    assert_eq!(g.input_value(m.input(1)), Some([2.0, 0.0, 0.0, 0.0]));
    assert!(!g.set_input_value(m.input(7), &[1.0]));
}

#[test]
fn second_link_replaces_the_first() {
    let mut g = NodeGraph::new();
    let a = g.add_node(ValueNode { value: 1.0 });
    let b = g.add_node(ValueNode { value: 2.0 });
    let m = g.add_node(add());
    assert!(g.add_link(a.output(0), m.input(0)));
    assert!(g.add_link(b.output(0), m.input(0)));
    assert_eq!(g.links().len(), 1);
    assert_eq!(g.input_link(m.input(0)), Some(b.output(0)));
}

#[test]
fn cycles_and_missing_sockets_are_rejected() {
    let mut g = NodeGraph::new();
    let m1 = g.add_node(add());
    let m2 = g.add_node(add());
    assert!(g.add_link(m1.output(0), m2.input(0)));
    assert!(!g.add_link(m2.output(0), m1.input(0)));
    assert!(!g.add_link(m1.output(0), m1.input(1)));
    assert!(!g.add_link(m1.output(3), m2.input(1)));
    assert!(!g.add_link(m1.output(0), m2.input(2)));
    assert_eq!(g.links().len(), 1);
}

#[test]
fn remove_link_reports_whether_anything_changed() {
    let mut g = NodeGraph::new();
    let a = g.add_node(ValueNode { value: 1.0 });
    let r = g.add_node(RerouteNode {
        data_type: DataType::Value,
    });
    g.add_link(a.output(0), r.input(0));
    assert!(g.remove_link(r.input(0)));
    assert!(!g.remove_link(r.input(0)));
    assert!(g.links().is_empty());
}

#[test]
fn group_inlining_adds_interface_proxies() {
    let mut inner = NodeGraph::new();
    let m = inner.add_node(add());
    let mut group = NodeGroup::new(inner);
    group.add_input(DataType::Value, &[4.0], &[m.input(0), m.input(1)]);
    group.add_output(DataType::Value, m.output(0));

    let mut g = NodeGraph::new();
    let v = g.add_node(ValueNode { value: 1.0 });
    let instance = g.add_group(group);
    assert_eq!(instance.inputs.len(), 1);
    assert_eq!(instance.outputs.len(), 1);
    // value node, inlined math node, input proxy, output proxy
    assert_eq!(g.len(), 4);
    assert_eq!(g.node_name(instance.inputs[0].node), Some("SocketProxy"));
    let default = g.input_value(instance.inputs[0]);
    assert_eq!(default, Some([4.0, 0.0, 0.0, 0.0]));

    let inlined = NodeId(1);
    assert_eq!(g.node_name(inlined), Some("Math"));
    assert_eq!(
        g.input_link(inlined.input(1)),
        Some(instance.inputs[0].node.output(0))
    );
    assert!(g.add_link(v.output(0), instance.inputs[0]));
    assert_eq!(
        g.input_link(instance.outputs[0].node.input(0)),
        Some(inlined.output(0))
    );
}
