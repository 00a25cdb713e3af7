use super::*;

use crate::ops::buffer::WriteBufferOperation;
use crate::ops::constant::{SetColorOperation, SetValueOperation};
use crate::ops::convert::ConvertOperation;
use crate::ops::math::{MathKind, MathOperation};

fn add_math(g: &mut OperationGraph) -> OperationId {
    g.add_operation(Box::new(MathOperation::new(MathKind::Add, false)))
}

#[test]
fn sockets_follow_the_declaration() {
    let mut g = OperationGraph::new();
    let m = add_math(&mut g);
    let node = g.node(m).unwrap();
    assert_eq!(node.inputs().len(), 2);
    assert_eq!(node.output_type(), Some(DataType::Value));
    assert_eq!(node.canvas(), Rect::NONE);
    assert!(!node.is_canvas_set());
    assert_eq!(node.name(), "Math");
}

#[test]
fn input_holds_at_most_one_link() {
    let mut g = OperationGraph::new();
    let a = g.add_operation(Box::new(SetValueOperation::new(1.0)));
    let b = g.add_operation(Box::new(SetValueOperation::new(2.0)));
    let m = add_math(&mut g);
    assert!(g.add_link(a, m, 0));
    assert!(g.add_link(b, m, 0));
    assert_eq!(g.node(m).unwrap().input_link(0), Some(b));
    assert_eq!(g.links().len(), 1);
    assert!(g.consumers(a).is_empty());
    assert_eq!(g.consumers(b), vec![(m, 0)]);
}

#[test]
fn links_need_an_output_and_an_existing_input() {
    let mut g = OperationGraph::new();
    let w = g.add_operation(Box::new(WriteBufferOperation::new(DataType::Value)));
    let m = add_math(&mut g);
    assert!(!g.add_link(w, m, 0));
    assert!(!g.add_link(m, m, 5));
    assert!(!g.add_link(OperationId(99), m, 0));
    assert!(g.links().is_empty());
}

#[test]
fn removed_ids_are_never_reused() {
    let mut g = OperationGraph::new();
    let a = g.add_operation(Box::new(SetValueOperation::new(1.0)));
    assert!(g.remove_operation(a).is_some());
    assert!(!g.contains(a));
    assert!(g.remove_operation(a).is_none());
    let b = g.add_operation(Box::new(SetValueOperation::new(1.0)));
    assert_ne!(a, b);
    assert_eq!(g.len(), 1);
    assert_eq!(g.operation_ids(), vec![b]);
}

#[test]
fn relinking_moves_every_consumer() {
    let mut g = OperationGraph::new();
    let a = g.add_operation(Box::new(SetValueOperation::new(1.0)));
    let b = g.add_operation(Box::new(SetValueOperation::new(1.0)));
    let m1 = add_math(&mut g);
    let m2 = add_math(&mut g);
    g.add_link(a, m1, 0);
    g.add_link(a, m1, 1);
    g.add_link(a, m2, 1);
    g.unlink_inputs_and_relink_outputs(a, b);
    assert!(g.consumers(a).is_empty());
    assert_eq!(g.consumers(b), vec![(m1, 0), (m1, 1), (m2, 1)]);
}

#[test]
fn remove_input_link_returns_the_producer() {
    let mut g = OperationGraph::new();
    let a = g.add_operation(Box::new(SetColorOperation::new([1.0; 4])));
    let convert = ConvertOperation::new(DataType::Color, DataType::Value).unwrap();
    let c = g.add_operation(Box::new(convert));
    g.add_link(a, c, 0);
    assert_eq!(g.remove_input_link(c, 0), Some(a));
    assert_eq!(g.remove_input_link(c, 0), None);
}

#[test]
fn proxies_attach_to_their_writer() {
    let mut g = OperationGraph::new();
    let w = g.add_operation(Box::new(WriteBufferOperation::new(DataType::Color)));
    let p = g.add_memory_proxy(w, DataType::Color);
    assert_eq!(g.node(w).unwrap().memory_proxy(), Some(p));
    let proxy = g.proxy(p).unwrap();
    assert_eq!(proxy.write_operation(), w);
    assert_eq!(proxy.data_type(), DataType::Color);
    assert!(proxy.executor().is_none());
    g.remove_proxy(p);
    assert!(g.proxy(p).is_none());
    assert_eq!(g.proxies().count(), 0);
}
