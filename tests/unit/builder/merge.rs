use super::*;

use crate::ops::constant::SetValueOperation;
use crate::ops::math::{MathKind, MathOperation};
use crate::ops::output::{OutputImage, ViewerOperation};

fn value(g: &mut OperationGraph, v: f32) -> OperationId {
    g.add_operation(Box::new(SetValueOperation::new(v)))
}

fn math(g: &mut OperationGraph, kind: MathKind, a: OperationId, b: OperationId) -> OperationId {
    let m = g.add_operation(Box::new(MathOperation::new(kind, false)));
    g.add_link(a, m, 0);
    g.add_link(b, m, 1);
    m
}

#[test]
fn equal_constants_hash_equal() {
    let mut g = OperationGraph::new();
    let a = value(&mut g, 1.0);
    let b = value(&mut g, 1.0);
    let c = value(&mut g, 2.0);
    let hash = |id| operation_hash(&g, g.node(id).unwrap());
    assert_eq!(hash(a), hash(b));
    assert_ne!(hash(a), hash(c));
}

#[test]
fn duplicate_subgraphs_collapse_to_the_lowest_ids() {
    let mut g = OperationGraph::new();
    let a1 = value(&mut g, 1.0);
    let b1 = value(&mut g, 1.0);
    let m1 = math(&mut g, MathKind::Add, a1, b1);
    let a2 = value(&mut g, 1.0);
    let b2 = value(&mut g, 1.0);
    let m2 = math(&mut g, MathKind::Add, a2, b2);
    let top = math(&mut g, MathKind::Multiply, m1, m2);

    assert_eq!(merge_equal_operations(&mut g), 4);
    assert_eq!(g.operation_ids(), vec![a1, m1, top]);
    let top_node = g.node(top).unwrap();
    assert_eq!(top_node.input_link(0), Some(m1));
    assert_eq!(top_node.input_link(1), Some(m1));
    let m1_node = g.node(m1).unwrap();
    assert_eq!(m1_node.input_link(0), Some(a1));
    assert_eq!(m1_node.input_link(1), Some(a1));
}

#[test]
fn merging_reaches_a_fixed_point() {
    let mut g = OperationGraph::new();
    let a = value(&mut g, 1.0);
    let b = value(&mut g, 2.0);
    let m1 = math(&mut g, MathKind::Add, a, b);
    let m2 = math(&mut g, MathKind::Add, a, b);
    let n1 = math(&mut g, MathKind::Subtract, m1, a);
    let n2 = math(&mut g, MathKind::Subtract, m2, a);
    math(&mut g, MathKind::Add, n1, n2);

    assert_eq!(merge_equal_operations(&mut g), 2);
    assert!(!g.contains(m2));
    assert!(!g.contains(n2));
    assert_eq!(merge_equal_operations(&mut g), 0);
}

#[test]
fn different_parameters_or_inputs_stay_apart() {
    let mut g = OperationGraph::new();
    let a = value(&mut g, 1.0);
    let b = value(&mut g, 2.0);
    math(&mut g, MathKind::Add, a, b);
    math(&mut g, MathKind::Subtract, a, b);
    math(&mut g, MathKind::Add, b, a);
    assert_eq!(merge_equal_operations(&mut g), 0);
    assert_eq!(g.len(), 5);
}

#[test]
fn unique_operations_are_never_merged() {
    let mut g = OperationGraph::new();
    let a = value(&mut g, 1.0);
    let image = OutputImage::new();
    for _ in 0..2 {
        let v = g.add_operation(Box::new(ViewerOperation::new(image.clone(), 4, 4)));
        g.add_link(a, v, 0);
    }
    assert_eq!(merge_equal_operations(&mut g), 0);
    assert_eq!(g.len(), 3);
}

#[test]
fn canvases_take_part_in_the_hash() {
    let mut g = OperationGraph::new();
    let a = value(&mut g, 1.0);
    let b = value(&mut g, 1.0);
    let small = crate::foundation::rect::Rect::from_size(4, 4);
    let large = crate::foundation::rect::Rect::from_size(8, 8);
    g.node_mut(a).unwrap().set_canvas(small);
    g.node_mut(b).unwrap().set_canvas(large);
    assert_eq!(merge_equal_operations(&mut g), 0);
}
