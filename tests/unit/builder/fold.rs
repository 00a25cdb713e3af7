use super::*;

use crate::memory::buffer::DataType;
use crate::ops::constant::{SetColorOperation, SetValueOperation};
use crate::ops::convert::ConvertOperation;
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

fn convert(g: &mut OperationGraph, from: DataType, to: DataType) -> OperationId {
    g.add_operation(Box::new(ConvertOperation::new(from, to).unwrap()))
}

fn folded_value(g: &OperationGraph, consumer: OperationId) -> Vec<f32> {
    let from = g.node(consumer).unwrap().input_link(0).unwrap();
    let node = g.node(from).unwrap();
    assert!(node.flags().is_constant_operation);
    node.operation().constant_elem().unwrap().to_vec()
}

#[test]
fn all_constant_inputs_fold_into_a_constant() {
    let mut g = OperationGraph::new();
    let a = value(&mut g, 2.0);
    let b = value(&mut g, 3.0);
    let m = math(&mut g, MathKind::Add, a, b);
    let c = convert(&mut g, DataType::Value, DataType::Color);
    g.add_link(m, c, 0);

    assert_eq!(fold_constants(&mut g), 2);
    assert!(!g.contains(m));
    assert!(!g.contains(c));
}

#[test]
fn chains_fold_through_consumers() {
    let mut g = OperationGraph::new();
    let a = value(&mut g, 2.0);
    let b = value(&mut g, 3.0);
    let sum = math(&mut g, MathKind::Add, a, b);
    let four = value(&mut g, 4.0);
    let product = math(&mut g, MathKind::Multiply, sum, four);
    let v = g.add_operation(Box::new(ViewerOperation::new(OutputImage::new(), 4, 4)));
    let to_color = convert(&mut g, DataType::Value, DataType::Color);
    g.add_link(product, to_color, 0);
    g.add_link(to_color, v, 0);

    assert_eq!(fold_constants(&mut g), 3);
    assert_eq!(folded_value(&g, v), vec![20.0, 20.0, 20.0, 1.0]);
    assert!(g.contains(v));
}

#[test]
fn unconnected_inputs_block_folding() {
    let mut g = OperationGraph::new();
    let a = value(&mut g, 2.0);
    let m = g.add_operation(Box::new(MathOperation::new(MathKind::Add, false)));
    g.add_link(a, m, 0);
    assert_eq!(fold_constants(&mut g), 0);
    assert!(g.contains(m));
}

#[test]
fn outputs_are_never_folded() {
    let mut g = OperationGraph::new();
    let a = g.add_operation(Box::new(SetColorOperation::new([1.0; 4])));
    let v = g.add_operation(Box::new(ViewerOperation::new(OutputImage::new(), 4, 4)));
    g.add_link(a, v, 0);
    assert_eq!(fold_constants(&mut g), 0);
    assert_eq!(g.len(), 2);
}

#[test]
fn folding_evaluates_the_first_element_area() {
    let mut g = OperationGraph::new();
    let a = value(&mut g, 9.0);
    let b = value(&mut g, 3.0);
    let m = math(&mut g, MathKind::Divide, a, b);
    let consumer = convert(&mut g, DataType::Value, DataType::Vector);
    g.add_link(m, consumer, 0);
    let folded = fold_operation(&mut g, m).unwrap();
    let elem = g.node(folded).unwrap().operation().constant_elem();
    assert_eq!(elem, Some(&[3.0][..]));
    assert_eq!(g.node(consumer).unwrap().input_link(0), Some(folded));
    assert_eq!(FIRST_ELEM_AREA, Rect::new(0, 1, 0, 1));
}
