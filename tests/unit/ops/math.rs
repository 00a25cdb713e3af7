use super::*;

use crate::ops::constant::SetValueOperation;
use crate::operation::graph::OperationGraph;
use crate::operation::tile::{TileContext, evaluate_pixel};

#[test]
fn divide_by_zero_yields_zero() {
    assert_eq!(MathKind::Divide.apply(3.0, 0.0), 0.0);
    assert_eq!(MathKind::Divide.apply(3.0, 2.0), 1.5);
    assert_eq!(MathKind::Minimum.apply(3.0, 2.0), 2.0);
    assert_eq!(MathKind::Subtract.apply(3.0, 2.0), 1.0);
}

#[test]
fn clamp_limits_the_result() {
    let op = MathOperation::new(MathKind::Add, true);
    let a = MemoryBuffer::from_elem(DataType::Value, &[0.75]);
    let b = MemoryBuffer::from_elem(DataType::Value, &[0.75]);
    let area = Rect::from_size(2, 2);
    let mut out = MemoryBuffer::new(DataType::Value, area);
    op.update_memory_buffer_partial(&mut out, area, &[&a, &b]);
    assert_eq!(out.elem(1, 1), Some(&[1.0][..]));
}

#[test]
fn area_render_only_touches_the_requested_area() {
    let op = MathOperation::new(MathKind::Multiply, false);
    let mut a = MemoryBuffer::new(DataType::Value, Rect::from_size(4, 1));
    for x in 0..4 {
        a.write_elem(x, 0, &[x as f32]);
    }
    let b = MemoryBuffer::from_elem(DataType::Value, &[10.0]);
    let mut out = MemoryBuffer::new(DataType::Value, Rect::from_size(4, 1));
    op.update_memory_buffer_partial(&mut out, Rect::new(1, 3, 0, 1), &[&a, &b]);
    assert_eq!(out.as_slice(), &[0.0, 10.0, 20.0, 0.0]);
}

#[test]
fn pixel_evaluation_pulls_constant_inputs() {
    let mut g = OperationGraph::new();
    let a = g.add_operation(Box::new(SetValueOperation::new(2.0)));
    let b = g.add_operation(Box::new(SetValueOperation::new(3.0)));
    let m = g.add_operation(Box::new(MathOperation::new(MathKind::Add, false)));
    assert!(g.add_link(a, m, 0));
    assert!(g.add_link(b, m, 1));
    let ctx = TileContext {
        graph: &g,
        buffers: &[],
    };
    let mut out = [0.0f32];
    evaluate_pixel(&ctx, m, &mut out, 5.0, 7.0, PixelSampler::Nearest);
    assert_eq!(out, [5.0]);
}

#[test]
fn structural_key_distinguishes_parameters() {
    let add = MathOperation::new(MathKind::Add, false).structural_key();
    let add2 = MathOperation::new(MathKind::Add, false).structural_key();
    let clamped = MathOperation::new(MathKind::Add, true).structural_key();
    let mul = MathOperation::new(MathKind::Multiply, false).structural_key();
    assert_eq!(add, add2);
    assert_ne!(add, clamped);
    assert_ne!(add, mul);
}
