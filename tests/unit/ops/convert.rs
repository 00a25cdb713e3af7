use super::*;

#[test]
fn same_layout_has_no_converter() {
    let same = ConvertOperation::new(DataType::Color, DataType::Color);
    assert_eq!(same, None);
    let to_value = ConvertOperation::new(DataType::Color, DataType::Value);
    assert!(to_value.is_some());
}

#[test]
fn color_to_value_averages_rgb() {
    let op = ConvertOperation::new(DataType::Color, DataType::Value).unwrap();
    let mut out = [0.0f32];
    op.convert(&[0.3, 0.6, 0.9, 0.2], &mut out);
    assert!((out[0] - 0.6).abs() < 1e-6);
}

#[test]
fn value_to_color_broadcasts_with_opaque_alpha() {
    let op = ConvertOperation::new(DataType::Value, DataType::Color).unwrap();
    let mut out = [0.0f32; 4];
    op.convert(&[0.25], &mut out);
    assert_eq!(out, [0.25, 0.25, 0.25, 1.0]);
}

#[test]
fn vector_and_color_exchange_xyz() {
    let to_color = ConvertOperation::new(DataType::Vector, DataType::Color).unwrap();
    let mut c = [0.0f32; 4];
    to_color.convert(&[1.0, 2.0, 3.0], &mut c);
    assert_eq!(c, [1.0, 2.0, 3.0, 1.0]);

    let to_vector = ConvertOperation::new(DataType::Color, DataType::Vector).unwrap();
    let mut v = [0.0f32; 3];
    to_vector.convert(&c, &mut v);
    assert_eq!(v, [1.0, 2.0, 3.0]);
}

#[test]
fn area_render_converts_every_element() {
    let op = ConvertOperation::new(DataType::Value, DataType::Color).unwrap();
    let mut input = MemoryBuffer::new(DataType::Value, Rect::from_size(2, 1));
    input.write_elem(0, 0, &[0.5]);
    input.write_elem(1, 0, &[1.0]);
    let mut out = MemoryBuffer::new(DataType::Color, Rect::from_size(2, 1));
    op.update_memory_buffer_partial(&mut out, Rect::from_size(2, 1), &[&input]);
    assert_eq!(out.elem(0, 0), Some(&[0.5, 0.5, 0.5, 1.0][..]));
    assert_eq!(out.elem(1, 0), Some(&[1.0, 1.0, 1.0, 1.0][..]));
}

#[test]
fn names_describe_the_direction() {
    let op = ConvertOperation::new(DataType::Vector, DataType::Value).unwrap();
    assert_eq!(op.name(), "ConvertVectorToValue");
    assert_eq!(op.sockets().output_type(), Some(DataType::Value));
}
