use super::*;

fn gradient(rect: Rect) -> MemoryBuffer {
    let mut b = MemoryBuffer::new(DataType::Value, rect);
    for y in rect.ymin..rect.ymax {
        for x in rect.xmin..rect.xmax {
            b.write_elem(x, y, &[(y * 10 + x) as f32]);
        }
    }
    b
}

#[test]
fn center_translates_by_half_the_size_difference() {
    let op = CanvasConvertOperation::new(
        ResizeMode::Center,
        DataType::Value,
        Rect::from_size(4, 4),
        Rect::from_size(8, 8),
    );
    assert_eq!(op.map_point(2.0, 2.0), (0.0, 0.0));
    assert_eq!(op.map_point(5.0, 3.0), (3.0, 1.0));
}

#[test]
fn align_matches_origins() {
    let op = CanvasConvertOperation::new(
        ResizeMode::Align,
        DataType::Value,
        Rect::from_size(4, 4),
        Rect::new(10, 18, 0, 8),
    );
    assert_eq!(op.map_point(10.0, 0.0), (0.0, 0.0));
}

#[test]
fn translated_pixels_outside_the_source_read_zero() {
    let from = Rect::from_size(2, 2);
    let to = Rect::from_size(4, 4);
    let op = CanvasConvertOperation::new(ResizeMode::Center, DataType::Value, from, to);
    let input = gradient(from);
    let mut out = MemoryBuffer::new(DataType::Value, to);
    op.update_memory_buffer_partial(&mut out, to, &[&input]);
    assert_eq!(out.elem(0, 0), Some(&[0.0][..]));
    assert_eq!(out.elem(1, 1), Some(&[0.0][..]));
    assert_eq!(out.elem(2, 1), Some(&[1.0][..]));
    assert_eq!(out.elem(1, 2), Some(&[10.0][..]));
    assert_eq!(out.elem(2, 2), Some(&[11.0][..]));
    assert_eq!(out.elem(3, 3), Some(&[0.0][..]));
}

#[test]
fn canvas_is_fixed_to_the_target() {
    let to = Rect::new(3, 9, 1, 5);
    let op = CanvasConvertOperation::new(
        ResizeMode::Stretch,
        DataType::Color,
        Rect::from_size(2, 2),
        to,
    );
    assert_eq!(op.canvas_policy(), CanvasPolicy::Fixed(to));
    assert!(!op.flags().use_datatype_conversion);
}

#[test]
fn area_of_interest_covers_the_scaled_source() {
    let op = CanvasConvertOperation::new(
        ResizeMode::Stretch,
        DataType::Value,
        Rect::from_size(4, 4),
        Rect::from_size(8, 8),
    );
    let aoi = op.area_of_interest(0, Rect::from_size(8, 8));
    assert!(aoi.contains_rect(&Rect::from_size(4, 4)));
    assert_eq!(op.area_of_interest(0, Rect::NONE), Rect::NONE);
}
