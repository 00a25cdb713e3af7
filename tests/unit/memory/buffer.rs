use super::*;

fn grid_3x3() -> MemoryBuffer {
    let mut b = MemoryBuffer::new(DataType::Value, Rect::from_size(3, 3));
    for y in 0..3 {
        for x in 0..3 {
            b.write_elem(x, y, &[(y * 3 + x + 1) as f32]);
        }
    }
    b
}

fn nearest(b: &MemoryBuffer, x: f32, y: f32, ext: MemoryBufferExtend) -> f32 {
    let mut out = [0.0f32];
    b.read(&mut out, x, y, PixelSampler::Nearest, ext, ext);
    out[0]
}

#[test]
fn clip_returns_zero_outside_and_values_inside() {
    let b = grid_3x3();
    assert_eq!(nearest(&b, 0.0, 0.0, MemoryBufferExtend::Clip), 1.0);
    assert_eq!(nearest(&b, 2.0, 2.0, MemoryBufferExtend::Clip), 9.0);
    assert_eq!(nearest(&b, 1.0, 2.0, MemoryBufferExtend::Clip), 8.0);
    assert_eq!(nearest(&b, -1.0, 0.0, MemoryBufferExtend::Clip), 0.0);
    assert_eq!(nearest(&b, 3.0, 1.0, MemoryBufferExtend::Clip), 0.0);
    assert_eq!(nearest(&b, 100.0, -100.0, MemoryBufferExtend::Clip), 0.0);
}

#[test]
fn extend_clamps_to_nearest_edge() {
    let b = grid_3x3();
    assert_eq!(nearest(&b, -5.0, 0.0, MemoryBufferExtend::Extend), 1.0);
    assert_eq!(nearest(&b, 7.0, 1.0, MemoryBufferExtend::Extend), 6.0);
    assert_eq!(nearest(&b, 1.0, 50.0, MemoryBufferExtend::Extend), 8.0);
    assert_eq!(nearest(&b, -100.0, -100.0, MemoryBufferExtend::Extend), 1.0);
}

#[test]
fn repeat_wraps_modulo_size() {
    let b = grid_3x3();
    assert_eq!(nearest(&b, 3.0, 0.0, MemoryBufferExtend::Repeat), 1.0);
    assert_eq!(nearest(&b, -1.0, 0.0, MemoryBufferExtend::Repeat), 3.0);
    assert_eq!(nearest(&b, 4.0, 5.0, MemoryBufferExtend::Repeat), 8.0);
    assert_eq!(nearest(&b, -301.0, 301.0, MemoryBufferExtend::Repeat), 6.0);
}

#[test]
fn clip_semantics_respect_offset_rects() {
    let mut b = MemoryBuffer::new(DataType::Value, Rect::new(10, 12, 20, 22));
    b.fill(b.rect(), &[4.0]);
    assert_eq!(nearest(&b, 10.0, 20.0, MemoryBufferExtend::Clip), 4.0);
    assert_eq!(nearest(&b, 0.0, 0.0, MemoryBufferExtend::Clip), 0.0);
    assert_eq!(nearest(&b, 12.0, 21.0, MemoryBufferExtend::Clip), 0.0);
}

#[test]
fn single_elem_broadcasts_everywhere() {
    let b = MemoryBuffer::from_elem(DataType::Color, &[0.25, 0.5, 0.75, 1.0]);
    assert!(b.is_a_single_elem());
    assert_eq!(b.elem_stride(), 0);
    assert_eq!(b.row_stride(), 0);
    for &(x, y) in &[(0.0, 0.0), (-7.0, 3.0), (1e6, -1e6), (12.5, 99.25)] {
        for sampler in [
            PixelSampler::Nearest,
            PixelSampler::Bilinear,
            PixelSampler::Bicubic,
        ] {
            let mut out = [0.0f32; 4];
            b.read(
                &mut out,
                x,
                y,
                sampler,
                MemoryBufferExtend::Clip,
                MemoryBufferExtend::Clip,
            );
            assert_eq!(out, [0.25, 0.5, 0.75, 1.0]);
        }
    }
    let mut out = [0.0f32; 4];
    b.read_elem_checked(-40, 90, &mut out);
    assert_eq!(out, [0.25, 0.5, 0.75, 1.0]);
}

#[test]
fn bilinear_is_exact_on_integers_and_blends_between() {
    let b = grid_3x3();
    let mut out = [0.0f32];
    let ext = MemoryBufferExtend::Extend;
    b.read(&mut out, 1.0, 1.0, PixelSampler::Bilinear, ext, ext);
    assert_eq!(out[0], 5.0);
    b.read(&mut out, 0.5, 0.0, PixelSampler::Bilinear, ext, ext);
    assert!((out[0] - 1.5).abs() < 1e-6);
    b.read(&mut out, 0.5, 0.5, PixelSampler::Bilinear, ext, ext);
    assert!((out[0] - 3.0).abs() < 1e-6);
}

#[test]
fn bicubic_preserves_uniform_buffers() {
    let mut b = MemoryBuffer::new(DataType::Value, Rect::from_size(8, 8));
    b.fill(b.rect(), &[0.6]);
    let mut out = [0.0f32];
    let ext = MemoryBufferExtend::Extend;
    b.read(&mut out, 3.3, 4.7, PixelSampler::Bicubic, ext, ext);
    assert!((out[0] - 0.6).abs() < 1e-5);
}

#[test]
fn clone_is_a_deep_copy() {
    let a = grid_3x3();
    let mut b = a.clone();
    b.write_elem(0, 0, &[42.0]);
    assert_eq!(a.elem(0, 0), Some(&[1.0f32][..]));
    assert_eq!(b.elem(0, 0), Some(&[42.0f32][..]));
}

#[test]
fn copy_from_only_touches_the_overlap() {
    let src = grid_3x3();
    let mut dst = MemoryBuffer::new(DataType::Value, Rect::new(1, 5, 1, 5));
    dst.copy_from(&src, Rect::new(0, 10, 0, 10));
    assert_eq!(dst.elem(1, 1), Some(&[5.0f32][..]));
    assert_eq!(dst.elem(2, 2), Some(&[9.0f32][..]));
    assert_eq!(dst.elem(3, 3), Some(&[0.0f32][..]));
}

#[test]
fn copy_from_single_elem_broadcasts_into_area() {
    let src = MemoryBuffer::from_elem(DataType::Value, &[2.0]);
    let mut dst = MemoryBuffer::new(DataType::Value, Rect::from_size(4, 4));
    dst.copy_from(&src, Rect::new(1, 3, 1, 3));
    assert_eq!(dst.elem(0, 0), Some(&[0.0f32][..]));
    assert_eq!(dst.elem(1, 1), Some(&[2.0f32][..]));
    assert_eq!(dst.elem(2, 2), Some(&[2.0f32][..]));
    assert_eq!(dst.elem(3, 3), Some(&[0.0f32][..]));
}

#[test]
fn ewa_read_of_uniform_color_is_that_color() {
    let mut b = MemoryBuffer::new(DataType::Color, Rect::from_size(16, 16));
    b.fill(b.rect(), &[0.2, 0.4, 0.6, 1.0]);
    let mut out = [0.0f32; 4];
    b.read_ewa(&mut out, 8.0, 8.0, [2.0, 0.0], [0.0, 2.0]);
    for (got, want) in out.iter().zip([0.2, 0.4, 0.6, 1.0]) {
        assert!((got - want).abs() < 1e-4, "{out:?}");
    }
}

#[test]
fn temporary_state_is_reported() {
    let b = MemoryBuffer::with_state(
        DataType::Vector,
        Rect::from_size(2, 2),
        false,
        BufferState::Temporary,
    );
    assert!(b.is_temporary());
    assert_eq!(b.num_channels(), 3);
    assert_eq!(b.as_slice().len(), 12);
}

const SAMPLERS: [PixelSampler; 3] = [
    PixelSampler::Nearest,
    PixelSampler::Bilinear,
    PixelSampler::Bicubic,
];

const CLIP: MemoryBufferExtend = MemoryBufferExtend::Clip;
const EXTEND: MemoryBufferExtend = MemoryBufferExtend::Extend;
const REPEAT: MemoryBufferExtend = MemoryBufferExtend::Repeat;

fn sample(b: &MemoryBuffer, x: f32, y: f32, s: PixelSampler, ext: MemoryBufferExtend) -> f32 {
    let mut out = [0.0f32];
    b.read(&mut out, x, y, s, ext, ext);
    out[0]
}

fn close(actual: f32, expected: f32) -> bool {
    (actual - expected).abs() < 1e-5
}

#[test]
fn far_out_of_range_reads_clip_or_clamp() {
    let b = grid_3x3();
    for s in SAMPLERS {
        for (x, y) in [(1.0e10, 1.0), (-1.0e10, 1.0), (1.0, 1.0e10), (1.0e10, -1.0e10)] {
            assert_eq!(sample(&b, x, y, s, CLIP), 0.0, "{s:?} at {x},{y}");
        }
        // Row 1 clamped to the right and left columns, then the top-right corner.
        assert!(close(sample(&b, 1.0e10, 1.0, s, EXTEND), 6.0), "{s:?}");
        assert!(close(sample(&b, -1.0e10, 1.0, s, EXTEND), 4.0), "{s:?}");
        assert!(close(sample(&b, 1.0e10, -1.0e10, s, EXTEND), 3.0), "{s:?}");
        for (x, y) in [(1.0e10, 1.0), (-1.0e10, -1.0e10), (f32::INFINITY, f32::NAN)] {
            let v = sample(&b, x, y, s, REPEAT);
            assert!((1.0..=9.0).contains(&v), "{s:?} at {x},{y}: {v}");
        }
    }
    // 1e10 = 1 (mod 3), -1e10 = 2 (mod 3).
    assert_eq!(nearest(&b, 1.0e10, 1.0, REPEAT), 5.0);
    assert_eq!(nearest(&b, -1.0e10, 1.0, REPEAT), 6.0);
}

#[test]
fn far_reads_of_negative_origin_buffers_stay_in_range() {
    let mut b = MemoryBuffer::new(DataType::Value, Rect::new(-4, 0, -4, 0));
    b.fill(b.rect(), &[7.0]);
    for s in SAMPLERS {
        for (x, y) in [(1.0e10, -2.0), (-1.0e10, -2.0), (-2.0, -1.0e10)] {
            assert_eq!(sample(&b, x, y, s, CLIP), 0.0, "{s:?} at {x},{y}");
            assert!(close(sample(&b, x, y, s, EXTEND), 7.0), "{s:?} at {x},{y}");
            assert!(close(sample(&b, x, y, s, REPEAT), 7.0), "{s:?} at {x},{y}");
        }
    }
}

#[test]
fn ewa_read_far_outside_is_zero() {
    let mut b = MemoryBuffer::new(DataType::Color, Rect::new(-4, 4, -4, 4));
    b.fill(b.rect(), &[1.0, 1.0, 1.0, 1.0]);
    for (x, y) in [(1.0e10, 0.0), (-1.0e10, -1.0e10), (f32::NAN, 0.0)] {
        let mut out = [0.5f32; 4];
        b.read_ewa(&mut out, x, y, [1.0, 0.0], [0.0, 1.0]);
        assert_eq!(out, [0.0; 4], "at {x},{y}");
    }
}
