use crate::foundation::rect::Rect;
use crate::memory::buffer::{DataType, MemoryBuffer, MemoryBufferExtend, PixelSampler};
use crate::operation::socket::{ResizeMode, SocketDecl};
use crate::operation::tile::TileInputs;
use crate::operation::traits::{
    AreaProducer, CanvasPolicy, Operation, OperationFlags, PixelProducer, StructuralKey,
};

/// Maps a producer canvas onto a consumer canvas according to a [`ResizeMode`].
///
/// Align translates origins; Center aligns centres; the fit modes scale uniformly; Stretch scales
/// each axis. Pixels that map outside the producer canvas read as zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasConvertOperation {
    mode: ResizeMode,
    data_type: DataType,
    from: Rect,
    to: Rect,
    scale: [f32; 2],
}

impl CanvasConvertOperation {
    /// Conversion of `data_type` elements from canvas `from` to canvas `to`.
    pub fn new(mode: ResizeMode, data_type: DataType, from: Rect, to: Rect) -> Self {
        let sx = to.width() as f32 / from.width().max(1) as f32;
        let sy = to.height() as f32 / from.height().max(1) as f32;
        let scale = match mode {
            ResizeMode::FitWidth => [sx, sx],
            ResizeMode::FitHeight => [sy, sy],
            ResizeMode::FitAny => {
                let s = sx.min(sy);
                [s, s]
            }
            ResizeMode::Stretch => [sx, sy],
            ResizeMode::Center | ResizeMode::Align | ResizeMode::None => [1.0, 1.0],
        };
        Self {
            mode,
            data_type,
            from,
            to,
            scale,
        }
    }

    /// Return `true` when the mapping is a pure integer translation.
    fn is_translation(&self) -> bool {
        self.scale == [1.0, 1.0]
    }

    fn translation(&self) -> (i32, i32) {
        match self.mode {
            ResizeMode::Align => (self.to.xmin - self.from.xmin, self.to.ymin - self.from.ymin),
            _ => (
                self.to.xmin + (self.to.width() - self.from.width()) / 2 - self.from.xmin,
                self.to.ymin + (self.to.height() - self.from.height()) / 2 - self.from.ymin,
            ),
        }
    }

    /// Producer-space sample position of the consumer pixel `(x, y)`, in the integer-addresses-
    /// pixel convention of [`MemoryBuffer::read`].
    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        if self.is_translation() {
            let (dx, dy) = self.translation();
            return (x - dx as f32, y - dy as f32);
        }
        let to_cx = self.to.xmin as f32 + self.to.width() as f32 * 0.5;
        let to_cy = self.to.ymin as f32 + self.to.height() as f32 * 0.5;
        let from_cx = self.from.xmin as f32 + self.from.width() as f32 * 0.5;
        let from_cy = self.from.ymin as f32 + self.from.height() as f32 * 0.5;
        (
            from_cx + (x + 0.5 - to_cx) / self.scale[0] - 0.5,
            from_cy + (y + 0.5 - to_cy) / self.scale[1] - 0.5,
        )
    }

    fn source_of(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        let (sx, sy) = self.map_point(x, y);
        let (cx, cy) = if self.is_translation() {
            (sx, sy)
        } else {
            (sx + 0.5, sy + 0.5)
        };
        let inside = cx >= self.from.xmin as f32
            && cx < self.from.xmax as f32
            && cy >= self.from.ymin as f32
            && cy < self.from.ymax as f32;
        inside.then_some((sx, sy))
    }

    fn sampler(&self) -> PixelSampler {
        if self.is_translation() {
            PixelSampler::Nearest
        } else {
            PixelSampler::Bilinear
        }
    }
}

impl Operation for CanvasConvertOperation {
    fn name(&self) -> &'static str {
        "CanvasConvert"
    }

    fn sockets(&self) -> SocketDecl {
        SocketDecl::new()
            .input_with(self.data_type, ResizeMode::None)
            .output(self.data_type)
    }

    fn flags(&self) -> OperationFlags {
        OperationFlags {
            use_datatype_conversion: false,
            ..OperationFlags::default()
        }
    }

    fn canvas_policy(&self) -> CanvasPolicy {
        CanvasPolicy::Fixed(self.to)
    }

    fn area_of_interest(&self, _input: usize, output_area: Rect) -> Rect {
        if output_area.is_empty() {
            return Rect::NONE;
        }
        let (x0, y0) = self.map_point(output_area.xmin as f32, output_area.ymin as f32);
        let (x1, y1) = self.map_point(output_area.xmax as f32, output_area.ymax as f32);
        let pad = if self.is_translation() { 0 } else { 1 };
        Rect::new(
            x0.min(x1).floor() as i32 - pad,
            x0.max(x1).ceil() as i32 + pad,
            y0.min(y1).floor() as i32 - pad,
            y0.max(y1).ceil() as i32 + pad,
        )
    }

    fn structural_key(&self) -> StructuralKey {
        StructuralKey::params(|h| {
            h.write_u8(self.mode.tag());
            h.write_u8(self.data_type.tag());
            for r in [self.from, self.to] {
                h.write_i32(r.xmin);
                h.write_i32(r.xmax);
                h.write_i32(r.ymin);
                h.write_i32(r.ymax);
            }
        })
    }

    fn as_pixel_producer(&self) -> Option<&dyn PixelProducer> {
        Some(self)
    }

    fn as_area_producer(&self) -> Option<&dyn AreaProducer> {
        Some(self)
    }
}

impl PixelProducer for CanvasConvertOperation {
    fn execute_pixel_sampled(
        &self,
        out: &mut [f32],
        x: f32,
        y: f32,
        _sampler: PixelSampler,
        inputs: &TileInputs<'_>,
    ) {
        match self.source_of(x, y) {
            Some((sx, sy)) => inputs.read_sampled(0, out, sx, sy, self.sampler()),
            None => out.iter_mut().for_each(|v| *v = 0.0),
        }
    }
}

impl AreaProducer for CanvasConvertOperation {
    fn update_memory_buffer_partial(
        &self,
        output: &mut MemoryBuffer,
        area: Rect,
        inputs: &[&MemoryBuffer],
    ) {
        let Some(input) = inputs.first() else {
            return;
        };
        let n = output.num_channels();
        let mut px = [0.0f32; 4];
        let sampler = self.sampler();
        for y in area.ymin..area.ymax {
            for x in area.xmin..area.xmax {
                match self.source_of(x as f32, y as f32) {
                    Some((sx, sy)) => input.read(
                        &mut px[..n],
                        sx,
                        sy,
                        sampler,
                        MemoryBufferExtend::Extend,
                        MemoryBufferExtend::Extend,
                    ),
                    None => px[..n].iter_mut().for_each(|v| *v = 0.0),
                }
                output.write_elem(x, y, &px[..n]);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ops/canvas.rs"]
mod tests;
