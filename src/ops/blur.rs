use crate::foundation::rect::Rect;
use crate::memory::buffer::{DataType, MemoryBuffer, MemoryBufferExtend, PixelSampler};
use crate::operation::socket::SocketDecl;
use crate::operation::tile::TileInputs;
use crate::operation::traits::{
    AreaProducer, Operation, OperationFlags, PixelProducer, StructuralKey,
};

/// Box blur over a `(2r+1)^2` window with edge clamping.
///
/// Needs neighbouring pixels of its input, so it is a complex operation: the tiled model
/// isolates it behind read/write buffer pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxBlurOperation {
    radius: i32,
}

impl BoxBlurOperation {
    /// Blur with `radius` pixels; negative radii are treated as zero.
    pub fn new(radius: i32) -> Self {
        Self {
            radius: radius.max(0),
        }
    }

    /// Window radius.
    pub fn radius(&self) -> i32 {
        self.radius
    }

    fn window_average(
        &self,
        out: &mut [f32],
        x: i32,
        y: i32,
        mut fetch: impl FnMut(i32, i32, &mut [f32; 4]),
    ) {
        let mut sum = [0.0f32; 4];
        let mut px = [0.0f32; 4];
        for dy in -self.radius..=self.radius {
            for dx in -self.radius..=self.radius {
                fetch(x + dx, y + dy, &mut px);
                for (s, p) in sum.iter_mut().zip(px) {
                    *s += p;
                }
            }
        }
        let side = (2 * self.radius + 1) as f32;
        let count = side * side;
        for (o, s) in out.iter_mut().zip(sum) {
            *o = s / count;
        }
    }
}

impl Operation for BoxBlurOperation {
    fn name(&self) -> &'static str {
        "BoxBlur"
    }

    fn sockets(&self) -> SocketDecl {
        SocketDecl::new()
            .input(DataType::Color)
            .output(DataType::Color)
    }

    fn flags(&self) -> OperationFlags {
        OperationFlags {
            complex: true,
            ..OperationFlags::default()
        }
    }

    fn area_of_interest(&self, _input: usize, output_area: Rect) -> Rect {
        output_area.expand(self.radius, self.radius)
    }

    fn structural_key(&self) -> StructuralKey {
        StructuralKey::params(|h| h.write_i32(self.radius))
    }

    fn as_pixel_producer(&self) -> Option<&dyn PixelProducer> {
        Some(self)
    }

    fn as_area_producer(&self) -> Option<&dyn AreaProducer> {
        Some(self)
    }
}

impl PixelProducer for BoxBlurOperation {
    fn execute_pixel_sampled(
        &self,
        out: &mut [f32],
        x: f32,
        y: f32,
        _sampler: PixelSampler,
        inputs: &TileInputs<'_>,
    ) {
        let canvas = inputs.input_canvas(0);
        if canvas.is_empty() {
            // Unsized producers (constants) have no edge to clamp against.
            self.window_average(out, x as i32, y as i32, |sx, sy, px| {
                inputs.read_sampled(0, px, sx as f32, sy as f32, PixelSampler::Nearest)
            });
            return;
        }
        self.window_average(out, x as i32, y as i32, |sx, sy, px| {
            let cx = sx.clamp(canvas.xmin, canvas.xmax - 1);
            let cy = sy.clamp(canvas.ymin, canvas.ymax - 1);
            inputs.read_sampled(0, px, cx as f32, cy as f32, PixelSampler::Nearest)
        });
    }
}

impl AreaProducer for BoxBlurOperation {
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
        for y in area.ymin..area.ymax {
            for x in area.xmin..area.xmax {
                self.window_average(&mut px, x, y, |sx, sy, p| {
                    input.read(
                        p,
                        sx as f32,
                        sy as f32,
                        PixelSampler::Nearest,
                        MemoryBufferExtend::Extend,
                        MemoryBufferExtend::Extend,
                    )
                });
                output.write_elem(x, y, &px[..n]);
            }
        }
    }
}
