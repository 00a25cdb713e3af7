use crate::foundation::rect::Rect;
use crate::memory::buffer::{DataType, MemoryBuffer, PixelSampler};
use crate::operation::socket::SocketDecl;
use crate::operation::tile::TileInputs;
use crate::operation::traits::{
    AreaProducer, Operation, OperationFlags, PixelProducer, StructuralKey,
};

/// Converts elements between value, vector and color layouts.
///
/// Color and vector collapse to a value by averaging their first three channels; a value
/// broadcasts to every channel with alpha one; vector and color exchange xyz/rgb with alpha one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvertOperation {
    from: DataType,
    to: DataType,
}

impl ConvertOperation {
    /// Converter from `from` to `to`; `None` when both are the same layout.
    pub fn new(from: DataType, to: DataType) -> Option<Self> {
        (from != to).then_some(Self { from, to })
    }

    /// Convert one element.
    pub fn convert(&self, src: &[f32], out: &mut [f32]) {
        let at = |i: usize| src.get(i).copied().unwrap_or(0.0);
        let converted: [f32; 4] = match (self.from, self.to) {
            (DataType::Color | DataType::Vector, DataType::Value) => {
                [(at(0) + at(1) + at(2)) / 3.0, 0.0, 0.0, 0.0]
            }
            (DataType::Value, DataType::Color) => [at(0), at(0), at(0), 1.0],
            (DataType::Value, DataType::Vector) => [at(0), at(0), at(0), 0.0],
            (DataType::Color, DataType::Vector) => [at(0), at(1), at(2), 0.0],
            (DataType::Vector, DataType::Color) => [at(0), at(1), at(2), 1.0],
            _ => [at(0), at(1), at(2), at(3)],
        };
        let n = out.len().min(self.to.num_channels());
        out[..n].copy_from_slice(&converted[..n]);
    }
}

impl Operation for ConvertOperation {
    fn name(&self) -> &'static str {
        match (self.from, self.to) {
            (DataType::Color, DataType::Value) => "ConvertColorToValue",
            (DataType::Vector, DataType::Value) => "ConvertVectorToValue",
            (DataType::Value, DataType::Color) => "ConvertValueToColor",
            (DataType::Value, DataType::Vector) => "ConvertValueToVector",
            (DataType::Color, DataType::Vector) => "ConvertColorToVector",
            (DataType::Vector, DataType::Color) => "ConvertVectorToColor",
            _ => "Convert",
        }
    }

    fn sockets(&self) -> SocketDecl {
        SocketDecl::new().input(self.from).output(self.to)
    }

    fn flags(&self) -> OperationFlags {
        OperationFlags {
            can_be_constant: true,
            ..OperationFlags::default()
        }
    }

    fn structural_key(&self) -> StructuralKey {
        StructuralKey::params(|h| {
            h.write_u8(self.from.tag());
            h.write_u8(self.to.tag());
        })
    }

    fn as_pixel_producer(&self) -> Option<&dyn PixelProducer> {
        Some(self)
    }

    fn as_area_producer(&self) -> Option<&dyn AreaProducer> {
        Some(self)
    }
}

impl PixelProducer for ConvertOperation {
    fn execute_pixel_sampled(
        &self,
        out: &mut [f32],
        x: f32,
        y: f32,
        sampler: PixelSampler,
        inputs: &TileInputs<'_>,
    ) {
        let mut src = [0.0f32; 4];
        inputs.read_sampled(0, &mut src[..self.from.num_channels()], x, y, sampler);
        self.convert(&src, out);
    }
}

impl AreaProducer for ConvertOperation {
    fn update_memory_buffer_partial(
        &self,
        output: &mut MemoryBuffer,
        area: Rect,
        inputs: &[&MemoryBuffer],
    ) {
        let Some(input) = inputs.first() else {
            return;
        };
        let mut src = [0.0f32; 4];
        let mut dst = [0.0f32; 4];
        let n = output.num_channels();
        for y in area.ymin..area.ymax {
            for x in area.xmin..area.xmax {
                input.read_elem_checked(x, y, &mut src[..input.num_channels()]);
                self.convert(&src, &mut dst[..n]);
                output.write_elem(x, y, &dst[..n]);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ops/convert.rs"]
mod tests;
