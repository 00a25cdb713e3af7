use crate::foundation::rect::Rect;
use crate::memory::buffer::{DataType, MemoryBuffer, PixelSampler};
use crate::operation::socket::SocketDecl;
use crate::operation::tile::TileInputs;
use crate::operation::traits::{
    AreaProducer, CanvasInput, CanvasPolicy, Operation, OperationFlags, PixelProducer,
    StructuralKey,
};

/// Binary function applied by [`MathOperation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathKind {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`, zero when `b` is zero.
    Divide,
    /// `min(a, b)`
    Minimum,
    /// `max(a, b)`
    Maximum,
}

impl MathKind {
    /// Apply to two operands.
    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            MathKind::Add => a + b,
            MathKind::Subtract => a - b,
            MathKind::Multiply => a * b,
            MathKind::Divide => {
                if b == 0.0 {
                    0.0
                } else {
                    a / b
                }
            }
            MathKind::Minimum => a.min(b),
            MathKind::Maximum => a.max(b),
        }
    }

    fn tag(self) -> u8 {
        match self {
            MathKind::Add => 0,
            MathKind::Subtract => 1,
            MathKind::Multiply => 2,
            MathKind::Divide => 3,
            MathKind::Minimum => 4,
            MathKind::Maximum => 5,
        }
    }
}

/// Per-pixel binary math on two values, optionally clamped to `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MathOperation {
    kind: MathKind,
    clamp: bool,
}

impl MathOperation {
    /// Math operation of `kind`.
    pub fn new(kind: MathKind, clamp: bool) -> Self {
        Self { kind, clamp }
    }

    fn compute(&self, a: f32, b: f32) -> f32 {
        let v = self.kind.apply(a, b);
        if self.clamp { v.clamp(0.0, 1.0) } else { v }
    }
}

impl Operation for MathOperation {
    fn name(&self) -> &'static str {
        "Math"
    }

    fn sockets(&self) -> SocketDecl {
        SocketDecl::new()
            .input(DataType::Value)
            .input(DataType::Value)
            .output(DataType::Value)
    }

    fn flags(&self) -> OperationFlags {
        OperationFlags {
            can_be_constant: true,
            ..OperationFlags::default()
        }
    }

    fn canvas_policy(&self) -> CanvasPolicy {
        CanvasPolicy::Input {
            main: CanvasInput::Any,
            preferred: None,
        }
    }

    fn structural_key(&self) -> StructuralKey {
        StructuralKey::params(|h| {
            h.write_u8(self.kind.tag());
            h.write_bool(self.clamp);
        })
    }

    fn as_pixel_producer(&self) -> Option<&dyn PixelProducer> {
        Some(self)
    }

    fn as_area_producer(&self) -> Option<&dyn AreaProducer> {
        Some(self)
    }
}

impl PixelProducer for MathOperation {
    fn execute_pixel_sampled(
        &self,
        out: &mut [f32],
        x: f32,
        y: f32,
        sampler: PixelSampler,
        inputs: &TileInputs<'_>,
    ) {
        let mut a = [0.0f32];
        let mut b = [0.0f32];
        inputs.read_sampled(0, &mut a, x, y, sampler);
        inputs.read_sampled(1, &mut b, x, y, sampler);
        out[0] = self.compute(a[0], b[0]);
    }
}

impl AreaProducer for MathOperation {
    fn update_memory_buffer_partial(
        &self,
        output: &mut MemoryBuffer,
        area: Rect,
        inputs: &[&MemoryBuffer],
    ) {
        let (Some(ia), Some(ib)) = (inputs.first(), inputs.get(1)) else {
            return;
        };
        let mut a = [0.0f32];
        let mut b = [0.0f32];
        for y in area.ymin..area.ymax {
            for x in area.xmin..area.xmax {
                ia.read_elem_checked(x, y, &mut a);
                ib.read_elem_checked(x, y, &mut b);
                output.write_elem(x, y, &[self.compute(a[0], b[0])]);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ops/math.rs"]
mod tests;
