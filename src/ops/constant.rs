use crate::memory::buffer::DataType;
use crate::operation::socket::SocketDecl;
use crate::operation::traits::{CanvasPolicy, Operation, OperationFlags, StructuralKey};

fn constant_flags() -> OperationFlags {
    OperationFlags {
        is_set_operation: true,
        is_constant_operation: true,
        ..OperationFlags::default()
    }
}

fn constant_key(name: &str, elem: &[f32]) -> StructuralKey {
    StructuralKey::params(|h| {
        h.write_str(name);
        h.write_f32s(elem);
    })
}

/// Constant single-channel value.
#[derive(Clone, Debug, PartialEq)]
pub struct SetValueOperation {
    value: [f32; 1],
}

impl SetValueOperation {
    /// Constant `value`.
    pub fn new(value: f32) -> Self {
        Self { value: [value] }
    }

    /// The held value.
    pub fn value(&self) -> f32 {
        self.value[0]
    }
}

impl Operation for SetValueOperation {
    fn name(&self) -> &'static str {
        "SetValue"
    }

    fn sockets(&self) -> SocketDecl {
        SocketDecl::new().output(DataType::Value)
    }

    fn flags(&self) -> OperationFlags {
        constant_flags()
    }

    fn canvas_policy(&self) -> CanvasPolicy {
        CanvasPolicy::Preferred
    }

    fn structural_key(&self) -> StructuralKey {
        constant_key(self.name(), &self.value)
    }

    fn constant_elem(&self) -> Option<&[f32]> {
        Some(&self.value)
    }
}

/// Constant RGBA color.
#[derive(Clone, Debug, PartialEq)]
pub struct SetColorOperation {
    rgba: [f32; 4],
}

impl SetColorOperation {
    /// Constant `rgba`.
    pub fn new(rgba: [f32; 4]) -> Self {
        Self { rgba }
    }
}

impl Operation for SetColorOperation {
    fn name(&self) -> &'static str {
        "SetColor"
    }

    fn sockets(&self) -> SocketDecl {
        SocketDecl::new().output(DataType::Color)
    }

    fn flags(&self) -> OperationFlags {
        constant_flags()
    }

    fn canvas_policy(&self) -> CanvasPolicy {
        CanvasPolicy::Preferred
    }

    fn structural_key(&self) -> StructuralKey {
        constant_key(self.name(), &self.rgba)
    }

    fn constant_elem(&self) -> Option<&[f32]> {
        Some(&self.rgba)
    }
}

/// Constant 3D vector.
#[derive(Clone, Debug, PartialEq)]
pub struct SetVectorOperation {
    xyz: [f32; 3],
}

impl SetVectorOperation {
    /// Constant `xyz`.
    pub fn new(xyz: [f32; 3]) -> Self {
        Self { xyz }
    }
}

impl Operation for SetVectorOperation {
    fn name(&self) -> &'static str {
        "SetVector"
    }

    fn sockets(&self) -> SocketDecl {
        SocketDecl::new().output(DataType::Vector)
    }

    fn flags(&self) -> OperationFlags {
        constant_flags()
    }

    fn canvas_policy(&self) -> CanvasPolicy {
        CanvasPolicy::Preferred
    }

    fn structural_key(&self) -> StructuralKey {
        constant_key(self.name(), &self.xyz)
    }

    fn constant_elem(&self) -> Option<&[f32]> {
        Some(&self.xyz)
    }
}

/// Constant operation matching `data_type`, built from the leading channels of `elem`.
pub fn constant_operation(data_type: DataType, elem: &[f32]) -> Box<dyn Operation> {
    let at = |i: usize| elem.get(i).copied().unwrap_or(0.0);
    match data_type {
        DataType::Value => Box::new(SetValueOperation::new(at(0))),
        DataType::Vector => Box::new(SetVectorOperation::new([at(0), at(1), at(2)])),
        DataType::Color => Box::new(SetColorOperation::new([at(0), at(1), at(2), at(3)])),
    }
}
