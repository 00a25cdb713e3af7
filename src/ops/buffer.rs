use crate::memory::buffer::DataType;
use crate::operation::socket::{ResizeMode, SocketDecl};
use crate::operation::traits::{CanvasPolicy, Operation, OperationFlags, StructuralKey};

/// Writes its input into a memory proxy, chunk by chunk.
///
/// Has no output socket; the paired [`ReadBufferOperation`]s expose the proxy to consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteBufferOperation {
    data_type: DataType,
}

impl WriteBufferOperation {
    /// Writer of `data_type` elements.
    pub fn new(data_type: DataType) -> Self {
        Self { data_type }
    }
}

impl Operation for WriteBufferOperation {
    fn name(&self) -> &'static str {
        "WriteBuffer"
    }

    fn sockets(&self) -> SocketDecl {
        SocketDecl::new().input_with(self.data_type, ResizeMode::None)
    }

    fn flags(&self) -> OperationFlags {
        OperationFlags {
            is_write_buffer: true,
            use_datatype_conversion: false,
            ..OperationFlags::default()
        }
    }

    fn structural_key(&self) -> StructuralKey {
        StructuralKey::Unique
    }
}

/// Exposes a memory proxy written by a [`WriteBufferOperation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadBufferOperation {
    data_type: DataType,
}

impl ReadBufferOperation {
    /// Reader of `data_type` elements.
    pub fn new(data_type: DataType) -> Self {
        Self { data_type }
    }
}

impl Operation for ReadBufferOperation {
    fn name(&self) -> &'static str {
        "ReadBuffer"
    }

    fn sockets(&self) -> SocketDecl {
        SocketDecl::new().output(self.data_type)
    }

    fn flags(&self) -> OperationFlags {
        OperationFlags {
            is_read_buffer: true,
            use_datatype_conversion: false,
            ..OperationFlags::default()
        }
    }

    fn canvas_policy(&self) -> CanvasPolicy {
        CanvasPolicy::Preferred
    }

    fn structural_key(&self) -> StructuralKey {
        StructuralKey::Unique
    }
}
