use crate::memory::buffer::DataType;
use crate::operation::socket::SocketDecl;
use crate::operation::traits::{Operation, OperationFlags, StructuralKey};

/// Zero-cost passthrough standing for a reroute, a muted node or a group boundary.
///
/// Proxies are spliced out before execution; consumers end up linked to the first non-proxy
/// producer upstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProxyOperation {
    input: DataType,
    output: DataType,
    use_conversion: bool,
}

impl ProxyOperation {
    /// Passthrough from `input` to `output` layout.
    pub fn new(input: DataType, output: DataType, use_conversion: bool) -> Self {
        Self {
            input,
            output,
            use_conversion,
        }
    }
}

impl Operation for ProxyOperation {
    fn name(&self) -> &'static str {
        "Proxy"
    }

    fn sockets(&self) -> SocketDecl {
        SocketDecl::new().input(self.input).output(self.output)
    }

    fn flags(&self) -> OperationFlags {
        OperationFlags {
            is_proxy: true,
            use_datatype_conversion: self.use_conversion,
            ..OperationFlags::default()
        }
    }

    fn structural_key(&self) -> StructuralKey {
        StructuralKey::Unique
    }
}
