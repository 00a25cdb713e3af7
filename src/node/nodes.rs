use crate::config::CompositorContext;
use crate::memory::buffer::DataType;
use crate::node::converter::NodeConverter;
use crate::node::graph::{Node, NodeSockets};
use crate::operation::traits::ChunkOrdering;
use crate::ops::blur::BoxBlurOperation;
use crate::ops::constant::{SetColorOperation, SetValueOperation};
use crate::ops::math::{MathKind, MathOperation};
use crate::ops::output::{CompositeOperation, OutputImage, ViewerOperation};
use crate::ops::proxy::ProxyOperation;

/// Constant value output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueNode {
    /// Produced value.
    pub value: f32,
}

impl Node for ValueNode {
    fn name(&self) -> &'static str {
        "Value"
    }

    fn sockets(&self) -> NodeSockets {
        NodeSockets::new().output(DataType::Value)
    }

    fn convert_to_operations(
        &self,
        converter: &mut NodeConverter<'_>,
        _context: &CompositorContext,
    ) {
        let op = converter.add_operation(SetValueOperation::new(self.value));
        converter.map_output_socket(0, op);
    }
}

/// Constant color output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RgbNode {
    /// Produced color.
    pub rgba: [f32; 4],
}

impl Node for RgbNode {
    fn name(&self) -> &'static str {
        "RGB"
    }

    fn sockets(&self) -> NodeSockets {
        NodeSockets::new().output(DataType::Color)
    }

    fn convert_to_operations(
        &self,
        converter: &mut NodeConverter<'_>,
        _context: &CompositorContext,
    ) {
        let op = converter.add_operation(SetColorOperation::new(self.rgba));
        converter.map_output_socket(0, op);
    }
}

/// Binary math on two values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MathNode {
    /// Applied function.
    pub kind: MathKind,
    /// Clamp the result to `[0, 1]`.
    pub clamp: bool,
}

impl Node for MathNode {
    fn name(&self) -> &'static str {
        "Math"
    }

    fn sockets(&self) -> NodeSockets {
        NodeSockets::new()
            .input(DataType::Value, &[0.5])
            .input(DataType::Value, &[0.5])
            .output(DataType::Value)
    }

    fn convert_to_operations(
        &self,
        converter: &mut NodeConverter<'_>,
        _context: &CompositorContext,
    ) {
        let op = converter.add_operation(MathOperation::new(self.kind, self.clamp));
        converter.map_input_socket(0, op, 0);
        converter.map_input_socket(1, op, 1);
        converter.map_output_socket(0, op);
    }
}

/// Socket indirection without any effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RerouteNode {
    /// Carried layout.
    pub data_type: DataType,
}

impl Node for RerouteNode {
    fn name(&self) -> &'static str {
        "Reroute"
    }

    fn sockets(&self) -> NodeSockets {
        NodeSockets::new()
            .input(self.data_type, &[])
            .output(self.data_type)
    }

    fn convert_to_operations(
        &self,
        converter: &mut NodeConverter<'_>,
        _context: &CompositorContext,
    ) {
        let op =
            converter.add_operation(ProxyOperation::new(self.data_type, self.data_type, false));
        converter.map_input_socket(0, op, 0);
        converter.map_output_socket(0, op);
    }
}

/// Passthrough standing for a group interface socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SocketProxyNode {
    input: DataType,
    output: DataType,
    use_conversion: bool,
}

impl SocketProxyNode {
    /// Proxy from `input` to `output` layout.
    pub fn new(input: DataType, output: DataType, use_conversion: bool) -> Self {
        Self {
            input,
            output,
            use_conversion,
        }
    }
}

impl Node for SocketProxyNode {
    fn name(&self) -> &'static str {
        "SocketProxy"
    }

    fn sockets(&self) -> NodeSockets {
        NodeSockets::new()
            .input(self.input, &[])
            .output(self.output)
    }

    fn convert_to_operations(
        &self,
        converter: &mut NodeConverter<'_>,
        _context: &CompositorContext,
    ) {
        let op = converter.add_operation(ProxyOperation::new(
            self.input,
            self.output,
            self.use_conversion,
        ));
        converter.map_input_socket(0, op, 0);
        converter.map_output_socket(0, op);
    }
}

/// Box blur of a color image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlurNode {
    /// Window radius in pixels.
    pub radius: i32,
}

impl Node for BlurNode {
    fn name(&self) -> &'static str {
        "Blur"
    }

    fn sockets(&self) -> NodeSockets {
        NodeSockets::new()
            .input(DataType::Color, &[1.0, 1.0, 1.0, 1.0])
            .output(DataType::Color)
    }

    fn convert_to_operations(
        &self,
        converter: &mut NodeConverter<'_>,
        _context: &CompositorContext,
    ) {
        if self.radius == 0 {
            let proxy = converter.add_input_proxy(0, false);
            converter.map_output_socket(0, proxy);
            return;
        }
        let op = converter.add_operation(BoxBlurOperation::new(self.radius));
        converter.map_input_socket(0, op, 0);
        converter.map_output_socket(0, op);
    }
}

/// Interactive output into a shared image.
#[derive(Clone, Debug)]
pub struct ViewerNode {
    /// Destination image.
    pub image: OutputImage,
    /// Preferred canvas size for unsized inputs.
    pub size: (i32, i32),
    /// Chunk scheduling order.
    pub chunk_order: ChunkOrdering,
    /// Normalised hotspot of the center-out order.
    pub center: [f32; 2],
}

impl ViewerNode {
    /// Viewer of `width x height` rendering into `image`.
    pub fn new(image: OutputImage, width: i32, height: i32) -> Self {
        Self {
            image,
            size: (width, height),
            chunk_order: ChunkOrdering::Default,
            center: [0.5, 0.5],
        }
    }
}

impl Node for ViewerNode {
    fn name(&self) -> &'static str {
        "Viewer"
    }

    fn sockets(&self) -> NodeSockets {
        NodeSockets::new().input(DataType::Color, &[0.0, 0.0, 0.0, 1.0])
    }

    fn convert_to_operations(
        &self,
        converter: &mut NodeConverter<'_>,
        _context: &CompositorContext,
    ) {
        let op = converter.add_operation(
            ViewerOperation::new(self.image.clone(), self.size.0, self.size.1)
                .with_chunk_order(self.chunk_order, self.center),
        );
        converter.map_input_socket(0, op, 0);
    }
}

/// Final-render output into a shared image.
#[derive(Clone, Debug)]
pub struct CompositeNode {
    /// Destination image.
    pub image: OutputImage,
    /// Render size.
    pub size: (i32, i32),
}

impl Node for CompositeNode {
    fn name(&self) -> &'static str {
        "Composite"
    }

    fn sockets(&self) -> NodeSockets {
        NodeSockets::new().input(DataType::Color, &[0.0, 0.0, 0.0, 1.0])
    }

    fn convert_to_operations(
        &self,
        converter: &mut NodeConverter<'_>,
        context: &CompositorContext,
    ) {
        // Outside final renders the composite produces nothing; its links are dropped.
        if !context.settings().is_rendering {
            return;
        }
        let op = converter.add_operation(CompositeOperation::new(
            self.image.clone(),
            self.size.0,
            self.size.1,
        ));
        converter.map_input_socket(0, op, 0);
    }
}
