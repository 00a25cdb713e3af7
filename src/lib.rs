//! Node-graph image compositing engine.
//!
//! A [`NodeGraph`] of user-facing nodes is compiled by the [`NodeOperationBuilder`] into an
//! [`OperationGraph`] of pixel operations, then rendered by an [`ExecutionSystem`] with one of
//! two execution models:
//!
//! - [`ExecutionModel::Tiled`]: outputs are partitioned into chunks and evaluated pixel by pixel
//!   inside [`ExecutionGroup`]s; complex operations are isolated behind [`MemoryProxy`] buffers.
//! - [`ExecutionModel::FullFrame`]: every operation renders the whole area its consumers need,
//!   after its inputs.
//!
//! Work is dispatched by an explicit [`WorkScheduler`].
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub(crate) mod builder;
pub(crate) mod config;
pub mod debug;
pub(crate) mod execution;
pub(crate) mod foundation;
pub(crate) mod memory;
pub(crate) mod node;
pub(crate) mod operation;
pub(crate) mod ops;
pub(crate) mod scheduler;

pub use builder::{BuildPass, BuildReport, BuiltGraph, NodeOperationBuilder};
pub use config::{
    CompositorContext, CompositorSettings, ExecutionModel, FractionalBorder, RenderPriority,
    ThreadingModel,
};
pub use execution::group::{ChunkState, ExecutionGroup, GroupFlags};
pub use execution::system::{ExecutionReport, ExecutionSystem};
pub use foundation::error::{CompositorError, CompositorResult};
pub use foundation::hash::StableHasher;
pub use foundation::ids::{GroupId, NodeId, OperationId, ProxyId};
pub use foundation::rect::Rect;
pub use memory::buffer::{BufferState, DataType, MemoryBuffer, MemoryBufferExtend, PixelSampler};
pub use memory::ewa::{EllipseShape, ewa_filter, implicit_to_shape, shape_to_implicit};
pub use memory::proxy::MemoryProxy;
pub use node::converter::NodeConverter;
pub use node::graph::{
    GroupInstance, Node, NodeGraph, NodeGroup, NodeInput, NodeInputDecl, NodeLink, NodeOutput,
    NodeSockets,
};
pub use node::nodes::{
    BlurNode, CompositeNode, MathNode, RerouteNode, RgbNode, SocketProxyNode, ValueNode,
    ViewerNode,
};
pub use operation::graph::{OperationGraph, OperationNode};
pub use operation::socket::{InputSocket, Link, ResizeMode, SocketDecl};
pub use operation::tile::TileInputs;
pub use operation::traits::{
    AreaProducer, CanvasInput, CanvasPolicy, ChunkOrdering, Operation, OperationFlags,
    OutputSink, PixelProducer, StructuralKey,
};
pub use ops::blur::BoxBlurOperation;
pub use ops::buffer::{ReadBufferOperation, WriteBufferOperation};
pub use ops::canvas::CanvasConvertOperation;
pub use ops::constant::{
    SetColorOperation, SetValueOperation, SetVectorOperation, constant_operation,
};
pub use ops::convert::ConvertOperation;
pub use ops::math::{MathKind, MathOperation};
pub use ops::output::{
    CompositeOperation, OutputImage, PREVIEW_SIZE, PreviewOperation, ViewerOperation,
};
pub use ops::proxy::ProxyOperation;
pub use scheduler::device::{CpuDevice, Device};
pub use scheduler::work::WorkPackage;
pub use scheduler::work_scheduler::WorkScheduler;
