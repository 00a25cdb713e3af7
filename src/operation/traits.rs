use std::fmt;

use crate::config::RenderPriority;
use crate::foundation::hash::StableHasher;
use crate::foundation::rect::Rect;
use crate::memory::buffer::{MemoryBuffer, PixelSampler};
use crate::operation::socket::SocketDecl;
use crate::operation::tile::TileInputs;

/// Structural identity of an operation used to merge duplicates.
///
/// Two operations with equal names, equal keys, equal canvases and identical producers compute
/// the same pixels and may be coalesced. [`StructuralKey::Unique`] opts out of merging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StructuralKey {
    /// Hash of every parameter that influences the output.
    Params(u64),
    /// Never merged.
    Unique,
}

impl StructuralKey {
    /// Key built from parameters fed into a [`StableHasher`].
    pub fn params(feed: impl FnOnce(&mut StableHasher)) -> Self {
        let mut h = StableHasher::new();
        feed(&mut h);
        StructuralKey::Params(h.finish_u64())
    }
}

/// Which input decides the canvas of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CanvasInput {
    /// First input that determines a non-empty canvas.
    Any,
    /// A fixed input index.
    Index(usize),
}

/// How an operation determines its canvas from a preferred area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CanvasPolicy {
    /// Take the preferred area (generators without an intrinsic size).
    Preferred,
    /// A fixed canvas regardless of inputs.
    Fixed(Rect),
    /// Follow an input; `preferred` overrides the area handed upstream.
    Input {
        /// Canvas-deciding input.
        main: CanvasInput,
        /// Replacement preferred area for the upstream query.
        preferred: Option<Rect>,
    },
}

impl Default for CanvasPolicy {
    fn default() -> Self {
        CanvasPolicy::Input {
            main: CanvasInput::Index(0),
            preferred: None,
        }
    }
}

/// Order in which an output group's chunks are scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkOrdering {
    /// Row-major chunk index order.
    #[default]
    Default,
    /// Shuffled.
    Random,
    /// Closest to a single hotspot first.
    CenterOut,
    /// Closest to the rule-of-thirds hotspots first.
    RuleOfThirds,
}

/// Static properties of an operation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct OperationFlags {
    /// Needs random access to whole inputs; isolated by buffer pairs in the tiled model.
    pub complex: bool,
    /// A `Set*` constant generator.
    pub is_set_operation: bool,
    /// Produces a single constant element.
    pub is_constant_operation: bool,
    /// May be folded into a constant when all inputs are constant.
    pub can_be_constant: bool,
    /// Reads a memory proxy.
    pub is_read_buffer: bool,
    /// Writes a memory proxy.
    pub is_write_buffer: bool,
    /// Passthrough removed before execution.
    pub is_proxy: bool,
    /// Viewer output.
    pub is_viewer: bool,
    /// Preview output.
    pub is_preview: bool,
    /// Executed as a single chunk.
    pub single_threaded: bool,
    /// Honours the viewer border.
    pub use_viewer_border: bool,
    /// Honours the render border.
    pub use_render_border: bool,
    /// Groups rooted here may run on the GPU device.
    pub open_cl: bool,
    /// Accepts datatype converters on its links.
    pub use_datatype_conversion: bool,
}

impl Default for OperationFlags {
    fn default() -> Self {
        Self {
            complex: false,
            is_set_operation: false,
            is_constant_operation: false,
            can_be_constant: false,
            is_read_buffer: false,
            is_write_buffer: false,
            is_proxy: false,
            is_viewer: false,
            is_preview: false,
            single_threaded: false,
            use_viewer_border: false,
            use_render_border: false,
            open_cl: false,
            use_datatype_conversion: true,
        }
    }
}

/// A node of the compiled operation graph.
///
/// Rendering is exposed through capability accessors; an operation that cannot render in the
/// selected execution model is rejected when the graph is built.
pub trait Operation: Send + Sync + fmt::Debug {
    /// Kind name, also part of the structural identity.
    fn name(&self) -> &'static str;

    /// Input and output declaration.
    fn sockets(&self) -> SocketDecl;

    /// Static flags.
    fn flags(&self) -> OperationFlags {
        OperationFlags::default()
    }

    /// Canvas determination policy.
    fn canvas_policy(&self) -> CanvasPolicy {
        CanvasPolicy::default()
    }

    /// Adjust the canvas picked by the policy before it is propagated to other inputs.
    fn modify_canvas(&self, _canvas: &mut Rect) {}

    /// Area of input `input` needed to produce `output_area`.
    fn area_of_interest(&self, _input: usize, output_area: Rect) -> Rect {
        output_area
    }

    /// Structural identity used by operation merging.
    fn structural_key(&self) -> StructuralKey;

    /// The constant element of a constant operation.
    fn constant_elem(&self) -> Option<&[f32]> {
        None
    }

    /// Priority class of an output operation.
    fn render_priority(&self, _is_rendering: bool) -> RenderPriority {
        RenderPriority::Low
    }

    /// Return `true` for operations whose results leave the engine.
    fn is_output_operation(&self, _is_rendering: bool) -> bool {
        false
    }

    /// Chunk ordering and normalised hotspot of an output group rooted here.
    fn chunk_ordering(&self) -> (ChunkOrdering, [f32; 2]) {
        (ChunkOrdering::Default, [0.5, 0.5])
    }

    /// Called once before execution with the determined canvas.
    fn init_execution(&self, _canvas: Rect) {}

    /// Called once after execution.
    fn deinit_execution(&self) {}

    /// Tiled-model capability.
    fn as_pixel_producer(&self) -> Option<&dyn PixelProducer> {
        None
    }

    /// Full-frame-model capability, also used by constant folding.
    fn as_area_producer(&self) -> Option<&dyn AreaProducer> {
        None
    }

    /// Output capability: receives the rendered pixels of input 0.
    fn as_output_sink(&self) -> Option<&dyn OutputSink> {
        None
    }
}

/// Per-pixel rendering for the tiled model.
pub trait PixelProducer: Send + Sync {
    /// Write the element at `(x, y)` into `out`, pulling inputs through `inputs`.
    fn execute_pixel_sampled(
        &self,
        out: &mut [f32],
        x: f32,
        y: f32,
        sampler: PixelSampler,
        inputs: &TileInputs<'_>,
    );
}

/// Per-area rendering for the full-frame model.
pub trait AreaProducer: Send + Sync {
    /// Fill `area` of `output` from fully rendered input buffers (one per input socket).
    fn update_memory_buffer_partial(
        &self,
        output: &mut MemoryBuffer,
        area: Rect,
        inputs: &[&MemoryBuffer],
    );
}

/// Destination of an output operation.
pub trait OutputSink: Send + Sync {
    /// Store `area` of `input`, the rendered pixels of input 0.
    fn write_region(&self, input: &MemoryBuffer, area: Rect);
}
