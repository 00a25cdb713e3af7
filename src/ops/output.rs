use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::RenderPriority;
use crate::foundation::rect::Rect;
use crate::memory::buffer::{DataType, MemoryBuffer};
use crate::operation::socket::{ResizeMode, SocketDecl};
use crate::operation::traits::{
    CanvasInput, CanvasPolicy, ChunkOrdering, Operation, OperationFlags, OutputSink,
    StructuralKey,
};

/// Shared RGBA image an output operation renders into.
///
/// Clones share the same storage, so the host keeps one handle and hands another to the node.
#[derive(Clone, Debug, Default)]
pub struct OutputImage {
    inner: Arc<Mutex<Option<MemoryBuffer>>>,
}

impl OutputImage {
    /// Unallocated image.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate(&self, rect: Rect) {
        *self.inner.lock() = Some(MemoryBuffer::new(DataType::Color, rect));
    }

    pub(crate) fn write(&self, src: &MemoryBuffer, area: Rect) {
        if let Some(dst) = self.inner.lock().as_mut() {
            dst.copy_from(src, area);
        }
    }

    pub(crate) fn write_pixel(&self, x: i32, y: i32, value: &[f32]) {
        if let Some(dst) = self.inner.lock().as_mut() {
            dst.write_elem(x, y, value);
        }
    }

    /// Deep copy of the current contents.
    pub fn snapshot(&self) -> Option<MemoryBuffer> {
        self.inner.lock().clone()
    }

    /// Covered rectangle, [`Rect::NONE`] when unallocated.
    pub fn rect(&self) -> Rect {
        self.inner
            .lock()
            .as_ref()
            .map_or(Rect::NONE, MemoryBuffer::rect)
    }

    /// RGBA value at `(x, y)`.
    pub fn pixel(&self, x: i32, y: i32) -> Option<[f32; 4]> {
        let guard = self.inner.lock();
        let e = guard.as_ref()?.elem(x, y)?;
        Some([e[0], e[1], e[2], e[3]])
    }

    /// Release the storage.
    pub fn clear(&self) {
        *self.inner.lock() = None;
    }
}

/// Interactive viewer output.
#[derive(Clone, Debug)]
pub struct ViewerOperation {
    image: OutputImage,
    render_size: (i32, i32),
    chunk_order: ChunkOrdering,
    center: [f32; 2],
    active: bool,
}

impl ViewerOperation {
    /// Viewer rendering into `image`, preferring a `width x height` canvas.
    pub fn new(image: OutputImage, width: i32, height: i32) -> Self {
        Self {
            image,
            render_size: (width, height),
            chunk_order: ChunkOrdering::Default,
            center: [0.5, 0.5],
            active: true,
        }
    }

    /// Schedule chunks in `order` around the normalised hotspot `center`.
    pub fn with_chunk_order(mut self, order: ChunkOrdering, center: [f32; 2]) -> Self {
        self.chunk_order = order;
        self.center = center;
        self
    }

    /// Inactive viewers are not outputs.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

impl Operation for ViewerOperation {
    fn name(&self) -> &'static str {
        "Viewer"
    }

    fn sockets(&self) -> SocketDecl {
        SocketDecl::new().input(DataType::Color)
    }

    fn flags(&self) -> OperationFlags {
        OperationFlags {
            is_viewer: true,
            use_viewer_border: true,
            ..OperationFlags::default()
        }
    }

    fn canvas_policy(&self) -> CanvasPolicy {
        CanvasPolicy::Input {
            main: CanvasInput::Index(0),
            preferred: Some(Rect::from_size(self.render_size.0, self.render_size.1)),
        }
    }

    fn structural_key(&self) -> StructuralKey {
        StructuralKey::Unique
    }

    fn render_priority(&self, _is_rendering: bool) -> RenderPriority {
        if self.active {
            RenderPriority::High
        } else {
            RenderPriority::Low
        }
    }

    fn is_output_operation(&self, _is_rendering: bool) -> bool {
        self.active
    }

    fn chunk_ordering(&self) -> (ChunkOrdering, [f32; 2]) {
        (self.chunk_order, self.center)
    }

    fn init_execution(&self, canvas: Rect) {
        self.image.allocate(canvas);
    }

    fn as_output_sink(&self) -> Option<&dyn OutputSink> {
        Some(self)
    }
}

impl OutputSink for ViewerOperation {
    fn write_region(&self, input: &MemoryBuffer, area: Rect) {
        self.image.write(input, area);
    }
}

/// Final-render output, active only while rendering.
#[derive(Clone, Debug)]
pub struct CompositeOperation {
    image: OutputImage,
    render_size: (i32, i32),
}

impl CompositeOperation {
    /// Composite output into `image` at a `width x height` render size.
    pub fn new(image: OutputImage, width: i32, height: i32) -> Self {
        Self {
            image,
            render_size: (width, height),
        }
    }
}

impl Operation for CompositeOperation {
    fn name(&self) -> &'static str {
        "Composite"
    }

    fn sockets(&self) -> SocketDecl {
        SocketDecl::new().input(DataType::Color)
    }

    fn flags(&self) -> OperationFlags {
        OperationFlags {
            use_render_border: true,
            ..OperationFlags::default()
        }
    }

    fn canvas_policy(&self) -> CanvasPolicy {
        CanvasPolicy::Input {
            main: CanvasInput::Index(0),
            preferred: Some(Rect::from_size(self.render_size.0, self.render_size.1)),
        }
    }

    fn structural_key(&self) -> StructuralKey {
        StructuralKey::Unique
    }

    fn render_priority(&self, _is_rendering: bool) -> RenderPriority {
        RenderPriority::Medium
    }

    fn is_output_operation(&self, is_rendering: bool) -> bool {
        is_rendering
    }

    fn init_execution(&self, canvas: Rect) {
        self.image.allocate(canvas);
    }

    fn as_output_sink(&self) -> Option<&dyn OutputSink> {
        Some(self)
    }
}

impl OutputSink for CompositeOperation {
    fn write_region(&self, input: &MemoryBuffer, area: Rect) {
        self.image.write(input, area);
    }
}

/// Default longest edge of a preview image.
pub const PREVIEW_SIZE: i32 = 140;

/// Thumbnail output of an intermediate result.
///
/// The preview keeps its producer's canvas and downsamples while writing, so the image is at most
/// [`PREVIEW_SIZE`] pixels on its longest edge.
#[derive(Debug)]
pub struct PreviewOperation {
    image: OutputImage,
    size: i32,
    mapping: Mutex<Option<(Rect, f32)>>,
}

impl PreviewOperation {
    /// Preview rendering into `image`.
    pub fn new(image: OutputImage) -> Self {
        Self {
            image,
            size: PREVIEW_SIZE,
            mapping: Mutex::new(None),
        }
    }
}

impl Operation for PreviewOperation {
    fn name(&self) -> &'static str {
        "Preview"
    }

    fn sockets(&self) -> SocketDecl {
        SocketDecl::new().input_with(DataType::Color, ResizeMode::Align)
    }

    fn flags(&self) -> OperationFlags {
        OperationFlags {
            is_preview: true,
            use_viewer_border: true,
            ..OperationFlags::default()
        }
    }

    fn canvas_policy(&self) -> CanvasPolicy {
        CanvasPolicy::Input {
            main: CanvasInput::Index(0),
            preferred: Some(Rect::from_size(self.size, self.size)),
        }
    }

    fn structural_key(&self) -> StructuralKey {
        StructuralKey::Unique
    }

    fn render_priority(&self, _is_rendering: bool) -> RenderPriority {
        RenderPriority::Low
    }

    fn is_output_operation(&self, _is_rendering: bool) -> bool {
        true
    }

    fn init_execution(&self, canvas: Rect) {
        let longest = canvas.width().max(canvas.height());
        if longest == 0 {
            *self.mapping.lock() = None;
            self.image.clear();
            return;
        }
        let divider = (self.size as f32 / longest as f32).min(1.0);
        let w = ((canvas.width() as f32 * divider) as i32).max(1);
        let h = ((canvas.height() as f32 * divider) as i32).max(1);
        *self.mapping.lock() = Some((canvas, divider));
        self.image.allocate(Rect::from_size(w, h));
    }

    fn as_output_sink(&self) -> Option<&dyn OutputSink> {
        Some(self)
    }
}

impl OutputSink for PreviewOperation {
    fn write_region(&self, input: &MemoryBuffer, area: Rect) {
        let Some((canvas, divider)) = *self.mapping.lock() else {
            return;
        };
        let mut px = [0.0f32; 4];
        for y in area.ymin..area.ymax {
            for x in area.xmin..area.xmax {
                input.read_elem_checked(x, y, &mut px[..input.num_channels().min(4)]);
                let dx = ((x - canvas.xmin) as f32 * divider) as i32;
                let dy = ((y - canvas.ymin) as f32 * divider) as i32;
                self.image.write_pixel(dx, dy, &px);
            }
        }
    }
}
