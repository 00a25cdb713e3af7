use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::foundation::error::{CompositorError, CompositorResult};
use crate::foundation::rect::Rect;

/// Execution strategy chosen once per build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionModel {
    /// Partition output canvases into chunks and evaluate pixel pipelines per chunk.
    #[default]
    Tiled,
    /// Render each operation over its whole area before its consumers.
    FullFrame,
}

/// Threading backend used by the [`WorkScheduler`](crate::WorkScheduler).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadingModel {
    /// Execute packages inline on the submitting thread.
    SingleThreaded,
    /// Persistent worker threads consuming a blocking queue.
    Queue,
    /// A work-stealing task pool.
    #[default]
    TaskPool,
}

/// Priority class of an output operation. Outputs run High first.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RenderPriority {
    /// Interactive outputs such as the viewer.
    High,
    /// Final-render outputs.
    Medium,
    /// Previews.
    Low,
}

impl RenderPriority {
    /// All priorities in execution order.
    pub const ALL: [RenderPriority; 3] = [
        RenderPriority::High,
        RenderPriority::Medium,
        RenderPriority::Low,
    ];
}

/// Border rectangle expressed as fractions of an output canvas.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FractionalBorder {
    /// Left edge in `[0, 1]`.
    pub xmin: f32,
    /// Right edge in `[0, 1]`.
    pub xmax: f32,
    /// Bottom edge in `[0, 1]`.
    pub ymin: f32,
    /// Top edge in `[0, 1]`.
    pub ymax: f32,
}

impl FractionalBorder {
    /// Scale the border onto `canvas`, clipped to it.
    pub fn apply(&self, canvas: Rect) -> Rect {
        let w = canvas.width() as f32;
        let h = canvas.height() as f32;
        let r = Rect::new(
            canvas.xmin + (self.xmin * w) as i32,
            canvas.xmin + (self.xmax * w) as i32,
            canvas.ymin + (self.ymin * h) as i32,
            canvas.ymin + (self.ymax * h) as i32,
        );
        r.intersect(&canvas)
    }
}

/// Settings of one compositing run.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompositorSettings {
    /// Tiled or full-frame execution.
    pub execution_model: ExecutionModel,
    /// Scheduler backend.
    pub threading: ThreadingModel,
    /// Worker count; `None` uses the available parallelism.
    pub num_threads: Option<usize>,
    /// Edge length of tiled chunks in pixels.
    pub chunk_size: u32,
    /// Final render (enables render-only outputs such as composite).
    pub is_rendering: bool,
    /// Only run high-priority outputs.
    pub fast_calculation: bool,
    /// Route packages of GPU-capable groups to the GPU device when one is attached.
    pub use_opencl: bool,
    /// Viewer border applied to outputs that opt into it.
    pub viewer_border: Option<FractionalBorder>,
    /// Render border applied to outputs that opt into it.
    pub render_border: Option<FractionalBorder>,
    /// Seed for the random chunk order.
    pub random_seed: u64,
    /// Directory receiving graphviz dumps of the build stages.
    pub graphviz_dir: Option<PathBuf>,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            execution_model: ExecutionModel::default(),
            threading: ThreadingModel::default(),
            num_threads: None,
            chunk_size: 256,
            is_rendering: false,
            fast_calculation: false,
            use_opencl: false,
            viewer_border: None,
            render_border: None,
            random_seed: 0,
            graphviz_dir: None,
        }
    }
}

impl CompositorSettings {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> CompositorResult<()> {
        if self.chunk_size == 0 {
            return Err(CompositorError::validation("chunk_size must be >= 1"));
        }
        if i32::try_from(self.chunk_size).is_err() {
            return Err(CompositorError::validation(format!(
                "chunk_size must be <= {}",
                i32::MAX
            )));
        }
        if let Some(n) = self.num_threads
            && n == 0
        {
            return Err(CompositorError::validation(
                "num_threads must be >= 1 when set",
            ));
        }
        Ok(())
    }

    /// Worker count after resolving `None` to the available parallelism.
    pub fn resolved_num_threads(&self) -> usize {
        if self.threading == ThreadingModel::SingleThreaded {
            return 1;
        }
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

type BreakFn = Arc<dyn Fn() -> bool + Send + Sync>;
type ProgressFn = Arc<dyn Fn(f32) + Send + Sync>;

/// Settings plus the host callbacks of one run.
#[derive(Clone, Default)]
pub struct CompositorContext {
    settings: CompositorSettings,
    test_break: Option<BreakFn>,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for CompositorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositorContext")
            .field("settings", &self.settings)
            .field("test_break", &self.test_break.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl CompositorContext {
    /// Context without host callbacks.
    pub fn new(settings: CompositorSettings) -> Self {
        Self {
            settings,
            test_break: None,
            progress: None,
        }
    }

    /// Install the "should I stop" predicate.
    pub fn with_break(mut self, f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.test_break = Some(Arc::new(f));
        self
    }

    /// Install the progress sink receiving fractions in `[0, 1]`.
    pub fn with_progress(mut self, f: impl Fn(f32) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(f));
        self
    }

    /// Run settings.
    pub fn settings(&self) -> &CompositorSettings {
        &self.settings
    }

    /// Selected execution model.
    pub fn execution_model(&self) -> ExecutionModel {
        self.settings.execution_model
    }

    /// Poll the host's break predicate.
    pub fn is_breaked(&self) -> bool {
        self.test_break.as_ref().is_some_and(|f| f())
    }

    /// Report a progress fraction to the host.
    pub fn update_progress(&self, fraction: f32) {
        if let Some(f) = &self.progress {
            f(fraction.clamp(0.0, 1.0));
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
