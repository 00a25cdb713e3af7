use std::fmt;

use crate::execution::tiled::TileJob;

type Callback = Box<dyn FnOnce() + Send + 'static>;

enum WorkKind {
    Tile(TileJob),
    Custom(Callback),
}

/// Unit of work handed to the [`WorkScheduler`](crate::WorkScheduler).
///
/// A package either renders one chunk of an execution group or runs a custom closure (the
/// row bands of the full-frame model). The optional completion callback runs on the executing
/// thread right after the work.
pub struct WorkPackage {
    kind: WorkKind,
    open_cl: bool,
    executed: Option<Callback>,
}

impl WorkPackage {
    /// Package running `f`.
    pub fn custom(f: impl FnOnce() + Send + 'static) -> Self {
        Self {
            kind: WorkKind::Custom(Box::new(f)),
            open_cl: false,
            executed: None,
        }
    }

    pub(crate) fn tile(job: TileJob, open_cl: bool) -> Self {
        Self {
            kind: WorkKind::Tile(job),
            open_cl,
            executed: None,
        }
    }

    /// Allow the package to run on the GPU device.
    pub fn with_open_cl(mut self, open_cl: bool) -> Self {
        self.open_cl = open_cl;
        self
    }

    /// Run `f` once the work is done.
    pub fn on_executed(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.executed = Some(Box::new(f));
        self
    }

    /// Return `true` for chunks of groups that may run on the GPU device.
    pub fn is_open_cl(&self) -> bool {
        self.open_cl
    }

    /// Return `true` for chunk renders.
    pub fn is_tile(&self) -> bool {
        matches!(self.kind, WorkKind::Tile(_))
    }

    /// Do the work, then run the completion callback.
    pub fn execute(self) {
        match self.kind {
            WorkKind::Tile(job) => job.execute(),
            WorkKind::Custom(f) => f(),
        }
        if let Some(done) = self.executed {
            done();
        }
    }
}

impl fmt::Debug for WorkPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("WorkPackage");
        match &self.kind {
            WorkKind::Tile(job) => s.field("group", &job.group()).field("chunk", &job.chunk()),
            WorkKind::Custom(_) => s.field("kind", &"custom"),
        };
        s.field("open_cl", &self.open_cl)
            .field("executed", &self.executed.is_some())
            .finish()
    }
}
