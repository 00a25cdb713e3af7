use crate::foundation::error::CompositorResult;
use crate::scheduler::work::WorkPackage;

/// Executor of work packages.
///
/// CPU devices are created by the scheduler, one per worker. A GPU device is supplied by the host
/// through [`WorkScheduler::with_gpu_device`](crate::WorkScheduler::with_gpu_device) and runs on
/// its own thread.
pub trait Device: Send {
    /// Prepare the device. A failing GPU device is dropped and its work runs on the CPU.
    fn initialize(&mut self) -> CompositorResult<()> {
        Ok(())
    }

    /// Execute one package, including its completion callback.
    fn execute(&mut self, package: WorkPackage);

    /// Release device resources.
    fn deinitialize(&mut self) {}
}

/// Device running packages on the calling worker thread.
#[derive(Debug, Default)]
pub struct CpuDevice {
    thread_id: usize,
    executed: usize,
}

impl CpuDevice {
    /// Device bound to worker `thread_id`.
    pub fn new(thread_id: usize) -> Self {
        Self {
            thread_id,
            executed: 0,
        }
    }

    /// Worker slot.
    pub fn thread_id(&self) -> usize {
        self.thread_id
    }

    /// Packages executed so far.
    pub fn executed(&self) -> usize {
        self.executed
    }
}

impl Device for CpuDevice {
    fn execute(&mut self, package: WorkPackage) {
        package.execute();
        self.executed += 1;
    }
}
