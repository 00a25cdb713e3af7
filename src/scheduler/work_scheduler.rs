use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, unbounded};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::config::{CompositorSettings, ThreadingModel};
use crate::foundation::error::{CompositorError, CompositorResult};
use crate::scheduler::device::{CpuDevice, Device};
use crate::scheduler::work::WorkPackage;

/// Count of scheduled packages that have not completed yet.
#[derive(Debug, Default)]
struct CompletionTracker {
    pending: Mutex<usize>,
    drained: Condvar,
}

impl CompletionTracker {
    fn add(&self) {
        *self.pending.lock() += 1;
    }

    fn done(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.drained.notify_all();
        }
    }

    fn wait(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.drained.wait(&mut pending);
        }
    }
}

/// Marks one package complete when dropped, also when the package panicked.
struct PendingGuard(Arc<CompletionTracker>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.done();
    }
}

enum Backend {
    Inline,
    Queue {
        sender: Sender<WorkPackage>,
        workers: Vec<JoinHandle<()>>,
    },
    Pool {
        pool: rayon::ThreadPool,
        devices: Arc<[Mutex<CpuDevice>]>,
    },
}

struct GpuQueue {
    sender: Sender<WorkPackage>,
    worker: JoinHandle<()>,
}

/// Dispatches [`WorkPackage`]s to CPU workers and an optional GPU device.
///
/// The scheduler is an explicit object owned by whoever runs a compositing pass, so independent
/// runs in one process do not share state. Between [`start`](Self::start) and
/// [`stop`](Self::stop) any number of threads may [`schedule`](Self::schedule);
/// [`finish`](Self::finish) blocks until everything scheduled before it completed. Before
/// `start` packages run inline.
pub struct WorkScheduler {
    threading: ThreadingModel,
    num_threads: usize,
    use_opencl: bool,
    tracker: Arc<CompletionTracker>,
    backend: Backend,
    inline_device: Mutex<CpuDevice>,
    gpu_device: Mutex<Option<Box<dyn Device>>>,
    gpu: Option<GpuQueue>,
}

impl fmt::Debug for WorkScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkScheduler")
            .field("threading", &self.threading)
            .field("num_threads", &self.num_threads)
            .field("use_opencl", &self.use_opencl)
            .field("started", &self.is_started())
            .field("gpu", &self.gpu.is_some())
            .finish()
    }
}

impl WorkScheduler {
    /// Scheduler configured from `settings`; call [`start`](Self::start) before scheduling.
    pub fn new(settings: &CompositorSettings) -> Self {
        Self {
            threading: settings.threading,
            num_threads: settings.resolved_num_threads().max(1),
            use_opencl: settings.use_opencl,
            tracker: Arc::new(CompletionTracker::default()),
            backend: Backend::Inline,
            inline_device: Mutex::new(CpuDevice::new(0)),
            gpu_device: Mutex::new(None),
            gpu: None,
        }
    }

    /// Attach a GPU device, started together with the CPU workers.
    pub fn with_gpu_device(mut self, device: Box<dyn Device>) -> Self {
        *self.gpu_device.get_mut() = Some(device);
        self
    }

    /// Selected backend.
    pub fn threading(&self) -> ThreadingModel {
        self.threading
    }

    /// Number of CPU workers.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Return `true` between `start` and `stop` for threaded backends.
    pub fn is_started(&self) -> bool {
        !matches!(self.backend, Backend::Inline)
    }

    /// Return `true` when a GPU device is running.
    pub fn has_gpu(&self) -> bool {
        self.gpu.is_some()
    }

    /// Spin up the workers of the selected backend and the GPU device thread.
    #[tracing::instrument(
        skip(self),
        fields(threading = ?self.threading, threads = self.num_threads)
    )]
    pub fn start(&mut self) -> CompositorResult<()> {
        if self.is_started() || self.gpu.is_some() {
            return Ok(());
        }
        self.backend = match self.threading {
            ThreadingModel::SingleThreaded => Backend::Inline,
            ThreadingModel::Queue => self.start_queue()?,
            ThreadingModel::TaskPool => self.start_pool()?,
        };
        if let Some(mut device) = self.gpu_device.get_mut().take() {
            match device.initialize() {
                Ok(()) => self.gpu = Some(self.start_gpu(device)?),
                Err(e) => warn!(error = %e, "gpu device failed to initialize; using cpu only"),
            }
        }
        debug!("work scheduler started");
        Ok(())
    }

    fn start_queue(&self) -> CompositorResult<Backend> {
        let (sender, receiver) = unbounded::<WorkPackage>();
        let mut workers = Vec::with_capacity(self.num_threads);
        for thread_id in 0..self.num_threads {
            let receiver = receiver.clone();
            let tracker = Arc::clone(&self.tracker);
            let handle = std::thread::Builder::new()
                .name(format!("compositor-worker-{thread_id}"))
                .spawn(move || {
                    let mut device = CpuDevice::new(thread_id);
                    for package in receiver {
                        let _guard = PendingGuard(Arc::clone(&tracker));
                        device.execute(package);
                    }
                })
                .map_err(|e| CompositorError::scheduler(format!("failed to spawn worker: {e}")))?;
            workers.push(handle);
        }
        Ok(Backend::Queue { sender, workers })
    }

    fn start_pool(&self) -> CompositorResult<Backend> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .thread_name(|i| format!("compositor-pool-{i}"))
            .build()
            .map_err(|e| {
                CompositorError::scheduler(format!("failed to build rayon thread pool: {e}"))
            })?;
        let devices: Arc<[Mutex<CpuDevice>]> = (0..self.num_threads)
            .map(|i| Mutex::new(CpuDevice::new(i)))
            .collect();
        Ok(Backend::Pool { pool, devices })
    }

    fn start_gpu(&self, mut device: Box<dyn Device>) -> CompositorResult<GpuQueue> {
        let (sender, receiver) = unbounded::<WorkPackage>();
        let tracker = Arc::clone(&self.tracker);
        let worker = std::thread::Builder::new()
            .name("compositor-gpu".to_owned())
            .spawn(move || {
                for package in receiver {
                    let _guard = PendingGuard(Arc::clone(&tracker));
                    device.execute(package);
                }
                device.deinitialize();
            })
            .map_err(|e| CompositorError::scheduler(format!("failed to spawn gpu thread: {e}")))?;
        Ok(GpuQueue { sender, worker })
    }

    /// Queue `package`. GPU-capable chunks go to the GPU device when OpenCL is enabled.
    pub fn schedule(&self, package: WorkPackage) {
        self.tracker.add();
        let package = match &self.gpu {
            Some(gpu) if self.use_opencl && package.is_open_cl() => {
                match gpu.sender.send(package) {
                    Ok(()) => return,
                    Err(e) => e.into_inner(),
                }
            }
            _ => package,
        };
        match &self.backend {
            Backend::Inline => self.execute_inline(package),
            Backend::Queue { sender, .. } => {
                if let Err(e) = sender.send(package) {
                    self.execute_inline(e.into_inner());
                }
            }
            Backend::Pool { pool, devices } => {
                let devices = Arc::clone(devices);
                let tracker = Arc::clone(&self.tracker);
                pool.spawn(move || {
                    let _guard = PendingGuard(tracker);
                    let slot = rayon::current_thread_index().unwrap_or(0) % devices.len().max(1);
                    if let Some(device) = devices.get(slot) {
                        device.lock().execute(package);
                    }
                });
            }
        }
    }

    fn execute_inline(&self, package: WorkPackage) {
        let _guard = PendingGuard(Arc::clone(&self.tracker));
        self.inline_device.lock().execute(package);
    }

    /// Block until every package scheduled so far has completed.
    pub fn finish(&self) {
        self.tracker.wait();
    }

    /// Drain outstanding work and tear the workers down. The scheduler may be started again.
    pub fn stop(&mut self) {
        self.finish();
        if let Backend::Queue { sender, workers } =
            std::mem::replace(&mut self.backend, Backend::Inline)
        {
            drop(sender);
            for worker in workers {
                if worker.join().is_err() {
                    warn!("compositor worker panicked");
                }
            }
        }
        if let Some(GpuQueue { sender, worker }) = self.gpu.take() {
            drop(sender);
            if worker.join().is_err() {
                warn!("gpu worker panicked");
            }
        }
    }
}

impl Drop for WorkScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scheduler/work_scheduler.rs"]
mod tests;
