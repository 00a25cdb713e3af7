use parking_lot::{RwLock, RwLockReadGuard};

use crate::foundation::ids::{GroupId, OperationId, ProxyId};
use crate::foundation::rect::Rect;
use crate::memory::buffer::{DataType, MemoryBuffer};

/// One logical buffer shared by a single write-buffer operation and any number of readers.
///
/// The canonical buffer is written chunk by chunk by the executor group and only read after the
/// chunks a reader depends on are executed, so readers and the writer never touch the same
/// region at the same time. The lock only guards allocation and the per-chunk copy-in.
#[derive(Debug)]
pub struct MemoryProxy {
    id: ProxyId,
    data_type: DataType,
    write_operation: OperationId,
    executor: Option<GroupId>,
    buffer: RwLock<Option<MemoryBuffer>>,
}

impl MemoryProxy {
    pub(crate) fn new(id: ProxyId, write_operation: OperationId, data_type: DataType) -> Self {
        Self {
            id,
            data_type,
            write_operation,
            executor: None,
            buffer: RwLock::new(None),
        }
    }

    /// Handle of this proxy.
    pub fn id(&self) -> ProxyId {
        self.id
    }

    /// Element layout of the buffer.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The single writer.
    pub fn write_operation(&self) -> OperationId {
        self.write_operation
    }

    /// Group responsible for computing the buffer, once grouping assigned one.
    pub fn executor(&self) -> Option<GroupId> {
        self.executor
    }

    pub(crate) fn set_executor(&mut self, group: GroupId) {
        self.executor = Some(group);
    }

    /// Allocate the canonical buffer covering `[0, width) x [0, height)`.
    pub fn allocate(&self, width: i32, height: i32) {
        self.allocate_rect(Rect::from_size(width, height));
    }

    /// Allocate the canonical buffer covering `rect`, replacing any previous allocation.
    pub fn allocate_rect(&self, rect: Rect) {
        *self.buffer.write() = Some(MemoryBuffer::new(self.data_type, rect));
    }

    /// Return `true` once a buffer is allocated.
    pub fn is_allocated(&self) -> bool {
        self.buffer.read().is_some()
    }

    /// Shared access to the canonical buffer.
    pub fn buffer(&self) -> RwLockReadGuard<'_, Option<MemoryBuffer>> {
        self.buffer.read()
    }

    /// Copy `area` of `src` into the canonical buffer. No-op when nothing is allocated.
    pub fn write_region(&self, src: &MemoryBuffer, area: Rect) {
        if let Some(dst) = self.buffer.write().as_mut() {
            dst.copy_from(src, area);
        }
    }

    /// Release the canonical buffer.
    pub fn free(&self) {
        *self.buffer.write() = None;
    }
}
