pub(crate) mod device;
pub(crate) mod work;
pub(crate) mod work_scheduler;
