pub(crate) mod buffer;
pub(crate) mod ewa;
pub(crate) mod proxy;
