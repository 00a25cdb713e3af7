pub(crate) mod blur;
pub(crate) mod buffer;
pub(crate) mod canvas;
pub(crate) mod constant;
pub(crate) mod convert;
pub(crate) mod math;
pub(crate) mod output;
pub(crate) mod proxy;
