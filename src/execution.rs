pub(crate) mod full_frame;
pub(crate) mod group;
pub(crate) mod system;
pub(crate) mod tiled;
