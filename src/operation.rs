pub(crate) mod graph;
pub(crate) mod socket;
pub(crate) mod tile;
pub(crate) mod traits;
