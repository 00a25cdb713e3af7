pub(crate) mod converter;
pub(crate) mod graph;
pub(crate) mod nodes;
