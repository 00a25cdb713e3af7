use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            /// Arena slot of this id.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Stable handle of an operation in an [`OperationGraph`](crate::OperationGraph).
    OperationId,
    "op"
);
arena_id!(
    /// Stable handle of a [`MemoryProxy`](crate::MemoryProxy).
    ProxyId,
    "proxy"
);
arena_id!(
    /// Stable handle of an [`ExecutionGroup`](crate::ExecutionGroup).
    GroupId,
    "group"
);
arena_id!(
    /// Stable handle of a node in a [`NodeGraph`](crate::NodeGraph).
    NodeId,
    "node"
);
