/// Convenience result type used across the compositor.
pub type CompositorResult<T> = Result<T, CompositorError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Invalid graph fragments are absorbed by the builder and never surface here; these variants
/// cover configuration mistakes, contract violations of operation implementations and
/// infrastructure failures.
#[derive(thiserror::Error, Debug)]
pub enum CompositorError {
    /// Invalid user-provided settings or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// The compiled operation graph violates an execution contract.
    #[error("graph error: {0}")]
    Graph(String),

    /// Errors raised while executing a compiled graph.
    #[error("execution error: {0}")]
    Execution(String),

    /// Errors raised by the work scheduler or its devices.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CompositorError {
    /// Build a [`CompositorError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CompositorError::Graph`] value.
    pub fn graph(msg: impl Into<String>) -> Self {
        Self::Graph(msg.into())
    }

    /// Build a [`CompositorError::Execution`] value.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Build a [`CompositorError::Scheduler`] value.
    pub fn scheduler(msg: impl Into<String>) -> Self {
        Self::Scheduler(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
