use smallvec::SmallVec;

use crate::foundation::ids::OperationId;
use crate::memory::buffer::DataType;

/// How an input reconciles a producer canvas that differs from its operation's canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ResizeMode {
    /// Centre the producer inside the consumer canvas.
    #[default]
    Center,
    /// Never convert.
    None,
    /// Align origins; converted only when origins differ.
    Align,
    /// Scale uniformly so widths match.
    FitWidth,
    /// Scale uniformly so heights match.
    FitHeight,
    /// Scale uniformly so the producer fits inside.
    FitAny,
    /// Scale each axis independently.
    Stretch,
}

impl ResizeMode {
    pub(crate) fn tag(self) -> u8 {
        match self {
            ResizeMode::Center => 0,
            ResizeMode::None => 1,
            ResizeMode::Align => 2,
            ResizeMode::FitWidth => 3,
            ResizeMode::FitHeight => 4,
            ResizeMode::FitAny => 5,
            ResizeMode::Stretch => 6,
        }
    }
}

/// Typed input port holding at most one link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputSocket {
    /// Element layout expected on this input.
    pub data_type: DataType,
    /// Canvas reconciliation policy.
    pub resize_mode: ResizeMode,
    /// Producing operation.
    pub link: Option<OperationId>,
}

impl InputSocket {
    /// Return `true` when a producer is linked.
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}

/// Socket declaration of an operation.
///
/// Operations have any number of inputs and at most one output, which fans out to any number
/// of consumers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SocketDecl {
    pub(crate) inputs: SmallVec<[(DataType, ResizeMode); 4]>,
    pub(crate) output: Option<DataType>,
}

impl SocketDecl {
    /// Empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input with the default resize mode.
    pub fn input(self, data_type: DataType) -> Self {
        self.input_with(data_type, ResizeMode::default())
    }

    /// Append an input with an explicit resize mode.
    pub fn input_with(mut self, data_type: DataType, resize_mode: ResizeMode) -> Self {
        self.inputs.push((data_type, resize_mode));
        self
    }

    /// Set the output type.
    pub fn output(mut self, data_type: DataType) -> Self {
        self.output = Some(data_type);
        self
    }

    /// Declared inputs.
    pub fn inputs(&self) -> &[(DataType, ResizeMode)] {
        &self.inputs
    }

    /// Declared output.
    pub fn output_type(&self) -> Option<DataType> {
        self.output
    }
}

/// Builder-side view of an edge: `from`'s output feeds input `input` of `to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct Link {
    /// Producer.
    pub from: OperationId,
    /// Consumer.
    pub to: OperationId,
    /// Consumer input index.
    pub input: usize,
}
