use crate::device::StorageDevice;
use crate::types::DType;
use thiserror::Error;

/// Error type for the gradflow engine.
///
/// Most variants are precondition violations: they are returned as soon as the
/// violation is detected and the operation does not proceed with a wrong shape,
/// element type or backend.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum GradFlowError {
    #[error("Variable creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Shape {shape:?} has more elements than a buffer can address")]
    ShapeOverflow { shape: Vec<usize> },

    #[error("Strides {strides:?} address elements outside a buffer of length {len} for shape {shape:?}")]
    StridesOutOfBounds {
        shape: Vec<usize>,
        strides: Vec<isize>,
        len: usize,
    },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Operation '{operation}' called on an undefined variable")]
    Undefined { operation: String },

    #[error(
        "Cannot restore erased node as ({expected_dtype:?}, rank {expected_rank}, {expected_device:?}): \
         node holds ({actual_dtype:?}, rank {actual_rank}, {actual_device:?})"
    )]
    ErasedKindMismatch {
        expected_dtype: DType,
        actual_dtype: DType,
        expected_rank: usize,
        actual_rank: usize,
        expected_device: StorageDevice,
        actual_device: StorageDevice,
    },

    #[error("Backward called on non-scalar variable without explicit gradient.")]
    BackwardNonScalar,

    #[error("Backward without explicit gradient requires a single-output record, found {outputs} outputs")]
    MultiOutputSeed { outputs: usize },

    #[error("Output position {position} is out of range for a record with {outputs} outputs")]
    OutputPositionOutOfRange { position: usize, outputs: usize },

    #[error("Gradient delivered to '{op}' after its backward already ran")]
    RecordAlreadyFired { op: String },

    #[error("Backward op '{op}' returned {actual} gradients, but has {expected} inputs")]
    GradientCountMismatch {
        op: String,
        expected: usize,
        actual: usize,
    },

    #[error("Device mismatch for operation '{operation}': expected {expected:?}, got {actual:?}")]
    DeviceMismatch {
        expected: StorageDevice,
        actual: StorageDevice,
        operation: String,
    },

    #[error("DType mismatch for operation '{operation}': expected {expected:?}, got {actual:?}")]
    DTypeMismatch {
        expected: DType,
        actual: DType,
        operation: String,
    },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
