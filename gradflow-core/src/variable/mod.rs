// src/variable/mod.rs

use crate::autograd::GradFn;
use crate::buffer::{Backend, Cpu, RawBuffer};
use crate::device::StorageDevice;
use crate::error::GradFlowError;
use crate::types::{DType, Element};
use std::fmt;
use std::sync::Arc;

mod arithmetic_methods;
mod autograd_methods;
pub mod create;
mod inplace_methods;
pub mod layout;
mod transfer;
mod view;

pub use arithmetic_methods::BinaryOp;
pub use create::{full, ones, scalar, variable, zeros};
pub use view::StridedView;

/// A typed, fixed-rank, stride-aware view over a storage buffer, together with a
/// same-length gradient buffer and the optional backward recipe of the operation
/// that produced it.
///
/// * `T` is the element type, `R` the rank (fixed at compile time, `0` for scalars)
///   and `B` the backend holding both buffers.
/// * `data` and `grad` are shared through `Arc`: cloning a `Variable` or erasing it
///   into an [`ErasedNode`](crate::node::ErasedNode) never copies element data.
/// * A `Variable::default()` is *undefined*: it has no buffers and every operation
///   that needs data returns [`GradFlowError::Undefined`].
pub struct Variable<T: Element, const R: usize, B: Backend = Cpu> {
    pub(crate) requires_grad: bool,
    pub(crate) shape: [usize; R],
    pub(crate) strides: [isize; R],
    pub(crate) data: Option<Arc<B::Buffer<T>>>,
    pub(crate) grad: Option<Arc<B::Buffer<T>>>,
    /// Backward recipe, present when this variable is an operation's output.
    pub(crate) bprop: Option<Arc<GradFn>>,
    /// Index of this variable among the outputs of the operation that produced it.
    pub(crate) out_position: usize,
}

impl<T: Element, const R: usize, B: Backend> Default for Variable<T, R, B> {
    fn default() -> Self {
        Variable {
            requires_grad: false,
            shape: [0; R],
            strides: [0; R],
            data: None,
            grad: None,
            bprop: None,
            out_position: 0,
        }
    }
}

impl<T: Element, const R: usize, B: Backend> Clone for Variable<T, R, B> {
    fn clone(&self) -> Self {
        Variable {
            requires_grad: self.requires_grad,
            shape: self.shape,
            strides: self.strides,
            data: self.data.clone(),
            grad: self.grad.clone(),
            bprop: self.bprop.clone(),
            out_position: self.out_position,
        }
    }
}

impl<T: Element, const R: usize, B: Backend> fmt::Debug for Variable<T, R, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("dtype", &T::DTYPE)
            .field("device", &B::DEVICE)
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("requires_grad", &self.requires_grad)
            .field("defined", &self.is_defined())
            .field("bprop", &self.bprop.as_ref().map(|b| b.name()))
            .field("out_position", &self.out_position)
            .finish()
    }
}

impl<T: Element, const R: usize, B: Backend> Variable<T, R, B> {
    /// Builds a variable over an existing buffer and allocates a zeroed gradient
    /// buffer of the same length.
    ///
    /// # Errors
    /// Returns `ShapeOverflow` if the element count of `shape` does not fit in
    /// `isize`, `TensorCreationError` if `data.len() != product(shape)` and
    /// `StridesOutOfBounds` if the strides address elements outside `data`.
    pub fn new(
        requires_grad: bool,
        shape: [usize; R],
        strides: [isize; R],
        data: Arc<B::Buffer<T>>,
    ) -> Result<Self, GradFlowError> {
        let numel = layout::checked_numel(&shape)?;
        let data_len = data.len();
        if data_len != numel {
            return Err(GradFlowError::TensorCreationError {
                data_len,
                shape: shape.to_vec(),
            });
        }
        layout::check_bounds(&shape, &strides, data_len)?;

        let grad = Arc::new(<B::Buffer<T> as RawBuffer<T>>::allocate_zeroed(data_len));
        Ok(Variable {
            requires_grad,
            shape,
            strides,
            data: Some(data),
            grad: Some(grad),
            bprop: None,
            out_position: 0,
        })
    }

    /// Returns false for a default-constructed variable.
    pub fn is_defined(&self) -> bool {
        self.data.is_some()
    }

    pub fn shape(&self) -> [usize; R] {
        self.shape
    }

    pub fn strides(&self) -> [isize; R] {
        self.strides
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        R
    }

    /// Returns the number of elements.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn device(&self) -> StorageDevice {
        B::DEVICE
    }

    /// Index of this variable among its producing operation's outputs.
    pub fn out_position(&self) -> usize {
        self.out_position
    }

    /// Checks if the variable's layout is row-major without gaps.
    pub fn is_contiguous(&self) -> bool {
        layout::is_contiguous(&self.shape, &self.strides)
    }

    /// Shared handle to the forward values.
    pub fn data_buffer(&self) -> Result<&Arc<B::Buffer<T>>, GradFlowError> {
        self.data.as_ref().ok_or_else(|| GradFlowError::Undefined {
            operation: "data_buffer".to_string(),
        })
    }

    /// Shared handle to the gradient buffer.
    pub fn grad_buffer(&self) -> Result<&Arc<B::Buffer<T>>, GradFlowError> {
        self.grad.as_ref().ok_or_else(|| GradFlowError::Undefined {
            operation: "grad_buffer".to_string(),
        })
    }

    /// Returns the attached backward record, if any.
    pub fn bprop(&self) -> Option<&Arc<GradFn>> {
        self.bprop.as_ref()
    }

    /// Attaches a backward record, making this variable the output at
    /// `out_position` of the recorded operation. Used by kernels.
    pub fn with_bprop(mut self, bprop: Arc<GradFn>, out_position: usize) -> Self {
        self.requires_grad = true;
        self.bprop = Some(bprop);
        self.out_position = out_position;
        self
    }

    /// Returns a variable with an independently owned copy of `data`, the same
    /// flags and layout, a fresh zeroed gradient and no backward record.
    pub fn duplicate(&self) -> Result<Self, GradFlowError> {
        let data = self.data_buffer()?;
        Variable::new(
            self.requires_grad,
            self.shape,
            self.strides,
            Arc::new(data.duplicate()),
        )
    }

    /// Copies the forward values to the host in logical row-major order.
    pub fn to_vec(&self) -> Result<Vec<T>, GradFlowError> {
        let host = self.data_buffer()?.to_host();
        Ok(self.gather(&host))
    }

    /// Copies the gradient values to the host in logical row-major order.
    pub fn grad_to_vec(&self) -> Result<Vec<T>, GradFlowError> {
        let host = self.grad_buffer()?.to_host();
        Ok(self.gather(&host))
    }

    fn gather(&self, host: &[T]) -> Vec<T> {
        layout::logical_offsets(&self.shape, &self.strides)
            .into_iter()
            .map(|o| host[o])
            .collect()
    }
}
