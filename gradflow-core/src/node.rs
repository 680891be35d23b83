//! Type-erased graph nodes.
//!
//! An [`ErasedNode`] is a snapshot of a [`Variable`] with its element type, rank
//! and backend moved from the type level to runtime tags. Backward records store
//! their inputs and incoming gradients as erased nodes, so a record does not need
//! to be generic over every `(T, R, B)` combination it may meet.
//!
//! The buffers are not copied: the node holds the same `Arc`s as the variable it
//! was erased from, so gradient accumulation through the node is visible on the
//! variable.

use crate::autograd::GradFn;
use crate::buffer::{Backend, Cpu, Gpu, RawBuffer};
use crate::device::StorageDevice;
use crate::error::GradFlowError;
use crate::types::{DType, Element};
use crate::variable::layout;
use crate::variable::Variable;
use num_traits::NumCast;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Calls `$func::<T, B>(args..)` with the element type and backend matching the
/// runtime tags.
macro_rules! dispatch_erased {
    ($dtype:expr, $device:expr, $func:ident($($arg:expr),*)) => {
        match ($dtype, $device) {
            (DType::F32, StorageDevice::CPU) => $func::<f32, Cpu>($($arg),*),
            (DType::F64, StorageDevice::CPU) => $func::<f64, Cpu>($($arg),*),
            (DType::I32, StorageDevice::CPU) => $func::<i32, Cpu>($($arg),*),
            (DType::I64, StorageDevice::CPU) => $func::<i64, Cpu>($($arg),*),
            (DType::F32, StorageDevice::GPU) => $func::<f32, Gpu>($($arg),*),
            (DType::F64, StorageDevice::GPU) => $func::<f64, Gpu>($($arg),*),
            (DType::I32, StorageDevice::GPU) => $func::<i32, Gpu>($($arg),*),
            (DType::I64, StorageDevice::GPU) => $func::<i64, Gpu>($($arg),*),
        }
    };
}

type ErasedBuffer = Arc<dyn Any + Send + Sync>;

/// Rank/type/backend-erased handle to a [`Variable`].
#[derive(Clone)]
pub struct ErasedNode {
    pub(crate) shape: Vec<usize>,
    pub(crate) strides: Vec<isize>,
    pub(crate) dtype: DType,
    pub(crate) device: StorageDevice,
    pub(crate) requires_grad: bool,
    pub(crate) data: ErasedBuffer,
    pub(crate) grad: ErasedBuffer,
    pub(crate) bprop: Option<Arc<GradFn>>,
    /// Index of the erased tensor among its producing operation's outputs; selects
    /// the gradient slot of `bprop` this tensor's gradient is delivered to.
    pub(crate) out_position: usize,
}

impl fmt::Debug for ErasedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedNode")
            .field("dtype", &self.dtype)
            .field("device", &self.device)
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("requires_grad", &self.requires_grad)
            .field("bprop", &self.bprop.as_ref().map(|b| b.name()))
            .field("out_position", &self.out_position)
            .finish()
    }
}

impl ErasedNode {
    /// Erases a variable. Shape, strides and flags are copied; `data`, `grad` and
    /// the backward record are shared.
    ///
    /// # Errors
    /// Returns `Undefined` for a default-constructed variable.
    pub fn erase<T: Element, const R: usize, B: Backend>(variable: &Variable<T, R, B>) -> Result<Self, GradFlowError> {
        let data: ErasedBuffer = variable.data_buffer()?.clone();
        let grad: ErasedBuffer = variable.grad_buffer()?.clone();
        Ok(ErasedNode {
            shape: variable.shape.to_vec(),
            strides: variable.strides.to_vec(),
            dtype: T::DTYPE,
            device: B::DEVICE,
            requires_grad: variable.requires_grad,
            data,
            grad,
            bprop: variable.bprop.clone(),
            out_position: variable.out_position,
        })
    }

    /// Reconstructs the typed variable this node was erased from.
    ///
    /// # Errors
    /// Returns `ErasedKindMismatch` if `T`, `R` or `B` differ from what was erased.
    pub fn restore<T: Element, const R: usize, B: Backend>(&self) -> Result<Variable<T, R, B>, GradFlowError> {
        if T::DTYPE != self.dtype || R != self.shape.len() || B::DEVICE != self.device {
            return Err(GradFlowError::ErasedKindMismatch {
                expected_dtype: T::DTYPE,
                actual_dtype: self.dtype,
                expected_rank: R,
                actual_rank: self.shape.len(),
                expected_device: B::DEVICE,
                actual_device: self.device,
            });
        }
        let (data, grad) = self.buffers::<T, B>()?;
        let mut shape = [0usize; R];
        shape.copy_from_slice(&self.shape);
        let mut strides = [0isize; R];
        strides.copy_from_slice(&self.strides);
        Ok(Variable {
            requires_grad: self.requires_grad,
            shape,
            strides,
            data: Some(data),
            grad: Some(grad),
            bprop: self.bprop.clone(),
            out_position: self.out_position,
        })
    }

    /// Sets the output position. Multi-output operations must do this before the
    /// node is used as one of their gradient slots.
    pub fn with_out_position(mut self, out_position: usize) -> Self {
        self.out_position = out_position;
        self
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn device(&self) -> StorageDevice {
        self.device
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub fn bprop(&self) -> Option<&Arc<GradFn>> {
        self.bprop.as_ref()
    }

    pub fn out_position(&self) -> usize {
        self.out_position
    }

    /// True if both nodes share the same forward buffer.
    pub fn shares_data_with(&self, other: &ErasedNode) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Runs a backward pass from this node.
    ///
    /// With `Some(grad)` the gradient must match this node's shape, element type and
    /// backend. With `None` the node must be a scalar produced by a single-output
    /// operation; a seed of one is synthesized in the node's backend. A node without
    /// a backward record is a leaf and nothing happens.
    pub fn backward(&self, grad: Option<&ErasedNode>) -> Result<(), GradFlowError> {
        let Some(bprop) = self.bprop.as_ref() else {
            return Ok(());
        };
        let seed = match grad {
            Some(g) => {
                self.check_same_kind(g, "backward")?;
                g.clone()
            }
            None => {
                if !self.shape.is_empty() {
                    return Err(GradFlowError::BackwardNonScalar);
                }
                if bprop.num_outputs() != 1 {
                    return Err(GradFlowError::MultiOutputSeed {
                        outputs: bprop.num_outputs(),
                    });
                }
                dispatch_erased!(self.dtype, self.device, scalar_one())
            }
        };
        bprop.backward(seed, self.out_position)
    }

    /// Adds `contribution` into this node's gradient buffer, element by element in
    /// logical order.
    pub(crate) fn accumulate_grad(&self, contribution: &ErasedNode) -> Result<(), GradFlowError> {
        self.check_same_kind(contribution, "accumulate_grad")?;
        dispatch_erased!(self.dtype, self.device, accumulate_typed(self, contribution))
    }

    /// Returns a fresh, detached node holding `self + other`.
    pub(crate) fn sum_with(&self, other: &ErasedNode) -> Result<ErasedNode, GradFlowError> {
        self.check_same_kind(other, "sum_with")?;
        dispatch_erased!(self.dtype, self.device, sum_typed(self, other))
    }

    /// Copies the forward values to the host as `f64`, in logical order.
    pub fn to_vec_f64(&self) -> Result<Vec<f64>, GradFlowError> {
        dispatch_erased!(self.dtype, self.device, to_vec_f64_typed(self))
    }

    pub(crate) fn check_same_kind(&self, other: &ErasedNode, operation: &str) -> Result<(), GradFlowError> {
        if self.dtype != other.dtype {
            return Err(GradFlowError::DTypeMismatch {
                expected: self.dtype,
                actual: other.dtype,
                operation: operation.to_string(),
            });
        }
        if self.device != other.device {
            return Err(GradFlowError::DeviceMismatch {
                expected: self.device,
                actual: other.device,
                operation: operation.to_string(),
            });
        }
        if self.shape != other.shape {
            return Err(GradFlowError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: other.shape.clone(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn buffers<T: Element, B: Backend>(&self) -> Result<(Arc<B::Buffer<T>>, Arc<B::Buffer<T>>), GradFlowError> {
        let downcast = |buffer: &ErasedBuffer| {
            Arc::clone(buffer)
                .downcast::<B::Buffer<T>>()
                .map_err(|_| GradFlowError::InternalError(format!("erased buffer is not a {:?} {:?} buffer", B::DEVICE, T::DTYPE)))
        };
        Ok((downcast(&self.data)?, downcast(&self.grad)?))
    }

    fn gather<T: Element, B: Backend>(&self, buffer: &B::Buffer<T>) -> Vec<T> {
        let offsets = layout::logical_offsets(&self.shape, &self.strides);
        buffer.launch(|values| offsets.iter().map(|&o| values[o]).collect())
    }
}

impl<T: Element, const R: usize, B: Backend> TryFrom<&Variable<T, R, B>> for ErasedNode {
    type Error = GradFlowError;

    fn try_from(variable: &Variable<T, R, B>) -> Result<Self, Self::Error> {
        ErasedNode::erase(variable)
    }
}

/// Builds a detached, contiguous node over freshly allocated buffers.
pub(crate) fn fresh_node<T: Element, B: Backend>(shape: Vec<usize>, values: Vec<T>) -> ErasedNode {
    let numel = values.len();
    let data = <B::Buffer<T> as RawBuffer<T>>::allocate_zeroed(numel);
    data.launch_mut(|out| out.copy_from_slice(&values));
    let grad = <B::Buffer<T> as RawBuffer<T>>::allocate_zeroed(numel);
    let strides = layout::contiguous_strides(&shape);
    ErasedNode {
        shape,
        strides,
        dtype: T::DTYPE,
        device: B::DEVICE,
        requires_grad: false,
        data: Arc::new(data),
        grad: Arc::new(grad),
        bprop: None,
        out_position: 0,
    }
}

fn scalar_one<T: Element, B: Backend>() -> ErasedNode {
    fresh_node::<T, B>(Vec::new(), vec![T::one()])
}

fn accumulate_typed<T: Element, B: Backend>(target: &ErasedNode, contribution: &ErasedNode) -> Result<(), GradFlowError> {
    let (_, grad) = target.buffers::<T, B>()?;
    let (source, _) = contribution.buffers::<T, B>()?;
    // Values are gathered before the gradient is locked for writing, so a
    // contribution aliasing the target's gradient buffer cannot deadlock.
    let values = contribution.gather::<T, B>(&source);
    let offsets = layout::logical_offsets(&target.shape, &target.strides);
    grad.launch_mut(|g| {
        for (&o, v) in offsets.iter().zip(values) {
            g[o] = g[o].accumulate(v);
        }
    });
    Ok(())
}

fn sum_typed<T: Element, B: Backend>(a: &ErasedNode, b: &ErasedNode) -> Result<ErasedNode, GradFlowError> {
    let (a_data, _) = a.buffers::<T, B>()?;
    let (b_data, _) = b.buffers::<T, B>()?;
    let a_values = a.gather::<T, B>(&a_data);
    let b_values = b.gather::<T, B>(&b_data);
    let values = a_values.into_iter().zip(b_values).map(|(x, y)| x.accumulate(y)).collect();
    Ok(fresh_node::<T, B>(a.shape.clone(), values))
}

fn to_vec_f64_typed<T: Element, B: Backend>(node: &ErasedNode) -> Result<Vec<f64>, GradFlowError> {
    let (data, _) = node.buffers::<T, B>()?;
    let host = data.to_host();
    layout::logical_offsets(&node.shape, &node.strides)
        .into_iter()
        .map(|o| {
            <f64 as NumCast>::from(host[o])
                .ok_or_else(|| GradFlowError::InternalError(format!("cannot represent {:?} as f64", host[o])))
        })
        .collect()
}

#[cfg(test)]
#[path = "node_test.rs"]
mod tests;
