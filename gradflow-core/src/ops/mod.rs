//! # Operations (`ops`)
//!
//! The kernels the engine composes and tests itself against. Each operation has an
//! `xxx_op` function that computes the forward result on the operands' backend and,
//! when the [`GradMode`] says so, attaches a [`GradFn`](crate::autograd::GradFn)
//! wrapping the operation's `Backward` struct.
//!
//! Operands must have identical shapes: there is no broadcasting.
//!
//! - [`arithmetic`]: element-wise `add`, `mul`, `scale`, `reciprocal` and the
//!   composed `sub` and `div`.
//! - [`reduction`]: full `sum` to a scalar.
//! - [`split`]: two-output `split_at`.

use crate::autograd::GradMode;
use crate::buffer::{Backend, RawBuffer};
use crate::error::GradFlowError;
use crate::node::ErasedNode;
use crate::types::Element;
use crate::variable::create::row_major_strides;
use crate::variable::{layout, Variable};
use std::sync::Arc;

pub mod arithmetic;
pub mod reduction;
pub mod split;

pub use arithmetic::{add_op, div_op, mul_op, reciprocal_op, scale_op, sub_op};
pub use reduction::sum_op;
pub use split::split_at_op;

/// Reads the elements of `v` in logical order, inside `v`'s backend.
pub(crate) fn gather<T: Element, const R: usize, B: Backend>(v: &Variable<T, R, B>) -> Result<Vec<T>, GradFlowError> {
    let offsets = layout::logical_offsets(&v.shape(), &v.strides());
    Ok(v.data_buffer()?.launch(|data| offsets.iter().map(|&o| data[o]).collect()))
}

/// Allocates a contiguous, non-recording variable in backend `B` holding `values`.
pub(crate) fn from_values<T: Element, const R: usize, B: Backend>(
    shape: [usize; R],
    values: Vec<T>,
) -> Result<Variable<T, R, B>, GradFlowError> {
    let buffer = <B::Buffer<T> as RawBuffer<T>>::allocate_zeroed(values.len());
    buffer.launch_mut(|out| out.copy_from_slice(&values));
    Variable::new(false, shape, row_major_strides(&shape), Arc::new(buffer))
}

pub(crate) fn check_same_shape<const R: usize>(
    expected: [usize; R],
    actual: [usize; R],
    operation: &str,
) -> Result<(), GradFlowError> {
    if expected != actual {
        return Err(GradFlowError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
            operation: operation.to_string(),
        });
    }
    Ok(())
}

/// Applies `f` element-wise to two same-shape operands.
pub(crate) fn zip_map<T: Element, const R: usize, B: Backend>(
    a: &Variable<T, R, B>,
    b: &Variable<T, R, B>,
    operation: &str,
    f: impl Fn(T, T) -> T,
) -> Result<Variable<T, R, B>, GradFlowError> {
    check_same_shape(a.shape(), b.shape(), operation)?;
    let a_values = gather(a)?;
    let b_values = gather(b)?;
    let values = a_values.into_iter().zip(b_values).map(|(x, y)| f(x, y)).collect();
    from_values(a.shape(), values)
}

/// Applies `f` to every element.
pub(crate) fn map<T: Element, const R: usize, B: Backend>(
    a: &Variable<T, R, B>,
    f: impl Fn(T) -> T,
) -> Result<Variable<T, R, B>, GradFlowError> {
    let values = gather(a)?.into_iter().map(f).collect();
    from_values(a.shape(), values)
}

/// Restores slot `position` of `grad_outputs`, or `None` if nothing arrived there.
pub(crate) fn grad_output<T: Element, const R: usize, B: Backend>(
    grad_outputs: &[Option<ErasedNode>],
    position: usize,
) -> Result<Option<Variable<T, R, B>>, GradFlowError> {
    match grad_outputs.get(position) {
        Some(Some(node)) => node.restore().map(Some),
        Some(None) => Ok(None),
        None => Err(GradFlowError::OutputPositionOutOfRange {
            position,
            outputs: grad_outputs.len(),
        }),
    }
}

/// Restores input `index` of a record.
pub(crate) fn input<T: Element, const R: usize, B: Backend>(
    inputs: &[ErasedNode],
    index: usize,
) -> Result<Variable<T, R, B>, GradFlowError> {
    inputs
        .get(index)
        .ok_or_else(|| GradFlowError::InternalError(format!("record has no input {}", index)))?
        .restore()
}

/// Erases a freshly computed gradient contribution.
pub(crate) fn contribution<T: Element, const R: usize, B: Backend>(
    grad: &Variable<T, R, B>,
) -> Result<Option<ErasedNode>, GradFlowError> {
    ErasedNode::erase(grad).map(Some)
}

/// Attaches a single-output record to `out` if `mode` and the operands ask for it.
pub(crate) fn record_output<T: Element, const R: usize, B: Backend>(
    mode: GradMode,
    out: Variable<T, R, B>,
    requires_grad: bool,
    make: impl FnOnce() -> Result<Arc<crate::autograd::GradFn>, GradFlowError>,
) -> Result<Variable<T, R, B>, GradFlowError> {
    if mode.should_record(requires_grad) {
        Ok(out.with_bprop(make()?, 0))
    } else {
        Ok(out)
    }
}
