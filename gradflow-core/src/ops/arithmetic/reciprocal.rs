use crate::autograd::{BackwardOp, GradFn, GradMode};
use crate::buffer::Backend;
use crate::error::GradFlowError;
use crate::node::ErasedNode;
use crate::ops::{contribution, grad_output, input, map, record_output, zip_map};
use crate::types::Element;
use crate::variable::Variable;
use std::marker::PhantomData;

/// Backward for `1 / b`: `grad_b = -grad / b²`.
#[derive(Debug)]
struct ReciprocalBackward<T, const R: usize, B> {
    _marker: PhantomData<fn() -> (T, B)>,
}

impl<T: Element, const R: usize, B: Backend> BackwardOp for ReciprocalBackward<T, R, B> {
    fn name(&self) -> &str {
        "reciprocal"
    }

    fn backward(
        &self,
        grad_outputs: &[Option<ErasedNode>],
        inputs: &[ErasedNode],
    ) -> Result<Vec<Option<ErasedNode>>, GradFlowError> {
        let Some(grad) = grad_output::<T, R, B>(grad_outputs, 0)? else {
            return Ok(vec![None]);
        };
        let b = input::<T, R, B>(inputs, 0)?;
        let grad_b = zip_map(&grad, &b, "reciprocal_backward", |g, y| -(g / (y * y)))?;
        Ok(vec![contribution(&grad_b)?])
    }
}

/// Element-wise `1 / b`. Only defined for floating-point element types.
pub fn reciprocal_op<T: Element, const R: usize, B: Backend>(
    mode: GradMode,
    b: &Variable<T, R, B>,
) -> Result<Variable<T, R, B>, GradFlowError> {
    if !T::DTYPE.is_float() {
        return Err(GradFlowError::UnsupportedOperation(format!(
            "reciprocal is not defined for {:?}",
            T::DTYPE
        )));
    }
    let out = map(b, |y| T::one() / y)?;
    record_output(mode, out, b.requires_grad(), || {
        let op = ReciprocalBackward::<T, R, B> { _marker: PhantomData };
        Ok(GradFn::new(op, vec![ErasedNode::erase(b)?], 1))
    })
}

#[cfg(test)]
#[path = "reciprocal_test.rs"]
mod tests;
