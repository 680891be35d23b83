use crate::autograd::{BackwardOp, GradFn, GradMode};
use crate::buffer::Backend;
use crate::error::GradFlowError;
use crate::node::ErasedNode;
use crate::ops::{contribution, grad_output, input, record_output, zip_map};
use crate::types::Element;
use crate::variable::Variable;
use std::marker::PhantomData;

/// Backward for `a * b`: `grad_a = grad * b`, `grad_b = grad * a`.
#[derive(Debug)]
struct MulBackward<T, const R: usize, B> {
    _marker: PhantomData<fn() -> (T, B)>,
}

impl<T: Element, const R: usize, B: Backend> BackwardOp for MulBackward<T, R, B> {
    fn name(&self) -> &str {
        "mul"
    }

    fn backward(
        &self,
        grad_outputs: &[Option<ErasedNode>],
        inputs: &[ErasedNode],
    ) -> Result<Vec<Option<ErasedNode>>, GradFlowError> {
        let Some(grad) = grad_output::<T, R, B>(grad_outputs, 0)? else {
            return Ok(vec![None, None]);
        };
        let a = input::<T, R, B>(inputs, 0)?;
        let b = input::<T, R, B>(inputs, 1)?;
        let grad_a = zip_map(&grad, &b, "mul_backward", |g, y| g * y)?;
        let grad_b = zip_map(&grad, &a, "mul_backward", |g, x| g * x)?;
        Ok(vec![contribution(&grad_a)?, contribution(&grad_b)?])
    }
}

/// Element-wise product of two same-shape variables.
pub fn mul_op<T: Element, const R: usize, B: Backend>(
    mode: GradMode,
    a: &Variable<T, R, B>,
    b: &Variable<T, R, B>,
) -> Result<Variable<T, R, B>, GradFlowError> {
    let out = zip_map(a, b, "mul", |x, y| x * y)?;
    record_output(mode, out, a.requires_grad() || b.requires_grad(), || {
        let inputs = vec![ErasedNode::erase(a)?, ErasedNode::erase(b)?];
        Ok(GradFn::new(MulBackward::<T, R, B> { _marker: PhantomData }, inputs, 1))
    })
}

#[cfg(test)]
#[path = "mul_test.rs"]
mod tests;
