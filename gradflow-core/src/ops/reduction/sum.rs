use crate::autograd::{BackwardOp, GradFn, GradMode};
use crate::buffer::Backend;
use crate::error::GradFlowError;
use crate::node::ErasedNode;
use crate::ops::{contribution, from_values, gather, grad_output, record_output};
use crate::types::Element;
use crate::variable::Variable;
use std::marker::PhantomData;

/// Backward for a full reduction: every input element receives the scalar
/// output gradient.
#[derive(Debug)]
struct SumBackward<T, const R: usize, B> {
    input_shape: [usize; R],
    _marker: PhantomData<fn() -> (T, B)>,
}

impl<T: Element, const R: usize, B: Backend> BackwardOp for SumBackward<T, R, B> {
    fn name(&self) -> &str {
        "sum"
    }

    fn backward(
        &self,
        grad_outputs: &[Option<ErasedNode>],
        _inputs: &[ErasedNode],
    ) -> Result<Vec<Option<ErasedNode>>, GradFlowError> {
        let Some(grad) = grad_output::<T, 0, B>(grad_outputs, 0)? else {
            return Ok(vec![None]);
        };
        let value = gather(&grad)?[0];
        let numel = self.input_shape.iter().product();
        let grad_input = from_values::<T, R, B>(self.input_shape, vec![value; numel])?;
        Ok(vec![contribution(&grad_input)?])
    }
}

/// Sums every element into a rank-0 variable. The sum of an empty variable is zero.
pub fn sum_op<T: Element, const R: usize, B: Backend>(
    mode: GradMode,
    a: &Variable<T, R, B>,
) -> Result<Variable<T, 0, B>, GradFlowError> {
    let total = gather(a)?.into_iter().fold(T::zero(), |acc, x| acc + x);
    let out = from_values::<T, 0, B>([], vec![total])?;
    record_output(mode, out, a.requires_grad(), || {
        let op = SumBackward::<T, R, B> {
            input_shape: a.shape(),
            _marker: PhantomData,
        };
        Ok(GradFn::new(op, vec![ErasedNode::erase(a)?], 1))
    })
}

#[cfg(test)]
#[path = "sum_test.rs"]
mod tests;
