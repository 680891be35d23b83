use crate::autograd::{BackwardOp, GradFn, GradMode};
use crate::buffer::Backend;
use crate::error::GradFlowError;
use crate::node::ErasedNode;
use crate::ops::{contribution, grad_output, map, record_output};
use crate::types::Element;
use crate::variable::Variable;
use std::marker::PhantomData;

#[derive(Debug)]
struct ScaleBackward<T, const R: usize, B> {
    factor: T,
    _marker: PhantomData<fn() -> B>,
}

impl<T: Element, const R: usize, B: Backend> BackwardOp for ScaleBackward<T, R, B> {
    fn name(&self) -> &str {
        "scale"
    }

    fn backward(
        &self,
        grad_outputs: &[Option<ErasedNode>],
        _inputs: &[ErasedNode],
    ) -> Result<Vec<Option<ErasedNode>>, GradFlowError> {
        let Some(grad) = grad_output::<T, R, B>(grad_outputs, 0)? else {
            return Ok(vec![None]);
        };
        let factor = self.factor;
        Ok(vec![contribution(&map(&grad, |g| g * factor)?)?])
    }
}

/// Multiplies every element by the constant `factor`. `factor == -1` is negation.
pub fn scale_op<T: Element, const R: usize, B: Backend>(
    mode: GradMode,
    a: &Variable<T, R, B>,
    factor: T,
) -> Result<Variable<T, R, B>, GradFlowError> {
    let out = map(a, |x| x * factor)?;
    record_output(mode, out, a.requires_grad(), || {
        let op = ScaleBackward::<T, R, B> {
            factor,
            _marker: PhantomData,
        };
        Ok(GradFn::new(op, vec![ErasedNode::erase(a)?], 1))
    })
}

#[cfg(test)]
#[path = "scale_test.rs"]
mod tests;
