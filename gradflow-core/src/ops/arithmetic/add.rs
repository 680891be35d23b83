use crate::autograd::{BackwardOp, GradFn, GradMode};
use crate::buffer::Backend;
use crate::error::GradFlowError;
use crate::node::ErasedNode;
use crate::ops::{grad_output, record_output, zip_map};
use crate::types::Element;
use crate::variable::Variable;
use std::marker::PhantomData;

/// Backward for `a + b`: both inputs receive the output gradient unchanged.
#[derive(Debug)]
struct AddBackward<T, const R: usize, B> {
    _marker: PhantomData<fn() -> (T, B)>,
}

impl<T: Element, const R: usize, B: Backend> BackwardOp for AddBackward<T, R, B> {
    fn name(&self) -> &str {
        "add"
    }

    fn backward(
        &self,
        grad_outputs: &[Option<ErasedNode>],
        _inputs: &[ErasedNode],
    ) -> Result<Vec<Option<ErasedNode>>, GradFlowError> {
        // Restoring checks the slot holds the kind this record was built for.
        if grad_output::<T, R, B>(grad_outputs, 0)?.is_none() {
            return Ok(vec![None, None]);
        }
        let grad = grad_outputs[0].clone();
        Ok(vec![grad.clone(), grad])
    }
}

/// Element-wise sum of two same-shape variables.
pub fn add_op<T: Element, const R: usize, B: Backend>(
    mode: GradMode,
    a: &Variable<T, R, B>,
    b: &Variable<T, R, B>,
) -> Result<Variable<T, R, B>, GradFlowError> {
    let out = zip_map(a, b, "add", |x, y| x + y)?;
    record_output(mode, out, a.requires_grad() || b.requires_grad(), || {
        let inputs = vec![ErasedNode::erase(a)?, ErasedNode::erase(b)?];
        Ok(GradFn::new(AddBackward::<T, R, B> { _marker: PhantomData }, inputs, 1))
    })
}

#[cfg(test)]
#[path = "add_test.rs"]
mod tests;
