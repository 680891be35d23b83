use crate::autograd::{BackwardOp, GradFn, GradMode};
use crate::buffer::Backend;
use crate::error::GradFlowError;
use crate::node::ErasedNode;
use crate::ops::{contribution, from_values, gather, grad_output};
use crate::types::Element;
use crate::variable::Variable;
use std::marker::PhantomData;

/// Backward for a split: the two output gradients are laid back side by side,
/// zeros standing in for an output that received nothing.
#[derive(Debug)]
struct SplitBackward<T, B> {
    mid: usize,
    len: usize,
    _marker: PhantomData<fn() -> (T, B)>,
}

impl<T: Element, B: Backend> BackwardOp for SplitBackward<T, B> {
    fn name(&self) -> &str {
        "split_at"
    }

    fn backward(
        &self,
        grad_outputs: &[Option<ErasedNode>],
        _inputs: &[ErasedNode],
    ) -> Result<Vec<Option<ErasedNode>>, GradFlowError> {
        let left = grad_output::<T, 1, B>(grad_outputs, 0)?;
        let right = grad_output::<T, 1, B>(grad_outputs, 1)?;
        if left.is_none() && right.is_none() {
            return Ok(vec![None]);
        }
        let mut values = match &left {
            Some(g) => gather(g)?,
            None => vec![T::zero(); self.mid],
        };
        match &right {
            Some(g) => values.extend(gather(g)?),
            None => values.extend(std::iter::repeat(T::zero()).take(self.len - self.mid)),
        }
        let grad_input = from_values::<T, 1, B>([self.len], values)?;
        Ok(vec![contribution(&grad_input)?])
    }
}

/// Splits a rank-1 variable into `a[..mid]` and `a[mid..]`.
///
/// Both outputs share one backward record; the left output sits at position 0 and
/// the right one at position 1.
pub fn split_at_op<T: Element, B: Backend>(
    mode: GradMode,
    a: &Variable<T, 1, B>,
    mid: usize,
) -> Result<(Variable<T, 1, B>, Variable<T, 1, B>), GradFlowError> {
    let [len] = a.shape();
    if mid > len {
        return Err(GradFlowError::UnsupportedOperation(format!(
            "split_at: mid {} is out of range for length {}",
            mid, len
        )));
    }
    let mut values = gather(a)?;
    let right_values = values.split_off(mid);
    let left = from_values::<T, 1, B>([mid], values)?;
    let right = from_values::<T, 1, B>([len - mid], right_values)?;

    if !mode.should_record(a.requires_grad()) {
        return Ok((left, right));
    }
    let op = SplitBackward::<T, B> {
        mid,
        len,
        _marker: PhantomData,
    };
    let record = GradFn::new(op, vec![ErasedNode::erase(a)?], 2);
    Ok((left.with_bprop(record.clone(), 0), right.with_bprop(record, 1)))
}

#[cfg(test)]
#[path = "split_test.rs"]
mod tests;
