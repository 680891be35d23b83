use super::Variable;
use crate::autograd::RecordState;
use crate::buffer::{Backend, RawBuffer};
use crate::error::GradFlowError;
use crate::node::ErasedNode;
use crate::types::Element;
use std::sync::Arc;

impl<T: Element, const R: usize, B: Backend> Variable<T, R, B> {
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Sets the `requires_grad` flag.
    ///
    /// Only meaningful on leaves: the flag of an operation output does not change
    /// whether its record propagates gradients further.
    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        if self.bprop.is_some() && !requires_grad {
            log::warn!("set_requires_grad(false) on an operation output; upstream gradients still propagate");
        }
        self.requires_grad = requires_grad;
    }

    /// Returns true if this variable was not produced by a recorded operation.
    pub fn is_leaf(&self) -> bool {
        self.bprop.is_none()
    }

    /// Propagates gradients from this variable back to the leaves of its graph.
    ///
    /// With `Some(grad)`, `grad` must have the same shape and is delivered to this
    /// variable's output position. With `None` the variable must be a scalar (rank 0)
    /// produced by a single-output operation and is seeded with one. Calling this on
    /// a leaf does nothing.
    ///
    /// # Errors
    /// * `BackwardNonScalar` without a gradient on a variable of rank > 0.
    /// * `MultiOutputSeed` without a gradient on the output of a multi-output operation.
    /// * `RecordAlreadyFired` if the pass reaches a record whose backward already ran.
    /// * Any error returned by a backward op during the pass.
    pub fn backward(&self, grad: Option<&Variable<T, R, B>>) -> Result<(), GradFlowError> {
        let node = ErasedNode::erase(self)?;
        match grad {
            Some(g) => node.backward(Some(&ErasedNode::erase(g)?)),
            None => node.backward(None),
        }
    }

    /// Delivers `grad` to output `position` of this variable's record, whatever this
    /// variable's own position is. A leaf ignores the call.
    pub fn backward_at(&self, grad: &Variable<T, R, B>, position: usize) -> Result<(), GradFlowError> {
        match &self.bprop {
            Some(bprop) => bprop.backward(ErasedNode::erase(grad)?, position),
            None => Ok(()),
        }
    }

    /// State of the attached record, if any.
    pub fn record_state(&self) -> Option<RecordState> {
        self.bprop.as_ref().map(|b| b.state())
    }

    /// Returns a variable sharing `data` with this one but with no backward record,
    /// `requires_grad == false` and a fresh zeroed gradient buffer.
    pub fn detach(&self) -> Result<Self, GradFlowError> {
        let data = self.data_buffer()?;
        Variable::new(false, self.shape, self.strides, Arc::clone(data))
    }

    /// Returns the accumulated gradient as a variable. The returned variable's data
    /// is this variable's gradient buffer, so later accumulations are visible on it.
    pub fn grad_variable(&self) -> Result<Self, GradFlowError> {
        let grad = self.grad_buffer()?;
        Variable::new(false, self.shape, self.strides, Arc::clone(grad))
    }

    /// Resets the gradient buffer to zero.
    pub fn zero_grad(&self) -> Result<(), GradFlowError> {
        self.grad_buffer()?.zero_fill();
        Ok(())
    }
}

#[cfg(test)]
#[path = "autograd_methods_test.rs"]
mod tests;
