use super::Variable;
use crate::buffer::{self, Backend};
use crate::error::GradFlowError;
use crate::types::Element;

impl<T: Element, const R: usize, B: Backend> Variable<T, R, B> {
    /// Moves the variable to backend `D`, keeping shape, strides and flags.
    ///
    /// Data and gradient are copied element by element when `D` differs from `B`.
    /// When `D == B` the buffers are shared, not copied. The result is detached from
    /// any backward record: the transfer itself is not differentiable.
    pub fn to<D: Backend>(&self) -> Result<Variable<T, R, D>, GradFlowError> {
        let data = buffer::transfer::<T, B, D>(self.data_buffer()?);
        let grad = buffer::transfer::<T, B, D>(self.grad_buffer()?);
        log::debug!("Variable {:?} moved {:?} -> {:?}", self.shape, B::DEVICE, D::DEVICE);
        Ok(Variable {
            requires_grad: self.requires_grad,
            shape: self.shape,
            strides: self.strides,
            data: Some(data),
            grad: Some(grad),
            bprop: None,
            out_position: 0,
        })
    }
}

#[cfg(test)]
#[path = "transfer_test.rs"]
mod tests;
