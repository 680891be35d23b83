use super::Variable;
use crate::buffer::{Backend, RawBuffer};
use crate::error::GradFlowError;
use crate::types::Element;

impl<T: Element, const R: usize, B: Backend> Variable<T, R, B> {
    /// Sets every element of the underlying data buffer to `value`.
    ///
    /// Acts on the whole buffer, not only the elements this view addresses, and is
    /// visible through every variable sharing the buffer. Not recorded.
    pub fn fill(&self, value: T) -> Result<(), GradFlowError> {
        self.data_buffer()?.fill(value);
        Ok(())
    }

    /// Sets every element of the underlying data buffer to zero.
    pub fn zero_(&self) -> Result<(), GradFlowError> {
        self.data_buffer()?.zero_fill();
        Ok(())
    }
}
