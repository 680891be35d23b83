use super::{add_op, scale_op};
use crate::autograd::GradMode;
use crate::buffer::Backend;
use crate::error::GradFlowError;
use crate::ops::check_same_shape;
use crate::types::Element;
use crate::variable::Variable;

/// Element-wise `a - b`, recorded as `a + (-1)·b`.
pub fn sub_op<T: Element, const R: usize, B: Backend>(
    mode: GradMode,
    a: &Variable<T, R, B>,
    b: &Variable<T, R, B>,
) -> Result<Variable<T, R, B>, GradFlowError> {
    check_same_shape(a.shape(), b.shape(), "sub")?;
    let negated = scale_op(mode, b, -T::one())?;
    add_op(mode, a, &negated)
}
