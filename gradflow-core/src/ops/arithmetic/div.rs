use super::{mul_op, reciprocal_op};
use crate::autograd::GradMode;
use crate::buffer::Backend;
use crate::error::GradFlowError;
use crate::ops::check_same_shape;
use crate::types::Element;
use crate::variable::Variable;

/// Element-wise `a / b`, recorded as `a · reciprocal(b)`. Only defined for
/// floating-point element types.
pub fn div_op<T: Element, const R: usize, B: Backend>(
    mode: GradMode,
    a: &Variable<T, R, B>,
    b: &Variable<T, R, B>,
) -> Result<Variable<T, R, B>, GradFlowError> {
    check_same_shape(a.shape(), b.shape(), "div")?;
    let inverse = reciprocal_op(mode, b)?;
    mul_op(mode, a, &inverse)
}
