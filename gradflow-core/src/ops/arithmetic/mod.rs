//! Element-wise arithmetic.
//!
//! `add`, `mul`, `scale` and `reciprocal` are primitive kernels with their own
//! backward structs. Subtraction is recorded as `a + (-1)·b` and division as
//! `a · reciprocal(b)`, so they need no backward of their own.

pub mod add;
pub mod div;
pub mod mul;
pub mod reciprocal;
pub mod scale;
pub mod sub;

pub use add::add_op;
pub use div::div_op;
pub use mul::mul_op;
pub use reciprocal::reciprocal_op;
pub use scale::scale_op;
pub use sub::sub_op;
