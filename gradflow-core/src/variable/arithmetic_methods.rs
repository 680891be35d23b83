use super::Variable;
use crate::autograd::GradMode;
use crate::buffer::Backend;
use crate::error::GradFlowError;
use crate::ops;
use crate::types::Element;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Element-wise binary operations available on variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl<T: Element, const R: usize, B: Backend> Variable<T, R, B> {
    /// Applies `op` element-wise with `other`, recording it according to `mode`.
    ///
    /// `Sub` is recorded as `self + (-1)·other` and `Div` as
    /// `self · reciprocal(other)`.
    pub fn elementwise(&self, op: BinaryOp, other: &Self, mode: GradMode) -> Result<Self, GradFlowError> {
        match op {
            BinaryOp::Add => ops::add_op(mode, self, other),
            BinaryOp::Sub => ops::sub_op(mode, self, other),
            BinaryOp::Mul => ops::mul_op(mode, self, other),
            BinaryOp::Div => ops::div_op(mode, self, other),
        }
    }

    /// Sum of all elements as a scalar variable.
    pub fn sum(&self, mode: GradMode) -> Result<Variable<T, 0, B>, GradFlowError> {
        ops::sum_op(mode, self)
    }

    /// Multiplies every element by `factor`.
    pub fn scale(&self, factor: T, mode: GradMode) -> Result<Self, GradFlowError> {
        ops::scale_op(mode, self, factor)
    }
}

macro_rules! impl_binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<'a, T: Element, const R: usize, B: Backend> $trait<&'a Variable<T, R, B>> for &'a Variable<T, R, B> {
            type Output = Result<Variable<T, R, B>, GradFlowError>;

            fn $method(self, rhs: &'a Variable<T, R, B>) -> Self::Output {
                self.elementwise($op, rhs, GradMode::default())
            }
        }
    };
}

impl_binary_operator!(Add, add, BinaryOp::Add);
impl_binary_operator!(Sub, sub, BinaryOp::Sub);
impl_binary_operator!(Mul, mul, BinaryOp::Mul);
impl_binary_operator!(Div, div, BinaryOp::Div);

impl<'a, T: Element, const R: usize, B: Backend> Neg for &'a Variable<T, R, B> {
    type Output = Result<Variable<T, R, B>, GradFlowError>;

    fn neg(self) -> Self::Output {
        ops::scale_op(GradMode::default(), self, -T::one())
    }
}

#[cfg(test)]
#[path = "arithmetic_methods_test.rs"]
mod tests;
