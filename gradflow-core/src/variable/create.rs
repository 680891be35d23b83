// src/variable/create.rs

use super::layout;
use super::Variable;
use crate::buffer::{Backend, Cpu, RawBuffer};
use crate::error::GradFlowError;
use crate::types::Element;
use num_traits::Float;
use rand::distributions::uniform::SampleUniform;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::StandardNormal;
use std::sync::Arc;

/// Row-major strides as a fixed-size array.
pub(crate) fn row_major_strides<const R: usize>(shape: &[usize; R]) -> [isize; R] {
    let mut strides = [0isize; R];
    strides.copy_from_slice(&layout::contiguous_strides(shape));
    strides
}

impl<T: Element, const R: usize, B: Backend> Variable<T, R, B> {
    /// Creates a variable from row-major host values. Strides are computed
    /// automatically. On an accelerator backend the values are copied to the device.
    pub fn from_vec(values: Vec<T>, shape: [usize; R], requires_grad: bool) -> Result<Self, GradFlowError> {
        layout::checked_numel(&shape)?;
        let strides = row_major_strides(&shape);
        Self::from_strided(values, shape, strides, requires_grad)
    }

    /// Creates a variable whose `values` are laid out according to caller-supplied
    /// strides.
    pub fn from_strided(
        values: Vec<T>,
        shape: [usize; R],
        strides: [isize; R],
        requires_grad: bool,
    ) -> Result<Self, GradFlowError> {
        let buffer = <B::Buffer<T> as RawBuffer<T>>::from_host(values);
        Variable::new(requires_grad, shape, strides, Arc::new(buffer))
    }

    /// Creates a variable filled with zeros.
    pub fn zeros(shape: [usize; R], requires_grad: bool) -> Result<Self, GradFlowError> {
        let numel = layout::checked_numel(&shape)?;
        let buffer = <B::Buffer<T> as RawBuffer<T>>::allocate_zeroed(numel);
        Variable::new(requires_grad, shape, row_major_strides(&shape), Arc::new(buffer))
    }

    /// Creates a variable filled with ones.
    pub fn ones(shape: [usize; R], requires_grad: bool) -> Result<Self, GradFlowError> {
        Self::full(shape, T::one(), requires_grad)
    }

    /// Creates a variable filled with `value`.
    pub fn full(shape: [usize; R], value: T, requires_grad: bool) -> Result<Self, GradFlowError> {
        let numel = layout::checked_numel(&shape)?;
        Self::from_vec(vec![value; numel], shape, requires_grad)
    }
}

impl<T: Element, B: Backend> Variable<T, 0, B> {
    /// Creates a rank-0 variable holding a single value.
    pub fn scalar(value: T, requires_grad: bool) -> Result<Self, GradFlowError> {
        Self::from_vec(vec![value], [], requires_grad)
    }
}

impl<T, const R: usize, B> Variable<T, R, B>
where
    T: Element + Float + SampleUniform,
    B: Backend,
{
    /// Creates a variable with values drawn uniformly from `[low, high)`.
    pub fn rand_uniform<G: Rng + ?Sized>(
        shape: [usize; R],
        low: T,
        high: T,
        rng: &mut G,
        requires_grad: bool,
    ) -> Result<Self, GradFlowError> {
        if !(low < high) {
            return Err(GradFlowError::UnsupportedOperation(format!(
                "rand_uniform requires low < high, got [{:?}, {:?})",
                low, high
            )));
        }
        let numel = layout::checked_numel(&shape)?;
        let dist = Uniform::new(low, high);
        let values: Vec<T> = (0..numel).map(|_| dist.sample(rng)).collect();
        Self::from_vec(values, shape, requires_grad)
    }

    /// Creates a variable with values drawn from the standard normal distribution.
    pub fn randn<G: Rng + ?Sized>(shape: [usize; R], rng: &mut G, requires_grad: bool) -> Result<Self, GradFlowError>
    where
        StandardNormal: Distribution<T>,
    {
        let numel = layout::checked_numel(&shape)?;
        let values: Vec<T> = (0..numel).map(|_| StandardNormal.sample(rng)).collect();
        Self::from_vec(values, shape, requires_grad)
    }
}

/// Creates a host variable from row-major values with automatically computed
/// strides.
pub fn variable<T: Element, const R: usize>(
    values: Vec<T>,
    shape: [usize; R],
    requires_grad: bool,
) -> Result<Variable<T, R, Cpu>, GradFlowError> {
    Variable::from_vec(values, shape, requires_grad)
}

/// Creates a host scalar variable.
pub fn scalar<T: Element>(value: T, requires_grad: bool) -> Result<Variable<T, 0, Cpu>, GradFlowError> {
    Variable::scalar(value, requires_grad)
}

/// Creates a host variable filled with zeros.
pub fn zeros<T: Element, const R: usize>(shape: [usize; R]) -> Result<Variable<T, R, Cpu>, GradFlowError> {
    Variable::zeros(shape, false)
}

/// Creates a host variable filled with ones.
pub fn ones<T: Element, const R: usize>(shape: [usize; R]) -> Result<Variable<T, R, Cpu>, GradFlowError> {
    Variable::ones(shape, false)
}

/// Creates a host variable filled with `value`.
pub fn full<T: Element, const R: usize>(shape: [usize; R], value: T) -> Result<Variable<T, R, Cpu>, GradFlowError> {
    Variable::full(shape, value, false)
}

#[cfg(test)]
#[path = "create_test.rs"]
mod tests;
