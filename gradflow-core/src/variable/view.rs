use super::layout;
use super::Variable;
use crate::buffer::Cpu;
use crate::error::GradFlowError;
use crate::types::Element;
use std::ops::Index;
use std::sync::RwLockReadGuard;

/// Dense multi-dimensional view over a host buffer, addressed through a variable's
/// shape and strides. No element is copied.
///
/// The view holds a read lock on the buffer for as long as it lives, so it must be
/// dropped before anything writes the same buffer (in-place fills, a backward pass
/// accumulating into the gradient).
pub struct StridedView<'a, T: Element, const R: usize> {
    guard: RwLockReadGuard<'a, Vec<T>>,
    shape: [usize; R],
    strides: [isize; R],
}

impl<'a, T: Element, const R: usize> StridedView<'a, T, R> {
    pub fn shape(&self) -> [usize; R] {
        self.shape
    }

    /// Number of elements in the view.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at a logical index.
    /// Panics if the index is out of bounds.
    pub fn get(&self, index: [usize; R]) -> T {
        self[index]
    }

    /// Iterates over the elements in logical row-major order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        layout::logical_offsets(&self.shape, &self.strides)
            .into_iter()
            .map(move |o| self.guard[o])
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<'a, T: Element, const R: usize> Index<[usize; R]> for StridedView<'a, T, R> {
    type Output = T;

    fn index(&self, index: [usize; R]) -> &T {
        &self.guard[layout::offset_of(&self.shape, &self.strides, &index)]
    }
}

impl<T: Element, const R: usize> Variable<T, R, Cpu> {
    /// Views the forward values as a dense `R`-dimensional array without copying.
    /// A rank-0 variable yields a single-element view indexed by `[]`.
    pub fn sliced(&self) -> Result<StridedView<'_, T, R>, GradFlowError> {
        Ok(StridedView {
            guard: self.data_buffer()?.read(),
            shape: self.shape,
            strides: self.strides,
        })
    }

    /// Same as [`sliced`](Self::sliced), over the gradient buffer.
    pub fn grad_view(&self) -> Result<StridedView<'_, T, R>, GradFlowError> {
        Ok(StridedView {
            guard: self.grad_buffer()?.read(),
            shape: self.shape,
            strides: self.strides,
        })
    }
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
