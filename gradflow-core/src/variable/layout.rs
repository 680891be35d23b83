//! Shape/stride arithmetic shared by typed variables and erased nodes.
//!
//! Strides are signed. A negative stride walks its dimension backwards, so the first
//! logical element of such a view does not sit at buffer offset 0 but at the
//! [`base_offset`] computed from the negative strides.

use crate::error::GradFlowError;

/// Calculates row-major (C order) strides for a given shape.
///
/// Example:
/// shape = [2, 3] -> strides = [3, 1]
/// shape = [2, 2, 2] -> strides = [4, 2, 1]
pub fn contiguous_strides(shape: &[usize]) -> Vec<isize> {
    let rank = shape.len();
    let mut strides = vec![1isize; rank];
    for i in (0..rank.saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1] as isize;
    }
    strides
}

/// Number of elements of `shape`.
///
/// Fails with `ShapeOverflow` when the element count, or the row-major stride of
/// any dimension, would not fit in `isize`. Zero-sized dimensions count as one for
/// the stride limit.
pub fn checked_numel(shape: &[usize]) -> Result<usize, GradFlowError> {
    let overflow = || GradFlowError::ShapeOverflow { shape: shape.to_vec() };
    let span = shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n.max(1)))
        .filter(|&span| span <= isize::MAX as usize)
        .ok_or_else(overflow)?;
    Ok(if shape.contains(&0) { 0 } else { span })
}

/// Buffer offset of the element at logical index `[0, 0, ...]`.
pub fn base_offset(shape: &[usize], strides: &[isize]) -> usize {
    shape
        .iter()
        .zip(strides)
        .filter(|(_, &s)| s < 0)
        .map(|(&n, &s)| n.saturating_sub(1).saturating_mul(s.unsigned_abs()))
        .fold(0, usize::saturating_add)
}

/// Checks that every element addressed by `shape`/`strides` lies inside a buffer of
/// `len` elements.
pub fn check_bounds(shape: &[usize], strides: &[isize], len: usize) -> Result<(), GradFlowError> {
    if shape.contains(&0) {
        return Ok(());
    }
    let highest = shape
        .iter()
        .zip(strides)
        .filter(|(_, &s)| s > 0)
        .map(|(&n, &s)| (n - 1).saturating_mul(s as usize))
        .fold(base_offset(shape, strides), usize::saturating_add);
    if highest >= len {
        return Err(GradFlowError::StridesOutOfBounds {
            shape: shape.to_vec(),
            strides: strides.to_vec(),
            len,
        });
    }
    Ok(())
}

/// Buffer offset of one logical index.
/// Panics if the index rank or any coordinate is out of bounds.
pub fn offset_of(shape: &[usize], strides: &[isize], index: &[usize]) -> usize {
    assert_eq!(
        index.len(),
        shape.len(),
        "Number of indices ({}) does not match rank ({}) for shape {:?}",
        index.len(),
        shape.len(),
        shape
    );
    let mut offset = base_offset(shape, strides) as isize;
    for (d, (&i, &n)) in index.iter().zip(shape).enumerate() {
        assert!(
            i < n,
            "Index {} is out of bounds for dimension {} with size {} (shape: {:?})",
            i,
            d,
            n,
            shape
        );
        offset += i as isize * strides[d];
    }
    offset as usize
}

/// Buffer offsets of every element, in logical row-major order.
pub fn logical_offsets(shape: &[usize], strides: &[isize]) -> Vec<usize> {
    let numel: usize = shape.iter().product();
    let mut offsets = Vec::with_capacity(numel);
    if numel == 0 {
        return offsets;
    }
    let rank = shape.len();
    let mut index = vec![0usize; rank];
    let mut current = base_offset(shape, strides) as isize;
    for _ in 0..numel {
        offsets.push(current as usize);
        for d in (0..rank).rev() {
            index[d] += 1;
            current += strides[d];
            if index[d] < shape[d] {
                break;
            }
            current -= strides[d] * shape[d] as isize;
            index[d] = 0;
        }
    }
    offsets
}

/// Checks if the layout is the standard row-major order without gaps.
pub fn is_contiguous(shape: &[usize], strides: &[isize]) -> bool {
    let mut expected = 1isize;
    for i in (0..shape.len()).rev() {
        let n = shape[i];
        if n == 0 {
            return true;
        }
        if n != 1 {
            if strides[i] != expected {
                return false;
            }
            expected *= n as isize;
        }
    }
    true
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod tests;
