use crate::buffer::Backend;
use crate::types::Element;
use crate::variable::Variable;
use num_traits::NumCast;

/// Initializes `env_logger` once for the test binary. Safe to call from every test.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn as_f64<T: Element>(values: Vec<T>) -> Vec<f64> {
    values
        .into_iter()
        .map(|v| <f64 as NumCast>::from(v).expect("element not representable as f64"))
        .collect()
}

/// Checks that a variable has the expected shape and that its values are within
/// `tolerance` of `expected_data`, in logical order.
/// Panics if shapes differ or data differs significantly.
pub fn check_variable_near<T: Element, const R: usize, B: Backend>(
    actual: &Variable<T, R, B>,
    expected_shape: [usize; R],
    expected_data: &[f64],
    tolerance: f64,
) {
    assert_eq!(actual.shape(), expected_shape, "Shape mismatch");
    let actual_data = as_f64(actual.to_vec().expect("Failed to read variable data in check_variable_near"));
    check_slice_near(&actual_data, expected_data, tolerance);
}

/// Same as [`check_variable_near`], on the accumulated gradient.
pub fn check_grad_near<T: Element, const R: usize, B: Backend>(
    actual: &Variable<T, R, B>,
    expected_data: &[f64],
    tolerance: f64,
) {
    let actual_grad = as_f64(actual.grad_to_vec().expect("Failed to read variable grad in check_grad_near"));
    check_slice_near(&actual_grad, expected_data, tolerance);
}

fn check_slice_near(actual: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len(), "Data length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let diff = (a - e).abs();
        if diff > tolerance {
            panic!(
                "Data mismatch at index {}: actual={:?}, expected={:?}, diff={:?}, tolerance={:?}",
                i, a, e, diff, tolerance
            );
        }
    }
}
