use super::*;
use crate::buffer::Gpu;
use crate::utils::testing::check_grad_near;
use crate::variable::variable;

#[test]
fn test_sum_forward() {
    let a = variable(vec![1_i64, 2, 3, 4, 5, 6], [2, 3], false).unwrap();
    let s = sum_op(GradMode::Record, &a).unwrap();
    assert_eq!(s.shape(), [0usize; 0]);
    assert_eq!(s.to_vec().unwrap(), vec![21]);
}

#[test]
fn test_sum_empty_is_zero() {
    let a = Variable::<f64, 2>::zeros([0, 3], false).unwrap();
    assert_eq!(sum_op(GradMode::Record, &a).unwrap().to_vec().unwrap(), vec![0.0]);
}

#[test]
fn test_sum_backward_broadcasts_seed() {
    let a = variable(vec![1.0_f64, 2.0, 3.0, 4.0], [2, 2], true).unwrap();
    let s = sum_op(GradMode::Record, &a).unwrap();
    s.backward(Some(&Variable::scalar(3.0, false).unwrap())).unwrap();
    check_grad_near(&a, &[3.0; 4], 0.0);
}

#[test]
fn test_sum_on_accelerator() {
    let a = Variable::<f32, 1, Gpu>::from_vec(vec![1.0, 2.0, 3.0], [3], true).unwrap();
    let s = sum_op(GradMode::Record, &a).unwrap();
    assert_eq!(s.to_vec().unwrap(), vec![6.0]);
    s.backward(None).unwrap();
    assert_eq!(a.grad_to_vec().unwrap(), vec![1.0, 1.0, 1.0]);
}
