use super::*;
use crate::buffer::Gpu;
use crate::utils::testing::{check_grad_near, check_variable_near};
use crate::variable::variable;

#[test]
fn test_operators_forward() {
    let a = variable(vec![6.0_f64, 8.0], [2], false).unwrap();
    let b = variable(vec![2.0_f64, 4.0], [2], false).unwrap();
    check_variable_near(&(&a + &b).unwrap(), [2], &[8.0, 12.0], 1e-12);
    check_variable_near(&(&a - &b).unwrap(), [2], &[4.0, 4.0], 1e-12);
    check_variable_near(&(&a * &b).unwrap(), [2], &[12.0, 32.0], 1e-12);
    check_variable_near(&(&a / &b).unwrap(), [2], &[3.0, 2.0], 1e-12);
    check_variable_near(&(-&a).unwrap(), [2], &[-6.0, -8.0], 1e-12);
}

#[test]
fn test_elementwise_records_by_mode() {
    let a = variable(vec![1.0_f32, 2.0], [2], true).unwrap();
    let b = variable(vec![3.0_f32, 4.0], [2], false).unwrap();
    let recorded = a.elementwise(BinaryOp::Mul, &b, GradMode::Record).unwrap();
    assert!(recorded.requires_grad());
    assert!(recorded.bprop().is_some());

    let plain = a.elementwise(BinaryOp::Mul, &b, GradMode::NoGrad).unwrap();
    assert!(!plain.requires_grad());
    assert!(plain.bprop().is_none());
}

#[test]
fn test_sub_records_composition() {
    let a = variable(vec![1.0_f64, 2.0], [2], true).unwrap();
    let b = variable(vec![3.0_f64, 5.0], [2], true).unwrap();
    let c = (&a - &b).unwrap();
    let bprop = c.bprop().unwrap();
    assert_eq!(bprop.name(), "add");
    assert_eq!(bprop.inputs()[1].bprop().unwrap().name(), "scale");

    let g = variable(vec![1.0, 2.0], [2], false).unwrap();
    c.backward(Some(&g)).unwrap();
    check_grad_near(&a, &[1.0, 2.0], 1e-12);
    check_grad_near(&b, &[-1.0, -2.0], 1e-12);
}

#[test]
fn test_div_on_integers_unsupported() {
    let a = variable(vec![4_i32, 6], [2], false).unwrap();
    let b = variable(vec![2_i32, 3], [2], false).unwrap();
    assert!(matches!(&a / &b, Err(GradFlowError::UnsupportedOperation(_))));
    assert_eq!((&a - &b).unwrap().to_vec().unwrap(), vec![2, 3]);
}

#[test]
fn test_shape_mismatch() {
    let a = variable(vec![1.0_f64, 2.0], [2], false).unwrap();
    let b = variable(vec![1.0_f64, 2.0, 3.0], [3], false).unwrap();
    for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div] {
        assert!(matches!(
            a.elementwise(op, &b, GradMode::Record),
            Err(GradFlowError::ShapeMismatch { .. })
        ));
    }
}

#[test]
fn test_operators_on_accelerator() {
    let a = Variable::<f32, 1, Gpu>::from_vec(vec![1.0, 2.0], [2], true).unwrap();
    let b = Variable::<f32, 1, Gpu>::from_vec(vec![0.5, 4.0], [2], true).unwrap();
    let c = (&a * &b).unwrap();
    assert_eq!(c.device(), crate::device::StorageDevice::GPU);
    let g = Variable::<f32, 1, Gpu>::ones([2], false).unwrap();
    c.backward(Some(&g)).unwrap();
    assert_eq!(a.grad_to_vec().unwrap(), vec![0.5, 4.0]);
    assert_eq!(b.grad_to_vec().unwrap(), vec![1.0, 2.0]);
}
