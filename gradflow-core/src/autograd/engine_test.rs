use super::*;
use crate::autograd::{GradMode, RecordState};
use crate::ops::{add_op, mul_op, scale_op, sum_op};
use crate::utils::testing::{check_grad_near, init_logger};
use crate::variable::{variable, Variable};

const MODE: GradMode = GradMode::Record;

#[test]
fn test_fan_in_doubles_twice() {
    init_logger();
    let x = variable(vec![1.0_f64, 2.0], [2], true).unwrap();
    let y = add_op(MODE, &x, &x).unwrap();
    let z = add_op(MODE, &y, &y).unwrap();
    let seed = variable(vec![0.0, 1.0], [2], false).unwrap();
    z.backward(Some(&seed)).unwrap();
    check_grad_near(&x, &[0.0, 4.0], 0.0);
    check_grad_near(&y, &[0.0, 2.0], 0.0);
}

#[test]
fn test_shared_intermediate_waits_for_both_consumers() {
    let x = variable(vec![3.0_f64], [1], true).unwrap();
    let y = mul_op(MODE, &x, &x).unwrap(); // y = x²
    let z = scale_op(MODE, &y, 2.0).unwrap(); // z = 2y
    let w = mul_op(MODE, &y, &x).unwrap(); // w = yx = x³
    let loss = sum_op(MODE, &add_op(MODE, &z, &w).unwrap()).unwrap();

    let y_record = y.bprop().unwrap().clone();
    loss.backward(None).unwrap();

    assert_eq!(y_record.state(), RecordState::Fired);
    // d/dx (2x² + x³) = 4x + 3x² = 12 + 27
    check_grad_near(&x, &[39.0], 1e-12);
}

#[test]
fn test_unreachable_consumer_does_not_block() {
    let x = variable(vec![1.0_f64, -1.0], [2], true).unwrap();
    let y = scale_op(MODE, &x, 3.0).unwrap();
    let _unused = mul_op(MODE, &y, &y).unwrap();
    let z = sum_op(MODE, &y).unwrap();
    z.backward(None).unwrap();
    check_grad_near(&x, &[3.0, 3.0], 0.0);
}

#[test]
fn test_second_pass_over_fired_root_is_error() {
    let x = variable(vec![2.0_f64], [1], true).unwrap();
    let loss = sum_op(MODE, &scale_op(MODE, &x, 5.0).unwrap()).unwrap();
    loss.backward(None).unwrap();
    check_grad_near(&x, &[5.0], 0.0);
    assert_eq!(
        loss.backward(None),
        Err(GradFlowError::RecordAlreadyFired { op: "sum".to_string() })
    );
    check_grad_near(&x, &[5.0], 0.0);
}

#[test]
fn test_late_consumer_of_fired_intermediate_is_error() {
    let x = variable(vec![1.0_f64], [1], true).unwrap();
    let y = scale_op(MODE, &x, 3.0).unwrap();
    let l1 = sum_op(MODE, &y).unwrap();
    let l2 = sum_op(MODE, &scale_op(MODE, &y, 2.0).unwrap()).unwrap();

    l1.backward(None).unwrap();
    check_grad_near(&x, &[3.0], 0.0);
    // y's record fired with l1's gradient only; l2's share cannot reach x anymore.
    assert_eq!(
        l2.backward(None),
        Err(GradFlowError::RecordAlreadyFired { op: "scale".to_string() })
    );
    check_grad_near(&x, &[3.0], 0.0);
}

#[test]
fn test_joint_loss_reaches_every_consumer() {
    let x = variable(vec![1.0_f64], [1], true).unwrap();
    let y = scale_op(MODE, &x, 3.0).unwrap();
    let l1 = sum_op(MODE, &y).unwrap();
    let l2 = sum_op(MODE, &scale_op(MODE, &y, 2.0).unwrap()).unwrap();
    add_op(MODE, &l1, &l2).unwrap().backward(None).unwrap();
    check_grad_near(&x, &[9.0], 0.0);
}

#[test]
fn test_reassignment_chain() {
    let x0 = variable(vec![1.0_f64, 1.0], [2], true).unwrap();
    let mut x = x0.clone();
    x = add_op(MODE, &x, &x).unwrap();
    x = add_op(MODE, &x, &x).unwrap();
    x = add_op(MODE, &x, &x).unwrap();
    let seed = variable(vec![1.0, 0.5], [2], false).unwrap();
    x.backward(Some(&seed)).unwrap();
    check_grad_near(&x0, &[8.0, 4.0], 0.0);
}

#[test]
fn test_intermediate_without_requires_grad_still_propagates() {
    let x = variable(vec![1.0_f64], [1], true).unwrap();
    let mut y = scale_op(MODE, &x, 2.0).unwrap();
    y.set_requires_grad(false);
    let loss = sum_op(MODE, &y).unwrap();
    loss.backward(None).unwrap();
    check_grad_near(&x, &[2.0], 0.0);
    check_grad_near(&y, &[0.0], 0.0);
}

#[test]
fn test_backward_op_error_propagates() {
    let x = variable(vec![1.0_f64], [1], true).unwrap();
    let failing = GradFn::from_fn("failing", vec![ErasedNode::erase(&x).unwrap()], 1, |_, _| {
        Err(GradFlowError::UnsupportedOperation("no gradient".to_string()))
    });
    let y = Variable::<f64, 1>::from_vec(vec![1.0], [1], false).unwrap().with_bprop(failing, 0);
    let loss = sum_op(MODE, &y).unwrap();
    assert_eq!(
        loss.backward(None),
        Err(GradFlowError::UnsupportedOperation("no gradient".to_string()))
    );
}

#[test]
fn test_contribution_with_wrong_shape_is_rejected() {
    let x = variable(vec![1.0_f64, 2.0], [2], true).unwrap();
    let bad = GradFn::from_fn("bad_shape", vec![ErasedNode::erase(&x).unwrap()], 1, |_, _| {
        let g = variable(vec![1.0_f64], [1], false)?;
        Ok(vec![Some(ErasedNode::erase(&g)?)])
    });
    let y = Variable::<f64, 0>::scalar(0.0, false).unwrap().with_bprop(bad, 0);
    assert!(matches!(y.backward(None), Err(GradFlowError::ShapeMismatch { .. })));
    check_grad_near(&x, &[0.0, 0.0], 0.0);
}

#[test]
fn test_deep_chain_does_not_overflow() {
    let x = variable(vec![1.0_f32], [1], true).unwrap();
    let mut y = x.clone();
    for _ in 0..50_000 {
        y = scale_op(MODE, &y, 1.0).unwrap();
    }
    let seed = variable(vec![2.0_f32], [1], false).unwrap();
    y.backward(Some(&seed)).unwrap();
    check_grad_near(&x, &[2.0], 0.0);
    drop(y);
}

#[test]
fn test_inputs_processed_in_order() {
    let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let make = |label: &'static str, input: &Variable<f64, 1>| {
        let order = std::sync::Arc::clone(&order);
        let record = GradFn::from_fn(label, vec![ErasedNode::erase(input).unwrap()], 1, move |grads, _| {
            order.lock().unwrap().push(label);
            Ok(vec![grads[0].clone()])
        });
        Variable::<f64, 1>::from_vec(vec![0.0], [1], false).unwrap().with_bprop(record, 0)
    };
    let x = variable(vec![1.0_f64], [1], true).unwrap();
    let a = make("first", &x);
    let a_up = make("first_upstream", &a);
    let b = make("second", &x);
    let z = add_op(MODE, &a_up, &b).unwrap();
    z.backward(Some(&variable(vec![1.0], [1], false).unwrap())).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["first_upstream", "first", "second"]);
    check_grad_near(&x, &[2.0], 0.0);
}
