mod common;

use approx::assert_relative_eq;
use common::{create_test_variable, grad_f64, init_logger};
use gradflow_core::autograd::grad_check::check_grad;
use gradflow_core::ops::{add_op, mul_op, split_at_op, sum_op};
use gradflow_core::{BinaryOp, GradFlowError, GradMode, Gpu, RecordState, Variable};

#[test]
fn fan_in_accumulates_every_use() {
    init_logger();
    let x = create_test_variable(vec![1.0_f64, 2.0], [2], true);
    let y = (&x + &x).unwrap();
    let z = (&y + &y).unwrap();
    let seed = create_test_variable(vec![0.0, 1.0], [2], false);
    z.backward(Some(&seed)).unwrap();
    assert_eq!(x.grad_to_vec().unwrap(), vec![0.0, 4.0]);
}

#[test]
fn self_reassignment_chain() {
    let x = create_test_variable(vec![1.0_f32, 2.0, 3.0], [3], true);
    let mut y = x.clone();
    for _ in 0..2 {
        y = (&y + &y).unwrap();
    }
    y.backward(Some(&create_test_variable(vec![1.0, 1.0, 1.0], [3], false))).unwrap();
    assert_eq!(x.grad_to_vec().unwrap(), vec![4.0, 4.0, 4.0]);
    assert_eq!(y.to_vec().unwrap(), vec![4.0, 8.0, 12.0]);
}

#[test]
fn single_consumer_ops_match_finite_differences() {
    let a = create_test_variable(vec![1.5_f64, -0.75, 2.0, 0.6], [2, 2], true);
    let b = create_test_variable(vec![0.8_f64, 1.25, -1.5, 3.0], [2, 2], true);
    let g = create_test_variable(vec![1.0, -2.0, 0.5, 3.0], [2, 2], false);
    for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div] {
        check_grad(
            |xs| xs[0].elementwise(op, &xs[1], GradMode::Record),
            &[a.clone(), b.clone()],
            &g,
            1e-6,
            1e-5,
        )
        .unwrap_or_else(|e| panic!("{:?}: {}", op, e));
    }
}

#[test]
fn single_consumer_analytic_values() {
    let a = create_test_variable(vec![2.0_f64, 3.0], [2], true);
    let b = create_test_variable(vec![4.0_f64, -1.0], [2], true);
    let g = create_test_variable(vec![1.0, 2.0], [2], false);

    (&a / &b).unwrap().backward(Some(&g)).unwrap();
    let grad_a = grad_f64(&a);
    let grad_b = grad_f64(&b);
    assert_relative_eq!(grad_a[0], 0.25);
    assert_relative_eq!(grad_a[1], -2.0);
    assert_relative_eq!(grad_b[0], -0.125);
    assert_relative_eq!(grad_b[1], -6.0);
}

#[test]
fn leaf_backward_is_noop() {
    let x = create_test_variable(vec![1_i32, 2], [2], true);
    x.backward(Some(&create_test_variable(vec![5, 5], [2], false))).unwrap();
    assert_eq!(x.grad_to_vec().unwrap(), vec![0, 0]);
}

#[test]
fn scalar_seed_equals_explicit_one() {
    let run = |explicit: bool| {
        let x = create_test_variable(vec![0.5_f64, 1.5, -2.0], [3], true);
        let w = create_test_variable(vec![2.0_f64, -1.0, 4.0], [3], false);
        let loss = (&x * &w).unwrap().sum(GradMode::Record).unwrap();
        if explicit {
            loss.backward(Some(&Variable::scalar(1.0, false).unwrap())).unwrap();
        } else {
            loss.backward(None).unwrap();
        }
        x.grad_to_vec().unwrap()
    };
    assert_eq!(run(true), run(false));
    assert_eq!(run(false), vec![2.0, -1.0, 4.0]);
}

#[test]
fn defined_flag() {
    assert!(!Variable::<f32, 2>::default().is_defined());
    assert!(create_test_variable(vec![1.0_f32], [1], false).is_defined());
}

#[test]
fn multi_output_routing_through_shared_record() {
    let x = create_test_variable(vec![1.0_f64, 2.0, 3.0, 4.0, 5.0], [5], true);
    let (head, tail) = split_at_op(GradMode::Record, &x, 2).unwrap();
    let record = head.bprop().unwrap().clone();
    let head_sq = mul_op(GradMode::Record, &head, &head).unwrap();
    let loss = add_op(
        GradMode::Record,
        &sum_op(GradMode::Record, &head_sq).unwrap(),
        &sum_op(GradMode::Record, &tail).unwrap(),
    )
    .unwrap();
    loss.backward(None).unwrap();
    assert_eq!(record.state(), RecordState::Fired);
    assert_eq!(x.grad_to_vec().unwrap(), vec![2.0, 4.0, 1.0, 1.0, 1.0]);
}

#[test]
fn split_outputs_seeded_in_separate_passes() {
    let x = create_test_variable(vec![1.0_f64, 2.0, 3.0, 4.0], [4], true);
    let (head, tail) = split_at_op(GradMode::Record, &x, 2).unwrap();
    let record = head.bprop().unwrap().clone();

    head.backward(Some(&create_test_variable(vec![1.0, 1.0], [2], false))).unwrap();
    assert_eq!(record.state(), RecordState::Pending { received: 1, expected: 2 });
    assert_eq!(x.grad_to_vec().unwrap(), vec![0.0; 4]);

    tail.backward(Some(&create_test_variable(vec![5.0, 5.0], [2], false))).unwrap();
    assert_eq!(record.state(), RecordState::Fired);
    assert_eq!(x.grad_to_vec().unwrap(), vec![1.0, 1.0, 5.0, 5.0]);

    assert_eq!(
        tail.backward(Some(&create_test_variable(vec![1.0, 1.0], [2], false))),
        Err(GradFlowError::RecordAlreadyFired {
            op: "split_at".to_string()
        })
    );
}

#[test]
fn split_output_seed_joins_with_sibling_consumer() {
    let x = create_test_variable(vec![1.0_f64, 2.0, 3.0], [3], true);
    let (head, tail) = split_at_op(GradMode::Record, &x, 1).unwrap();
    head.backward(Some(&create_test_variable(vec![7.0], [1], false))).unwrap();
    sum_op(GradMode::Record, &tail).unwrap().backward(None).unwrap();
    assert_eq!(x.grad_to_vec().unwrap(), vec![7.0, 1.0, 1.0]);
}

#[test]
fn backward_through_consumed_intermediate_is_error() {
    let x = create_test_variable(vec![1.0_f64], [1], true);
    let y = (&x * &x).unwrap();
    let l1 = y.sum(GradMode::Record).unwrap();
    let l2 = (&y + &y).unwrap().sum(GradMode::Record).unwrap();
    l1.backward(None).unwrap();
    assert!(matches!(
        l2.backward(None),
        Err(GradFlowError::RecordAlreadyFired { .. })
    ));
    assert_eq!(x.grad_to_vec().unwrap(), vec![2.0]);
}

#[test]
fn no_grad_mode_builds_no_graph() {
    let x = create_test_variable(vec![1.0_f64, 2.0], [2], true);
    let y = x.elementwise(BinaryOp::Mul, &x, GradMode::NoGrad).unwrap();
    assert!(y.is_leaf());
    y.backward(Some(&create_test_variable(vec![1.0, 1.0], [2], false))).unwrap();
    assert_eq!(x.grad_to_vec().unwrap(), vec![0.0, 0.0]);
}

#[test]
fn accelerator_graph_matches_host_graph() {
    let host_x = create_test_variable(vec![0.5_f32, -1.0, 2.0], [3], true);
    let device_x = host_x.to::<Gpu>().unwrap();

    let host_loss = (&host_x * &host_x).unwrap().sum(GradMode::Record).unwrap();
    let device_loss = (&device_x * &device_x).unwrap().sum(GradMode::Record).unwrap();
    host_loss.backward(None).unwrap();
    device_loss.backward(None).unwrap();

    assert_eq!(host_x.grad_to_vec().unwrap(), device_x.grad_to_vec().unwrap());
    assert_eq!(device_x.to::<gradflow_core::Cpu>().unwrap().grad_to_vec().unwrap(), vec![1.0, -2.0, 4.0]);
}

#[test]
fn non_scalar_without_seed_is_error() {
    let x = create_test_variable(vec![1.0_f64, 2.0], [2], true);
    let y = (&x * &x).unwrap();
    assert_eq!(y.backward(None), Err(GradFlowError::BackwardNonScalar));
}
