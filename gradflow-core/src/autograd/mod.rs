//! # Reverse-mode automatic differentiation
//!
//! Every differentiable operation that records itself attaches a [`GradFn`] to its
//! outputs. A `GradFn` owns the erased inputs of the operation and a
//! [`BackwardOp`] that turns the gradients of the outputs into gradients of the
//! inputs. [`Variable::backward`](crate::variable::Variable::backward) walks these
//! records from the seeded output towards the leaves (see [`engine`]).

pub mod backward_op;
pub(crate) mod engine;
pub mod grad_check;
pub mod grad_fn;
pub mod mode;

pub use backward_op::{BackwardOp, FnBackward};
pub use grad_fn::{GradFn, RecordState};
pub use mode::GradMode;
