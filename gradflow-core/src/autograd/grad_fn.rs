use super::backward_op::{BackwardOp, FnBackward};
use super::engine;
use crate::error::GradFlowError;
use crate::node::ErasedNode;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Observable progress of a record through a backward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Waiting for gradients: `received` of `expected` deliveries have arrived.
    Pending { received: usize, expected: usize },
    /// Backward has run. Further deliveries are rejected.
    Fired,
}

#[derive(Debug)]
struct GradFnState {
    grad_outputs: Vec<Option<ErasedNode>>,
    received: usize,
    expected: usize,
    fired: bool,
}

/// Backward record of one operation invocation.
///
/// Shared through `Arc` by every output of the operation. Holds the erased inputs
/// (keeping their buffers and upstream records alive), one gradient slot per output
/// and the [`BackwardOp`] computing the input gradients.
pub struct GradFn {
    op: Box<dyn BackwardOp>,
    inputs: Vec<ErasedNode>,
    num_outputs: usize,
    state: Mutex<GradFnState>,
}

impl fmt::Debug for GradFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradFn")
            .field("op", &self.op)
            .field("inputs", &self.inputs.len())
            .field("num_outputs", &self.num_outputs)
            .field("state", &self.state())
            .finish()
    }
}

impl GradFn {
    /// Creates a record for an operation with `num_outputs` outputs.
    ///
    /// Panics if `num_outputs` is zero.
    pub fn new(op: impl BackwardOp + 'static, inputs: Vec<ErasedNode>, num_outputs: usize) -> Arc<Self> {
        assert!(num_outputs > 0, "A backward record needs at least one output slot");
        Arc::new(GradFn {
            op: Box::new(op),
            inputs,
            num_outputs,
            state: Mutex::new(GradFnState {
                grad_outputs: vec![None; num_outputs],
                received: 0,
                expected: 0,
                fired: false,
            }),
        })
    }

    /// Creates a record whose backward computation is a closure.
    pub fn from_fn<F>(name: &'static str, inputs: Vec<ErasedNode>, num_outputs: usize, func: F) -> Arc<Self>
    where
        F: Fn(&[Option<ErasedNode>], &[ErasedNode]) -> Result<Vec<Option<ErasedNode>>, GradFlowError>
            + Send
            + Sync
            + 'static,
    {
        GradFn::new(FnBackward::new(name, func), inputs, num_outputs)
    }

    pub fn name(&self) -> &str {
        self.op.name()
    }

    pub fn inputs(&self) -> &[ErasedNode] {
        &self.inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    pub fn state(&self) -> RecordState {
        let state = self.lock();
        if state.fired {
            RecordState::Fired
        } else {
            RecordState::Pending {
                received: state.received,
                expected: state.expected,
            }
        }
    }

    pub fn is_fired(&self) -> bool {
        self.lock().fired
    }

    /// Starts a backward pass at this record, delivering `grad` to the output at
    /// `position`.
    pub fn backward(self: &Arc<Self>, grad: ErasedNode, position: usize) -> Result<(), GradFlowError> {
        engine::run_backward(self, grad, position)
    }

    /// Adds `additional` deliveries to wait for in the coming pass.
    ///
    /// A record that has not received anything yet gets fresh slots. A partly
    /// filled record keeps its slots and arrivals, so a join spread over several
    /// passes completes once. Fired records are left untouched.
    pub(crate) fn prepare(&self, additional: usize) {
        let mut state = self.lock();
        if state.fired {
            return;
        }
        if state.received == 0 {
            state.grad_outputs = vec![None; self.num_outputs];
        }
        state.expected = state.received + additional;
    }

    /// Deliveries a pass seeded at this record contributes to its join: one per
    /// output slot still waiting, or one when every output is already accounted for.
    pub(crate) fn outstanding_seeds(&self) -> usize {
        let received = self.lock().received;
        self.num_outputs.saturating_sub(received).max(1)
    }

    /// Accepts one delivery for the output at `position`.
    ///
    /// `grad` is summed into that output's slot when present; an absent gradient
    /// still counts as an arrival. Once every expected delivery has arrived the
    /// record fires and the input gradients are returned. Before that, and for
    /// records without inputs, `Ok(None)` is returned.
    ///
    /// # Errors
    /// `RecordAlreadyFired` if the record's backward already ran: the gradient
    /// would never reach the inputs.
    pub(crate) fn deliver(
        &self,
        grad: Option<ErasedNode>,
        position: usize,
    ) -> Result<Option<Vec<Option<ErasedNode>>>, GradFlowError> {
        if self.inputs.is_empty() {
            return Ok(None);
        }
        let grad_outputs = {
            let mut state = self.lock();
            if state.fired {
                return Err(GradFlowError::RecordAlreadyFired {
                    op: self.name().to_string(),
                });
            }
            if position >= self.num_outputs {
                return Err(GradFlowError::OutputPositionOutOfRange {
                    position,
                    outputs: self.num_outputs,
                });
            }
            state.received += 1;
            if let Some(grad) = grad {
                let slot = match state.grad_outputs[position].take() {
                    Some(previous) => previous.sum_with(&grad)?,
                    None => grad,
                };
                state.grad_outputs[position] = Some(slot);
            }
            if state.received < state.expected {
                return Ok(None);
            }
            state.fired = true;
            std::mem::take(&mut state.grad_outputs)
        };

        if grad_outputs.iter().all(Option::is_none) {
            log::trace!("'{}' fired without any incoming gradient", self.name());
            return Ok(Some(vec![None; self.inputs.len()]));
        }
        let grads = self.op.backward(&grad_outputs, &self.inputs)?;
        if grads.len() != self.inputs.len() {
            return Err(GradFlowError::GradientCountMismatch {
                op: self.name().to_string(),
                expected: self.inputs.len(),
                actual: grads.len(),
            });
        }
        Ok(Some(grads))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GradFnState> {
        self.state.lock().expect("Mutex poisoned")
    }
}

// Records of a long chain own each other through their inputs; releasing them one
// at a time keeps dropping the tail of the chain off the call stack.
impl Drop for GradFn {
    fn drop(&mut self) {
        let mut pending: Vec<Arc<GradFn>> = self.inputs.iter_mut().filter_map(|i| i.bprop.take()).collect();
        while let Some(record) = pending.pop() {
            if let Ok(mut record) = Arc::try_unwrap(record) {
                pending.extend(record.inputs.iter_mut().filter_map(|i| i.bprop.take()));
            }
        }
    }
}

#[cfg(test)]
#[path = "grad_fn_test.rs"]
mod tests;
