//! Backward pass driver.
//!
//! A pass runs in two phases:
//!
//! 1. **Fan-in count.** Starting at the seeded record, every record reachable
//!    through `bprop` links is visited once and told how many deliveries to wait
//!    for: one per input edge pointing at it from another reachable record. The
//!    root also waits for its seeds: one for a single-output record, one per output
//!    slot still empty for a multi-output record, so its siblings can be seeded by
//!    later passes. Consumers that are not reachable from the seed are not counted,
//!    so they never hold a record back. A record partly filled by an earlier pass
//!    keeps what it received.
//! 2. **Propagation.** Deliveries are processed from an explicit LIFO worklist.
//!    When a record fires, each input with `requires_grad` has its gradient
//!    accumulated, and every input produced by another record forwards a delivery
//!    to it. Depth is bounded by the heap, not the call stack.
//!
//! Records already fired in an earlier pass are skipped during counting. A delivery
//! reaching one fails the pass with `RecordAlreadyFired`.

use super::grad_fn::GradFn;
use crate::error::GradFlowError;
use crate::node::ErasedNode;
use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

struct Delivery {
    record: Arc<GradFn>,
    grad: Option<ErasedNode>,
    position: usize,
}

pub(crate) fn run_backward(root: &Arc<GradFn>, seed: ErasedNode, position: usize) -> Result<(), GradFlowError> {
    let counted = count_fan_in(root);
    debug!("Backward pass from '{}': {} records to visit", root.name(), counted);

    let mut worklist = vec![Delivery {
        record: Arc::clone(root),
        grad: Some(seed),
        position,
    }];
    let mut fired = 0usize;

    while let Some(delivery) = worklist.pop() {
        let Some(grads) = delivery.record.deliver(delivery.grad, delivery.position)? else {
            continue;
        };
        fired += 1;
        trace!(
            "'{}' fired, propagating to {} inputs",
            delivery.record.name(),
            delivery.record.inputs().len()
        );

        // Pushed in reverse so that input 0 is processed first.
        for (input, grad) in delivery.record.inputs().iter().zip(grads).rev() {
            if let Some(g) = &grad {
                input.check_same_kind(g, delivery.record.name())?;
                if input.requires_grad {
                    input.accumulate_grad(g)?;
                }
            }
            if let Some(bprop) = &input.bprop {
                worklist.push(Delivery {
                    record: Arc::clone(bprop),
                    grad,
                    position: input.out_position,
                });
            }
        }
    }

    debug!("Backward pass from '{}' done: {} records fired", root.name(), fired);
    Ok(())
}

/// Adds this pass's deliveries to the join of every record reachable from `root`
/// and returns how many records were prepared.
fn count_fan_in(root: &Arc<GradFn>) -> usize {
    let mut counts: HashMap<*const GradFn, (Arc<GradFn>, usize)> = HashMap::new();
    let mut visited: HashSet<*const GradFn> = HashSet::new();
    let mut stack = vec![Arc::clone(root)];

    counts.insert(Arc::as_ptr(root), (Arc::clone(root), root.outstanding_seeds()));
    visited.insert(Arc::as_ptr(root));

    while let Some(record) = stack.pop() {
        if record.is_fired() {
            continue;
        }
        for input in record.inputs() {
            let Some(bprop) = &input.bprop else {
                continue;
            };
            let key = Arc::as_ptr(bprop);
            counts.entry(key).or_insert_with(|| (Arc::clone(bprop), 0)).1 += 1;
            if visited.insert(key) {
                stack.push(Arc::clone(bprop));
            }
        }
    }

    for (record, additional) in counts.values() {
        record.prepare(*additional);
    }
    counts.len()
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
