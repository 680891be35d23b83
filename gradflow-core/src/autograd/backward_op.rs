use crate::error::GradFlowError;
use crate::node::ErasedNode;
use std::fmt;

/// Defines the interface for the backward pass of a differentiable operation.
///
/// An implementation is stored in the [`GradFn`](super::GradFn) attached to the
/// outputs of the operation. The trait requires `Debug + Send + Sync` because the
/// record is shared through `Arc` by every output and every downstream record
/// holding one of those outputs as an input.
pub trait BackwardOp: fmt::Debug + Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Computes the gradient of each input given the gradient of each output.
    ///
    /// # Arguments
    /// * `grad_outputs`: one slot per output of the operation, indexed by output
    ///   position. A slot is `None` when no gradient reached that output.
    /// * `inputs`: the operation's inputs, in forward order.
    ///
    /// # Returns
    /// One entry per input, in the same order as `inputs`. An entry is `None` when
    /// the input receives no gradient contribution. `Some` entries must have the
    /// shape, element type and backend of the corresponding input.
    fn backward(
        &self,
        grad_outputs: &[Option<ErasedNode>],
        inputs: &[ErasedNode],
    ) -> Result<Vec<Option<ErasedNode>>, GradFlowError>;
}

type BackwardFn =
    dyn Fn(&[Option<ErasedNode>], &[ErasedNode]) -> Result<Vec<Option<ErasedNode>>, GradFlowError> + Send + Sync;

/// A [`BackwardOp`] built from a closure.
pub struct FnBackward {
    name: &'static str,
    func: Box<BackwardFn>,
}

impl FnBackward {
    pub fn new<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(&[Option<ErasedNode>], &[ErasedNode]) -> Result<Vec<Option<ErasedNode>>, GradFlowError>
            + Send
            + Sync
            + 'static,
    {
        FnBackward {
            name,
            func: Box::new(func),
        }
    }
}

impl fmt::Debug for FnBackward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBackward").field("name", &self.name).finish()
    }
}

impl BackwardOp for FnBackward {
    fn name(&self) -> &str {
        self.name
    }

    fn backward(
        &self,
        grad_outputs: &[Option<ErasedNode>],
        inputs: &[ErasedNode],
    ) -> Result<Vec<Option<ErasedNode>>, GradFlowError> {
        (self.func)(grad_outputs, inputs)
    }
}
