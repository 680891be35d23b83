//! Finite-difference verification of analytical gradients.

use crate::buffer::Cpu;
use crate::error::GradFlowError;
use crate::variable::Variable;
use thiserror::Error;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check failed for input {input_index}, element {element_index}: analytical {analytical_grad:?} != numerical {numerical_grad:?} (difference {difference:?})")]
    GradientMismatch {
        input_index: usize,
        element_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },
    #[error("Forward function execution failed during gradient check: {0}")]
    ForwardPassError(GradFlowError),
    #[error("Backward pass execution failed during gradient check: {0}")]
    BackwardPassError(GradFlowError),
    #[error("Variable error during intermediate calculation: {0}")]
    VariableError(GradFlowError),
    #[error("Numerical gradient is NaN or infinite for input {input_index}, element {element_index} (loss+ {loss_plus:?}, loss- {loss_minus:?})")]
    NumericalGradNaNOrInfinite {
        input_index: usize,
        element_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },
    #[error("Analytical gradient is NaN or infinite for input {input_index}, element {element_index}: {value:?}")]
    AnalyticalGradNaNOrInfinite {
        input_index: usize,
        element_index: usize,
        value: f64,
    },
    #[error("Gradient check input {input_index} must be a leaf (no backward record)")]
    InputNotLeaf { input_index: usize },
    #[error("Function did not propagate requires_grad correctly.")]
    RequiresGradPropagationError,
    #[error("Output gradient shape {actual:?} does not match output shape {expected:?}")]
    OutputGradShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },
}

impl From<GradFlowError> for GradCheckError {
    fn from(err: GradFlowError) -> Self {
        GradCheckError::VariableError(err)
    }
}

/// Checks analytical gradients against central finite differences.
///
/// The scalar being differentiated is `L = Σ func(inputs) · output_grad`, whose
/// gradient with respect to each input is exactly what a backward pass seeded with
/// `output_grad` accumulates. Every element of every input with `requires_grad` is
/// perturbed by `±epsilon`. A gradient passes if its absolute or relative difference
/// is within `tolerance`.
///
/// The inputs' gradient buffers are zeroed before the backward pass and hold the
/// analytical gradients afterwards.
pub fn check_grad<F, const R: usize, const O: usize>(
    func: F,
    inputs: &[Variable<f64, R, Cpu>],
    output_grad: &Variable<f64, O, Cpu>,
    epsilon: f64,
    tolerance: f64,
) -> Result<(), GradCheckError>
where
    F: Fn(&[Variable<f64, R, Cpu>]) -> Result<Variable<f64, O, Cpu>, GradFlowError>,
{
    for (i, input) in inputs.iter().enumerate() {
        if !input.is_leaf() {
            return Err(GradCheckError::InputNotLeaf { input_index: i });
        }
        if input.requires_grad() {
            input.zero_grad()?;
        }
    }

    let output = func(inputs).map_err(GradCheckError::ForwardPassError)?;
    if output.shape() != output_grad.shape() {
        return Err(GradCheckError::OutputGradShapeMismatch {
            expected: output.shape().to_vec(),
            actual: output_grad.shape().to_vec(),
        });
    }
    if inputs.iter().any(|t| t.requires_grad()) && !output.requires_grad() {
        return Err(GradCheckError::RequiresGradPropagationError);
    }
    output
        .backward(Some(output_grad))
        .map_err(GradCheckError::BackwardPassError)?;

    let weights = output_grad.to_vec()?;

    for (i, original) in inputs.iter().enumerate() {
        if !original.requires_grad() {
            continue;
        }
        let analytical = original.grad_to_vec()?;
        let values = original.to_vec()?;

        for (elem_idx, &analytical_grad) in analytical.iter().enumerate() {
            let loss_at = |delta: f64| -> Result<f64, GradCheckError> {
                let mut perturbed_values = values.clone();
                perturbed_values[elem_idx] += delta;
                let perturbed = Variable::from_vec(perturbed_values, original.shape(), true)?;
                let mut perturbed_inputs = inputs.to_vec();
                perturbed_inputs[i] = perturbed;
                let out = func(&perturbed_inputs).map_err(GradCheckError::ForwardPassError)?;
                Ok(out.to_vec()?.iter().zip(&weights).map(|(o, w)| o * w).sum())
            };
            let loss_plus = loss_at(epsilon)?;
            let loss_minus = loss_at(-epsilon)?;
            let numerical_grad = (loss_plus - loss_minus) / (2.0 * epsilon);

            if !numerical_grad.is_finite() {
                return Err(GradCheckError::NumericalGradNaNOrInfinite {
                    input_index: i,
                    element_index: elem_idx,
                    loss_plus,
                    loss_minus,
                });
            }
            if !analytical_grad.is_finite() {
                return Err(GradCheckError::AnalyticalGradNaNOrInfinite {
                    input_index: i,
                    element_index: elem_idx,
                    value: analytical_grad,
                });
            }

            let difference = (analytical_grad - numerical_grad).abs();
            if difference > tolerance && difference / (analytical_grad.abs() + epsilon) > tolerance {
                return Err(GradCheckError::GradientMismatch {
                    input_index: i,
                    element_index: elem_idx,
                    analytical_grad,
                    numerical_grad,
                    difference,
                });
            }
        }
    }
    log::debug!("Gradient check passed for {} inputs", inputs.len());
    Ok(())
}

#[cfg(test)]
#[path = "grad_check_test.rs"]
mod tests;
