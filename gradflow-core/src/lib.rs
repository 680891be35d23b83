//! # gradflow-core
//!
//! Reverse-mode automatic differentiation over typed, fixed-rank, strided
//! variables stored in host or (simulated) accelerator memory.
//!
//! ```
//! use gradflow_core::{variable, GradFlowError};
//!
//! # fn main() -> Result<(), GradFlowError> {
//! let x = variable(vec![1.0f64, 2.0], [2], true)?;
//! let y = (&x * &x)?;
//! let loss = y.sum(Default::default())?;
//! loss.backward(None)?;
//! assert_eq!(x.grad_to_vec()?, vec![2.0, 4.0]);
//! # Ok(())
//! # }
//! ```

pub mod autograd;
pub mod buffer;
pub mod device;
pub mod error;
pub mod node;
pub mod ops;
pub mod types;
pub mod utils;
pub mod variable;

pub use autograd::{BackwardOp, GradFn, GradMode, RecordState};
pub use buffer::{Backend, Cpu, Gpu, RawBuffer};
pub use device::StorageDevice;
pub use error::GradFlowError;
pub use node::ErasedNode;
pub use types::{DType, Element};
pub use variable::{full, ones, scalar, variable, zeros, BinaryOp, StridedView, Variable};

// Re-export traits required by public functions/structs
pub use num_traits;
