/// Whether operations record backward information.
///
/// Kernels take the mode as an argument instead of reading a process-wide flag, so
/// two threads can build graphs in different modes at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GradMode {
    /// Outputs of operations with at least one input requiring gradients get a
    /// backward record.
    #[default]
    Record,
    /// Nothing is recorded; outputs are plain leaves.
    NoGrad,
}

impl GradMode {
    /// Returns true if an operation whose inputs have the given `requires_grad`
    /// flags must attach a backward record to its outputs.
    pub fn should_record(self, any_input_requires_grad: bool) -> bool {
        self == GradMode::Record && any_input_requires_grad
    }

    pub fn is_enabled(self) -> bool {
        self == GradMode::Record
    }
}
