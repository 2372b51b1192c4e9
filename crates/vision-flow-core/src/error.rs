use thiserror::Error;

/// Errors raised by the flow, epipole and depth solvers.
///
/// Unreliable local estimates are never errors; they show up as low
/// confidence values. Only undefined arithmetic escalates here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    /// The linear system does not carry enough independent constraints.
    #[error("degenerate system: {0}")]
    DegenerateSystem(String),
    /// No pixel survived confidence / positivity filtering.
    #[error("empty result: {0}")]
    EmptyResult(String),
    /// Input arrays disagree on their dimensions.
    #[error("shape mismatch: expected {expected:?}, got {got:?} ({what})")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// The intrinsic matrix has no inverse.
    #[error("intrinsic matrix is not invertible")]
    SingularIntrinsics,
}

impl FlowError {
    /// Check that `got` matches `expected` for the named argument.
    pub fn check_shape(
        what: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    ) -> Result<(), FlowError> {
        if expected == got {
            Ok(())
        } else {
            Err(FlowError::ShapeMismatch {
                what,
                expected,
                got,
            })
        }
    }
}
