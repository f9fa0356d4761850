use thiserror::Error;

/// Errors raised by the power-estimation engine.
///
/// `InvalidParameter` aborts the offending scenario only, `DegenerateInput`
/// is absorbed inside the replicate loop per the estimator's policy, and
/// `DrawBudgetExhausted` is fatal for the whole sweep.
#[derive(Debug, Error)]
pub enum PowerError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("degenerate test input: {0}")]
    DegenerateInput(String),

    #[error("random draw budget exhausted after {attempts} attempts")]
    DrawBudgetExhausted { attempts: usize },
}

impl PowerError {
    /// Whether the error must abort the entire sweep rather than a single
    /// scenario.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PowerError::DrawBudgetExhausted { .. })
    }
}
