use thiserror::Error;

use crate::model::ModelError;

/// Agent errors surfaced to the caller of a run.
///
/// Everything that happens inside the loop is folded into the step outcome
/// stream or a terminal [`AgentResult`](super::AgentResult); only task
/// cancellation and bad input escape as errors.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Run was cancelled")]
    Cancelled,
    #[error("Instruction must not be empty")]
    InvalidInstruction,
}

/// Failure of a single role call.
#[derive(Error, Debug)]
pub enum RoleError {
    /// The model call itself did not complete.
    #[error("Model call failed: {0}")]
    Transport(#[from] ModelError),
    /// The model replied but the reply had no usable structure.
    #[error("Unparseable reply: {reason}")]
    Parse { reason: String, raw: String },
}

impl RoleError {
    pub(crate) fn parse(reason: impl Into<String>, raw: &str) -> Self {
        RoleError::Parse {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}
