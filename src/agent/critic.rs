//! Critic role: judges the last action from before/after screenshots.

use crate::actions::Action;
use crate::config::critic_prompt;
use crate::device::Screenshot;
use crate::model::VisionModel;

use super::context::{OutcomeCode, RunContext};
use super::error::RoleError;
use super::reply::extract_section;

/// Error description recorded when the critic cannot be reached.
pub const CRITIC_CALL_FAILED: &str = "Critic model call failed; outcome could not be verified";

/// Parsed critic verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct CriticOutput {
    pub outcome: OutcomeCode,
    pub error_description: String,
}

pub fn parse_critic_reply(reply: &str) -> Result<CriticOutput, RoleError> {
    let outcome = extract_section(reply, "Outcome")
        .and_then(|text| OutcomeCode::parse(&text))
        .ok_or_else(|| RoleError::parse("missing or unknown ### Outcome ###", reply))?;

    let error_description = extract_section(reply, "Error Description")
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "None".to_string());

    Ok(CriticOutput {
        outcome,
        error_description,
    })
}

/// Compare the screens around `action` and classify the result.
pub async fn reflect(
    model: &dyn VisionModel,
    ctx: &RunContext,
    action: &Action,
    description: &str,
    before: &Screenshot,
    after: &Screenshot,
) -> Result<CriticOutput, RoleError> {
    let prompt = critic_prompt(ctx, action, description);
    let images = [before.base64_data.clone(), after.base64_data.clone()];
    let reply = model.predict(&prompt, &images).await?;
    let output = parse_critic_reply(&reply)?;
    tracing::debug!(outcome = %output.outcome, "Critic replied");
    Ok(output)
}
