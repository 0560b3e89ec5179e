//! Actor role: turns the plan and the current screen into one concrete action.

use crate::actions::{parse_action, Action};
use crate::config::actor_step_prompt;
use crate::device::Screenshot;
use crate::model::VisionModel;

use super::context::RunContext;
use super::error::RoleError;
use super::reply::extract_section;

/// Parsed actor reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorOutput {
    pub thought: String,
    pub action: Action,
    pub description: String,
}

/// Parse an actor reply into an action.
pub fn parse_actor_reply(reply: &str) -> Result<ActorOutput, RoleError> {
    let action_text = extract_section(reply, "Action").unwrap_or_else(|| reply.to_string());
    let action =
        parse_action(&action_text).map_err(|e| RoleError::parse(e.to_string(), reply))?;

    let description = extract_section(reply, "Description")
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| action.to_string());

    Ok(ActorOutput {
        thought: extract_section(reply, "Thought").unwrap_or_default(),
        action,
        description,
    })
}

/// Run the actor on its stateful conversation channel.
///
/// The step prompt and screenshot are appended to the actor's memory before
/// the call. If the call does not complete the turn is rolled back so the
/// log never holds an unanswered user message; a reply that fails to parse
/// is still kept in the log.
pub async fn act(
    model: &dyn VisionModel,
    ctx: &mut RunContext,
    screenshot: &Screenshot,
) -> Result<ActorOutput, RoleError> {
    let prompt = actor_step_prompt(ctx);
    ctx.executor_memory
        .push_user(&prompt, Some(&screenshot.base64_data));

    let reply = match model.predict_with_context(ctx.executor_memory.messages()).await {
        Ok(reply) => reply,
        Err(e) => {
            ctx.executor_memory.rollback_unanswered();
            return Err(RoleError::Transport(e));
        }
    };
    ctx.executor_memory.push_assistant(&reply);

    let output = parse_actor_reply(&reply)?;
    tracing::debug!(action = %output.action, "Actor replied");
    Ok(output)
}
