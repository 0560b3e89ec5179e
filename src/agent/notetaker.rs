//! Note-taker role: keeps task-relevant facts seen on screen.

use crate::config::notetaker_prompt;
use crate::device::Screenshot;
use crate::model::VisionModel;

use super::context::RunContext;
use super::error::RoleError;
use super::reply::extract_section;

/// Extract the updated notes. `None` (any case) means no notes.
pub fn parse_notes_reply(reply: &str) -> Result<String, RoleError> {
    let notes = extract_section(reply, "Important Notes")
        .ok_or_else(|| RoleError::parse("missing ### Important Notes ###", reply))?;
    if notes.eq_ignore_ascii_case("none") {
        return Ok(String::new());
    }
    Ok(notes)
}

/// Ask the note-taker for an updated set of notes.
pub async fn take_notes(
    model: &dyn VisionModel,
    ctx: &RunContext,
    screenshot: &Screenshot,
) -> Result<String, RoleError> {
    let prompt = notetaker_prompt(ctx);
    let reply = model
        .predict(&prompt, std::slice::from_ref(&screenshot.base64_data))
        .await?;
    parse_notes_reply(&reply)
}
