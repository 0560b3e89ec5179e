//! Planner role: tracks completed subgoals and maintains the high-level plan.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::planner_prompt;
use crate::device::Screenshot;
use crate::model::VisionModel;

use super::context::RunContext;
use super::error::RoleError;
use super::reply::extract_section;

/// Plan text the planner writes when it sees a payment or credential screen.
pub const STOP_SENSITIVE: &str = "STOP_SENSITIVE";

/// `finished` alone, or followed by `. ! : , -` (optionally after spaces) or a line break.
static FINISHED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^finished(?:[ \t]*[.!:,\-]|[ \t]*$|[ \t]*\r?\n)")
        .expect("finished pattern is valid")
});

/// How the loop controller should treat a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerSignal {
    /// In-progress plan; hand it to the actor.
    Continue,
    /// The instruction is achieved.
    Finished,
    /// A sensitive page was detected; abort without retrying.
    StopSensitive,
}

/// Classify plan text. `STOP_SENSITIVE` anywhere wins over `Finished`.
pub fn classify_plan(plan: &str) -> PlannerSignal {
    if plan.to_uppercase().contains(STOP_SENSITIVE) {
        return PlannerSignal::StopSensitive;
    }
    if FINISHED_RE.is_match(plan.trim()) {
        return PlannerSignal::Finished;
    }
    PlannerSignal::Continue
}

/// Parsed planner reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerOutput {
    pub thought: String,
    pub completed_subgoal: String,
    pub plan: String,
}

impl PlannerOutput {
    pub fn signal(&self) -> PlannerSignal {
        classify_plan(&self.plan)
    }
}

/// Parse a planner reply. The `### Plan ###` section is mandatory.
pub fn parse_planner_reply(reply: &str) -> Result<PlannerOutput, RoleError> {
    let plan = extract_section(reply, "Plan")
        .filter(|p| !p.is_empty())
        .ok_or_else(|| RoleError::parse("missing ### Plan ### section", reply))?;

    let completed_subgoal = extract_section(reply, "Completed Subgoal")
        .or_else(|| extract_section(reply, "Historical Operations"))
        .unwrap_or_default();

    Ok(PlannerOutput {
        thought: extract_section(reply, "Thought").unwrap_or_default(),
        completed_subgoal,
        plan,
    })
}

/// Run the planner against the current screen.
pub async fn plan(
    model: &dyn VisionModel,
    ctx: &RunContext,
    screenshot: &Screenshot,
) -> Result<PlannerOutput, RoleError> {
    let prompt = planner_prompt(ctx);
    let reply = model
        .predict(&prompt, std::slice::from_ref(&screenshot.base64_data))
        .await?;
    let output = parse_planner_reply(&reply)?;
    tracing::debug!(plan = %output.plan, "Planner replied");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finished_signal_boundaries() {
        for text in [
            "Finished",
            "finished.",
            "Finished: app is open",
            "FINISHED!",
            "Finished - all done",
            "  finished  ",
            "Finished ,",
            "Finished\nAll subgoals are complete.",
        ] {
            assert_eq!(classify_plan(text), PlannerSignal::Finished, "{:?}", text);
        }

        for text in [
            "Finished it later",
            "Finishedness",
            "1. Open Spotify\n2. Finished",
            "Not finished yet",
            "",
        ] {
            assert_eq!(classify_plan(text), PlannerSignal::Continue, "{:?}", text);
        }
    }

    #[test]
    fn test_stop_sensitive_signal() {
        assert_eq!(classify_plan("STOP_SENSITIVE"), PlannerSignal::StopSensitive);
        assert_eq!(
            classify_plan("The page asks for a PIN: stop_sensitive"),
            PlannerSignal::StopSensitive
        );
        assert_eq!(
            classify_plan("Finished. STOP_SENSITIVE"),
            PlannerSignal::StopSensitive
        );
    }

    #[test]
    fn test_parse_planner_reply() {
        let reply = "### Thought ###\nSpotify is on the home screen.\n\n### Completed Subgoal ###\nNo completed subgoal.\n\n### Plan ###\n1. Open Spotify\n2. Play music";
        let output = parse_planner_reply(reply).unwrap();
        assert_eq!(output.thought, "Spotify is on the home screen.");
        assert_eq!(output.completed_subgoal, "No completed subgoal.");
        assert_eq!(output.plan, "1. Open Spotify\n2. Play music");
        assert_eq!(output.signal(), PlannerSignal::Continue);
    }

    #[test]
    fn test_parse_planner_reply_requires_plan() {
        assert!(matches!(
            parse_planner_reply("I think we are done"),
            Err(RoleError::Parse { .. })
        ));
        assert!(parse_planner_reply("### Plan ###\n\n").is_err());
    }
}
