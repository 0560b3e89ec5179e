//! Prompt templates for the planner, actor, critic and note-taker roles.

use chrono::Local;

use crate::actions::Action;
use crate::agent::RunContext;

/// Number of past steps quoted back to the planner.
const PLANNER_HISTORY_STEPS: usize = 5;

/// Today's date as shown to the models.
fn formatted_date() -> String {
    Local::now().format("%A, %B %d, %Y").to_string()
}

fn installed_apps_line(ctx: &RunContext) -> String {
    if ctx.installed_apps.is_empty() {
        "Unknown".to_string()
    } else {
        ctx.installed_apps.join(", ")
    }
}

/// Planner prompt: decide what has been achieved and what comes next.
pub fn planner_prompt(ctx: &RunContext) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are an agent who can operate a phone on behalf of a user. \
         Your goal is to track progress and devise high-level plans to achieve the user's request.\n\n",
    );
    prompt.push_str(&format!("### Date ###\n{}\n\n", formatted_date()));
    prompt.push_str(&format!("### User Request ###\n{}\n\n", ctx.instruction));

    if let Some(skill) = &ctx.skill_context {
        prompt.push_str(&format!(
            "### Suggested Procedure ###\nA known shortcut may apply. Use it if it fits the current screen:\n{}\n\n",
            skill
        ));
    }

    if ctx.plan.is_empty() {
        prompt.push_str(&format!(
            "### Installed Apps ###\n{}\n\n\
             ---\n\
             Make a high-level plan to achieve the user's request. If the request is complex, \
             break it down into subgoals. The screenshot displays the starting state of the phone.\n\
             If this page asks for payment, passwords or other credentials, output STOP_SENSITIVE as the plan.\n\n",
            installed_apps_line(ctx)
        ));
    } else {
        prompt.push_str(&format!(
            "### Current Plan ###\n{}\n\n### Previous Subgoal ###\n{}\n\n",
            ctx.plan,
            if ctx.completed_subgoal.is_empty() {
                "No completed subgoal."
            } else {
                ctx.completed_subgoal.as_str()
            }
        ));

        let history = ctx.recent_history(PLANNER_HISTORY_STEPS);
        if !history.is_empty() {
            prompt.push_str(&format!("### Recent Actions ###\n{}\n\n", history));
        }

        if let (Some(action), Some(outcome)) = (&ctx.last_action, ctx.last_outcome()) {
            prompt.push_str(&format!(
                "### Last Action ###\n{}\nExpectation: {}\nOutcome: {}\n\n",
                action.to_json_string(),
                ctx.last_summary,
                outcome.description()
            ));
        }

        if !ctx.important_notes.is_empty() {
            prompt.push_str(&format!("### Important Notes ###\n{}\n\n", ctx.important_notes));
        }

        if ctx.error_flag_plan {
            prompt.push_str(&format!(
                "### Potentially Stuck! ###\n\
                 You have encountered several failed attempts in a row. Recent feedback: {}\n\
                 Consider a different approach or revise the plan.\n\n",
                ctx.last_error_description().unwrap_or("None")
            ));
        }

        prompt.push_str(
            "---\n\
             Carefully assess the current status and the screenshot. Check whether the current plan \
             needs revision. If all subgoals are done and the request is satisfied, write \"Finished\" \
             as the plan. If the screen asks for payment, passwords or other credentials, write \
             STOP_SENSITIVE as the plan. If you are stuck, try an alternative route.\n\n",
        );
    }

    prompt.push_str(
        "Provide your output in the following format, which contains three parts:\n\
         ### Thought ###\n\
         A detailed explanation of your rationale for the plan and subgoals.\n\n\
         ### Completed Subgoal ###\n\
         The subgoals that have been completed so far, or \"No completed subgoal.\"\n\n\
         ### Plan ###\n\
         The numbered list of remaining subgoals, or \"Finished\".",
    );

    prompt
}

/// System prompt seeding the actor's conversation memory.
pub fn actor_system_prompt(instruction: &str) -> String {
    format!(
        "Today's date is: {}\n\
         You are a GUI agent operating a phone to accomplish this request from the user: \"{}\"\n\n\
         On every turn you receive the plan and the current screenshot, and you choose exactly one action.\n\
         Coordinates are normalized to [0, 999] along each axis (0 is the left/top edge, 999 the right/bottom edge).\n\n\
         Available actions (JSON):\n\
         - {{\"action\": \"click\", \"coordinate\": [x, y]}}\n\
         - {{\"action\": \"double_tap\", \"coordinate\": [x, y]}}\n\
         - {{\"action\": \"long_press\", \"coordinate\": [x, y]}}\n\
         - {{\"action\": \"swipe\", \"coordinate\": [x1, y1], \"coordinate2\": [x2, y2]}}\n\
         - {{\"action\": \"type\", \"text\": \"...\"}}  (the input box must be focused first)\n\
         - {{\"action\": \"system_button\", \"button\": \"Back\" | \"Home\" | \"Enter\"}}\n\
         - {{\"action\": \"open_app\", \"text\": \"app name\"}}\n\
         - {{\"action\": \"wait\", \"duration\": seconds}}\n\
         - {{\"action\": \"answer\", \"text\": \"...\"}}  (only when the request is a question)\n\
         - {{\"action\": \"take_over\", \"message\": \"why a human is needed\"}}  (logins, captchas)\n\n\
         For a tap that pays, deletes, sends or otherwise cannot be undone, add \"message\" describing it \
         or \"need_confirm\": true so the user can approve it first.\n\n\
         Reply in exactly this format:\n\
         ### Thought ###\n\
         Your reasoning for the chosen action.\n\n\
         ### Action ###\n\
         One JSON object from the list above.\n\n\
         ### Description ###\n\
         A short description of the action and its expected outcome.",
        formatted_date(),
        instruction
    )
}

/// Per-step user message for the actor.
pub fn actor_step_prompt(ctx: &RunContext) -> String {
    let mut prompt = format!(
        "### Overall Plan ###\n{}\n\n### Progress So Far ###\n{}\n\n",
        ctx.plan,
        if ctx.completed_subgoal.is_empty() {
            "Nothing completed yet. Work on the first item of the plan."
        } else {
            ctx.completed_subgoal.as_str()
        }
    );

    prompt.push_str(&format!(
        "### Screen ###\n{}x{} pixels\n\n",
        ctx.screen_width, ctx.screen_height
    ));

    if let Some(skill) = &ctx.skill_context {
        prompt.push_str(&format!("### Suggested Procedure ###\n{}\n\n", skill));
    }

    if !ctx.important_notes.is_empty() {
        prompt.push_str(&format!("### Important Notes ###\n{}\n\n", ctx.important_notes));
    }

    if let (Some(action), Some(outcome)) = (&ctx.last_action, ctx.last_outcome()) {
        if !outcome.is_success() {
            prompt.push_str(&format!(
                "### Last Action Feedback ###\nYour last action {} did not succeed ({}): {}\n\n",
                action.to_json_string(),
                outcome.description(),
                ctx.last_error_description().unwrap_or("None")
            ));
        }
    }

    prompt.push_str("Decide the single next action for the screenshot below.");
    prompt
}

/// Critic prompt: judge an action from the before/after screenshots.
pub fn critic_prompt(ctx: &RunContext, action: &Action, description: &str) -> String {
    format!(
        "You are an agent who can operate a phone on behalf of a user. \
         Your goal is to verify whether the last action produced the expected behavior and to keep track of the overall progress.\n\n\
         ### User Request ###\n{}\n\n\
         ### Progress Status ###\n{}\n\n\
         ### Screen Information ###\n\
         The attached images are two phone screenshots taken before and after your last action, both {}x{} pixels.\n\n\
         ### Latest Action ###\n\
         Action: {}\nExpectation: {}\n\n\
         ---\n\
         Carefully examine the two screenshots to determine whether the last action achieved the expected result. \
         If the action involved typing text, check that the text now appears on screen.\n\n\
         Provide your output in the following format containing two parts:\n\
         ### Outcome ###\n\
         Choose from the following options. Give your answer as \"A\", \"B\" or \"C\":\n\
         A: Successful. The result of the last action meets the expectation.\n\
         B: Partially successful or uncertain. The screen changed, but not clearly as expected (for example a wrong page).\n\
         C: Failed. The last action produced no change or an error.\n\n\
         ### Error Description ###\n\
         If the action failed, describe the error and its likely cause. Put \"None\" for a successful action.",
        ctx.instruction,
        if ctx.progress_status.is_empty() {
            "No progress yet."
        } else {
            ctx.progress_status.as_str()
        },
        ctx.screen_width,
        ctx.screen_height,
        action.to_json_string(),
        description
    )
}

/// Note-taker prompt: pull durable facts off the current screen.
pub fn notetaker_prompt(ctx: &RunContext) -> String {
    format!(
        "You are a helpful AI assistant for operating mobile phones. \
         Your goal is to take notes of important content relevant to the user's request.\n\n\
         ### User Request ###\n{}\n\n\
         ### Overall Plan ###\n{}\n\n\
         ### Existing Notes ###\n{}\n\n\
         ---\n\
         Carefully examine the screenshot. If it shows content relevant to the user's request \
         (prices, names, times, confirmation numbers), record it. Keep the existing notes that are still \
         relevant and do not record anything unrelated.\n\n\
         Provide your output in the following format:\n\
         ### Important Notes ###\n\
         The updated notes, or \"None\" if there is nothing worth keeping.",
        ctx.instruction,
        ctx.plan,
        if ctx.important_notes.is_empty() {
            "None"
        } else {
            ctx.important_notes.as_str()
        }
    )
}
