//! Shared run state threaded through every phase of a step.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::actions::{Action, ActionType};

use super::memory::ConversationMemory;

/// Default window for the stuck-plan escalation check.
pub const DEFAULT_ERR_TO_MANAGER_THRESH: usize = 3;

/// Default cap on the installed-app list placed in prompts.
pub const DEFAULT_MAX_INSTALLED_APPS: usize = 50;

/// Critic verdict for one executed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeCode {
    /// Success: the action did what it was meant to.
    A,
    /// Partial or uncertain: something changed, but not as intended.
    B,
    /// Failure, invalid action, or nothing happened.
    C,
}

impl OutcomeCode {
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeCode::A)
    }

    /// Parse the first outcome letter in a critic reply.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim().trim_start_matches(['*', '"', '\'', '(', '[']);
        match trimmed.chars().next()?.to_ascii_uppercase() {
            'A' => Some(OutcomeCode::A),
            'B' => Some(OutcomeCode::B),
            'C' => Some(OutcomeCode::C),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OutcomeCode::A => "Successful",
            OutcomeCode::B => "Partially successful or wrong page",
            OutcomeCode::C => "Failed",
        }
    }
}

impl fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            OutcomeCode::A => "A",
            OutcomeCode::B => "B",
            OutcomeCode::C => "C",
        };
        f.write_str(letter)
    }
}

/// Mutable state of one instruction run.
///
/// Owned by the loop controller and lent to each role. The four history
/// vectors are index-aligned: an entry is opened in `action_history` and
/// `summary_history` when an action is committed, and closed in
/// `action_outcomes` and `error_descriptions` once its outcome is known.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub instruction: String,
    pub plan: String,
    pub completed_subgoal: String,
    pub skill_context: Option<String>,
    pub screen_width: u32,
    pub screen_height: u32,
    pub installed_apps: Vec<String>,

    pub action_history: Vec<Action>,
    pub summary_history: Vec<String>,
    pub action_outcomes: Vec<OutcomeCode>,
    pub error_descriptions: Vec<String>,

    pub error_flag_plan: bool,
    pub err_to_manager_thresh: usize,
    pub important_notes: String,

    pub last_action: Option<Action>,
    pub last_action_thought: String,
    pub last_summary: String,
    pub progress_status: String,

    pub executor_memory: ConversationMemory,
}

impl RunContext {
    pub fn new(instruction: impl Into<String>, executor_memory: ConversationMemory) -> Self {
        Self {
            instruction: instruction.into(),
            plan: String::new(),
            completed_subgoal: String::new(),
            skill_context: None,
            screen_width: 0,
            screen_height: 0,
            installed_apps: Vec::new(),
            action_history: Vec::new(),
            summary_history: Vec::new(),
            action_outcomes: Vec::new(),
            error_descriptions: Vec::new(),
            error_flag_plan: false,
            err_to_manager_thresh: DEFAULT_ERR_TO_MANAGER_THRESH,
            important_notes: String::new(),
            last_action: None,
            last_action_thought: String::new(),
            last_summary: String::new(),
            progress_status: String::new(),
            executor_memory,
        }
    }

    pub fn with_skill_context(mut self, skill_context: Option<String>) -> Self {
        self.skill_context = skill_context;
        self
    }

    pub fn with_err_to_manager_thresh(mut self, thresh: usize) -> Self {
        self.err_to_manager_thresh = thresh.max(1);
        self
    }

    /// Keep at most `cap` non-system app names, in the order given.
    pub fn set_installed_apps<I>(&mut self, apps: I, cap: usize)
    where
        I: IntoIterator<Item = crate::device::AppInfo>,
    {
        self.installed_apps = apps
            .into_iter()
            .filter(|app| !app.is_system)
            .map(|app| app.name)
            .take(cap)
            .collect();
    }

    /// Recompute `error_flag_plan`: true iff the last `err_to_manager_thresh`
    /// outcomes are all B or C.
    pub fn update_error_flag(&mut self) -> bool {
        self.error_flag_plan = false;
        let k = self.err_to_manager_thresh;
        if k > 0 && self.action_outcomes.len() >= k {
            let recent = &self.action_outcomes[self.action_outcomes.len() - k..];
            if recent.iter().all(|o| !o.is_success()) {
                self.error_flag_plan = true;
            }
        }
        self.error_flag_plan
    }

    /// The planner is skipped when the last action was unparseable and the
    /// plan is not flagged as stuck: the actor simply retries the same plan.
    pub fn should_skip_planner(&self) -> bool {
        !self.error_flag_plan
            && self
                .action_history
                .last()
                .map(|a| a.action_type() == ActionType::Invalid)
                .unwrap_or(false)
    }

    /// Open a history entry for a committed action. Its outcome is pending
    /// until [`RunContext::resolve_outcome`] closes it.
    pub fn begin_action(&mut self, action: Action, thought: &str, summary: &str) {
        self.action_history.push(action.clone());
        self.summary_history.push(summary.to_string());
        self.last_action = Some(action);
        self.last_action_thought = thought.to_string();
        self.last_summary = summary.to_string();
    }

    /// Close the pending history entry.
    pub fn resolve_outcome(&mut self, outcome: OutcomeCode, error_description: impl Into<String>) {
        debug_assert!(self.has_pending_outcome(), "no pending action to resolve");
        self.action_outcomes.push(outcome);
        self.error_descriptions.push(error_description.into());
        if outcome.is_success() {
            self.progress_status = if self.completed_subgoal.is_empty() {
                self.last_summary.clone()
            } else {
                format!("{} {}", self.completed_subgoal, self.last_summary)
            };
        }
    }

    /// Record a whole step in one go (invalid actions, declined confirmations).
    pub fn record_step(
        &mut self,
        action: Action,
        thought: &str,
        summary: &str,
        outcome: OutcomeCode,
        error_description: impl Into<String>,
    ) {
        self.begin_action(action, thought, summary);
        self.resolve_outcome(outcome, error_description);
    }

    pub fn has_pending_outcome(&self) -> bool {
        self.action_history.len() > self.action_outcomes.len()
    }

    /// All four history vectors have the same length.
    pub fn histories_aligned(&self) -> bool {
        let n = self.action_history.len();
        self.summary_history.len() == n
            && self.action_outcomes.len() == n
            && self.error_descriptions.len() == n
    }

    pub fn last_outcome(&self) -> Option<OutcomeCode> {
        self.action_outcomes.last().copied()
    }

    pub fn last_error_description(&self) -> Option<&str> {
        self.error_descriptions.last().map(|s| s.as_str())
    }

    pub fn step_count(&self) -> usize {
        self.action_history.len()
    }

    /// Numbered history of the most recent `limit` steps for prompts.
    pub fn recent_history(&self, limit: usize) -> String {
        let n = self.action_outcomes.len();
        let start = n.saturating_sub(limit);
        (start..n)
            .map(|i| {
                let outcome = self.action_outcomes[i];
                let mut line = format!(
                    "Step {}: {} | {} | Outcome: {}",
                    i + 1,
                    self.action_history[i].to_json_string(),
                    self.summary_history[i],
                    outcome.description()
                );
                if !outcome.is_success() {
                    line.push_str(&format!(" | Feedback: {}", self.error_descriptions[i]));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
