//! MobileAgent: the loop controller orchestrating the planner, actor,
//! critic and note-taker roles against a device.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::actions::{Action, ActionExecutor, ActionKind};
use crate::config::actor_system_prompt;
use crate::device::{AppInventory, DeviceController, Screenshot};
use crate::model::VisionModel;
use crate::skills::{normalize_advisory, NoSkills, SkillMatcher};
use crate::surface::StatusSurface;

use super::actor::{self, ActorOutput};
use super::context::{
    OutcomeCode, RunContext, DEFAULT_ERR_TO_MANAGER_THRESH, DEFAULT_MAX_INSTALLED_APPS,
};
use super::critic::{self, CRITIC_CALL_FAILED};
use super::error::{AgentError, RoleError};
use super::memory::{ConversationMemory, DEFAULT_MAX_TURNS};
use super::notetaker;
use super::planner::{self, PlannerSignal};
use super::status::{
    LogLevel, LoopState, StatusSnapshot, StepLogEntry, DEFAULT_STEP_LOG_CAPACITY,
};

/// Default step budget of a run.
pub const DEFAULT_MAX_STEPS: u32 = 25;

/// Default pause after an action before the result is captured.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;

/// Error description of an actor reply that could not be parsed.
pub const INVALID_ACTION_FORMAT: &str = "Invalid action format";

/// Error description of an action the human declined.
pub const USER_CANCELLED: &str = "User cancelled";

const SENSITIVE_PAGE_PROMPT: &str =
    "The screen could not be captured and may show a payment or password page. Continue the task?";

/// Configuration for the MobileAgent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum number of steps before stopping.
    pub max_steps: u32,
    /// Run the note-taker after successful actions.
    pub use_notetaker: bool,
    /// Consecutive non-success outcomes that flag the plan as stuck.
    pub err_to_manager_thresh: usize,
    /// Pause after an action so the UI can settle.
    pub settle_delay_ms: u64,
    /// Cap on app names shown to the planner.
    pub max_installed_apps: usize,
    /// User/assistant turns kept in the actor's memory.
    pub max_memory_turns: usize,
    /// Entries kept in the status step log.
    pub step_log_capacity: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            use_notetaker: false,
            err_to_manager_thresh: DEFAULT_ERR_TO_MANAGER_THRESH,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            max_installed_apps: DEFAULT_MAX_INSTALLED_APPS,
            max_memory_turns: DEFAULT_MAX_TURNS,
            step_log_capacity: DEFAULT_STEP_LOG_CAPACITY,
        }
    }
}

impl AgentConfig {
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_notetaker(mut self, enabled: bool) -> Self {
        self.use_notetaker = enabled;
        self
    }

    pub fn with_err_to_manager_thresh(mut self, thresh: usize) -> Self {
        self.err_to_manager_thresh = thresh;
        self
    }

    pub fn with_settle_delay_ms(mut self, delay_ms: u64) -> Self {
        self.settle_delay_ms = delay_ms;
        self
    }

    pub fn with_max_installed_apps(mut self, cap: usize) -> Self {
        self.max_installed_apps = cap;
        self
    }

    pub fn with_max_memory_turns(mut self, turns: usize) -> Self {
        self.max_memory_turns = turns;
        self
    }

    pub fn with_step_log_capacity(mut self, capacity: usize) -> Self {
        self.step_log_capacity = capacity.max(1);
        self
    }
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResult {
    pub success: bool,
    pub message: String,
    /// Reply text when the instruction was a question.
    pub answer: Option<String>,
    pub state: LoopState,
    /// Steps started before the run ended.
    pub steps: u32,
}

impl AgentResult {
    fn completed(message: impl Into<String>, steps: u32) -> Self {
        Self {
            success: true,
            message: message.into(),
            answer: None,
            state: LoopState::Completed,
            steps,
        }
    }

    fn answered(answer: String, steps: u32) -> Self {
        Self {
            answer: Some(answer.clone()),
            ..Self::completed(answer, steps)
        }
    }

    fn ended(state: LoopState, message: impl Into<String>, steps: u32) -> Self {
        Self {
            success: false,
            message: message.into(),
            answer: None,
            state,
            steps,
        }
    }
}

/// User stop request, checked whenever the loop awaits.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopSignal {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    async fn stopped(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

/// Cloneable control and observation handle for a [`MobileAgent`].
#[derive(Debug, Clone)]
pub struct AgentHandle {
    stop: StopSignal,
    cancel: CancellationToken,
    status: watch::Receiver<StatusSnapshot>,
}

impl AgentHandle {
    /// Ask the running task to stop; the run ends with [`LoopState::Stopped`].
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Cancel the task; the run returns [`AgentError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.clone()
    }

    /// Latest status snapshot.
    pub fn status(&self) -> StatusSnapshot {
        self.status.borrow().clone()
    }
}

enum Interrupt {
    Stopped,
    Cancelled,
}

enum StepFlow {
    Continue,
    Finish(AgentResult),
}

/// Multi-role agent driving a device toward a natural-language instruction.
pub struct MobileAgent {
    model: Arc<dyn VisionModel>,
    device: Arc<dyn DeviceController>,
    inventory: Arc<dyn AppInventory>,
    surface: Arc<dyn StatusSurface>,
    skills: Arc<dyn SkillMatcher>,
    executor: ActionExecutor,
    config: AgentConfig,
    stop: StopSignal,
    cancel: CancellationToken,
    status: watch::Sender<StatusSnapshot>,
    last_context: Option<RunContext>,
}

impl MobileAgent {
    pub fn new(
        model: Arc<dyn VisionModel>,
        device: Arc<dyn DeviceController>,
        inventory: Arc<dyn AppInventory>,
        surface: Arc<dyn StatusSurface>,
        config: AgentConfig,
    ) -> Self {
        let executor = ActionExecutor::new(device.clone(), inventory.clone());
        let (status, _) = watch::channel(StatusSnapshot::default());
        Self {
            model,
            device,
            inventory,
            surface,
            skills: Arc::new(NoSkills),
            executor,
            config,
            stop: StopSignal::default(),
            cancel: CancellationToken::new(),
            status,
            last_context: None,
        }
    }

    pub fn with_skills(mut self, skills: Arc<dyn SkillMatcher>) -> Self {
        self.skills = skills;
        self
    }

    /// Tie the agent to an externally owned cancellation token.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn handle(&self) -> AgentHandle {
        AgentHandle {
            stop: self.stop.clone(),
            cancel: self.cancel.clone(),
            status: self.status.subscribe(),
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.borrow().clone()
    }

    /// Run state of the most recent run, kept for inspection.
    pub fn last_context(&self) -> Option<&RunContext> {
        self.last_context.as_ref()
    }

    /// Run with the configured step budget and note-taker setting.
    pub async fn run(&mut self, instruction: &str) -> Result<AgentResult, AgentError> {
        let (max_steps, use_notetaker) = (self.config.max_steps, self.config.use_notetaker);
        self.run_instruction(instruction, max_steps, use_notetaker)
            .await
    }

    /// Drive the device until the instruction is finished, answered,
    /// stopped, aborted, or `max_steps` runs out.
    ///
    /// Overlay cleanup runs on every exit, including cancellation.
    pub async fn run_instruction(
        &mut self,
        instruction: &str,
        max_steps: u32,
        use_notetaker: bool,
    ) -> Result<AgentResult, AgentError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(AgentError::InvalidInstruction);
        }
        if self.cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        self.stop.reset();
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id);
        self.status
            .send_replace(StatusSnapshot::started(run_id, instruction, max_steps));
        span.in_scope(|| tracing::info!(instruction, max_steps, use_notetaker, "Starting run"));

        let memory = ConversationMemory::new(&actor_system_prompt(instruction))
            .with_max_turns(self.config.max_memory_turns);
        let mut ctx = RunContext::new(instruction, memory)
            .with_err_to_manager_thresh(self.config.err_to_manager_thresh);

        let outcome = self
            .drive(&mut ctx, max_steps, use_notetaker)
            .instrument(span.clone())
            .await;

        self.cleanup().instrument(span.clone()).await;
        let steps = self.status.borrow().current_step;
        self.last_context = Some(ctx);

        let result = match outcome {
            Ok(result) => result,
            Err(Interrupt::Stopped) => {
                AgentResult::ended(LoopState::Stopped, "Stopped by user", steps)
            }
            Err(Interrupt::Cancelled) => {
                span.in_scope(|| tracing::warn!(steps, "Run cancelled"));
                self.publish(|s| s.finish(LoopState::Failed, "Cancelled"));
                return Err(AgentError::Cancelled);
            }
        };

        span.in_scope(|| {
            tracing::info!(state = result.state.as_str(), steps, "Run finished: {}", result.message)
        });
        let level = if result.success {
            LogLevel::Success
        } else {
            LogLevel::Warning
        };
        let capacity = self.config.step_log_capacity;
        self.publish(|s| {
            s.push_log(StepLogEntry::new(steps, level, result.message.clone()), capacity);
            s.finish(result.state, result.message.clone());
        });
        Ok(result)
    }

    async fn drive(
        &self,
        ctx: &mut RunContext,
        max_steps: u32,
        use_notetaker: bool,
    ) -> Result<AgentResult, Interrupt> {
        let advisory = self.guard(self.skills.generate_context(&ctx.instruction)).await?;
        ctx.skill_context = normalize_advisory(advisory);
        if let Some(skill) = &ctx.skill_context {
            self.log(0, LogLevel::Info, format!("Skill advisory: {}", skill));
        }

        let apps = self.guard(self.inventory.list_apps()).await?;
        ctx.set_installed_apps(apps, self.config.max_installed_apps);

        self.guard(self.surface.show(&format!("Task: {}", ctx.instruction)))
            .await?;

        for step in 1..=max_steps {
            self.publish(|s| s.current_step = step);
            let flow = self
                .run_step(ctx, step, use_notetaker)
                .instrument(tracing::debug_span!("step", step))
                .await?;
            if let StepFlow::Finish(result) = flow {
                return Ok(result);
            }
            debug_assert!(ctx.histories_aligned());
        }

        Ok(AgentResult::ended(
            LoopState::MaxStepsReached,
            format!("Max steps ({}) reached", max_steps),
            max_steps,
        ))
    }

    async fn run_step(
        &self,
        ctx: &mut RunContext,
        step: u32,
        use_notetaker: bool,
    ) -> Result<StepFlow, Interrupt> {
        // Observe
        let before = self.capture().await?;
        let (width, height) = match self.guard(self.device.screen_size()).await? {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!("Screen size query failed, using screenshot size: {}", e);
                (before.width, before.height)
            }
        };
        ctx.screen_width = width;
        ctx.screen_height = height;

        if let Some(flow) = self.check_sensitive(&before, step).await? {
            return Ok(flow);
        }

        if ctx.update_error_flag() {
            self.log(
                step,
                LogLevel::Warning,
                "Several actions in a row did not succeed; asking the planner to revise",
            );
        }

        // Plan
        if ctx.should_skip_planner() {
            self.log(step, LogLevel::Info, "Last action was invalid; reusing the current plan");
        } else {
            self.guard(self.surface.update(&format!("Step {}: planning", step)))
                .await?;
            match self.guard(planner::plan(self.model.as_ref(), ctx, &before)).await? {
                Ok(output) => {
                    self.log(step, LogLevel::Thinking, format!("Plan: {}", output.plan));
                    let signal = output.signal();
                    ctx.completed_subgoal = output.completed_subgoal;
                    ctx.plan = output.plan;
                    match signal {
                        PlannerSignal::StopSensitive => {
                            return Ok(StepFlow::Finish(AgentResult::ended(
                                LoopState::Failed,
                                "Stopped: the planner detected a sensitive page",
                                step,
                            )));
                        }
                        PlannerSignal::Finished => {
                            return Ok(StepFlow::Finish(AgentResult::completed(
                                "Task completed",
                                step,
                            )));
                        }
                        PlannerSignal::Continue => {}
                    }
                }
                Err(e) => self.log(
                    step,
                    LogLevel::Warning,
                    format!("Planner failed, keeping the previous plan: {}", e),
                ),
            }
        }

        // Act
        self.guard(self.surface.update(&format!("Step {}: choosing an action", step)))
            .await?;
        let ActorOutput {
            thought,
            action,
            description,
        } = match self.guard(actor::act(self.model.as_ref(), ctx, &before)).await? {
            Ok(output) => output,
            Err(RoleError::Transport(e)) => {
                self.log(step, LogLevel::Error, format!("Actor call failed: {}", e));
                return Ok(StepFlow::Continue);
            }
            Err(RoleError::Parse { reason, raw }) => {
                self.log(step, LogLevel::Warning, format!("Invalid action: {}", reason));
                ctx.record_step(
                    Action::invalid(raw),
                    "",
                    "Invalid action",
                    OutcomeCode::C,
                    INVALID_ACTION_FORMAT,
                );
                return Ok(StepFlow::Continue);
            }
        };
        self.log(step, LogLevel::Action, format!("{} ({})", description, action));

        if let ActionKind::Answer { text } = &action.kind {
            let answer = text.clone();
            ctx.record_step(action, &thought, &description, OutcomeCode::A, "None");
            self.guard(self.surface.show(&answer)).await?;
            return Ok(StepFlow::Finish(AgentResult::answered(answer, step)));
        }

        if action.requires_confirmation() {
            let approved = self
                .guard(self.surface.confirm(&action.confirmation_prompt()))
                .await?;
            if !approved {
                self.log(step, LogLevel::Warning, "User declined the action");
                ctx.record_step(action, &thought, &description, OutcomeCode::C, USER_CANCELLED);
                return Ok(StepFlow::Continue);
            }
        }

        // Execute
        ctx.begin_action(action.clone(), &thought, &description);
        let executed = match &action.kind {
            ActionKind::TakeOver => {
                let message = action
                    .message
                    .clone()
                    .unwrap_or_else(|| "Manual operation required".to_string());
                self.guard(self.surface.take_over(&message)).await?;
                Ok(())
            }
            _ => {
                self.guard(self.executor.execute(&action, width, height))
                    .await?
            }
        };
        if let Err(e) = executed {
            let reason = format!("Action execution failed: {}", e);
            self.log(step, LogLevel::Error, reason.clone());
            ctx.resolve_outcome(OutcomeCode::C, reason);
            return Ok(StepFlow::Continue);
        }

        self.guard(tokio::time::sleep(Duration::from_millis(
            self.config.settle_delay_ms,
        )))
        .await?;

        // Reflect
        let after = self.capture().await?;
        if let Some(flow) = self.check_sensitive(&after, step).await? {
            ctx.resolve_outcome(OutcomeCode::B, "Reached a sensitive page");
            return Ok(flow);
        }

        let (outcome, error_description) = match self
            .guard(critic::reflect(
                self.model.as_ref(),
                ctx,
                &action,
                &description,
                &before,
                &after,
            ))
            .await?
        {
            Ok(verdict) => (verdict.outcome, verdict.error_description),
            Err(e) => {
                tracing::warn!("Critic failed: {}", e);
                (OutcomeCode::C, CRITIC_CALL_FAILED.to_string())
            }
        };
        ctx.resolve_outcome(outcome, error_description);
        let level = if outcome.is_success() {
            LogLevel::Success
        } else {
            LogLevel::Warning
        };
        self.log(step, level, format!("Outcome {}: {}", outcome, outcome.description()));

        // Notes
        if use_notetaker && outcome.is_success() {
            match self
                .guard(notetaker::take_notes(self.model.as_ref(), ctx, &after))
                .await?
            {
                Ok(notes) => ctx.important_notes = notes,
                Err(e) => tracing::debug!("Note-taker failed, keeping previous notes: {}", e),
            }
        }

        Ok(StepFlow::Continue)
    }

    /// Screenshot with transient UI hidden.
    async fn capture(&self) -> Result<Screenshot, Interrupt> {
        self.guard(self.surface.set_visible(false)).await?;
        let shot = self.guard(self.device.screenshot_with_fallback()).await?;
        self.guard(self.surface.set_visible(true)).await?;
        Ok(shot)
    }

    /// Pause on pages the platform refused to capture.
    async fn check_sensitive(
        &self,
        shot: &Screenshot,
        step: u32,
    ) -> Result<Option<StepFlow>, Interrupt> {
        if shot.is_sensitive {
            self.log(step, LogLevel::Warning, "Sensitive page detected, waiting for the user");
            if !self.guard(self.surface.confirm(SENSITIVE_PAGE_PROMPT)).await? {
                return Ok(Some(StepFlow::Finish(AgentResult::ended(
                    LoopState::Stopped,
                    "Cancelled on a sensitive page",
                    step,
                ))));
            }
        } else if shot.is_fallback {
            self.log(step, LogLevel::Warning, "Screenshot failed, continuing with a placeholder");
        }
        Ok(None)
    }

    async fn cleanup(&self) {
        self.surface.hide().await;
        self.surface.return_to_host().await;
    }

    /// Race `fut` against task cancellation and the user stop flag.
    async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Interrupt> {
        if self.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        if self.stop.is_stopped() {
            return Err(Interrupt::Stopped);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupt::Cancelled),
            _ = self.stop.stopped() => Err(Interrupt::Stopped),
            out = fut => Ok(out),
        }
    }

    /// Replace the status snapshot with an updated copy.
    fn publish(&self, update: impl FnOnce(&mut StatusSnapshot)) {
        let mut next = self.status.borrow().clone();
        update(&mut next);
        self.status.send_replace(next);
    }

    fn log(&self, step: u32, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Error => tracing::error!(step, "{}", message),
            LogLevel::Warning => tracing::warn!(step, "{}", message),
            LogLevel::Thinking => tracing::debug!(step, "{}", message),
            _ => tracing::info!(step, "{}", message),
        }
        let capacity = self.config.step_log_capacity;
        self.publish(|s| s.push_log(StepLogEntry::new(step, level, message), capacity));
    }
}
