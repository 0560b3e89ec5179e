//! Agent module: the multi-role loop and the state it threads through steps.

pub mod actor;
mod context;
pub mod critic;
mod error;
mod memory;
mod mobile_agent;
pub mod notetaker;
pub mod planner;
mod reply;
mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{
    OutcomeCode, RunContext, DEFAULT_ERR_TO_MANAGER_THRESH, DEFAULT_MAX_INSTALLED_APPS,
};
pub use error::{AgentError, RoleError};
pub use memory::{ConversationMemory, DEFAULT_MAX_TURNS};
pub use mobile_agent::{
    AgentConfig, AgentHandle, AgentResult, MobileAgent, StopSignal, DEFAULT_MAX_STEPS,
    DEFAULT_SETTLE_DELAY_MS, INVALID_ACTION_FORMAT, USER_CANCELLED,
};
pub use planner::{classify_plan, PlannerSignal, STOP_SENSITIVE};
pub use reply::extract_section;
pub use status::{LogLevel, LoopState, StatusSnapshot, StepLogEntry, DEFAULT_STEP_LOG_CAPACITY};
