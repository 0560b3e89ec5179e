//! Observable run status and the user-facing step log.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of step log entries kept in a snapshot.
pub const DEFAULT_STEP_LOG_CAPACITY: usize = 200;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    Idle,
    Running,
    Completed,
    Stopped,
    Failed,
    MaxStepsReached,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoopState::Idle | LoopState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::Idle => "idle",
            LoopState::Running => "running",
            LoopState::Completed => "completed",
            LoopState::Stopped => "stopped",
            LoopState::Failed => "failed",
            LoopState::MaxStepsReached => "max_steps_reached",
        }
    }
}

/// Log level of a step log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Action,
    Thinking,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Action => "ACTION",
            LogLevel::Thinking => "THINK",
        }
    }
}

/// A single user-visible log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLogEntry {
    pub timestamp: DateTime<Local>,
    pub step: u32,
    pub level: LogLevel,
    pub message: String,
}

impl StepLogEntry {
    pub fn new(step: u32, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            step,
            level,
            message: message.into(),
        }
    }

    pub fn format_display(&self) -> String {
        format!(
            "[{}] [{}] step {}: {}",
            self.timestamp.format("%H:%M:%S"),
            self.level.as_str(),
            self.step,
            self.message
        )
    }
}

/// Read-only projection of the loop, replaced as a whole on every change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub run_id: Option<Uuid>,
    pub instruction: String,
    pub state: LoopState,
    pub current_step: u32,
    pub max_steps: u32,
    pub is_running: bool,
    pub is_completed: bool,
    pub message: String,
    pub step_log: Vec<StepLogEntry>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            run_id: None,
            instruction: String::new(),
            state: LoopState::Idle,
            current_step: 0,
            max_steps: 0,
            is_running: false,
            is_completed: false,
            message: String::new(),
            step_log: Vec::new(),
        }
    }
}

impl StatusSnapshot {
    /// Fresh snapshot for a run that is about to start.
    pub fn started(run_id: Uuid, instruction: &str, max_steps: u32) -> Self {
        Self {
            run_id: Some(run_id),
            instruction: instruction.to_string(),
            state: LoopState::Running,
            max_steps,
            is_running: true,
            ..Self::default()
        }
    }

    /// Append a log entry, dropping the oldest beyond `capacity`.
    pub fn push_log(&mut self, entry: StepLogEntry, capacity: usize) {
        self.step_log.push(entry);
        if self.step_log.len() > capacity {
            let excess = self.step_log.len() - capacity;
            self.step_log.drain(..excess);
        }
    }

    /// Move into a terminal state.
    pub fn finish(&mut self, state: LoopState, message: impl Into<String>) {
        self.state = state;
        self.is_running = false;
        self.is_completed = state == LoopState::Completed;
        self.message = message.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_snapshot() {
        let id = Uuid::new_v4();
        let snapshot = StatusSnapshot::started(id, "open Spotify", 25);
        assert_eq!(snapshot.run_id, Some(id));
        assert_eq!(snapshot.state, LoopState::Running);
        assert!(snapshot.is_running);
        assert!(!snapshot.is_completed);
        assert_eq!(snapshot.current_step, 0);
    }

    #[test]
    fn test_step_log_is_bounded() {
        let mut snapshot = StatusSnapshot::default();
        for i in 0..10 {
            snapshot.push_log(StepLogEntry::new(i, LogLevel::Info, format!("entry {}", i)), 4);
        }
        assert_eq!(snapshot.step_log.len(), 4);
        assert_eq!(snapshot.step_log[0].message, "entry 6");
    }

    #[test]
    fn test_finish_sets_flags() {
        let mut snapshot = StatusSnapshot::started(Uuid::new_v4(), "x", 5);
        snapshot.finish(LoopState::MaxStepsReached, "out of steps");
        assert!(!snapshot.is_running);
        assert!(!snapshot.is_completed);
        assert!(snapshot.state.is_terminal());

        snapshot.finish(LoopState::Completed, "done");
        assert!(snapshot.is_completed);
    }
}
