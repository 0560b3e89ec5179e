// Copyright 2025 Zhipu AI (Original Python implementation)
// Copyright 2025 ModerRAS (Rust implementation)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Mobile Agent
//!
//! Multi-role vision-language agent for driving phones and other
//! screen-based targets.
//!
//! Each step the loop captures the screen, lets a planner revise the
//! high-level plan, asks an actor for one concrete action, executes it,
//! and has a critic judge the result from before/after screenshots. An
//! optional note-taker keeps task-relevant facts. Devices are reached
//! through the [`DeviceController`] trait; [`adb::AdbDevice`] drives
//! Android over ADB.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mobile_agent::adb::AdbDevice;
//! use mobile_agent::surface::ConsoleSurface;
//! use mobile_agent::{AgentConfig, MobileAgent, ModelClient, ModelConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let device = Arc::new(AdbDevice::new(None));
//!     let mut agent = MobileAgent::new(
//!         Arc::new(ModelClient::new(ModelConfig::default())),
//!         device.clone(),
//!         device,
//!         Arc::new(ConsoleSurface::new()),
//!         AgentConfig::default(),
//!     );
//!
//!     let result = agent.run_instruction("open Spotify", 25, false).await?;
//!     println!("{}: {}", result.success, result.message);
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod adb;
pub mod agent;
pub mod config;
pub mod device;
pub mod model;
pub mod settings;
pub mod skills;
pub mod surface;

pub use actions::{parse_action, Action, ActionExecutor, ActionKind, ActionType, SystemButton};
pub use agent::{
    AgentConfig, AgentError, AgentHandle, AgentResult, LogLevel, LoopState, MobileAgent,
    OutcomeCode, RunContext, StatusSnapshot, StepLogEntry,
};
pub use device::{AppInfo, AppInventory, DeviceController, DeviceError, Screenshot};
pub use model::{ModelClient, ModelConfig, ModelError, VisionModel};
pub use settings::AppSettings;
pub use skills::{SkillMatcher, StaticSkillMatcher};
pub use surface::{ConsoleSurface, StatusSurface};
