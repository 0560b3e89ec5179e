//! Configuration module: prompt templates and the app table.

mod apps;
mod prompts;

pub use apps::{known_package, APP_PACKAGES};
pub use prompts::{
    actor_step_prompt, actor_system_prompt, critic_prompt, notetaker_prompt, planner_prompt,
};
