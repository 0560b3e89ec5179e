//! Model client module for AI inference.

mod client;
mod vision;

pub use client::{
    MessageBuilder, ModelClient, ModelConfig, ModelError, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_DELAY_SECS, SCREENSHOT_PLACEHOLDER,
};
pub use vision::VisionModel;
