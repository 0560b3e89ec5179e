use async_trait::async_trait;
use serde_json::Value;

use super::client::ModelError;

/// A vision-language backend the agent roles talk to.
///
/// Both calls return the raw reply text. Failures are always surfaced as a
/// [`ModelError`] so a role can fold them into its own outcome instead of
/// aborting the loop.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Stateless call: one prompt plus zero or more base64 PNG images.
    async fn predict(&self, prompt: &str, images: &[String]) -> Result<String, ModelError>;

    /// Stateful call over a full OpenAI-format message log.
    async fn predict_with_context(&self, messages: &[Value]) -> Result<String, ModelError>;
}
