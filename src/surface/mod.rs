//! Status surface: the on-screen overlay and the human in the loop.

mod console;

use async_trait::async_trait;

pub use console::ConsoleSurface;

/// Presentation layer the loop controller reports to.
///
/// `confirm` and `take_over` suspend the calling phase until a human
/// responds; the controller races them against its cancellation signals.
#[async_trait]
pub trait StatusSurface: Send + Sync {
    async fn show(&self, message: &str);
    async fn update(&self, message: &str);
    async fn hide(&self);

    /// Toggle transient UI; hidden right before every screenshot.
    async fn set_visible(&self, visible: bool);

    /// Ask the human to approve or decline. `true` means proceed.
    async fn confirm(&self, message: &str) -> bool;

    /// Let the human operate the device, returning once they are done.
    async fn take_over(&self, message: &str);

    /// Bring the host application back to the foreground after a run.
    async fn return_to_host(&self) {}
}
