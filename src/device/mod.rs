//! Device abstraction consumed by the agent loop.

mod screenshot;

use async_trait::async_trait;
use thiserror::Error;

pub use screenshot::{Screenshot, FALLBACK_HEIGHT, FALLBACK_WIDTH};

/// Device control errors.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Command execution failed: {0}")]
    CommandFailed(String),
    #[error("App not found: {0}")]
    AppNotFound(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// An installed application as reported by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub name: String,
    pub is_system: bool,
}

impl AppInfo {
    pub fn new(name: impl Into<String>, is_system: bool) -> Self {
        Self {
            name: name.into(),
            is_system,
        }
    }
}

/// Low-level control primitives of a screen-based target.
///
/// Coordinates passed to the gesture methods are already in device pixels.
#[async_trait]
pub trait DeviceController: Send + Sync {
    /// Current screen size as `(width, height)`; re-queried every step.
    async fn screen_size(&self) -> Result<(u32, u32), DeviceError>;

    /// Capture the screen. Never fails: a placeholder image is returned
    /// with `is_fallback` (and possibly `is_sensitive`) set instead.
    async fn screenshot_with_fallback(&self) -> Screenshot;

    async fn tap(&self, x: i32, y: i32) -> Result<(), DeviceError>;
    async fn double_tap(&self, x: i32, y: i32) -> Result<(), DeviceError>;
    async fn long_press(&self, x: i32, y: i32) -> Result<(), DeviceError>;
    async fn swipe(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<(), DeviceError>;
    async fn type_text(&self, text: &str) -> Result<(), DeviceError>;
    async fn back(&self) -> Result<(), DeviceError>;
    async fn home(&self) -> Result<(), DeviceError>;
    async fn enter(&self) -> Result<(), DeviceError>;

    /// Launch an app by its platform identifier (e.g. an Android package).
    async fn open_app(&self, identifier: &str) -> Result<(), DeviceError>;
}

/// Host-side inventory of installed apps.
#[async_trait]
pub trait AppInventory: Send + Sync {
    async fn list_apps(&self) -> Vec<AppInfo>;

    /// Resolve a human app name to a launchable identifier.
    async fn find_package_for(&self, name: &str) -> Option<String>;
}
