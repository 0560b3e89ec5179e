//! Action executor mapping parsed actions onto device primitives.

use std::sync::Arc;
use std::time::Duration;

use crate::device::{AppInventory, DeviceController, DeviceError};

use super::action::{Action, ActionKind, SystemButton};

/// Model coordinates at or above this value are raw pixels.
pub const PIXEL_COORDINATE_MIN: f64 = 1000.0;

/// Upper bound of the normalized coordinate range `[0, 999]`.
pub const NORMALIZED_COORDINATE_MAX: f64 = 999.0;

/// Longest `wait` the executor will honor, in seconds.
pub const MAX_WAIT_SECS: f64 = 60.0;

/// Map one model coordinate onto a screen axis of `screen_max` pixels.
///
/// `[0, 999]` is a fraction of the axis (`value * screen_max / 999`); values
/// `>= 1000` are already pixels and are clamped to `screen_max`.
pub fn map_coordinate(value: f64, screen_max: u32) -> i32 {
    let max = screen_max as f64;
    let mapped = if value >= PIXEL_COORDINATE_MIN {
        value
    } else {
        value * max / NORMALIZED_COORDINATE_MAX
    };
    mapped.round().clamp(0.0, max) as i32
}

/// Map an `(x, y)` model point onto the current screen.
pub fn map_point(x: f64, y: f64, screen_width: u32, screen_height: u32) -> (i32, i32) {
    (
        map_coordinate(x, screen_width),
        map_coordinate(y, screen_height),
    )
}

/// Executes actions against a [`DeviceController`].
pub struct ActionExecutor {
    device: Arc<dyn DeviceController>,
    inventory: Arc<dyn AppInventory>,
}

impl ActionExecutor {
    pub fn new(device: Arc<dyn DeviceController>, inventory: Arc<dyn AppInventory>) -> Self {
        Self { device, inventory }
    }

    /// Execute an action using the screen size queried for this step.
    ///
    /// `take_over`, `answer` and `invalid` never reach the device; they are
    /// handled by the loop controller and rejected here.
    pub async fn execute(
        &self,
        action: &Action,
        screen_width: u32,
        screen_height: u32,
    ) -> Result<(), DeviceError> {
        tracing::debug!(action = %action, screen_width, screen_height, "Executing action");

        match &action.kind {
            ActionKind::Click { x, y } => {
                let (px, py) = map_point(*x, *y, screen_width, screen_height);
                self.device.tap(px, py).await
            }
            ActionKind::DoubleTap { x, y } => {
                let (px, py) = map_point(*x, *y, screen_width, screen_height);
                self.device.double_tap(px, py).await
            }
            ActionKind::LongPress { x, y } => {
                let (px, py) = map_point(*x, *y, screen_width, screen_height);
                self.device.long_press(px, py).await
            }
            ActionKind::Swipe { x1, y1, x2, y2 } => {
                let (sx, sy) = map_point(*x1, *y1, screen_width, screen_height);
                let (ex, ey) = map_point(*x2, *y2, screen_width, screen_height);
                self.device.swipe(sx, sy, ex, ey).await
            }
            ActionKind::TypeText { text } => self.device.type_text(text).await,
            ActionKind::SystemButton { button } => match button {
                SystemButton::Back => self.device.back().await,
                SystemButton::Home => self.device.home().await,
                SystemButton::Enter => self.device.enter().await,
            },
            ActionKind::OpenApp { app } => self.handle_open_app(app).await,
            ActionKind::Wait { duration } => {
                let secs = if duration.is_finite() {
                    duration.clamp(0.0, MAX_WAIT_SECS)
                } else {
                    0.0
                };
                tokio::time::sleep(Duration::from_secs_f64(secs)).await;
                Ok(())
            }
            ActionKind::TakeOver | ActionKind::Answer { .. } | ActionKind::Invalid { .. } => {
                Err(DeviceError::Unsupported(format!(
                    "{} is not a device action",
                    action.action_type()
                )))
            }
        }
    }

    async fn handle_open_app(&self, app: &str) -> Result<(), DeviceError> {
        let package = self
            .inventory
            .find_package_for(app)
            .await
            .ok_or_else(|| DeviceError::AppNotFound(app.to_string()))?;
        tracing::info!(app, package = %package, "Launching app");
        self.device.open_app(&package).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{DeviceCall, FakeDevice, FakeInventory};

    #[test]
    fn test_normalized_coordinates_scale_to_screen() {
        assert_eq!(map_coordinate(0.0, 1080), 0);
        assert_eq!(map_coordinate(999.0, 1080), 1080);
        assert_eq!(map_coordinate(499.5, 1000), 500);
    }

    #[test]
    fn test_pixel_coordinates_are_clamped() {
        assert_eq!(map_coordinate(1000.0, 2400), 1000);
        assert_eq!(map_coordinate(1500.0, 1080), 1080);
        assert_eq!(map_coordinate(5000.0, 2400), 2400);
    }

    #[test]
    fn test_pixel_mapping_is_idempotent_once_clamped() {
        for v in [1000.0, 1080.0, 1234.0, 2400.0, 9999.0] {
            let once = map_coordinate(v, 2400);
            assert_eq!(once, (v as i32).min(2400));
            if f64::from(once) >= PIXEL_COORDINATE_MIN {
                assert_eq!(map_coordinate(f64::from(once), 2400), once);
            }
        }
    }

    #[test]
    fn test_negative_coordinates_clamp_to_zero() {
        assert_eq!(map_coordinate(-20.0, 1080), 0);
    }

    #[tokio::test]
    async fn test_click_uses_fresh_screen_size() {
        let device = Arc::new(FakeDevice::new(1080, 2400));
        let executor = ActionExecutor::new(device.clone(), Arc::new(FakeInventory::default()));

        let action = Action::new(ActionKind::Click { x: 999.0, y: 0.0 });
        executor.execute(&action, 1080, 2400).await.unwrap();
        // Same action after a rotation.
        executor.execute(&action, 2400, 1080).await.unwrap();

        assert_eq!(
            device.calls(),
            vec![DeviceCall::Tap(1080, 0), DeviceCall::Tap(2400, 0)]
        );
    }

    #[tokio::test]
    async fn test_open_app_resolves_package() {
        let device = Arc::new(FakeDevice::new(1080, 2400));
        let inventory = FakeInventory::default().with_package("Spotify", "com.spotify.music");
        let executor = ActionExecutor::new(device.clone(), Arc::new(inventory));

        let action = Action::new(ActionKind::OpenApp {
            app: "Spotify".to_string(),
        });
        executor.execute(&action, 1080, 2400).await.unwrap();
        assert_eq!(
            device.calls(),
            vec![DeviceCall::OpenApp("com.spotify.music".to_string())]
        );

        let unknown = Action::new(ActionKind::OpenApp {
            app: "Nope".to_string(),
        });
        assert!(matches!(
            executor.execute(&unknown, 1080, 2400).await,
            Err(DeviceError::AppNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_non_finite_wait_does_not_sleep_or_panic() {
        let executor = ActionExecutor::new(
            Arc::new(FakeDevice::new(1080, 2400)),
            Arc::new(FakeInventory::default()),
        );
        for duration in [f64::NAN, f64::INFINITY, -5.0] {
            let action = Action::new(ActionKind::Wait { duration });
            executor.execute(&action, 1080, 2400).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_non_device_actions_are_rejected() {
        let device = Arc::new(FakeDevice::new(1080, 2400));
        let executor = ActionExecutor::new(device.clone(), Arc::new(FakeInventory::default()));
        let result = executor.execute(&Action::invalid("garbage"), 1080, 2400).await;
        assert!(matches!(result, Err(DeviceError::Unsupported(_))));
        assert!(device.calls().is_empty());
    }
}
