//! ADB-backed implementation of [`DeviceController`].

use std::time::Duration;

use async_trait::async_trait;

use crate::device::{DeviceController, DeviceError, Screenshot};

use super::command::AdbCommand;
use super::{input, screenshot};

/// Hold time of a long press.
const LONG_PRESS_MS: u64 = 3000;

/// Gap between the two taps of a double tap.
const DOUBLE_TAP_GAP: Duration = Duration::from_millis(100);

/// Parse `wm size` output, preferring an override size over the physical one.
pub fn parse_wm_size(stdout: &str) -> Option<(u32, u32)> {
    let mut physical = None;
    for line in stdout.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let Some((w, h)) = value.trim().split_once('x') else {
            continue;
        };
        let (Ok(w), Ok(h)) = (w.trim().parse(), h.trim().parse()) else {
            continue;
        };
        if label.contains("Override") {
            return Some((w, h));
        }
        physical = Some((w, h));
    }
    physical
}

/// Swipe duration scaled to the distance travelled, 1-2 seconds.
fn swipe_duration_ms(x1: i32, y1: i32, x2: i32, y2: i32) -> u64 {
    let dx = i64::from(x1 - x2);
    let dy = i64::from(y1 - y2);
    ((dx * dx + dy * dy) as u64 / 1000).clamp(1000, 2000)
}

/// An Android device reached through `adb`.
#[derive(Debug, Clone, Default)]
pub struct AdbDevice {
    adb: AdbCommand,
}

impl AdbDevice {
    pub fn new(device_id: Option<String>) -> Self {
        Self {
            adb: AdbCommand::new(device_id),
        }
    }

    pub fn with_adb(adb: AdbCommand) -> Self {
        Self { adb }
    }

    pub fn adb(&self) -> &AdbCommand {
        &self.adb
    }

    async fn input<I, S>(&self, args: I) -> Result<(), DeviceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = std::iter::once("input".to_string())
            .chain(args.into_iter().map(|a| a.as_ref().to_string()))
            .collect();
        self.adb.shell(&args).await.map(|_| ())
    }

    async fn keyevent(&self, key: &str) -> Result<(), DeviceError> {
        self.input(["keyevent", key]).await
    }
}

#[async_trait]
impl DeviceController for AdbDevice {
    async fn screen_size(&self) -> Result<(u32, u32), DeviceError> {
        let out = self.adb.shell(["wm", "size"]).await?;
        parse_wm_size(&out).ok_or_else(|| {
            DeviceError::CommandFailed(format!("Unexpected wm size output: {}", out.trim()))
        })
    }

    async fn screenshot_with_fallback(&self) -> Screenshot {
        screenshot::capture(&self.adb).await
    }

    async fn tap(&self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.input(["tap".to_string(), x.to_string(), y.to_string()])
            .await
    }

    async fn double_tap(&self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.tap(x, y).await?;
        tokio::time::sleep(DOUBLE_TAP_GAP).await;
        self.tap(x, y).await
    }

    async fn long_press(&self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.input([
            "swipe".to_string(),
            x.to_string(),
            y.to_string(),
            x.to_string(),
            y.to_string(),
            LONG_PRESS_MS.to_string(),
        ])
        .await
    }

    async fn swipe(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<(), DeviceError> {
        self.input([
            "swipe".to_string(),
            x1.to_string(),
            y1.to_string(),
            x2.to_string(),
            y2.to_string(),
            swipe_duration_ms(x1, y1, x2, y2).to_string(),
        ])
        .await
    }

    async fn type_text(&self, text: &str) -> Result<(), DeviceError> {
        input::type_text(&self.adb, text).await
    }

    async fn back(&self) -> Result<(), DeviceError> {
        self.keyevent("4").await
    }

    async fn home(&self) -> Result<(), DeviceError> {
        self.keyevent("KEYCODE_HOME").await
    }

    async fn enter(&self) -> Result<(), DeviceError> {
        self.keyevent("KEYCODE_ENTER").await
    }

    async fn open_app(&self, identifier: &str) -> Result<(), DeviceError> {
        let out = self
            .adb
            .shell([
                "monkey",
                "-p",
                identifier,
                "-c",
                "android.intent.category.LAUNCHER",
                "1",
            ])
            .await?;
        if out.contains("No activities found") {
            return Err(DeviceError::AppNotFound(identifier.to_string()));
        }
        Ok(())
    }
}
