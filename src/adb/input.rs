//! Text input through the ADB Keyboard IME.
//!
//! Requires ADB Keyboard on the device: <https://github.com/senzhk/ADBKeyBoard>

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::device::DeviceError;

use super::command::AdbCommand;

const ADB_KEYBOARD_IME: &str = "com.android.adbkeyboard/.AdbIME";

/// Pause between IME operations so the broadcast lands in the right field.
const IME_SETTLE: Duration = Duration::from_millis(500);

async fn current_ime(adb: &AdbCommand) -> String {
    adb.shell(["settings", "get", "secure", "default_input_method"])
        .await
        .map(|out| out.trim().to_string())
        .unwrap_or_default()
}

async fn broadcast_text(adb: &AdbCommand, text: &str) -> Result<(), DeviceError> {
    let encoded = STANDARD.encode(text.as_bytes());
    adb.shell(["am", "broadcast", "-a", "ADB_INPUT_B64", "--es", "msg", encoded.as_str()])
        .await
        .map(|_| ())
}

/// Clear the focused field and type `text`, restoring the user's keyboard after.
pub(crate) async fn type_text(adb: &AdbCommand, text: &str) -> Result<(), DeviceError> {
    let original = current_ime(adb).await;
    if !original.contains(ADB_KEYBOARD_IME) {
        adb.shell(["ime", "set", ADB_KEYBOARD_IME]).await?;
        tokio::time::sleep(IME_SETTLE).await;
    }

    let typed = async {
        adb.shell(["am", "broadcast", "-a", "ADB_CLEAR_TEXT"]).await?;
        tokio::time::sleep(IME_SETTLE).await;
        broadcast_text(adb, text).await
    }
    .await;

    if !original.is_empty() && !original.contains(ADB_KEYBOARD_IME) {
        if let Err(e) = adb.shell(["ime", "set", original.as_str()]).await {
            tracing::warn!("Failed to restore keyboard {}: {}", original, e);
        }
    }
    typed
}
