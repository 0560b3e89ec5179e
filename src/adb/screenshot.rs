//! Screen capture through `adb exec-out screencap -p`.

use crate::device::Screenshot;

use super::command::AdbCommand;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Turn raw screencap output into a screenshot.
///
/// Android refuses to capture secure windows (payment, password) and
/// reports it on stderr; that case yields a sensitive placeholder. Any
/// other failure yields a plain placeholder.
pub fn classify_screencap(stdout: &[u8], stderr: &str) -> Screenshot {
    if stderr.contains("Status: -1") || stderr.contains("Failed") {
        tracing::warn!("Screen capture refused, treating page as sensitive: {}", stderr.trim());
        return Screenshot::fallback(true);
    }

    if stdout.len() < PNG_MAGIC.len() || &stdout[..PNG_MAGIC.len()] != PNG_MAGIC {
        tracing::error!("Screencap returned {} bytes without a PNG header", stdout.len());
        return Screenshot::fallback(false);
    }

    match Screenshot::from_png(stdout) {
        Ok(shot) => shot,
        Err(e) => {
            tracing::error!("Failed to decode screenshot: {}", e);
            Screenshot::fallback(false)
        }
    }
}

pub(crate) async fn capture(adb: &AdbCommand) -> Screenshot {
    match adb.run(["exec-out", "screencap", "-p"]).await {
        Ok(output) => classify_screencap(&output.stdout, &String::from_utf8_lossy(&output.stderr)),
        Err(e) => {
            tracing::error!("Screenshot command failed: {}", e);
            Screenshot::fallback(false)
        }
    }
}
