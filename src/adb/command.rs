//! Async `adb` invocation for one (optionally pinned) device.

use std::process::Output;

use tokio::process::Command;

use crate::device::DeviceError;

/// A device as listed by `adb devices -l`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub device_id: String,
    pub status: String,
    pub model: Option<String>,
}

impl DeviceEntry {
    pub fn is_online(&self) -> bool {
        self.status == "device"
    }
}

/// Builds and runs `adb [-s <id>] ...` commands.
#[derive(Debug, Clone)]
pub struct AdbCommand {
    adb_path: String,
    device_id: Option<String>,
}

impl Default for AdbCommand {
    fn default() -> Self {
        Self::new(None)
    }
}

impl AdbCommand {
    pub fn new(device_id: Option<String>) -> Self {
        Self {
            adb_path: "adb".to_string(),
            device_id: device_id.filter(|id| !id.trim().is_empty()),
        }
    }

    pub fn with_path(mut self, adb_path: impl Into<String>) -> Self {
        self.adb_path = adb_path.into();
        self
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Leading arguments selecting the device.
    pub fn prefix(&self) -> Vec<String> {
        match &self.device_id {
            Some(id) => vec!["-s".to_string(), id.clone()],
            None => Vec::new(),
        }
    }

    /// Run `adb <prefix> <args>` and collect its output.
    pub async fn run<I, S>(&self, args: I) -> Result<Output, DeviceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = self
            .prefix()
            .into_iter()
            .chain(args.into_iter().map(|a| a.as_ref().to_string()))
            .collect();
        tracing::trace!(adb = %self.adb_path, ?args, "Running adb");

        Command::new(&self.adb_path)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DeviceError::CommandFailed(format!("adb {}: {}", args.join(" "), e)))
    }

    /// Run `adb shell <args>`, failing on a non-zero exit status.
    pub async fn shell<I, S>(&self, args: I) -> Result<String, DeviceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = std::iter::once("shell".to_string())
            .chain(args.into_iter().map(|a| a.as_ref().to_string()))
            .collect();
        let output = self.run(&args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeviceError::CommandFailed(format!(
                "adb {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Devices known to the adb server.
    pub async fn list_devices(&self) -> Result<Vec<DeviceEntry>, DeviceError> {
        let output = Command::new(&self.adb_path)
            .args(["devices", "-l"])
            .output()
            .await
            .map_err(|e| DeviceError::CommandFailed(e.to_string()))?;
        Ok(parse_devices(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `adb devices -l` output.
pub(crate) fn parse_devices(stdout: &str) -> Vec<DeviceEntry> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 2 {
                return None;
            }
            let model = parts
                .iter()
                .find_map(|p| p.strip_prefix("model:"))
                .map(|m| m.to_string());
            Some(DeviceEntry {
                device_id: parts[0].to_string(),
                status: parts[1].to_string(),
                model,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix() {
        assert!(AdbCommand::new(None).prefix().is_empty());
        assert!(AdbCommand::new(Some("  ".to_string())).prefix().is_empty());
        assert_eq!(
            AdbCommand::new(Some("emulator-5554".to_string())).prefix(),
            vec!["-s", "emulator-5554"]
        );
    }

    #[test]
    fn test_parse_devices() {
        let out = "List of devices attached\n\
                   emulator-5554          device product:sdk model:Pixel_7 device:emu\n\
                   192.168.1.10:5555      offline\n\n";
        let devices = parse_devices(out);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].device_id, "emulator-5554");
        assert_eq!(devices[0].model.as_deref(), Some("Pixel_7"));
        assert!(devices[0].is_online());
        assert!(!devices[1].is_online());
    }
}
