//! Installed-app inventory through `pm list packages`.

use async_trait::async_trait;

use crate::config::{known_package, APP_PACKAGES};
use crate::device::{AppInfo, AppInventory};

use super::device::AdbDevice;

/// Package ids from `pm list packages` output (`package:<id>` per line).
pub fn parse_package_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Human-readable name for a package: the known app name if any, otherwise
/// the capitalized last segment of the package id.
pub fn label_for_package(package: &str) -> String {
    let known = APP_PACKAGES
        .iter()
        .filter(|(_, p)| **p == package)
        .map(|(name, _)| *name)
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.cmp(a)));
    if let Some(name) = known {
        return title_case(name);
    }

    let segment = package.rsplit('.').next().unwrap_or(package);
    title_case(segment)
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Pick the installed package best matching `name`.
pub(crate) fn match_installed(name: &str, installed: &[String]) -> Option<String> {
    let wanted = compact(name);
    if wanted.is_empty() {
        return None;
    }
    if let Some(exact) = installed.iter().find(|p| p.as_str() == name.trim()) {
        return Some(exact.clone());
    }
    if let Some(by_label) = installed
        .iter()
        .find(|p| compact(&label_for_package(p)) == wanted)
    {
        return Some(by_label.clone());
    }
    installed
        .iter()
        .filter(|p| p.to_lowercase().contains(&wanted))
        .min_by_key(|p| p.len())
        .cloned()
}

impl AdbDevice {
    async fn packages(&self, filter: Option<&str>) -> Vec<String> {
        let mut args = vec!["pm", "list", "packages"];
        args.extend(filter);
        match self.adb().shell(&args).await {
            Ok(out) => parse_package_list(&out),
            Err(e) => {
                tracing::warn!("Failed to list packages: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl AppInventory for AdbDevice {
    async fn list_apps(&self) -> Vec<AppInfo> {
        let user = self.packages(Some("-3")).await;
        let system = self.packages(Some("-s")).await;
        user.iter()
            .map(|p| AppInfo::new(label_for_package(p), false))
            .chain(system.iter().map(|p| AppInfo::new(label_for_package(p), true)))
            .collect()
    }

    async fn find_package_for(&self, name: &str) -> Option<String> {
        if let Some(package) = known_package(name) {
            return Some(package.to_string());
        }
        let installed = self.packages(None).await;
        let found = match_installed(name, &installed);
        if found.is_none() {
            tracing::debug!(app = name, "No installed package matches");
        }
        found
    }
}
