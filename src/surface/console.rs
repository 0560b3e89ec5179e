//! Terminal-backed status surface.

use async_trait::async_trait;
use std::io::{self, BufRead, Write};

use super::StatusSurface;

/// Prints status to stdout and reads decisions from stdin.
///
/// Blocking reads run on the blocking pool so the agent task stays
/// cancellable while a decision is pending.
#[derive(Debug, Default, Clone)]
pub struct ConsoleSurface;

impl ConsoleSurface {
    pub fn new() -> Self {
        Self
    }
}

fn read_line_blocking(prompt: String) -> Option<String> {
    print!("{}", prompt);
    io::stdout().flush().ok()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    Some(line)
}

async fn read_line(prompt: String) -> Option<String> {
    tokio::task::spawn_blocking(move || read_line_blocking(prompt))
        .await
        .ok()
        .flatten()
}

#[async_trait]
impl StatusSurface for ConsoleSurface {
    async fn show(&self, message: &str) {
        println!("▶ {}", message);
    }

    async fn update(&self, message: &str) {
        println!("  {}", message);
    }

    async fn hide(&self) {}

    async fn set_visible(&self, _visible: bool) {}

    async fn confirm(&self, message: &str) -> bool {
        read_line(format!("⚠️  {}\nConfirm? (y/N): ", message))
            .await
            .map(|line| line.trim().eq_ignore_ascii_case("y"))
            .unwrap_or(false)
    }

    async fn take_over(&self, message: &str) {
        let _ = read_line(format!(
            "✋ {}\nPress Enter after completing the manual operation...",
            message
        ))
        .await;
    }
}
