//! Mobile Agent - multi-role phone automation
//!
//! CLI entry point. Run with: cargo run --bin mobile-agent -- "open Spotify"

use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use mobile_agent::adb::AdbDevice;
use mobile_agent::surface::ConsoleSurface;
use mobile_agent::{AgentHandle, AgentResult, AppSettings, MobileAgent, ModelClient};
use tracing_subscriber::EnvFilter;

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Saved settings overridden by environment variables.
fn settings_from_env() -> AppSettings {
    let mut settings = AppSettings::load();
    if let Ok(v) = env::var("MODEL_BASE_URL") {
        settings.base_url = v;
    }
    if let Ok(v) = env::var("MODEL_API_KEY") {
        settings.api_key = v;
    }
    if let Ok(v) = env::var("MODEL_NAME") {
        settings.model_name = v;
    }
    if let Ok(v) = env::var("ADB_DEVICE_ID") {
        settings.device_id = v;
    }
    if let Some(v) = env_parse("AGENT_MAX_STEPS") {
        settings.max_steps = v;
    }
    if let Some(v) = env_flag("AGENT_USE_NOTETAKER") {
        settings.use_notetaker = v;
    }
    if let Some(v) = env_parse("MODEL_MAX_RETRIES") {
        settings.max_retries = v;
    }
    if let Some(v) = env_parse("MODEL_RETRY_DELAY") {
        settings.retry_delay = v;
    }
    settings
}

fn read_task() -> io::Result<Option<String>> {
    print!("📝 Task: ");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn print_result(result: &AgentResult, handle: &AgentHandle) {
    let icon = if result.success { "✅" } else { "⚠️" };
    println!(
        "\n{} {} ({}, {} steps)",
        icon,
        result.message,
        result.state.as_str(),
        result.steps
    );
    if let Some(answer) = &result.answer {
        println!("💬 {}", answer);
    }
    let status = handle.status();
    for entry in status.step_log.iter().rev().take(3).rev() {
        println!("   {}", entry.format_display());
    }
    println!();
}

async fn run_task(agent: &mut MobileAgent, handle: &AgentHandle, task: &str) {
    println!("📝 Task: {}\n", task);
    match agent.run(task).await {
        Ok(result) => print_result(&result, handle),
        Err(e) => eprintln!("\n❌ Error: {}\n", e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let settings = settings_from_env();
    let model_config = settings.to_model_config();
    let agent_config = settings.to_agent_config();

    println!("🤖 Mobile Agent - multi-role phone automation");
    println!("================================================");
    println!("Model: {} @ {}", model_config.model_name, model_config.base_url);
    println!(
        "Retry: max {} attempts, {}s delay",
        model_config.max_retries, model_config.retry_delay_secs
    );
    println!(
        "Steps: {} | Note-taker: {}",
        agent_config.max_steps,
        if agent_config.use_notetaker { "on" } else { "off" }
    );

    let device = Arc::new(AdbDevice::new(settings.device_id()));
    let devices = device
        .adb()
        .list_devices()
        .await
        .context("failed to query adb devices")?;
    match device.adb().device_id() {
        Some(id) => println!("Device: {}", id),
        None => match devices.iter().find(|d| d.is_online()) {
            Some(d) => println!(
                "Device: {} ({})",
                d.device_id,
                d.model.as_deref().unwrap_or("unknown")
            ),
            None => println!("Device: none online, check `adb devices`"),
        },
    }
    println!("================================================\n");

    let mut agent = MobileAgent::new(
        Arc::new(ModelClient::new(model_config)),
        device.clone(),
        device,
        Arc::new(ConsoleSurface::new()),
        agent_config,
    );
    let handle = agent.handle();

    // Ctrl-C stops a running task; when idle it exits.
    let stopper = handle.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !stopper.status().is_running {
                std::process::exit(130);
            }
            println!("\n⏹  Stopping...");
            stopper.stop();
        }
    });

    if !args.is_empty() {
        let task = args.join(" ");
        run_task(&mut agent, &handle, &task).await;
        return Ok(());
    }

    println!("Interactive mode. Type your task and press Enter.");
    println!("Type 'quit' or 'exit' to exit.\n");

    loop {
        let Some(task) = tokio::task::spawn_blocking(read_task).await?? else {
            break;
        };
        if task.is_empty() {
            continue;
        }
        if task == "quit" || task == "exit" {
            println!("Goodbye! 👋");
            break;
        }
        run_task(&mut agent, &handle, &task).await;
    }

    Ok(())
}
