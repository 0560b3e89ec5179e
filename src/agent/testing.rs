//! In-memory fakes for the agent's trait seams.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::device::{AppInfo, AppInventory, DeviceController, DeviceError, Screenshot};
use crate::model::{ModelError, VisionModel};
use crate::skills::SkillMatcher;
use crate::surface::StatusSurface;

pub const DEFAULT_PLANNER_REPLY: &str = "### Thought ###\nKeep working.\n\n### Completed Subgoal ###\nNo completed subgoal.\n\n### Plan ###\n1. Keep going";
pub const DEFAULT_ACTOR_REPLY: &str = "### Thought ###\nScroll for more.\n\n### Action ###\n{\"action\": \"swipe\", \"coordinate\": [500, 800], \"coordinate2\": [500, 200]}\n\n### Description ###\nScroll down.";
pub const DEFAULT_CRITIC_REPLY: &str = "### Outcome ###\nA\n\n### Error Description ###\nNone";
pub const DEFAULT_NOTES_REPLY: &str = "### Important Notes ###\nNone";

type Scripted = Mutex<VecDeque<Result<String, String>>>;

fn next_reply(queue: &Scripted, default: &str) -> Result<String, ModelError> {
    match queue.lock().unwrap().pop_front() {
        Some(Ok(reply)) => Ok(reply),
        Some(Err(message)) => Err(ModelError::ApiError(message)),
        None => Ok(default.to_string()),
    }
}

/// Scripted vision model. Stateless calls are routed to a role by the
/// section headers their prompt asks for; the actor is the only caller of
/// `predict_with_context`.
#[derive(Default)]
pub struct FakeModel {
    planner: Scripted,
    actor: Scripted,
    critic: Scripted,
    notetaker: Scripted,
    planner_calls: AtomicUsize,
    actor_calls: AtomicUsize,
    critic_calls: AtomicUsize,
    notetaker_calls: AtomicUsize,
    last_images: Mutex<Vec<String>>,
    actor_contexts: Mutex<Vec<Vec<Value>>>,
}

impl FakeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn planner_reply(self, reply: &str) -> Self {
        self.planner.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn planner_error(self, message: &str) -> Self {
        self.planner.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn actor_reply(self, reply: &str) -> Self {
        self.actor.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn actor_error(self, message: &str) -> Self {
        self.actor.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn critic_reply(self, reply: &str) -> Self {
        self.critic.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn critic_error(self, message: &str) -> Self {
        self.critic.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn notetaker_reply(self, reply: &str) -> Self {
        self.notetaker.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn planner_calls(&self) -> usize {
        self.planner_calls.load(Ordering::SeqCst)
    }

    pub fn actor_calls(&self) -> usize {
        self.actor_calls.load(Ordering::SeqCst)
    }

    pub fn critic_calls(&self) -> usize {
        self.critic_calls.load(Ordering::SeqCst)
    }

    pub fn notetaker_calls(&self) -> usize {
        self.notetaker_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.planner_calls() + self.actor_calls() + self.critic_calls() + self.notetaker_calls()
    }

    pub fn last_images(&self) -> Vec<String> {
        self.last_images.lock().unwrap().clone()
    }

    /// Message logs the actor was called with, oldest first.
    pub fn actor_contexts(&self) -> Vec<Vec<Value>> {
        self.actor_contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionModel for FakeModel {
    async fn predict(&self, prompt: &str, images: &[String]) -> Result<String, ModelError> {
        *self.last_images.lock().unwrap() = images.to_vec();
        if prompt.contains("### Outcome ###") {
            self.critic_calls.fetch_add(1, Ordering::SeqCst);
            next_reply(&self.critic, DEFAULT_CRITIC_REPLY)
        } else if prompt.contains("### Completed Subgoal ###") {
            self.planner_calls.fetch_add(1, Ordering::SeqCst);
            next_reply(&self.planner, DEFAULT_PLANNER_REPLY)
        } else {
            self.notetaker_calls.fetch_add(1, Ordering::SeqCst);
            next_reply(&self.notetaker, DEFAULT_NOTES_REPLY)
        }
    }

    async fn predict_with_context(&self, messages: &[Value]) -> Result<String, ModelError> {
        self.actor_calls.fetch_add(1, Ordering::SeqCst);
        self.actor_contexts.lock().unwrap().push(messages.to_vec());
        next_reply(&self.actor, DEFAULT_ACTOR_REPLY)
    }
}

/// Device primitive recorded by [`FakeDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Tap(i32, i32),
    DoubleTap(i32, i32),
    LongPress(i32, i32),
    Swipe(i32, i32, i32, i32),
    Type(String),
    Back,
    Home,
    Enter,
    OpenApp(String),
}

/// Records every primitive and serves scripted screenshots.
pub struct FakeDevice {
    size: Mutex<(u32, u32)>,
    screenshots: Mutex<VecDeque<Screenshot>>,
    screenshot_count: AtomicUsize,
    calls: Mutex<Vec<DeviceCall>>,
    fail_gestures: AtomicBool,
}

impl FakeDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Mutex::new((width, height)),
            screenshots: Mutex::new(VecDeque::new()),
            screenshot_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            fail_gestures: AtomicBool::new(false),
        }
    }

    /// Serve these screenshots first, then plain ones.
    pub fn with_screenshots(self, shots: Vec<Screenshot>) -> Self {
        self.screenshots.lock().unwrap().extend(shots);
        self
    }

    /// Make every gesture fail with a command error.
    pub fn with_failing_gestures(self) -> Self {
        self.fail_gestures.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_size(&self, width: u32, height: u32) {
        *self.size.lock().unwrap() = (width, height);
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn screenshot_count(&self) -> usize {
        self.screenshot_count.load(Ordering::SeqCst)
    }

    fn record(&self, call: DeviceCall) -> Result<(), DeviceError> {
        if self.fail_gestures.load(Ordering::SeqCst) {
            return Err(DeviceError::CommandFailed(format!("{:?} rejected", call)));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }

    /// Sensitive-page placeholder without the cost of encoding a PNG.
    pub fn sensitive_shot() -> Screenshot {
        Screenshot {
            base64_data: String::new(),
            width: 1080,
            height: 2400,
            is_fallback: true,
            is_sensitive: true,
        }
    }
}

#[async_trait]
impl DeviceController for FakeDevice {
    async fn screen_size(&self) -> Result<(u32, u32), DeviceError> {
        Ok(*self.size.lock().unwrap())
    }

    async fn screenshot_with_fallback(&self) -> Screenshot {
        let n = self.screenshot_count.fetch_add(1, Ordering::SeqCst);
        if let Some(shot) = self.screenshots.lock().unwrap().pop_front() {
            return shot;
        }
        let (width, height) = *self.size.lock().unwrap();
        Screenshot::new(format!("screen-{}", n), width, height)
    }

    async fn tap(&self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.record(DeviceCall::Tap(x, y))
    }

    async fn double_tap(&self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.record(DeviceCall::DoubleTap(x, y))
    }

    async fn long_press(&self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.record(DeviceCall::LongPress(x, y))
    }

    async fn swipe(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<(), DeviceError> {
        self.record(DeviceCall::Swipe(x1, y1, x2, y2))
    }

    async fn type_text(&self, text: &str) -> Result<(), DeviceError> {
        self.record(DeviceCall::Type(text.to_string()))
    }

    async fn back(&self) -> Result<(), DeviceError> {
        self.record(DeviceCall::Back)
    }

    async fn home(&self) -> Result<(), DeviceError> {
        self.record(DeviceCall::Home)
    }

    async fn enter(&self) -> Result<(), DeviceError> {
        self.record(DeviceCall::Enter)
    }

    async fn open_app(&self, identifier: &str) -> Result<(), DeviceError> {
        self.record(DeviceCall::OpenApp(identifier.to_string()))
    }
}

/// Fixed app list and name-to-package table.
#[derive(Default)]
pub struct FakeInventory {
    apps: Vec<AppInfo>,
    packages: HashMap<String, String>,
}

impl FakeInventory {
    pub fn with_package(mut self, name: &str, package: &str) -> Self {
        self.apps.push(AppInfo::new(name, false));
        self.packages
            .insert(name.to_lowercase(), package.to_string());
        self
    }

    pub fn with_app(mut self, app: AppInfo) -> Self {
        self.apps.push(app);
        self
    }
}

#[async_trait]
impl AppInventory for FakeInventory {
    async fn list_apps(&self) -> Vec<AppInfo> {
        self.apps.clone()
    }

    async fn find_package_for(&self, name: &str) -> Option<String> {
        self.packages.get(&name.trim().to_lowercase()).cloned()
    }
}

/// Interaction recorded by [`FakeSurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Show(String),
    Update(String),
    Hide,
    Visible(bool),
    Confirm(String),
    TakeOver(String),
    ReturnToHost,
}

/// Scripted human: answers confirmations from a queue (default approve).
#[derive(Default)]
pub struct FakeSurface {
    answers: Mutex<VecDeque<bool>>,
    hang_on_confirm: AtomicBool,
    events: Mutex<Vec<SurfaceEvent>>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers(self, answers: &[bool]) -> Self {
        self.answers.lock().unwrap().extend(answers.iter().copied());
        self
    }

    /// Never answer a confirmation.
    pub fn hanging(self) -> Self {
        self.hang_on_confirm.store(true, Ordering::SeqCst);
        self
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn confirm_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::Confirm(_)))
            .count()
    }

    fn record(&self, event: SurfaceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl StatusSurface for FakeSurface {
    async fn show(&self, message: &str) {
        self.record(SurfaceEvent::Show(message.to_string()));
    }

    async fn update(&self, message: &str) {
        self.record(SurfaceEvent::Update(message.to_string()));
    }

    async fn hide(&self) {
        self.record(SurfaceEvent::Hide);
    }

    async fn set_visible(&self, visible: bool) {
        self.record(SurfaceEvent::Visible(visible));
    }

    async fn confirm(&self, message: &str) -> bool {
        self.record(SurfaceEvent::Confirm(message.to_string()));
        if self.hang_on_confirm.load(Ordering::SeqCst) {
            return std::future::pending::<bool>().await;
        }
        self.answers.lock().unwrap().pop_front().unwrap_or(true)
    }

    async fn take_over(&self, message: &str) {
        self.record(SurfaceEvent::TakeOver(message.to_string()));
    }

    async fn return_to_host(&self) {
        self.record(SurfaceEvent::ReturnToHost);
    }
}

/// Skill matcher returning a fixed advisory.
#[derive(Default)]
pub struct FakeSkills {
    advisory: Option<String>,
    calls: AtomicUsize,
}

impl FakeSkills {
    pub fn returning(advisory: &str) -> Self {
        Self {
            advisory: Some(advisory.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SkillMatcher for FakeSkills {
    async fn generate_context(&self, _instruction: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.advisory.clone()
    }
}
