//! Device actions and the parser for the actor's JSON action format.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Action parsing errors.
#[derive(Error, Debug, PartialEq)]
pub enum ActionError {
    #[error("No JSON object found in action text")]
    MissingJson,
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Missing required parameter '{param}' for {action}")]
    MissingParameter { action: String, param: &'static str },
}

/// Flat discriminant of an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Click,
    DoubleTap,
    LongPress,
    Swipe,
    TypeText,
    SystemButton,
    OpenApp,
    Wait,
    Answer,
    TakeOver,
    Invalid,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Click => "click",
            ActionType::DoubleTap => "double_tap",
            ActionType::LongPress => "long_press",
            ActionType::Swipe => "swipe",
            ActionType::TypeText => "type_text",
            ActionType::SystemButton => "system_button",
            ActionType::OpenApp => "open_app",
            ActionType::Wait => "wait",
            ActionType::Answer => "answer",
            ActionType::TakeOver => "take_over",
            ActionType::Invalid => "invalid",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        let kind = match normalized.as_str() {
            "click" | "tap" => ActionType::Click,
            "double_tap" | "double_click" => ActionType::DoubleTap,
            "long_press" => ActionType::LongPress,
            "swipe" | "scroll" => ActionType::Swipe,
            "type" | "type_text" | "input" => ActionType::TypeText,
            "system_button" | "key" => ActionType::SystemButton,
            "open_app" | "open" | "launch" => ActionType::OpenApp,
            "wait" => ActionType::Wait,
            "answer" => ActionType::Answer,
            "take_over" | "takeover" => ActionType::TakeOver,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hardware or navigation buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SystemButton {
    Back,
    Home,
    Enter,
}

impl SystemButton {
    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "back" => Some(SystemButton::Back),
            "home" => Some(SystemButton::Home),
            "enter" | "return" => Some(SystemButton::Enter),
            _ => None,
        }
    }
}

/// Type-dependent payload of an [`Action`].
///
/// Spatial fields are in the model's coordinate space: `[0, 999]` is
/// normalized, `>= 1000` is raw pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Click { x: f64, y: f64 },
    DoubleTap { x: f64, y: f64 },
    LongPress { x: f64, y: f64 },
    Swipe { x1: f64, y1: f64, x2: f64, y2: f64 },
    TypeText { text: String },
    SystemButton { button: SystemButton },
    OpenApp { app: String },
    Wait { duration: f64 },
    Answer { text: String },
    TakeOver,
    Invalid { raw: String },
}

/// One concrete device action chosen by the actor. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub kind: ActionKind,
    /// Human-readable note; on taps it marks the action as sensitive.
    pub message: Option<String>,
    pub need_confirm: bool,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            message: None,
            need_confirm: false,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_need_confirm(mut self, need_confirm: bool) -> Self {
        self.need_confirm = need_confirm;
        self
    }

    /// Placeholder for a reply that could not be parsed.
    pub fn invalid(raw: impl Into<String>) -> Self {
        Self::new(ActionKind::Invalid { raw: raw.into() })
    }

    pub fn action_type(&self) -> ActionType {
        match &self.kind {
            ActionKind::Click { .. } => ActionType::Click,
            ActionKind::DoubleTap { .. } => ActionType::DoubleTap,
            ActionKind::LongPress { .. } => ActionType::LongPress,
            ActionKind::Swipe { .. } => ActionType::Swipe,
            ActionKind::TypeText { .. } => ActionType::TypeText,
            ActionKind::SystemButton { .. } => ActionType::SystemButton,
            ActionKind::OpenApp { .. } => ActionType::OpenApp,
            ActionKind::Wait { .. } => ActionType::Wait,
            ActionKind::Answer { .. } => ActionType::Answer,
            ActionKind::TakeOver => ActionType::TakeOver,
            ActionKind::Invalid { .. } => ActionType::Invalid,
        }
    }

    /// Whether a human must approve this action before it runs.
    ///
    /// Two independent triggers: the explicit `need_confirm` flag, and any
    /// tap-like action that carries a message.
    pub fn requires_confirmation(&self) -> bool {
        if self.need_confirm {
            return true;
        }
        let tap_like = matches!(
            self.action_type(),
            ActionType::Click | ActionType::DoubleTap | ActionType::LongPress
        );
        tap_like && self.message.is_some()
    }

    /// Text shown to the human when confirmation is requested.
    pub fn confirmation_prompt(&self) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => format!("Allow the agent to perform: {}?", self),
        }
    }

    /// Compact JSON form used in prompts and logs.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_string())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActionKind::Click { x, y } => write!(f, "click({}, {})", x, y),
            ActionKind::DoubleTap { x, y } => write!(f, "double_tap({}, {})", x, y),
            ActionKind::LongPress { x, y } => write!(f, "long_press({}, {})", x, y),
            ActionKind::Swipe { x1, y1, x2, y2 } => {
                write!(f, "swipe({}, {} -> {}, {})", x1, y1, x2, y2)
            }
            ActionKind::TypeText { text } => write!(f, "type_text({:?})", text),
            ActionKind::SystemButton { button } => write!(f, "system_button({:?})", button),
            ActionKind::OpenApp { app } => write!(f, "open_app({:?})", app),
            ActionKind::Wait { duration } => write!(f, "wait({}s)", duration),
            ActionKind::Answer { text } => write!(f, "answer({:?})", text),
            ActionKind::TakeOver => write!(f, "take_over"),
            ActionKind::Invalid { .. } => write!(f, "invalid"),
        }
    }
}

/// Parse the actor's action text, e.g. `{"action": "click", "coordinate": [500, 300]}`.
///
/// Surrounding prose and markdown fences are tolerated; the first `{` to the
/// last `}` is taken as the JSON object.
pub fn parse_action(text: &str) -> Result<Action, ActionError> {
    let start = text.find('{').ok_or(ActionError::MissingJson)?;
    let end = text.rfind('}').ok_or(ActionError::MissingJson)?;
    if end < start {
        return Err(ActionError::MissingJson);
    }

    let value: Value = serde_json::from_str(&text[start..=end])
        .map_err(|e| ActionError::InvalidJson(e.to_string()))?;
    action_from_value(&value)
}

fn action_from_value(value: &Value) -> Result<Action, ActionError> {
    let name = value
        .get("action")
        .or_else(|| value.get("action_type"))
        .and_then(|v| v.as_str())
        .ok_or(ActionError::MissingParameter {
            action: "<unknown>".to_string(),
            param: "action",
        })?;
    let action_type =
        ActionType::from_name(name).ok_or_else(|| ActionError::UnknownAction(name.to_string()))?;

    let missing = |param: &'static str| ActionError::MissingParameter {
        action: action_type.to_string(),
        param,
    };

    let kind = match action_type {
        ActionType::Click | ActionType::DoubleTap | ActionType::LongPress => {
            let (x, y) = point(value, &["coordinate", "element", "point"])
                .ok_or_else(|| missing("coordinate"))?;
            match action_type {
                ActionType::Click => ActionKind::Click { x, y },
                ActionType::DoubleTap => ActionKind::DoubleTap { x, y },
                _ => ActionKind::LongPress { x, y },
            }
        }
        ActionType::Swipe => {
            let (x1, y1) =
                point(value, &["coordinate", "start"]).ok_or_else(|| missing("coordinate"))?;
            let (x2, y2) =
                point(value, &["coordinate2", "end"]).ok_or_else(|| missing("coordinate2"))?;
            ActionKind::Swipe { x1, y1, x2, y2 }
        }
        ActionType::TypeText => ActionKind::TypeText {
            text: string_field(value, &["text", "content"]).ok_or_else(|| missing("text"))?,
        },
        ActionType::SystemButton => {
            let name = string_field(value, &["button", "text", "key"])
                .ok_or_else(|| missing("button"))?;
            let button = SystemButton::parse(&name)
                .ok_or_else(|| ActionError::UnknownAction(format!("system_button {}", name)))?;
            ActionKind::SystemButton { button }
        }
        ActionType::OpenApp => ActionKind::OpenApp {
            app: string_field(value, &["text", "app", "app_name"])
                .ok_or_else(|| missing("text"))?,
        },
        ActionType::Wait => {
            let duration = match value.get("duration").or_else(|| value.get("time")) {
                None => 1.0,
                Some(_) => duration_field(value).ok_or_else(|| missing("duration"))?,
            };
            ActionKind::Wait { duration }
        }
        ActionType::Answer => ActionKind::Answer {
            text: string_field(value, &["text", "answer"]).ok_or_else(|| missing("text"))?,
        },
        ActionType::TakeOver => ActionKind::TakeOver,
        ActionType::Invalid => unreachable!("invalid is never produced by from_name"),
    };

    let mut action = Action::new(kind);
    if let Some(message) = string_field(value, &["message"]).filter(|m| !m.trim().is_empty()) {
        action.message = Some(message);
    } else if action_type == ActionType::TakeOver {
        action.message = string_field(value, &["text"]);
    }
    action.need_confirm = value
        .get("need_confirm")
        .or_else(|| value.get("needConfirm"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    Ok(action)
}

/// Finite numbers only; `parse::<f64>` also accepts "NaN" and "inf".
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn point(value: &Value, keys: &[&str]) -> Option<(f64, f64)> {
    keys.iter().find_map(|key| {
        let arr = value.get(*key)?.as_array()?;
        if arr.len() < 2 {
            return None;
        }
        Some((number(&arr[0])?, number(&arr[1])?))
    })
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(|s| s.to_string())
}

/// Accepts `2`, `"2"`, or `"2 seconds"`.
fn duration_field(value: &Value) -> Option<f64> {
    let raw = value.get("duration").or_else(|| value.get("time"))?;
    match raw {
        Value::String(s) => s
            .replace("seconds", "")
            .replace('s', "")
            .trim()
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite()),
        other => number(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_click() {
        let action = parse_action(r#"{"action": "click", "coordinate": [500, 300]}"#).unwrap();
        assert_eq!(action.kind, ActionKind::Click { x: 500.0, y: 300.0 });
        assert!(!action.requires_confirmation());
    }

    #[test]
    fn test_parse_tolerates_fences_and_prose() {
        let text = "Here you go:\n```json\n{\"action\": \"open_app\", \"text\": \"Spotify\"}\n```";
        let action = parse_action(text).unwrap();
        assert_eq!(
            action.kind,
            ActionKind::OpenApp {
                app: "Spotify".to_string()
            }
        );
    }

    #[test]
    fn test_parse_swipe_and_aliases() {
        let action = parse_action(
            r#"{"action": "swipe", "coordinate": [500, 800], "coordinate2": ["500", "200"]}"#,
        )
        .unwrap();
        assert_eq!(
            action.kind,
            ActionKind::Swipe {
                x1: 500.0,
                y1: 800.0,
                x2: 500.0,
                y2: 200.0
            }
        );

        let action = parse_action(r#"{"action": "Type", "text": "hello"}"#).unwrap();
        assert_eq!(action.action_type(), ActionType::TypeText);
    }

    #[test]
    fn test_parse_system_button() {
        let action = parse_action(r#"{"action": "system_button", "button": "back"}"#).unwrap();
        assert_eq!(
            action.kind,
            ActionKind::SystemButton {
                button: SystemButton::Back
            }
        );
        assert!(parse_action(r#"{"action": "system_button", "button": "volume"}"#).is_err());
    }

    #[test]
    fn test_parse_wait_duration_forms() {
        let a = parse_action(r#"{"action": "wait", "duration": "3 seconds"}"#).unwrap();
        assert_eq!(a.kind, ActionKind::Wait { duration: 3.0 });
        let a = parse_action(r#"{"action": "wait"}"#).unwrap();
        assert_eq!(a.kind, ActionKind::Wait { duration: 1.0 });
    }

    #[test]
    fn test_non_finite_numbers_are_rejected() {
        for raw in [
            r#"{"action": "wait", "duration": "NaN"}"#,
            r#"{"action": "wait", "duration": "inf"}"#,
            r#"{"action": "wait", "time": "infinity"}"#,
            r#"{"action": "click", "coordinate": ["NaN", "NaN"]}"#,
            r#"{"action": "click", "coordinate": [500, "inf"]}"#,
            r#"{"action": "swipe", "coordinate": [500, 800], "coordinate2": ["-inf", 200]}"#,
        ] {
            assert!(
                matches!(parse_action(raw), Err(ActionError::MissingParameter { .. })),
                "accepted {}",
                raw
            );
        }
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(parse_action("tap the button"), Err(ActionError::MissingJson));
        assert!(matches!(
            parse_action(r#"{"action": "fly"}"#),
            Err(ActionError::UnknownAction(_))
        ));
        assert!(matches!(
            parse_action(r#"{"action": "click"}"#),
            Err(ActionError::MissingParameter { .. })
        ));
        assert!(matches!(
            parse_action("{not json}"),
            Err(ActionError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_confirmation_triggers() {
        let tap_with_message =
            parse_action(r#"{"action": "click", "coordinate": [1, 2], "message": "Pay 5 USD"}"#)
                .unwrap();
        assert!(tap_with_message.requires_confirmation());
        assert_eq!(tap_with_message.confirmation_prompt(), "Pay 5 USD");

        let flagged =
            parse_action(r#"{"action": "type", "text": "x", "need_confirm": true}"#).unwrap();
        assert!(flagged.requires_confirmation());

        let swipe_with_message = parse_action(
            r#"{"action": "swipe", "coordinate": [1, 2], "coordinate2": [3, 4], "message": "m"}"#,
        )
        .unwrap();
        assert!(!swipe_with_message.requires_confirmation());

        let empty_message =
            parse_action(r#"{"action": "click", "coordinate": [1, 2], "message": " "}"#).unwrap();
        assert!(!empty_message.requires_confirmation());
    }

    #[test]
    fn test_take_over_message_falls_back_to_text() {
        let action = parse_action(r#"{"action": "take_over", "text": "Please log in"}"#).unwrap();
        assert_eq!(action.kind, ActionKind::TakeOver);
        assert_eq!(action.message.as_deref(), Some("Please log in"));
    }
}
