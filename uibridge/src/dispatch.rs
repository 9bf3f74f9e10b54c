//! Command dispatch: maps inbound `{action, params}` envelopes onto engine
//! operations and folds every outcome into a uniform result envelope.
//!
//! `dispatch` is total over the closed action set; unrecognized actions and
//! invalid parameters become failure results, never faults that reach the
//! transport layer.

use crate::element::UiElement;
use crate::errors::AutomationError;
use crate::gesture::{
    GestureExecutor, StrokePath, DEFAULT_LONG_PRESS_MS, DEFAULT_SWIPE_MS,
};
use crate::input::{InputMethod, TextInput, DEFAULT_KEYSTROKE_DELAY_MS};
use crate::matcher;
use crate::platforms::{AccessibilityBridge, GlobalAction};
use crate::selector::MatchPredicate;
use crate::serialize::ElementSerializer;
use crate::snapshot::SnapshotAccessor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// An inbound request, immutable once parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct Command {
    pub action: String,
    #[serde(default)]
    pub params: Value,
}

impl Command {
    pub fn new(action: impl Into<String>, params: Value) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }
}

/// The uniform result envelope. Every handler produces exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn ok_with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

// Per-action parameter schemas, validated before any device action.

#[derive(Debug, Deserialize)]
struct TapParams {
    x: i64,
    y: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwipeParams {
    start_x: i64,
    start_y: i64,
    end_x: i64,
    end_y: i64,
    #[serde(default = "default_swipe_duration")]
    duration: u64,
}

#[derive(Debug, Deserialize)]
struct LongPressParams {
    x: i64,
    y: i64,
    #[serde(default = "default_long_press_duration")]
    duration: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectorParams {
    text: Option<String>,
    resource_id: Option<String>,
    desc: Option<String>,
    class_name: Option<String>,
}

impl From<SelectorParams> for MatchPredicate {
    fn from(params: SelectorParams) -> Self {
        MatchPredicate {
            text: params.text,
            resource_id: params.resource_id,
            description: params.desc,
            class_name: params.class_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TapElementParams {
    #[serde(flatten)]
    selector: SelectorParams,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct InputTextParams {
    text: String,
    #[serde(default)]
    focus: bool,
}

#[derive(Debug, Deserialize)]
struct InputPasteParams {
    text: String,
    #[serde(default = "default_true")]
    clear: bool,
}

#[derive(Debug, Deserialize)]
struct InputKeyboardParams {
    text: String,
    #[serde(default = "default_keystroke_delay")]
    delay: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyParams {
    key_code: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartAppParams {
    package_name: String,
}

fn default_swipe_duration() -> u64 {
    DEFAULT_SWIPE_MS
}

fn default_long_press_duration() -> u64 {
    DEFAULT_LONG_PRESS_MS
}

fn default_keystroke_delay() -> u64 {
    DEFAULT_KEYSTROKE_DELAY_MS
}

fn default_true() -> bool {
    true
}

fn parse<T: DeserializeOwned>(params: &Value) -> Result<T, AutomationError> {
    let value = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params.clone()
    };
    serde_json::from_value(value)
        .map_err(|e| AutomationError::InvalidArgument(format!("invalid parameters: {e}")))
}

// Coordinates are narrowed to i32 for the gesture path, so the accepted
// range must be checked here rather than discovered by wrapping later.
fn require_coordinates(pairs: &[(&str, i64)]) -> Result<(), AutomationError> {
    for (name, value) in pairs {
        if *value < 0 {
            return Err(AutomationError::InvalidArgument(format!(
                "coordinate {name} must be non-negative, got {value}"
            )));
        }
        if *value > i32::MAX as i64 {
            return Err(AutomationError::InvalidArgument(format!(
                "coordinate {name} exceeds the device coordinate range, got {value}"
            )));
        }
    }
    Ok(())
}

/// Maps command names to engine operations. One instance serves all
/// concurrent connections; no cross-command ordering is guaranteed.
pub struct Dispatcher {
    bridge: Arc<dyn AccessibilityBridge>,
    accessor: SnapshotAccessor,
    gestures: GestureExecutor,
    input: TextInput,
    serializer: ElementSerializer,
}

impl Dispatcher {
    pub fn new(bridge: Arc<dyn AccessibilityBridge>) -> Self {
        Self {
            accessor: SnapshotAccessor::new(bridge.clone()),
            gestures: GestureExecutor::new(bridge.clone()),
            input: TextInput::new(bridge.clone()),
            serializer: ElementSerializer::new(bridge.clone()),
            bridge,
        }
    }

    pub fn accessor(&self) -> &SnapshotAccessor {
        &self.accessor
    }

    pub fn bridge(&self) -> &Arc<dyn AccessibilityBridge> {
        &self.bridge
    }

    /// Total over the action set; every error becomes a failure envelope.
    #[instrument(skip(self, command), fields(action = %command.action))]
    pub async fn dispatch(&self, command: Command) -> CommandResult {
        let outcome = match command.action.as_str() {
            "tap" => self.tap(&command.params).await,
            "tap_element" => self.tap_element(&command.params).await,
            "swipe" => self.swipe(&command.params).await,
            "long_press" => self.long_press(&command.params).await,
            "input_text" => self.input_text(&command.params).await,
            "input_paste" => self.input_paste(&command.params).await,
            "input_keyboard" => self.input_keyboard(&command.params).await,
            "key" => self.key(&command.params),
            "find_element" => self.find_element(&command.params).await,
            "dump" => self.dump().await,
            "scroll_forward" => self.scroll(&command.params, true).await,
            "scroll_backward" => self.scroll(&command.params, false).await,
            "back" => self.global(GlobalAction::Back),
            "home" => self.global(GlobalAction::Home),
            "recent" => self.global(GlobalAction::Recents),
            "notifications" => self.global(GlobalAction::Notifications),
            "quick_settings" => self.global(GlobalAction::QuickSettings),
            "start_app" => self.start_app(&command.params).await,
            other => Err(AutomationError::UnknownAction(other.to_string())),
        };
        match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!("command failed: {e}");
                CommandResult::fail(e.to_string())
            }
        }
    }

    async fn require_root(&self) -> Result<UiElement, AutomationError> {
        match self.accessor.acquire_root().await {
            Some(root) => Ok(root),
            None => Err(AutomationError::NoSnapshot(self.accessor.diagnostics())),
        }
    }

    async fn tap(&self, params: &Value) -> Result<CommandResult, AutomationError> {
        let params: TapParams = parse(params)?;
        require_coordinates(&[("x", params.x), ("y", params.y)])?;
        self.gestures
            .dispatch(StrokePath::tap(params.x as i32, params.y as i32))
            .await?;
        Ok(CommandResult::ok(format!(
            "Tapped ({}, {})",
            params.x, params.y
        )))
    }

    async fn long_press(&self, params: &Value) -> Result<CommandResult, AutomationError> {
        let params: LongPressParams = parse(params)?;
        require_coordinates(&[("x", params.x), ("y", params.y)])?;
        self.gestures
            .dispatch(StrokePath::long_press(
                params.x as i32,
                params.y as i32,
                params.duration,
            ))
            .await?;
        Ok(CommandResult::ok(format!(
            "Long-pressed ({}, {}) for {}ms",
            params.x, params.y, params.duration
        )))
    }

    async fn swipe(&self, params: &Value) -> Result<CommandResult, AutomationError> {
        let params: SwipeParams = parse(params)?;
        require_coordinates(&[
            ("startX", params.start_x),
            ("startY", params.start_y),
            ("endX", params.end_x),
            ("endY", params.end_y),
        ])?;
        self.gestures
            .dispatch(StrokePath::swipe(
                params.start_x as i32,
                params.start_y as i32,
                params.end_x as i32,
                params.end_y as i32,
                params.duration,
            ))
            .await?;
        Ok(CommandResult::ok(format!(
            "Swiped ({}, {}) -> ({}, {})",
            params.start_x, params.start_y, params.end_x, params.end_y
        )))
    }

    async fn tap_element(&self, params: &Value) -> Result<CommandResult, AutomationError> {
        let params: TapElementParams = parse(params)?;
        let predicate = MatchPredicate::from(params.selector);
        if predicate.is_empty() {
            return Err(AutomationError::InvalidArgument(
                "tap_element requires at least one of text, resourceId, desc, className"
                    .to_string(),
            ));
        }
        let root = self.require_root().await?;
        let matches = matcher::find_all(&root, &predicate);
        if matches.is_empty() {
            return Err(AutomationError::ElementNotFound(format!(
                "no element matching {}",
                predicate.describe()
            )));
        }
        let element = matches.get(params.index).ok_or_else(|| {
            AutomationError::IndexOutOfRange(format!(
                "index {} with only {} match(es) for {}",
                params.index,
                matches.len(),
                predicate.describe()
            ))
        })?;
        let (x, y) = element.bounds()?.center();
        self.gestures.dispatch(StrokePath::tap(x, y)).await?;
        Ok(CommandResult::ok(format!(
            "Tapped element {} of {} at ({x}, {y})",
            params.index,
            matches.len()
        )))
    }

    async fn find_element(&self, params: &Value) -> Result<CommandResult, AutomationError> {
        let selector: SelectorParams = parse(params)?;
        let predicate = MatchPredicate::from(selector);
        if predicate.is_empty() {
            return Err(AutomationError::InvalidArgument(
                "find_element requires at least one of text, resourceId, desc, className"
                    .to_string(),
            ));
        }
        let root = self.require_root().await?;
        let matches = matcher::find_all(&root, &predicate);
        if matches.is_empty() {
            return Err(AutomationError::ElementNotFound(format!(
                "no element matching {}",
                predicate.describe()
            )));
        }
        let records: Vec<Value> = matches
            .iter()
            .filter_map(|element| match self.serializer.serialize(element) {
                Ok(record) => serde_json::to_value(record).ok(),
                Err(e) => {
                    debug!("dropping match that went stale: {e}");
                    None
                }
            })
            .collect();
        let count = records.len();
        Ok(CommandResult::ok_with_data(
            format!("Found {count} matching element(s)"),
            Value::Array(records),
        ))
    }

    async fn dump(&self) -> Result<CommandResult, AutomationError> {
        let root = self.require_root().await?;
        let hierarchy = self.serializer.serialize_subtree(&root)?;
        let node_count = hierarchy.node_count();
        let data = serde_json::to_value(hierarchy)
            .map_err(|e| AutomationError::PlatformError(format!("serialization failed: {e}")))?;
        Ok(CommandResult::ok_with_data(
            format!("UI hierarchy captured ({node_count} nodes)"),
            data,
        ))
    }

    async fn scroll(
        &self,
        params: &Value,
        forward: bool,
    ) -> Result<CommandResult, AutomationError> {
        use crate::element::NodeAction;

        let selector: SelectorParams = parse(params)?;
        let predicate = MatchPredicate::from(selector);
        let root = self.require_root().await?;
        let action = if forward {
            NodeAction::ScrollForward
        } else {
            NodeAction::ScrollBackward
        };
        let direction = if forward { "forward" } else { "backward" };

        let mut saw_scrollable = false;
        for element in matcher::find_all(&root, &predicate) {
            let scrollable = element
                .attributes()
                .map(|attrs| attrs.scrollable)
                .unwrap_or(false);
            if !scrollable {
                continue;
            }
            saw_scrollable = true;
            // First accepted scroll wins.
            if element.perform(action.clone()).unwrap_or(false) {
                return Ok(CommandResult::ok(format!("Scrolled {direction}")));
            }
        }
        if saw_scrollable {
            Err(AutomationError::ActionRejected(format!(
                "no scrollable element accepted the {direction} scroll"
            )))
        } else {
            Err(AutomationError::ElementNotFound(format!(
                "no scrollable element matching {}",
                predicate.describe()
            )))
        }
    }

    async fn input_text(&self, params: &Value) -> Result<CommandResult, AutomationError> {
        let params: InputTextParams = parse(params)?;
        let root = self.require_root().await?;
        self.input
            .enter_text(
                &root,
                &params.text,
                InputMethod::Direct {
                    focus_first: params.focus,
                },
            )
            .await?;
        Ok(CommandResult::ok(format!(
            "Entered {} character(s)",
            params.text.chars().count()
        )))
    }

    async fn input_paste(&self, params: &Value) -> Result<CommandResult, AutomationError> {
        let params: InputPasteParams = parse(params)?;
        let root = self.require_root().await?;
        self.input
            .enter_text(
                &root,
                &params.text,
                InputMethod::Paste {
                    clear: params.clear,
                },
            )
            .await?;
        Ok(CommandResult::ok(format!(
            "Pasted {} character(s)",
            params.text.chars().count()
        )))
    }

    async fn input_keyboard(&self, params: &Value) -> Result<CommandResult, AutomationError> {
        let params: InputKeyboardParams = parse(params)?;
        let root = self.require_root().await?;
        self.input
            .enter_text(
                &root,
                &params.text,
                InputMethod::Keyboard {
                    delay_ms: params.delay,
                },
            )
            .await?;
        Ok(CommandResult::ok(format!(
            "Typed {} character(s)",
            params.text.chars().count()
        )))
    }

    fn key(&self, params: &Value) -> Result<CommandResult, AutomationError> {
        let params: KeyParams = parse(params)?;
        if self.bridge.send_key(params.key_code)? {
            Ok(CommandResult::ok(format!(
                "Sent key code {}",
                params.key_code
            )))
        } else {
            Err(AutomationError::ActionRejected(format!(
                "platform refused key code {}",
                params.key_code
            )))
        }
    }

    fn global(&self, action: GlobalAction) -> Result<CommandResult, AutomationError> {
        if self.bridge.perform_global_action(action)? {
            Ok(CommandResult::ok(format!(
                "Performed {} action",
                action.label()
            )))
        } else {
            Err(AutomationError::ActionRejected(format!(
                "platform refused the {} action",
                action.label()
            )))
        }
    }

    async fn start_app(&self, params: &Value) -> Result<CommandResult, AutomationError> {
        let params: StartAppParams = parse(params)?;
        if params.package_name.is_empty() {
            return Err(AutomationError::InvalidArgument(
                "packageName must not be empty".to_string(),
            ));
        }
        if self.bridge.launch_package(&params.package_name).await? {
            Ok(CommandResult::ok(format!(
                "Launched {}",
                params.package_name
            )))
        } else {
            Err(AutomationError::ActionRejected(format!(
                "could not launch {}",
                params.package_name
            )))
        }
    }
}
