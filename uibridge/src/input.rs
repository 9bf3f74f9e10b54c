//! Text input strategies.
//!
//! Three mutually exclusive ways to get text into the first focusable field
//! of the current snapshot, trading speed against fidelity to real typing.
//! The fixed inter-step sleeps are best-effort accommodations for
//! asynchronous focus/keyboard state on the target surface, not guarantees.

use crate::element::{NodeAction, UiElement};
use crate::errors::AutomationError;
use crate::gesture::{GestureExecutor, StrokePath};
use crate::matcher;
use crate::platforms::AccessibilityBridge;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_KEYSTROKE_DELAY_MS: u64 = 50;

const FOCUS_SETTLE: Duration = Duration::from_millis(200);
const CLIPBOARD_SETTLE: Duration = Duration::from_millis(50);
const CLEAR_SETTLE: Duration = Duration::from_millis(100);

/// Which injection strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMethod {
    /// Set the value field in one call. Fastest, but bypasses any
    /// input-method side effects the target surface expects.
    Direct { focus_first: bool },
    /// Focus (or tap) the field, put the text on the clipboard, paste.
    Paste { clear: bool },
    /// One value-set per character, approximating keystroke-level input for
    /// surfaces that react to incremental changes.
    Keyboard { delay_ms: u64 },
}

pub struct TextInput {
    bridge: Arc<dyn AccessibilityBridge>,
    gestures: GestureExecutor,
}

impl TextInput {
    pub fn new(bridge: Arc<dyn AccessibilityBridge>) -> Self {
        let gestures = GestureExecutor::new(bridge.clone());
        Self { bridge, gestures }
    }

    /// Enter `text` into the first editable, enabled node under `root`.
    #[instrument(skip(self, root, text), fields(method = ?method, chars = text.chars().count()))]
    pub async fn enter_text(
        &self,
        root: &UiElement,
        text: &str,
        method: InputMethod,
    ) -> Result<(), AutomationError> {
        let target = matcher::find_first_focusable(root).ok_or_else(|| {
            AutomationError::ElementNotFound(
                "no editable, enabled element in the current snapshot".to_string(),
            )
        })?;
        match method {
            InputMethod::Direct { focus_first } => {
                if focus_first {
                    // Best effort; direct value set works on unfocused fields.
                    let _ = target.perform(NodeAction::Focus);
                }
                self.set_value(&target, text)
            }
            InputMethod::Paste { clear } => self.paste(&target, text, clear).await,
            InputMethod::Keyboard { delay_ms } => self.keystrokes(&target, text, delay_ms).await,
        }
    }

    fn set_value(&self, target: &UiElement, text: &str) -> Result<(), AutomationError> {
        if target.perform(NodeAction::SetText(text.to_string()))? {
            Ok(())
        } else {
            Err(AutomationError::ActionRejected(
                "target element refused the set-text action".to_string(),
            ))
        }
    }

    async fn paste(
        &self,
        target: &UiElement,
        text: &str,
        clear: bool,
    ) -> Result<(), AutomationError> {
        // Acquire focus programmatically; fall back to tapping the field.
        let focused = target.perform(NodeAction::Focus).unwrap_or(false);
        if !focused {
            debug!("focus action failed, tapping element center instead");
            let (x, y) = target.bounds()?.center();
            self.gestures.dispatch(StrokePath::tap(x, y)).await?;
        }
        tokio::time::sleep(FOCUS_SETTLE).await;

        if clear {
            self.clear_field(target)?;
            tokio::time::sleep(CLEAR_SETTLE).await;
        }

        self.bridge.set_clipboard(text)?;
        tokio::time::sleep(CLIPBOARD_SETTLE).await;

        match target.perform(NodeAction::Paste) {
            Ok(true) => Ok(()),
            // Paste rejected; direct value set is the last resort.
            Ok(false) => {
                debug!("paste rejected, falling back to direct value set");
                self.set_value(target, text)
            }
            Err(e) => Err(e),
        }
    }

    async fn keystrokes(
        &self,
        target: &UiElement,
        text: &str,
        delay_ms: u64,
    ) -> Result<(), AutomationError> {
        self.set_value(target, "")?;
        let delay = Duration::from_millis(delay_ms);
        let mut accumulated = String::with_capacity(text.len());
        for ch in text.chars() {
            accumulated.push(ch);
            self.set_value(target, &accumulated)?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    /// Select the full range, then overwrite with the empty string.
    fn clear_field(&self, target: &UiElement) -> Result<(), AutomationError> {
        let length = target
            .attributes()?
            .text
            .map(|text| text.chars().count())
            .unwrap_or(0);
        if length > 0 {
            let _ = target.perform(NodeAction::SetSelection(0, length))?;
        }
        let _ = target.perform(NodeAction::SetText(String::new()))?;
        Ok(())
    }
}

impl Default for InputMethod {
    fn default() -> Self {
        InputMethod::Direct { focus_first: false }
    }
}
