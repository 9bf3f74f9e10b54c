use crate::element::UiElement;
use crate::errors::AutomationError;
use crate::gesture::{GestureCompletion, StrokePath};

pub mod simulated;

/// System-level navigation actions performed without a target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAction {
    Back,
    Home,
    Recents,
    Notifications,
    QuickSettings,
}

impl GlobalAction {
    pub fn label(&self) -> &'static str {
        match self {
            GlobalAction::Back => "back",
            GlobalAction::Home => "home",
            GlobalAction::Recents => "recents",
            GlobalAction::Notifications => "notifications",
            GlobalAction::QuickSettings => "quick settings",
        }
    }
}

/// One top-level window as reported by the platform.
pub struct WindowInfo {
    pub root: Option<UiElement>,
    pub active: bool,
}

impl WindowInfo {
    /// True when the window has a resolvable root with at least one child.
    pub fn has_content(&self) -> bool {
        self.root
            .as_ref()
            .and_then(|root| root.child_count().ok())
            .is_some_and(|count| count > 0)
    }
}

/// The common trait every platform backend must implement.
///
/// This is the boundary between the engine and the device: the engine never
/// owns UI state, it only queries windows, injects input, and reads flags
/// through this trait.
#[async_trait::async_trait]
pub trait AccessibilityBridge: Send + Sync {
    /// Root of the currently active window. `Ok(None)` when the platform
    /// cannot name one right now (a transient, expected condition).
    fn active_window_root(&self) -> Result<Option<UiElement>, AutomationError>;

    /// All currently known top-level windows.
    fn windows(&self) -> Result<Vec<WindowInfo>, AutomationError>;

    /// Start asynchronous execution of a stroke. The platform must fire
    /// `completion` exactly once when the stroke finishes or is cancelled.
    async fn dispatch_gesture(
        &self,
        path: StrokePath,
        completion: GestureCompletion,
    ) -> Result<(), AutomationError>;

    /// Perform a system-level navigation action. The boolean is the
    /// platform's own acceptance flag, with no further detail available.
    fn perform_global_action(&self, action: GlobalAction) -> Result<bool, AutomationError>;

    /// Inject a raw key event by platform key code.
    fn send_key(&self, key_code: i32) -> Result<bool, AutomationError>;

    fn set_clipboard(&self, text: &str) -> Result<(), AutomationError>;

    /// Device display dimensions, if the platform can report them.
    fn display_size(&self) -> Option<(i32, i32)>;

    fn service_enabled(&self) -> bool;

    fn device_locked(&self) -> bool;

    /// Launch an application by package name.
    async fn launch_package(&self, package: &str) -> Result<bool, AutomationError>;
}
