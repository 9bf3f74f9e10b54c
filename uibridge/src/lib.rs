//! UI automation engine for driving an on-screen interface remotely.
//!
//! A controller issues high-level commands (tap, swipe, type text, query UI
//! state) over a local protocol; this crate turns them into device input and
//! serialized views of the live UI element tree, reached through the
//! [`platforms::AccessibilityBridge`] seam. The engine never owns UI state:
//! it holds transient, read-only handles that may be invalidated by any UI
//! mutation, and every command folds into a uniform
//! [`CommandResult`] envelope.

use std::sync::Arc;

pub mod dispatch;
pub mod element;
pub mod errors;
pub mod gesture;
pub mod input;
pub mod matcher;
pub mod platforms;
pub mod selector;
pub mod serialize;
pub mod snapshot;
#[cfg(test)]
mod tests;

pub use dispatch::{Command, CommandResult, Dispatcher};
pub use element::{Bounds, NodeAction, NodeAttributes, UiElement, UiNodeHandle};
pub use errors::AutomationError;
pub use gesture::{GestureExecutor, StrokePath, StrokePoint};
pub use input::InputMethod;
pub use selector::MatchPredicate;
pub use serialize::{ElementRecord, HierarchyRecord};

/// The single live engine instance, injected into whatever transport serves
/// it. There is deliberately no global: a transport that has not been handed
/// an engine represents the "not yet attached" state as `Option<…>`.
pub struct AutomationEngine {
    dispatcher: Dispatcher,
}

impl AutomationEngine {
    pub fn new(bridge: Arc<dyn platforms::AccessibilityBridge>) -> Self {
        Self {
            dispatcher: Dispatcher::new(bridge),
        }
    }

    /// Execute one command; never faults, always yields an envelope.
    pub async fn dispatch(&self, command: Command) -> CommandResult {
        self.dispatcher.dispatch(command).await
    }

    /// Whether the platform's accessibility layer is currently enabled.
    pub fn service_enabled(&self) -> bool {
        self.dispatcher.bridge().service_enabled()
    }

    /// Feed a window-lifecycle change notification into the snapshot cache.
    pub fn notify_window_changed(&self) {
        self.dispatcher.accessor().notify_window_changed();
    }
}
