//! In-memory platform backend.
//!
//! Serves a scriptable UI tree through the `AccessibilityBridge` seam so the
//! engine can run without a real device: the server uses it as a development
//! backend and the test suite drives every failure path through it (stale
//! handles, failing live queries, cancelled or never-confirming gestures).

use crate::element::{Bounds, NodeAction, NodeAttributes, UiElement, UiNodeHandle};
use crate::errors::AutomationError;
use crate::gesture::{GestureCompletion, StrokePath};
use crate::platforms::{AccessibilityBridge, GlobalAction, WindowInfo};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Discriminant of a `NodeAction`, used to script per-node rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Focus,
    SetText,
    SetSelection,
    Paste,
    ScrollForward,
    ScrollBackward,
}

fn kind_of(action: &NodeAction) -> ActionKind {
    match action {
        NodeAction::Focus => ActionKind::Focus,
        NodeAction::SetText(_) => ActionKind::SetText,
        NodeAction::SetSelection(_, _) => ActionKind::SetSelection,
        NodeAction::Paste => ActionKind::Paste,
        NodeAction::ScrollForward => ActionKind::ScrollForward,
        NodeAction::ScrollBackward => ActionKind::ScrollBackward,
    }
}

type SharedClipboard = Arc<Mutex<Option<String>>>;

struct SimNodeState {
    attrs: Mutex<NodeAttributes>,
    bounds: Mutex<Bounds>,
    children: Mutex<Vec<SimNode>>,
    invalidated: AtomicBool,
    performed: Mutex<Vec<NodeAction>>,
    rejected: Mutex<Vec<ActionKind>>,
    clipboard: Mutex<Option<SharedClipboard>>,
}

/// One scriptable node of a simulated UI tree.
///
/// Cloning is shallow: clones share state, so tests can keep a handle to a
/// node after handing the tree to the platform and mutate it mid-scenario.
#[derive(Clone)]
pub struct SimNode {
    state: Arc<SimNodeState>,
}

impl SimNode {
    pub fn new(class_name: &str) -> Self {
        let attrs = NodeAttributes {
            class_name: class_name.to_string(),
            enabled: true,
            visible: true,
            ..Default::default()
        };
        Self {
            state: Arc::new(SimNodeState {
                attrs: Mutex::new(attrs),
                bounds: Mutex::new(Bounds::new(0, 0, 100, 100)),
                children: Mutex::new(Vec::new()),
                invalidated: AtomicBool::new(false),
                performed: Mutex::new(Vec::new()),
                rejected: Mutex::new(Vec::new()),
                clipboard: Mutex::new(None),
            }),
        }
    }

    // Builder-style setup, consumed fluently when assembling trees.

    pub fn text(self, text: &str) -> Self {
        lock(&self.state.attrs).text = Some(text.to_string());
        self
    }

    pub fn description(self, desc: &str) -> Self {
        lock(&self.state.attrs).description = Some(desc.to_string());
        self
    }

    pub fn resource_id(self, id: &str) -> Self {
        lock(&self.state.attrs).resource_id = Some(id.to_string());
        self
    }

    pub fn package(self, package: &str) -> Self {
        lock(&self.state.attrs).package = Some(package.to_string());
        self
    }

    pub fn bounds(self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        *lock(&self.state.bounds) = Bounds::new(left, top, right, bottom);
        self
    }

    pub fn clickable(self) -> Self {
        lock(&self.state.attrs).clickable = true;
        self
    }

    pub fn scrollable(self) -> Self {
        lock(&self.state.attrs).scrollable = true;
        self
    }

    pub fn editable(self) -> Self {
        {
            let mut attrs = lock(&self.state.attrs);
            attrs.editable = true;
            attrs.focusable = true;
        }
        self
    }

    pub fn focusable(self) -> Self {
        lock(&self.state.attrs).focusable = true;
        self
    }

    pub fn disabled(self) -> Self {
        lock(&self.state.attrs).enabled = false;
        self
    }

    pub fn invisible(self) -> Self {
        lock(&self.state.attrs).visible = false;
        self
    }

    pub fn checkable(self, checked: bool) -> Self {
        {
            let mut attrs = lock(&self.state.attrs);
            attrs.checkable = true;
            attrs.checked = checked;
        }
        self
    }

    pub fn selected(self) -> Self {
        lock(&self.state.attrs).selected = true;
        self
    }

    pub fn child(self, child: SimNode) -> Self {
        lock(&self.state.children).push(child);
        self
    }

    // Runtime controls for scripting scenarios.

    /// Mark the handle stale: every subsequent access through the
    /// `UiNodeHandle` seam fails, as after a real UI mutation.
    pub fn invalidate(&self) {
        self.state.invalidated.store(true, Ordering::SeqCst);
    }

    /// Make the node report `false` for the given action kind.
    pub fn reject(&self, kind: ActionKind) {
        lock(&self.state.rejected).push(kind);
    }

    /// Actions performed on this node so far, in order.
    pub fn performed(&self) -> Vec<NodeAction> {
        lock(&self.state.performed).clone()
    }

    pub fn text_value(&self) -> Option<String> {
        lock(&self.state.attrs).text.clone()
    }

    pub fn is_focused(&self) -> bool {
        lock(&self.state.attrs).focused
    }

    /// Engine-side handle to this node.
    pub fn element(&self) -> UiElement {
        UiElement::new(Arc::new(self.clone()))
    }

    fn check_live(&self) -> Result<(), AutomationError> {
        if self.state.invalidated.load(Ordering::SeqCst) {
            Err(AutomationError::StaleHandle(
                "node handle was invalidated".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl UiNodeHandle for SimNode {
    fn attributes(&self) -> Result<NodeAttributes, AutomationError> {
        self.check_live()?;
        Ok(lock(&self.state.attrs).clone())
    }

    fn bounds(&self) -> Result<Bounds, AutomationError> {
        self.check_live()?;
        Ok(*lock(&self.state.bounds))
    }

    fn child_count(&self) -> Result<usize, AutomationError> {
        self.check_live()?;
        Ok(lock(&self.state.children).len())
    }

    fn child(&self, index: usize) -> Result<Option<UiElement>, AutomationError> {
        self.check_live()?;
        match lock(&self.state.children).get(index) {
            Some(child) if child.state.invalidated.load(Ordering::SeqCst) => Err(
                AutomationError::StaleHandle(format!("child {index} could not be resolved")),
            ),
            Some(child) => Ok(Some(child.element())),
            None => Ok(None),
        }
    }

    fn perform(&self, action: NodeAction) -> Result<bool, AutomationError> {
        self.check_live()?;
        lock(&self.state.performed).push(action.clone());
        if lock(&self.state.rejected).contains(&kind_of(&action)) {
            return Ok(false);
        }
        let mut attrs = lock(&self.state.attrs);
        match action {
            NodeAction::Focus => {
                attrs.focused = true;
                Ok(true)
            }
            NodeAction::SetText(value) => {
                if !attrs.editable {
                    return Ok(false);
                }
                attrs.text = Some(value);
                Ok(true)
            }
            NodeAction::SetSelection(_, _) => Ok(attrs.editable),
            NodeAction::Paste => {
                if !attrs.editable {
                    return Ok(false);
                }
                let pasted = lock(&self.state.clipboard)
                    .as_ref()
                    .and_then(|clipboard| lock(clipboard).clone());
                if let Some(content) = pasted {
                    attrs.text = Some(content);
                }
                Ok(true)
            }
            NodeAction::ScrollForward | NodeAction::ScrollBackward => Ok(attrs.scrollable),
        }
    }
}

/// How the simulated platform resolves dispatched gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureMode {
    /// Confirm after the stroke's duration has elapsed.
    Complete,
    /// Cancel immediately.
    Cancel,
    /// Hold the completion signal without ever firing it.
    Hang,
}

struct PlatformState {
    active_root: Mutex<Option<SimNode>>,
    windows: Mutex<Vec<(SimNode, bool)>>,
    /// Remaining active-window queries that answer "no window".
    live_failures: AtomicUsize,
    gestures: Mutex<Vec<StrokePath>>,
    gesture_mode: Mutex<GestureMode>,
    pending: Mutex<Vec<GestureCompletion>>,
    global_actions: Mutex<Vec<GlobalAction>>,
    global_accepts: AtomicBool,
    keys: Mutex<Vec<i32>>,
    clipboard: SharedClipboard,
    display: Mutex<Option<(i32, i32)>>,
    service_enabled: AtomicBool,
    device_locked: AtomicBool,
    launched: Mutex<Vec<String>>,
}

/// Scriptable `AccessibilityBridge` implementation.
#[derive(Clone)]
pub struct SimulatedPlatform {
    state: Arc<PlatformState>,
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self {
            state: Arc::new(PlatformState {
                active_root: Mutex::new(None),
                windows: Mutex::new(Vec::new()),
                live_failures: AtomicUsize::new(0),
                gestures: Mutex::new(Vec::new()),
                gesture_mode: Mutex::new(GestureMode::Complete),
                pending: Mutex::new(Vec::new()),
                global_actions: Mutex::new(Vec::new()),
                global_accepts: AtomicBool::new(true),
                keys: Mutex::new(Vec::new()),
                clipboard: Arc::new(Mutex::new(None)),
                display: Mutex::new(Some((1080, 1920))),
                service_enabled: AtomicBool::new(true),
                device_locked: AtomicBool::new(false),
                launched: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn with_tree(root: SimNode) -> Self {
        let platform = Self::new();
        platform.set_tree(root);
        platform
    }

    /// Install `root` as the active window's tree.
    pub fn set_tree(&self, root: SimNode) {
        self.link_clipboard(&root);
        *lock(&self.state.windows) = vec![(root.clone(), true)];
        *lock(&self.state.active_root) = Some(root);
    }

    /// Drop the active window and all known windows.
    pub fn clear_tree(&self) {
        *lock(&self.state.active_root) = None;
        lock(&self.state.windows).clear();
    }

    /// Drop the window list while keeping the active-window answer.
    pub fn clear_windows(&self) {
        lock(&self.state.windows).clear();
    }

    /// Add a top-level window without touching the active-window answer.
    pub fn add_window(&self, root: SimNode, active: bool) {
        self.link_clipboard(&root);
        lock(&self.state.windows).push((root, active));
    }

    /// Make the next `count` active-window queries answer "no window".
    /// `usize::MAX` fails them permanently.
    pub fn fail_live_queries(&self, count: usize) {
        self.state.live_failures.store(count, Ordering::SeqCst);
    }

    pub fn set_gesture_mode(&self, mode: GestureMode) {
        *lock(&self.state.gesture_mode) = mode;
    }

    pub fn set_global_accepts(&self, accepts: bool) {
        self.state.global_accepts.store(accepts, Ordering::SeqCst);
    }

    pub fn set_display(&self, display: Option<(i32, i32)>) {
        *lock(&self.state.display) = display;
    }

    pub fn set_service_enabled(&self, enabled: bool) {
        self.state.service_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_device_locked(&self, locked: bool) {
        self.state.device_locked.store(locked, Ordering::SeqCst);
    }

    // Recorded side effects, for assertions.

    pub fn gestures(&self) -> Vec<StrokePath> {
        lock(&self.state.gestures).clone()
    }

    pub fn global_actions(&self) -> Vec<GlobalAction> {
        lock(&self.state.global_actions).clone()
    }

    pub fn keys(&self) -> Vec<i32> {
        lock(&self.state.keys).clone()
    }

    pub fn clipboard_text(&self) -> Option<String> {
        lock(&self.state.clipboard).clone()
    }

    pub fn launched(&self) -> Vec<String> {
        lock(&self.state.launched).clone()
    }

    /// Hand every node in the tree a reference to the shared clipboard so a
    /// Paste action can observe what was last placed on it.
    fn link_clipboard(&self, root: &SimNode) {
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            *lock(&node.state.clipboard) = Some(self.state.clipboard.clone());
            stack.extend(lock(&node.state.children).iter().cloned());
        }
    }
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AccessibilityBridge for SimulatedPlatform {
    fn active_window_root(&self) -> Result<Option<UiElement>, AutomationError> {
        let remaining = self.state.live_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.state.live_failures.store(remaining - 1, Ordering::SeqCst);
            }
            return Ok(None);
        }
        Ok(lock(&self.state.active_root)
            .as_ref()
            .map(|root| root.element()))
    }

    fn windows(&self) -> Result<Vec<WindowInfo>, AutomationError> {
        Ok(lock(&self.state.windows)
            .iter()
            .map(|(root, active)| WindowInfo {
                root: Some(root.element()),
                active: *active,
            })
            .collect())
    }

    async fn dispatch_gesture(
        &self,
        path: StrokePath,
        completion: GestureCompletion,
    ) -> Result<(), AutomationError> {
        let duration = Duration::from_millis(path.duration_ms);
        lock(&self.state.gestures).push(path);
        match *lock(&self.state.gesture_mode) {
            GestureMode::Complete => {
                tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    completion.completed();
                });
            }
            GestureMode::Cancel => completion.cancelled(),
            GestureMode::Hang => lock(&self.state.pending).push(completion),
        }
        Ok(())
    }

    fn perform_global_action(&self, action: GlobalAction) -> Result<bool, AutomationError> {
        lock(&self.state.global_actions).push(action);
        Ok(self.state.global_accepts.load(Ordering::SeqCst))
    }

    fn send_key(&self, key_code: i32) -> Result<bool, AutomationError> {
        lock(&self.state.keys).push(key_code);
        Ok(self.state.global_accepts.load(Ordering::SeqCst))
    }

    fn set_clipboard(&self, text: &str) -> Result<(), AutomationError> {
        *lock(&self.state.clipboard) = Some(text.to_string());
        Ok(())
    }

    fn display_size(&self) -> Option<(i32, i32)> {
        *lock(&self.state.display)
    }

    fn service_enabled(&self) -> bool {
        self.state.service_enabled.load(Ordering::SeqCst)
    }

    fn device_locked(&self) -> bool {
        self.state.device_locked.load(Ordering::SeqCst)
    }

    async fn launch_package(&self, package: &str) -> Result<bool, AutomationError> {
        lock(&self.state.launched).push(package.to_string());
        Ok(true)
    }
}
