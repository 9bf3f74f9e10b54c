use crate::errors::AutomationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Screen-space rectangle of an element, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }

    /// True when the rectangle has positive width and height.
    pub fn has_area(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }
}

/// Scalar attributes of a node, read from the backing handle in one access.
///
/// Text-like fields are `Option` here; the wire format flattens absent values
/// to empty strings (see `serialize::ElementRecord`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeAttributes {
    pub class_name: String,
    pub text: Option<String>,
    pub description: Option<String>,
    pub resource_id: Option<String>,
    pub package: Option<String>,
    pub clickable: bool,
    pub scrollable: bool,
    pub editable: bool,
    pub enabled: bool,
    pub focusable: bool,
    pub focused: bool,
    pub checked: bool,
    pub checkable: bool,
    pub selected: bool,
    /// Platform-reported visibility. Combined with geometry into the derived
    /// `visibleToUser` flag during serialization.
    pub visible: bool,
}

/// A node-level action performed through the platform's accessibility layer.
///
/// The platform reports acceptance as a boolean; a `false` maps to
/// `AutomationError::ActionRejected` at the call site that needs the action
/// to have happened.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeAction {
    Focus,
    SetText(String),
    SetSelection(usize, usize),
    Paste,
    ScrollForward,
    ScrollBackward,
}

/// The platform seam for a single UI element.
///
/// Handles are transient: the backing UI may mutate at any time, after which
/// any accessor may fail with `StaleHandle`. Callers must not assume a handle
/// remains queryable across an arbitrary time gap.
pub trait UiNodeHandle: Send + Sync {
    fn attributes(&self) -> Result<NodeAttributes, AutomationError>;
    fn bounds(&self) -> Result<Bounds, AutomationError>;
    fn child_count(&self) -> Result<usize, AutomationError>;
    /// Resolve the n-th child. `Ok(None)` means the slot is empty; `Err`
    /// means the child exists but its handle can no longer be resolved.
    fn child(&self, index: usize) -> Result<Option<UiElement>, AutomationError>;
    fn perform(&self, action: NodeAction) -> Result<bool, AutomationError>;
}

/// A cloneable, read-only handle to one element of a UI snapshot.
#[derive(Clone)]
pub struct UiElement {
    inner: Arc<dyn UiNodeHandle>,
}

impl UiElement {
    pub fn new(inner: Arc<dyn UiNodeHandle>) -> Self {
        Self { inner }
    }

    pub fn attributes(&self) -> Result<NodeAttributes, AutomationError> {
        self.inner.attributes()
    }

    pub fn bounds(&self) -> Result<Bounds, AutomationError> {
        self.inner.bounds()
    }

    pub fn child_count(&self) -> Result<usize, AutomationError> {
        self.inner.child_count()
    }

    pub fn child(&self, index: usize) -> Result<Option<UiElement>, AutomationError> {
        self.inner.child(index)
    }

    pub fn perform(&self, action: NodeAction) -> Result<bool, AutomationError> {
        self.inner.perform(action)
    }

    /// All children whose handles still resolve, in child-slot order.
    /// Unresolvable children are skipped rather than failing the whole read.
    pub fn children(&self) -> Vec<UiElement> {
        let count = match self.child_count() {
            Ok(count) => count,
            Err(e) => {
                debug!("child count unavailable, treating node as a leaf: {e}");
                return Vec::new();
            }
        };
        let mut children = Vec::with_capacity(count);
        for index in 0..count {
            match self.child(index) {
                Ok(Some(child)) => children.push(child),
                Ok(None) => {}
                Err(e) => debug!("skipping unresolvable child {index}: {e}"),
            }
        }
        children
    }
}

impl fmt::Debug for UiElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.attributes() {
            Ok(attrs) => f
                .debug_struct("UiElement")
                .field("class", &attrs.class_name)
                .field("text", &attrs.text)
                .field("resource_id", &attrs.resource_id)
                .finish_non_exhaustive(),
            Err(_) => f.write_str("UiElement(<stale>)"),
        }
    }
}
