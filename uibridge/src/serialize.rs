//! Conversion of live element handles into the wire format.
//!
//! Absent text-like attributes serialize as empty strings, never as null, to
//! keep the transfer format stable for clients.

use crate::element::{Bounds, UiElement};
use crate::errors::AutomationError;
use crate::matcher::PreOrder;
use crate::platforms::AccessibilityBridge;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Used when the platform cannot report display dimensions.
pub const FALLBACK_DISPLAY: (i32, i32) = (1080, 1920);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundsRecord {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub center_x: i32,
    pub center_y: i32,
    pub width: i32,
    pub height: i32,
}

impl From<Bounds> for BoundsRecord {
    fn from(bounds: Bounds) -> Self {
        let (center_x, center_y) = bounds.center();
        Self {
            left: bounds.left,
            top: bounds.top,
            right: bounds.right,
            bottom: bounds.bottom,
            center_x,
            center_y,
            width: bounds.width(),
            height: bounds.height(),
        }
    }
}

/// One element in the transfer format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRecord {
    pub class_name: String,
    pub package_name: String,
    pub text: String,
    pub desc: String,
    pub resource_id: String,
    pub bounds: BoundsRecord,
    pub clickable: bool,
    pub scrollable: bool,
    pub editable: bool,
    pub enabled: bool,
    pub focusable: bool,
    pub focused: bool,
    pub checked: bool,
    pub checkable: bool,
    pub selected: bool,
    pub child_count: usize,
    /// Platform-reported visibility AND positive-area bounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_to_user: Option<bool>,
    /// Bounds intersect the display rectangle. Independent of
    /// `visibleToUser`: an occluded node can still be on screen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_screen: Option<bool>,
}

/// A serialized subtree: element plus ordered children, each tagged with its
/// depth below the serialization root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyRecord {
    #[serde(flatten)]
    pub element: ElementRecord,
    pub depth: usize,
    pub children: Vec<HierarchyRecord>,
}

impl HierarchyRecord {
    /// Total number of nodes in this record, the root included.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(record) = stack.pop() {
            count += 1;
            stack.extend(record.children.iter());
        }
        count
    }
}

pub struct ElementSerializer {
    bridge: Arc<dyn AccessibilityBridge>,
    display: OnceCell<(i32, i32)>,
}

impl ElementSerializer {
    pub fn new(bridge: Arc<dyn AccessibilityBridge>) -> Self {
        Self {
            bridge,
            display: OnceCell::new(),
        }
    }

    /// Serialize one node, including the derived `visibleToUser` and
    /// `onScreen` flags.
    pub fn serialize(&self, element: &UiElement) -> Result<ElementRecord, AutomationError> {
        let attrs = element.attributes()?;
        let bounds = element.bounds()?;
        let child_count = element.child_count().unwrap_or(0);

        let (display_w, display_h) = self.display_size();
        let display_rect = Bounds::new(0, 0, display_w, display_h);

        Ok(ElementRecord {
            class_name: attrs.class_name,
            package_name: attrs.package.unwrap_or_default(),
            text: attrs.text.unwrap_or_default(),
            desc: attrs.description.unwrap_or_default(),
            resource_id: attrs.resource_id.unwrap_or_default(),
            bounds: bounds.into(),
            clickable: attrs.clickable,
            scrollable: attrs.scrollable,
            editable: attrs.editable,
            enabled: attrs.enabled,
            focusable: attrs.focusable,
            focused: attrs.focused,
            checked: attrs.checked,
            checkable: attrs.checkable,
            selected: attrs.selected,
            child_count,
            visible_to_user: Some(attrs.visible && bounds.has_area()),
            on_screen: Some(bounds.intersects(&display_rect)),
        })
    }

    /// Serialize a whole subtree in pre-order. Nodes that went stale
    /// mid-traversal are dropped together with their subtrees; the root
    /// itself must still resolve.
    pub fn serialize_subtree(&self, root: &UiElement) -> Result<HierarchyRecord, AutomationError> {
        // First pass: flatten in pre-order, remembering each node's parent
        // slot so the nesting can be rebuilt without recursion.
        let mut flat: Vec<(HierarchyRecord, Option<usize>)> = Vec::new();
        let mut parent_of_depth: Vec<usize> = Vec::new();

        for (node, depth) in PreOrder::new(root) {
            let record = match self.serialize(&node) {
                Ok(record) => record,
                Err(e) if flat.is_empty() => return Err(e),
                Err(e) => {
                    trace!("dropping stale node from hierarchy: {e}");
                    // Orphan any descendants that still resolve so they
                    // cannot attach to an unrelated earlier branch.
                    parent_of_depth.truncate(depth);
                    continue;
                }
            };
            parent_of_depth.truncate(depth);
            let parent = depth.checked_sub(1).and_then(|d| parent_of_depth.get(d).copied());
            flat.push((
                HierarchyRecord {
                    element: record,
                    depth,
                    children: Vec::new(),
                },
                parent,
            ));
            parent_of_depth.push(flat.len() - 1);
        }

        // Second pass: children always come after their parent in pre-order,
        // so assembling back-to-front sees every child fully built.
        let mut slots: Vec<(Option<HierarchyRecord>, Option<usize>)> = flat
            .into_iter()
            .map(|(record, parent)| (Some(record), parent))
            .collect();
        for index in (1..slots.len()).rev() {
            let (record, parent) = {
                let (slot, parent) = &mut slots[index];
                (slot.take(), *parent)
            };
            if let (Some(record), Some(parent)) = (record, parent) {
                if let Some(parent_record) = slots[parent].0.as_mut() {
                    parent_record.children.insert(0, record);
                }
            }
        }

        slots
            .into_iter()
            .next()
            .and_then(|(record, _)| record)
            .ok_or_else(|| {
                AutomationError::StaleHandle("subtree root could not be serialized".to_string())
            })
    }

    fn display_size(&self) -> (i32, i32) {
        *self
            .display
            .get_or_init(|| self.bridge.display_size().unwrap_or(FALLBACK_DISPLAY))
    }
}
