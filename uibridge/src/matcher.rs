//! Predicate-based search over a UI snapshot.
//!
//! Traversal is iterative depth-first pre-order over an explicit stack, so
//! tree depth never translates into call-stack depth. Match order follows
//! pre-order visitation; "first match" means topmost/leftmost in tree order,
//! which is an externally observable contract.

use crate::element::{NodeAttributes, UiElement};
use crate::selector::MatchPredicate;
use tracing::trace;

/// Depth cap guarding against pathological or cyclic trees; platform trees
/// are assumed acyclic but depth is unbounded in theory.
const MAX_DEPTH: usize = 512;

/// Pre-order walk over resolvable nodes. Nodes whose handles fail to resolve
/// are skipped together with their subtrees.
pub(crate) struct PreOrder {
    stack: Vec<(UiElement, usize)>,
}

impl PreOrder {
    pub(crate) fn new(root: &UiElement) -> Self {
        Self {
            stack: vec![(root.clone(), 0)],
        }
    }
}

impl Iterator for PreOrder {
    type Item = (UiElement, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, depth) = self.stack.pop()?;
        if depth < MAX_DEPTH {
            // Reverse so the first child is popped first.
            for child in node.children().into_iter().rev() {
                self.stack.push((child, depth + 1));
            }
        } else {
            trace!("depth cap reached, not descending further");
        }
        Some((node, depth))
    }
}

/// All nodes matching `predicate`, in pre-order.
pub fn find_all(root: &UiElement, predicate: &MatchPredicate) -> Vec<UiElement> {
    let mut matches = Vec::new();
    for (node, _) in PreOrder::new(root) {
        match node.attributes() {
            Ok(attrs) => {
                if predicate.matches(&attrs) {
                    matches.push(node);
                }
            }
            // A node can go stale between being reached and being read;
            // skip it rather than failing the whole traversal.
            Err(e) => trace!("skipping unreadable node: {e}"),
        }
    }
    matches
}

/// First node in pre-order that is editable and enabled.
pub fn find_first_focusable(root: &UiElement) -> Option<UiElement> {
    find_first(root, |attrs| attrs.editable && attrs.enabled)
}

fn find_first<F>(root: &UiElement, mut accept: F) -> Option<UiElement>
where
    F: FnMut(&NodeAttributes) -> bool,
{
    PreOrder::new(root).find_map(|(node, _)| match node.attributes() {
        Ok(attrs) if accept(&attrs) => Some(node),
        _ => None,
    })
}
