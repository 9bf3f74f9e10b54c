use crate::element::NodeAttributes;

/// A conjunctive, case-insensitive substring filter used to locate nodes.
///
/// Up to four optional criteria; absent criteria are vacuously true, so the
/// empty predicate matches every node. The `text` criterion matches against
/// the node's visible text OR its accessible description, mirroring how
/// users refer to labeled controls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchPredicate {
    pub text: Option<String>,
    pub resource_id: Option<String>,
    pub description: Option<String>,
    pub class_name: Option<String>,
}

impl MatchPredicate {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.resource_id.is_none()
            && self.description.is_none()
            && self.class_name.is_none()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_class_name(mut self, class: impl Into<String>) -> Self {
        self.class_name = Some(class.into());
        self
    }

    /// True iff every supplied criterion holds for `attrs`.
    pub fn matches(&self, attrs: &NodeAttributes) -> bool {
        if let Some(needle) = &self.text {
            let in_text = contains_ci(attrs.text.as_deref(), needle);
            let in_desc = contains_ci(attrs.description.as_deref(), needle);
            if !in_text && !in_desc {
                return false;
            }
        }
        if let Some(needle) = &self.resource_id {
            if !contains_ci(attrs.resource_id.as_deref(), needle) {
                return false;
            }
        }
        if let Some(needle) = &self.description {
            if !contains_ci(attrs.description.as_deref(), needle) {
                return false;
            }
        }
        if let Some(needle) = &self.class_name {
            if !contains_ci(Some(&attrs.class_name), needle) {
                return false;
            }
        }
        true
    }

    /// Short human-readable rendering for result messages,
    /// e.g. `text~"sett", className~"Button"`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(t) = &self.text {
            parts.push(format!("text~{t:?}"));
        }
        if let Some(id) = &self.resource_id {
            parts.push(format!("resourceId~{id:?}"));
        }
        if let Some(d) = &self.description {
            parts.push(format!("desc~{d:?}"));
        }
        if let Some(c) = &self.class_name {
            parts.push(format!("className~{c:?}"));
        }
        if parts.is_empty() {
            "<any>".to_string()
        } else {
            parts.join(", ")
        }
    }
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    match haystack {
        Some(h) => h.to_lowercase().contains(&needle.to_lowercase()),
        None => false,
    }
}
