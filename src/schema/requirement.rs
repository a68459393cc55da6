use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A precondition gating an element, exit or dialogue option.
///
/// Trait minimums and owned items combine conjunctively. An empty spec is
/// always satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSpec {
    /// trait name → minimum value
    #[serde(default)]
    pub traits: BTreeMap<String, i64>,
    /// items that must all be owned
    #[serde(default)]
    pub items: Vec<String>,
}

impl RequirementSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trait(mut self, name: &str, min: i64) -> Self {
        self.traits.insert(name.to_string(), min);
        self
    }

    pub fn with_item(mut self, id: &str) -> Self {
        self.items.push(id.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty() && self.items.is_empty()
    }

    /// Number of entries an evaluation has to check.
    pub fn len(&self) -> usize {
        self.traits.len() + self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_entries() {
        let spec = RequirementSpec::new()
            .with_trait("observant", 2)
            .with_item("healing_herb");
        assert_eq!(spec.traits["observant"], 2);
        assert_eq!(spec.items, vec!["healing_herb".to_string()]);
        assert_eq!(spec.len(), 2);
        assert!(!spec.is_empty());
    }

    #[test]
    fn default_is_empty() {
        assert!(RequirementSpec::default().is_empty());
    }
}
