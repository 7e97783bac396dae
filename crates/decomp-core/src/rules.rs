use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::item_type::WorkItemTypeName;

/// Which work item types may be created as direct children of which parent
/// types. The child list is ordered; the first entry is the default type
/// for a newly added child.
///
/// Rules describe type relationships, not instances; the remote project
/// configuration guarantees the mapping is acyclic. A type absent as a key
/// has no creatable children.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HierarchyRuleSet {
    rules: HashMap<WorkItemTypeName, Vec<WorkItemTypeName>>,
}

impl HierarchyRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(rules: HashMap<WorkItemTypeName, Vec<WorkItemTypeName>>) -> Self {
        Self { rules }
    }

    pub fn insert(
        &mut self,
        parent: WorkItemTypeName,
        children: impl IntoIterator<Item = WorkItemTypeName>,
    ) {
        self.rules.insert(parent, children.into_iter().collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn allowed_children(&self, parent: &WorkItemTypeName) -> &[WorkItemTypeName] {
        self.rules.get(parent).map_or(&[], Vec::as_slice)
    }

    pub fn allows(&self, parent: &WorkItemTypeName, child: &WorkItemTypeName) -> bool {
        self.allowed_children(parent).contains(child)
    }

    pub fn first_allowed_child(&self, parent: &WorkItemTypeName) -> Option<&WorkItemTypeName> {
        self.allowed_children(parent).first()
    }
}
