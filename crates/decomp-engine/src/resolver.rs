use std::collections::BTreeSet;

use decomp_core::identity::Identity;
use decomp_core::node::WorkItemNode;
use decomp_core::settings::{AssignmentBehavior, ScopedSettings, TagInheritance};

/// Turns per-type policy plus area-path scoping into concrete field values.
///
/// Pure with respect to the tree: nothing here mutates a node, and the same
/// inputs always produce the same outputs. The materialization walk threads
/// the parent-tag snapshot and the ancestor union through explicitly so
/// sibling branches stay isolated.
pub struct ConfigurationResolver<'a> {
    settings: &'a ScopedSettings,
    /// Area path of the item being decomposed; the fallback scope for nodes
    /// without an explicit override.
    root_area_path: Option<&'a str>,
}

impl<'a> ConfigurationResolver<'a> {
    pub fn new(settings: &'a ScopedSettings, root_area_path: Option<&'a str>) -> Self {
        Self {
            settings,
            root_area_path,
        }
    }

    /// The area path that selects a node's policy scope: its own override
    /// when set, otherwise the decomposing root's.
    pub fn effective_area_path(&self, node: &'a WorkItemNode) -> Option<&'a str> {
        node.area_path.as_deref().or(self.root_area_path)
    }

    /// Resolve the tag set for one node.
    ///
    /// `parent_tags` is the set actually applied to the immediate parent
    /// after its own resolution, not the parent's raw policy.
    /// `ancestor_tags` is the running union of every applied tag from the
    /// decomposing root down to (but not including) this node.
    pub fn resolve_tags(
        &self,
        node: &WorkItemNode,
        parent_tags: &BTreeSet<String>,
        ancestor_tags: &BTreeSet<String>,
    ) -> BTreeSet<String> {
        let Some(policy) = self
            .settings
            .policy_for(self.effective_area_path(node), &node.item_type)
        else {
            return BTreeSet::new();
        };

        let mut tags = policy.tags.tags.clone();
        match policy.tags.inheritance {
            TagInheritance::None => {}
            TagInheritance::Parent => tags.extend(parent_tags.iter().cloned()),
            TagInheritance::Ancestors => tags.extend(ancestor_tags.iter().cloned()),
        }
        tags
    }

    /// Resolve the assignment target for one node, if any.
    ///
    /// `decomposing_assignee` and `actor` are both fixed once per
    /// materialization run, never re-fetched per node.
    pub fn resolve_assignment(
        &self,
        node: &WorkItemNode,
        decomposing_assignee: Option<&Identity>,
        actor: &Identity,
    ) -> Option<Identity> {
        let behavior = self
            .settings
            .policy_for(self.effective_area_path(node), &node.item_type)
            .map_or(AssignmentBehavior::None, |p| p.assignment);

        match behavior {
            AssignmentBehavior::None => None,
            AssignmentBehavior::DecomposingItem => decomposing_assignee.cloned(),
            AssignmentBehavior::Creator => Some(actor.clone()),
        }
    }
}
