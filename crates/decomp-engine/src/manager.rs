use tracing::debug;

use decomp_core::ids::NodeId;
use decomp_core::item_type::WorkItemTypeName;
use decomp_core::node::{HierarchyTree, WorkItemNode};
use decomp_core::rules::HierarchyRuleSet;

/// A mutation that would break a type/parent or type/child rule.
/// Rejected mutations never partially apply; the tree is left untouched.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("the decomposed item's type is not set")]
    RootContextUnset,

    #[error("changing the decomposed item's type to {context} would orphan a {child} node")]
    RootContextConflict {
        context: WorkItemTypeName,
        child: WorkItemTypeName,
    },

    #[error("{child} is not an allowed child of {parent}")]
    DisallowedChild {
        parent: WorkItemTypeName,
        child: WorkItemTypeName,
    },

    #[error("{0} allows no child types")]
    NoChildTypesAllowed(WorkItemTypeName),

    #[error("cannot move a node into its own subtree")]
    MoveIntoSubtree,
}

/// Owns the composition tree for one decomposition session and enforces the
/// hierarchy rules on every mutation.
///
/// All operations are synchronous and all-or-nothing: every check runs
/// before the first write, so a returned error guarantees the tree is
/// exactly what it was.
pub struct HierarchyManager {
    rules: HierarchyRuleSet,
    tree: HierarchyTree,
}

impl HierarchyManager {
    pub fn new(rules: HierarchyRuleSet) -> Self {
        Self {
            rules,
            tree: HierarchyTree::new(),
        }
    }

    /// Adopt a tree built elsewhere (e.g. by the text parser). The caller is
    /// responsible for having validated it against the same rule set.
    pub fn with_tree(rules: HierarchyRuleSet, tree: HierarchyTree) -> Self {
        Self { rules, tree }
    }

    pub fn rules(&self) -> &HierarchyRuleSet {
        &self.rules
    }

    pub fn tree(&self) -> &HierarchyTree {
        &self.tree
    }

    pub fn into_tree(self) -> HierarchyTree {
        self.tree
    }

    /// Read-only view of the current root node list.
    pub fn hierarchy(&self) -> &[WorkItemNode] {
        self.tree.roots()
    }

    /// Total node count across the whole tree. Zero means the hierarchy is
    /// empty; there is no other lifecycle state.
    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }

    /// Fix the type of the item being decomposed. Idempotent; changing to a
    /// different type is rejected while any existing root node would become
    /// illegal under it.
    pub fn set_root_context(&mut self, context: WorkItemTypeName) -> Result<(), HierarchyError> {
        if self.tree.root_context() == Some(&context) {
            return Ok(());
        }
        if let Some(root) = self
            .tree
            .roots()
            .iter()
            .find(|r| !self.rules.allows(&context, &r.item_type))
        {
            return Err(HierarchyError::RootContextConflict {
                context,
                child: root.item_type.clone(),
            });
        }
        self.tree.set_root_context(context);
        Ok(())
    }

    /// Create a new node under `parent`, or at root level when `parent` is
    /// None. The initial type is the first allowed child type of the parent
    /// (root context for root-level adds); a parent whose type allows no
    /// children is an immediate error, not a deferred one.
    pub fn add_item(&mut self, parent: Option<&NodeId>) -> Result<NodeId, HierarchyError> {
        match parent {
            Some(parent_id) => {
                let parent_type = self
                    .tree
                    .find(parent_id)
                    .map(|n| n.item_type.clone())
                    .ok_or_else(|| HierarchyError::UnknownNode(parent_id.clone()))?;
                let initial = self
                    .rules
                    .first_allowed_child(&parent_type)
                    .cloned()
                    .ok_or(HierarchyError::NoChildTypesAllowed(parent_type))?;
                let node = WorkItemNode::new(initial);
                let id = node.id.clone();
                if let Some(parent_node) = self.tree.find_mut(parent_id) {
                    parent_node.children.push(node);
                }
                debug!(node_id = %id, "added child node");
                Ok(id)
            }
            None => {
                let context = self
                    .tree
                    .root_context()
                    .cloned()
                    .ok_or(HierarchyError::RootContextUnset)?;
                let initial = self
                    .rules
                    .first_allowed_child(&context)
                    .cloned()
                    .ok_or(HierarchyError::NoChildTypesAllowed(context))?;
                let node = WorkItemNode::new(initial);
                let id = node.id.clone();
                self.tree.push_root(node);
                debug!(node_id = %id, "added root node");
                Ok(id)
            }
        }
    }

    /// Delete the node and its entire subtree. Children are owned by value,
    /// so nothing can be orphaned.
    pub fn remove_item(&mut self, id: &NodeId) -> Result<(), HierarchyError> {
        self.tree
            .detach(id)
            .map(|_| ())
            .ok_or_else(|| HierarchyError::UnknownNode(id.clone()))
    }

    pub fn update_item_title(
        &mut self,
        id: &NodeId,
        title: impl Into<String>,
    ) -> Result<(), HierarchyError> {
        let node = self
            .tree
            .find_mut(id)
            .ok_or_else(|| HierarchyError::UnknownNode(id.clone()))?;
        node.title = title.into();
        Ok(())
    }

    /// Change a node's type. The new type must be a legal child of the
    /// node's parent (or of the root context for root-level nodes), and
    /// every existing child must still be legal under the new type.
    pub fn update_item_type(
        &mut self,
        id: &NodeId,
        new_type: WorkItemTypeName,
    ) -> Result<(), HierarchyError> {
        let context_type = match self.tree.parent_of(id) {
            Some(parent) => parent.item_type.clone(),
            None => {
                if !self.tree.contains(id) {
                    return Err(HierarchyError::UnknownNode(id.clone()));
                }
                self.tree
                    .root_context()
                    .cloned()
                    .ok_or(HierarchyError::RootContextUnset)?
            }
        };
        if !self.rules.allows(&context_type, &new_type) {
            return Err(HierarchyError::DisallowedChild {
                parent: context_type,
                child: new_type,
            });
        }
        if let Some(node) = self.tree.find(id) {
            if let Some(child) = node
                .children
                .iter()
                .find(|c| !self.rules.allows(&new_type, &c.item_type))
            {
                return Err(HierarchyError::DisallowedChild {
                    parent: new_type,
                    child: child.item_type.clone(),
                });
            }
        }
        if let Some(node) = self.tree.find_mut(id) {
            node.item_type = new_type;
        }
        Ok(())
    }

    /// Reattach a node (with its subtree) under a new parent at the given
    /// sibling index. `new_parent` of None targets root level. The index is
    /// clamped to the sibling count after detachment.
    pub fn move_item(
        &mut self,
        id: &NodeId,
        new_parent: Option<&NodeId>,
        index: usize,
    ) -> Result<(), HierarchyError> {
        let node_type = self
            .tree
            .find(id)
            .map(|n| n.item_type.clone())
            .ok_or_else(|| HierarchyError::UnknownNode(id.clone()))?;

        match new_parent {
            Some(parent_id) => {
                if self.tree.find(id).is_some_and(|n| n.contains(parent_id)) {
                    return Err(HierarchyError::MoveIntoSubtree);
                }
                let target_type = self
                    .tree
                    .find(parent_id)
                    .map(|n| n.item_type.clone())
                    .ok_or_else(|| HierarchyError::UnknownNode(parent_id.clone()))?;
                if !self.rules.allows(&target_type, &node_type) {
                    return Err(HierarchyError::DisallowedChild {
                        parent: target_type,
                        child: node_type,
                    });
                }
                let node = self
                    .tree
                    .detach(id)
                    .ok_or_else(|| HierarchyError::UnknownNode(id.clone()))?;
                let target = self
                    .tree
                    .find_mut(parent_id)
                    .ok_or_else(|| HierarchyError::UnknownNode(parent_id.clone()))?;
                let at = index.min(target.children.len());
                target.children.insert(at, node);
            }
            None => {
                let context = self
                    .tree
                    .root_context()
                    .cloned()
                    .ok_or(HierarchyError::RootContextUnset)?;
                if !self.rules.allows(&context, &node_type) {
                    return Err(HierarchyError::DisallowedChild {
                        parent: context,
                        child: node_type,
                    });
                }
                let node = self
                    .tree
                    .detach(id)
                    .ok_or_else(|| HierarchyError::UnknownNode(id.clone()))?;
                let at = index.min(self.tree.roots().len());
                self.tree.roots_mut().insert(at, node);
            }
        }
        Ok(())
    }
}
