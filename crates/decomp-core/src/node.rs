use serde::{Deserialize, Serialize};

use crate::ids::NodeId;
use crate::item_type::WorkItemTypeName;

/// One not-yet-persisted work item in a composition tree.
///
/// Children are owned by value: a node lives in exactly one place, so
/// removing a node removes its entire subtree and nothing can be orphaned.
/// Insertion order of `children` is significant: it determines creation
/// order during materialization and depth in text-format round-trips.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemNode {
    pub id: NodeId,
    pub item_type: WorkItemTypeName,
    /// May be blank while editing; blank titles are silently excluded at
    /// materialization time.
    pub title: String,
    /// Absent means "inherit from the remote parent at creation time."
    pub area_path: Option<String>,
    pub iteration_path: Option<String>,
    pub children: Vec<WorkItemNode>,
}

impl WorkItemNode {
    pub fn new(item_type: WorkItemTypeName) -> Self {
        Self {
            id: NodeId::new(),
            item_type,
            title: String::new(),
            area_path: None,
            iteration_path: None,
            children: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Node count of this subtree, self included.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_len).sum::<usize>()
    }

    /// True when `id` names this node or anything below it.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.find(id).is_some()
    }

    fn find(&self, id: &NodeId) -> Option<&WorkItemNode> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    fn find_mut(&mut self, id: &NodeId) -> Option<&mut WorkItemNode> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }
}

/// The in-memory composition tree for one decomposition session.
///
/// `root_context` is the type of the existing item being decomposed; it
/// validates root-level node types. The tree has no persisted form; it is
/// created when a session starts and discarded when the session ends.
///
/// This is a plain data structure: rule validation lives in the hierarchy
/// manager, which is the only intended writer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyTree {
    root_context: Option<WorkItemTypeName>,
    roots: Vec<WorkItemNode>,
}

impl HierarchyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_context(&self) -> Option<&WorkItemTypeName> {
        self.root_context.as_ref()
    }

    pub fn set_root_context(&mut self, context: WorkItemTypeName) {
        self.root_context = Some(context);
    }

    pub fn roots(&self) -> &[WorkItemNode] {
        &self.roots
    }

    pub fn roots_mut(&mut self) -> &mut Vec<WorkItemNode> {
        &mut self.roots
    }

    pub fn push_root(&mut self, node: WorkItemNode) {
        self.roots.push(node);
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total node count across the whole tree.
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(WorkItemNode::subtree_len).sum()
    }

    /// Count of nodes that would survive blank-title filtering.
    pub fn titled_count(&self) -> usize {
        fn count(nodes: &[WorkItemNode]) -> usize {
            nodes
                .iter()
                .map(|n| usize::from(n.has_title()) + count(&n.children))
                .sum()
        }
        count(&self.roots)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.find(id).is_some()
    }

    pub fn find(&self, id: &NodeId) -> Option<&WorkItemNode> {
        self.roots.iter().find_map(|n| n.find(id))
    }

    pub fn find_mut(&mut self, id: &NodeId) -> Option<&mut WorkItemNode> {
        self.roots.iter_mut().find_map(|n| n.find_mut(id))
    }

    /// The parent node of `id`, or None when `id` is root-level or unknown.
    /// Use `contains` to tell the two None cases apart.
    pub fn parent_of(&self, id: &NodeId) -> Option<&WorkItemNode> {
        fn walk<'a>(nodes: &'a [WorkItemNode], id: &NodeId) -> Option<&'a WorkItemNode> {
            for node in nodes {
                if node.children.iter().any(|c| &c.id == id) {
                    return Some(node);
                }
                if let Some(found) = walk(&node.children, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.roots, id)
    }

    /// Remove the node and return it with its whole subtree.
    pub fn detach(&mut self, id: &NodeId) -> Option<WorkItemNode> {
        fn take(nodes: &mut Vec<WorkItemNode>, id: &NodeId) -> Option<WorkItemNode> {
            if let Some(pos) = nodes.iter().position(|n| &n.id == id) {
                return Some(nodes.remove(pos));
            }
            nodes.iter_mut().find_map(|n| take(&mut n.children, id))
        }
        take(&mut self.roots, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(name: &str) -> WorkItemTypeName {
        WorkItemTypeName::from(name)
    }

    fn sample_tree() -> (HierarchyTree, NodeId, NodeId, NodeId) {
        let mut tree = HierarchyTree::new();
        tree.set_root_context(ty("Epic"));

        let mut feature = WorkItemNode::new(ty("Feature")).with_title("A building");
        let task_a = WorkItemNode::new(ty("Task")).with_title("Design");
        let task_b = WorkItemNode::new(ty("Task"));
        let (fid, aid, bid) = (feature.id.clone(), task_a.id.clone(), task_b.id.clone());
        feature.children.push(task_a);
        feature.children.push(task_b);
        tree.push_root(feature);
        (tree, fid, aid, bid)
    }

    #[test]
    fn counts_whole_tree() {
        let (tree, ..) = sample_tree();
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.titled_count(), 2);
    }

    #[test]
    fn find_reaches_nested_nodes() {
        let (tree, _, aid, _) = sample_tree();
        let node = tree.find(&aid).unwrap();
        assert_eq!(node.title, "Design");
    }

    #[test]
    fn parent_of_distinguishes_root_level() {
        let (tree, fid, aid, _) = sample_tree();
        assert_eq!(tree.parent_of(&aid).unwrap().id, fid);
        assert!(tree.parent_of(&fid).is_none());
        assert!(tree.contains(&fid));
        assert!(!tree.contains(&NodeId::new()));
    }

    #[test]
    fn detach_removes_subtree() {
        let (mut tree, fid, aid, bid) = sample_tree();
        let detached = tree.detach(&fid).unwrap();
        assert_eq!(detached.subtree_len(), 3);
        assert_eq!(tree.node_count(), 0);
        assert!(!tree.contains(&aid));
        assert!(!tree.contains(&bid));
    }

    #[test]
    fn detach_of_middle_node_keeps_siblings() {
        let (mut tree, _, aid, bid) = sample_tree();
        assert!(tree.detach(&aid).is_some());
        assert_eq!(tree.node_count(), 2);
        assert!(tree.contains(&bid));
    }
}
