use std::collections::HashSet;

use decomp_core::item_type::WorkItemTypeName;
use decomp_core::node::{HierarchyTree, WorkItemNode};
use decomp_core::rules::HierarchyRuleSet;

/// A malformed hierarchy document. Nothing is built from an invalid
/// document; the parser returns the first error with its 1-based line.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: expected 'Type: Title'")]
    MalformedLine { line: usize },

    #[error("line {line}: nesting jumped from depth {from} to {to}")]
    DepthJump { line: usize, from: usize, to: usize },

    #[error("line {line}: {child} is not an allowed child of {parent}")]
    DisallowedType {
        line: usize,
        parent: WorkItemTypeName,
        child: WorkItemTypeName,
    },
}

/// Parses the line-oriented alternate input format into a hierarchy tree.
///
/// Grammar: one node per line as `Type: Title`; leading `-` markers (one
/// per depth level, no cap) set nesting relative to the document; blank
/// lines are skipped. Every attachment passes the same rule check the
/// hierarchy manager applies, so this parser cannot produce a tree the
/// manager would have rejected.
pub struct TextHierarchyParser<'a> {
    rules: &'a HierarchyRuleSet,
}

impl<'a> TextHierarchyParser<'a> {
    pub fn new(rules: &'a HierarchyRuleSet) -> Self {
        Self { rules }
    }

    pub fn parse(
        &self,
        input: &str,
        root_context: Option<&WorkItemTypeName>,
    ) -> Result<HierarchyTree, ParseError> {
        let mut tree = HierarchyTree::new();
        if let Some(context) = root_context {
            tree.set_root_context(context.clone());
        }

        // Open nodes, depths strictly increasing bottom to top. A node is
        // attached to its parent (or the root list) when a line at its
        // depth or shallower arrives, which preserves document order.
        let mut stack: Vec<(usize, WorkItemNode)> = Vec::new();
        let mut prev_depth = 0usize;

        for (idx, raw) in input.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let depth = line.chars().take_while(|c| *c == '-').count();
            let rest = line[depth..].trim_start();
            let Some((type_part, title_part)) = rest.split_once(':') else {
                return Err(ParseError::MalformedLine { line: line_no });
            };
            let type_name = type_part.trim();
            if type_name.is_empty() {
                return Err(ParseError::MalformedLine { line: line_no });
            }
            let item_type = WorkItemTypeName::from(type_name);

            Self::collapse(&mut stack, &mut tree, depth);

            let parent_type = match stack.last() {
                Some((d, parent)) if *d + 1 == depth => Some(&parent.item_type),
                None if depth == 0 => tree.root_context(),
                _ => {
                    return Err(ParseError::DepthJump {
                        line: line_no,
                        from: prev_depth,
                        to: depth,
                    });
                }
            };
            if let Some(parent_type) = parent_type {
                if !self.rules.allows(parent_type, &item_type) {
                    return Err(ParseError::DisallowedType {
                        line: line_no,
                        parent: parent_type.clone(),
                        child: item_type,
                    });
                }
            }

            let node = WorkItemNode::new(item_type).with_title(title_part.trim());
            stack.push((depth, node));
            prev_depth = depth;
        }

        Self::collapse(&mut stack, &mut tree, 0);
        Ok(tree)
    }

    /// Pop every open node at `down_to` or deeper, attaching each to the
    /// entry beneath it (its parent by construction) or to the root list.
    fn collapse(stack: &mut Vec<(usize, WorkItemNode)>, tree: &mut HierarchyTree, down_to: usize) {
        while stack.last().is_some_and(|(d, _)| *d >= down_to) {
            let Some((_, node)) = stack.pop() else { break };
            match stack.last_mut() {
                Some((_, parent)) => parent.children.push(node),
                None => tree.push_root(node),
            }
        }
    }

    /// Render one illustrative line per type reachable from `root_context`,
    /// at increasing depth. Preview/documentation only; the output always
    /// re-parses under the same rules.
    pub fn example_template(&self, root_context: &WorkItemTypeName) -> String {
        let mut visited = HashSet::new();
        let mut out = String::new();
        self.render_level(root_context, 0, &mut visited, &mut out);
        out
    }

    fn render_level(
        &self,
        parent: &WorkItemTypeName,
        depth: usize,
        visited: &mut HashSet<WorkItemTypeName>,
        out: &mut String,
    ) {
        for child in self.rules.allowed_children(parent) {
            if !visited.insert(child.clone()) {
                continue;
            }
            if depth == 0 {
                out.push_str(&format!("{child}: Example {child}\n"));
            } else {
                out.push_str(&format!("{} {child}: Example {child}\n", "-".repeat(depth)));
            }
            self.render_level(child, depth + 1, visited, out);
        }
    }
}
