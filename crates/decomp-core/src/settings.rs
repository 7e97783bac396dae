use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::item_type::WorkItemTypeName;

/// How a type's tags relate to the tags of the items above it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagInheritance {
    /// Only the explicit tag list is applied.
    #[default]
    None,
    /// Union with the tags actually applied to the immediate parent.
    Parent,
    /// Union with every tag applied from the decomposing root down.
    Ancestors,
}

/// Per-type tag policy. Explicit tags are always applied; the set is
/// deduplicated case-sensitively at construction and nowhere else.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPolicy {
    #[serde(default)]
    pub inheritance: TagInheritance,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

/// Who a freshly created item of a given type is assigned to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentBehavior {
    /// No assignment field is emitted.
    #[default]
    None,
    /// The assignee recorded on the item being decomposed.
    DecomposingItem,
    /// The actor performing the save.
    Creator,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypePolicy {
    #[serde(default)]
    pub tags: TagPolicy,
    #[serde(default)]
    pub assignment: AssignmentBehavior,
}

pub type PolicyMap = HashMap<WorkItemTypeName, TypePolicy>;

/// Layered tag/assignment policy: one default map plus per-area-path
/// overrides. An area path with an entry replaces the default map wholesale
/// for nodes scoped to it; there is no per-type merging across layers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedSettings {
    #[serde(default)]
    pub default: PolicyMap,
    #[serde(default)]
    pub by_area_path: HashMap<String, PolicyMap>,
    /// When set, every created item also receives a fixed discussion
    /// comment.
    #[serde(default)]
    pub attach_comment: bool,
    #[serde(default = "default_comment_body")]
    pub comment_body: String,
}

fn default_comment_body() -> String {
    "Created by decomp as part of a hierarchy decomposition.".to_owned()
}

impl Default for ScopedSettings {
    fn default() -> Self {
        Self {
            default: PolicyMap::new(),
            by_area_path: HashMap::new(),
            attach_comment: false,
            comment_body: default_comment_body(),
        }
    }
}

impl ScopedSettings {
    /// The policy map in effect for the given area path.
    pub fn scope_for(&self, effective_area_path: Option<&str>) -> &PolicyMap {
        effective_area_path
            .and_then(|path| self.by_area_path.get(path))
            .unwrap_or(&self.default)
    }

    /// The policy for one type under the given area path, if configured.
    pub fn policy_for(
        &self,
        effective_area_path: Option<&str>,
        item_type: &WorkItemTypeName,
    ) -> Option<&TypePolicy> {
        self.scope_for(effective_area_path).get(item_type)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Source of the tag/assignment settings snapshot, read once per
/// materialization run.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn load(&self) -> Result<ScopedSettings, SettingsError>;
}
