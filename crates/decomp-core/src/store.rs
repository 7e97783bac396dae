use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::RemoteError;
use crate::identity::Identity;
use crate::ids::RemoteId;
use crate::item_type::WorkItemTypeName;
use crate::rules::HierarchyRuleSet;
use crate::settings::SettingsError;

/// One creation call's worth of resolved field values.
///
/// This is the only shape this crate owns on the wire boundary; transport
/// encoding belongs to the store implementation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationRequest {
    pub project: String,
    pub title: String,
    pub item_type: WorkItemTypeName,
    /// Already resolved and deduplicated; joined into a single tag string
    /// on the wire.
    pub tags: Vec<String>,
    pub assignee: Option<Identity>,
    pub area_path: Option<String>,
    pub iteration_path: Option<String>,
    pub comment: Option<String>,
}

impl CreationRequest {
    /// The wire form of the tag set.
    pub fn tag_string(&self) -> String {
        self.tags.join("; ")
    }
}

/// A work item as read back from the remote store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteWorkItem {
    pub id: RemoteId,
    pub item_type: WorkItemTypeName,
    pub title: String,
    pub tags: Vec<String>,
    pub assignee: Option<Identity>,
    pub area_path: Option<String>,
}

/// The remote work-tracking store.
#[async_trait]
pub trait WorkItemStore: Send + Sync {
    /// Create one work item, optionally linked under an existing parent.
    /// Returns the id the store assigned.
    async fn create_item(
        &self,
        request: &CreationRequest,
        parent: Option<RemoteId>,
    ) -> Result<RemoteId, RemoteError>;

    async fn get_item(&self, id: RemoteId) -> Result<RemoteWorkItem, RemoteError>;
}

/// Source of the parent/child type rules, refreshed by the surrounding
/// application and treated as immutable for one editing session.
#[async_trait]
pub trait RulesProvider: Send + Sync {
    async fn get_rules(&self) -> Result<HierarchyRuleSet, SettingsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_string_joins_with_semicolons() {
        let request = CreationRequest {
            project: "proj".into(),
            title: "t".into(),
            item_type: WorkItemTypeName::from("Task"),
            tags: vec!["alpha".into(), "beta".into()],
            assignee: None,
            area_path: None,
            iteration_path: None,
            comment: None,
        };
        assert_eq!(request.tag_string(), "alpha; beta");
    }
}
