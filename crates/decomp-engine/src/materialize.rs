use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use decomp_core::events::MaterializeEvent;
use decomp_core::identity::{Identity, IdentityProvider};
use decomp_core::ids::{NodeId, RemoteId, RunId};
use decomp_core::node::{HierarchyTree, WorkItemNode};
use decomp_core::settings::ScopedSettings;
use decomp_core::store::{CreationRequest, WorkItemStore};

use crate::error::{EngineError, PreconditionError};
use crate::resolver::ConfigurationResolver;

/// Inputs for a single materialization run, captured once at the start and
/// never re-read mid-run.
pub struct MaterializeParams<'a> {
    pub tree: &'a HierarchyTree,
    /// Remote id of the existing item being decomposed.
    pub parent_id: RemoteId,
    pub project: &'a str,
    /// Settings snapshot for the whole run; a policy change made elsewhere
    /// mid-save cannot produce a mixed-rule hierarchy.
    pub settings: &'a ScopedSettings,
}

#[derive(Clone, Debug)]
pub struct CreatedItem {
    pub node_id: NodeId,
    pub remote_id: RemoteId,
    pub title: String,
}

/// Outcome of one run: what was created, and one formatted message per
/// node whose creation the remote store rejected. Empty `errors` means
/// complete success; a non-empty list still closes the editing session.
#[derive(Debug, Default)]
pub struct MaterializeReport {
    pub run_id: RunId,
    pub created: Vec<CreatedItem>,
    pub errors: Vec<String>,
}

impl MaterializeReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

struct RunContext<'a> {
    run_id: RunId,
    project: &'a str,
    resolver: ConfigurationResolver<'a>,
    actor: Identity,
    decomposing_assignee: Option<Identity>,
    comment: Option<String>,
}

/// Walks a validated tree depth-first and issues creation requests to the
/// remote store, parent strictly before children.
///
/// Siblings are processed sequentially by design: this bounds the burst
/// rate against the store and keeps failure attribution order-deterministic.
/// There is no retry, no rollback of already-created items, and no
/// cancellation once a run has started.
pub struct MaterializationEngine {
    store: Arc<dyn WorkItemStore>,
    identity: Arc<dyn IdentityProvider>,
    event_tx: Option<broadcast::Sender<MaterializeEvent>>,
}

impl MaterializationEngine {
    pub fn new(store: Arc<dyn WorkItemStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            identity,
            event_tx: None,
        }
    }

    /// Emit progress events over the given channel.
    pub fn with_events(mut self, event_tx: broadcast::Sender<MaterializeEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    fn send_event(&self, event: MaterializeEvent) {
        if let Some(tx) = &self.event_tx {
            if tx.send(event).is_err() {
                debug!("no event receivers, event dropped");
            }
        }
    }

    /// Materialize the tree under the decomposing item.
    ///
    /// Fails fast with a `PreconditionError` before anything is created;
    /// afterwards every failure is per-node: the failed node's subtree is
    /// skipped for this run and its siblings still attempt creation.
    #[instrument(skip(self, p), fields(parent_id = %p.parent_id, project = p.project))]
    pub async fn materialize(
        &self,
        p: MaterializeParams<'_>,
    ) -> Result<MaterializeReport, EngineError> {
        if !p.parent_id.is_valid() {
            return Err(PreconditionError::InvalidParentId(p.parent_id.get()).into());
        }
        if p.project.trim().is_empty() {
            return Err(PreconditionError::MissingProject.into());
        }
        let pending = p.tree.titled_count();
        if pending == 0 {
            return Err(PreconditionError::EmptyHierarchy.into());
        }

        // Run snapshot: the decomposing item's assignee, area path and tags,
        // and the saving actor, each resolved exactly once.
        let root_item = self.store.get_item(p.parent_id).await?;
        let actor = self.identity.current_actor().await?;

        let run_id = RunId::new();
        info!(run_id = %run_id, pending, "materialization started");
        self.send_event(MaterializeEvent::RunStarted {
            run_id: run_id.clone(),
            parent_id: p.parent_id,
            pending,
        });

        let run = RunContext {
            run_id: run_id.clone(),
            project: p.project,
            resolver: ConfigurationResolver::new(p.settings, root_item.area_path.as_deref()),
            actor,
            decomposing_assignee: root_item.assignee.clone(),
            comment: p
                .settings
                .attach_comment
                .then(|| p.settings.comment_body.clone()),
        };

        let mut report = MaterializeReport {
            run_id: run_id.clone(),
            ..MaterializeReport::default()
        };

        // The decomposing item's own tags seed both accumulators so that
        // parent/ancestor inheritance works for depth-zero nodes.
        let seed: BTreeSet<String> = root_item.tags.iter().cloned().collect();
        self.create_level(&run, p.tree.roots(), p.parent_id, &seed, &seed, &mut report)
            .await;

        info!(
            run_id = %run_id,
            created = report.created.len(),
            failed = report.errors.len(),
            "materialization finished"
        );
        self.send_event(MaterializeEvent::RunFinished {
            run_id,
            created: report.created.len(),
            failed: report.errors.len(),
        });
        Ok(report)
    }

    /// Create one sibling level in document order, recursing into each
    /// node's children only after its own creation succeeded.
    fn create_level<'a>(
        &'a self,
        run: &'a RunContext<'a>,
        nodes: &'a [WorkItemNode],
        parent_remote: RemoteId,
        parent_tags: &'a BTreeSet<String>,
        ancestor_tags: &'a BTreeSet<String>,
        report: &'a mut MaterializeReport,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            for node in nodes {
                if !node.has_title() {
                    debug!(node_id = %node.id, "blank title, skipped");
                    continue;
                }

                let applied_tags = run.resolver.resolve_tags(node, parent_tags, ancestor_tags);
                let assignee = run.resolver.resolve_assignment(
                    node,
                    run.decomposing_assignee.as_ref(),
                    &run.actor,
                );
                let request = CreationRequest {
                    project: run.project.to_owned(),
                    title: node.title.trim().to_owned(),
                    item_type: node.item_type.clone(),
                    tags: applied_tags.iter().cloned().collect(),
                    assignee,
                    area_path: node.area_path.clone(),
                    iteration_path: node.iteration_path.clone(),
                    comment: run.comment.clone(),
                };

                // A child is never submitted before its parent's creation
                // has succeeded: it needs that remote id to link
                // against.
                match self.store.create_item(&request, Some(parent_remote)).await {
                    Ok(remote_id) => {
                        info!(node_id = %node.id, %remote_id, item_type = %node.item_type, "item created");
                        self.send_event(MaterializeEvent::ItemCreated {
                            run_id: run.run_id.clone(),
                            node_id: node.id.clone(),
                            remote_id,
                            item_type: node.item_type.clone(),
                            title: request.title.clone(),
                        });
                        report.created.push(CreatedItem {
                            node_id: node.id.clone(),
                            remote_id,
                            title: request.title.clone(),
                        });

                        // The ancestor union grows for the recursive call
                        // only; sibling branches never see each other's
                        // tags.
                        let mut next_ancestors = ancestor_tags.clone();
                        next_ancestors.extend(applied_tags.iter().cloned());
                        self.create_level(
                            run,
                            &node.children,
                            remote_id,
                            &applied_tags,
                            &next_ancestors,
                            &mut *report,
                        )
                        .await;
                    }
                    Err(error) => {
                        warn!(
                            node_id = %node.id,
                            error_kind = error.error_kind(),
                            "creation failed, subtree skipped"
                        );
                        report.errors.push(format!(
                            "{} '{}': {}",
                            node.item_type, request.title, error
                        ));
                        self.send_event(MaterializeEvent::ItemFailed {
                            run_id: run.run_id.clone(),
                            node_id: node.id.clone(),
                            item_type: node.item_type.clone(),
                            title: request.title.clone(),
                            error: error.to_string(),
                        });
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use decomp_client::mock::{MockOutcome, MockStore, StaticIdentityProvider};
    use decomp_core::errors::RemoteError;
    use decomp_core::item_type::WorkItemTypeName;
    use decomp_core::settings::{AssignmentBehavior, TagInheritance, TagPolicy, TypePolicy};
    use decomp_core::store::RemoteWorkItem;

    fn ty(name: &str) -> WorkItemTypeName {
        WorkItemTypeName::from(name)
    }

    fn actor() -> Identity {
        Identity::new("Saving Actor", "actor@svc")
    }

    fn owner() -> Identity {
        Identity::new("Item Owner", "owner@svc")
    }

    fn root_item(id: i64) -> RemoteWorkItem {
        RemoteWorkItem {
            id: RemoteId::new(id),
            item_type: ty("Epic"),
            title: "Parent epic".into(),
            tags: vec!["root-tag".into()],
            assignee: Some(owner()),
            area_path: Some("Proj\\Root".into()),
        }
    }

    fn node(type_name: &str, title: &str) -> WorkItemNode {
        WorkItemNode::new(ty(type_name)).with_title(title)
    }

    fn policy(inheritance: TagInheritance, tags: &[&str], assignment: AssignmentBehavior) -> TypePolicy {
        TypePolicy {
            tags: TagPolicy {
                inheritance,
                tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            },
            assignment,
        }
    }

    fn engine(store: &Arc<MockStore>) -> MaterializationEngine {
        MaterializationEngine::new(
            Arc::clone(store) as Arc<dyn WorkItemStore>,
            Arc::new(StaticIdentityProvider(actor())),
        )
    }

    async fn run(
        store: &Arc<MockStore>,
        tree: &HierarchyTree,
        settings: &ScopedSettings,
        parent_id: i64,
    ) -> Result<MaterializeReport, EngineError> {
        engine(store)
            .materialize(MaterializeParams {
                tree,
                parent_id: RemoteId::new(parent_id),
                project: "proj",
                settings,
            })
            .await
    }

    #[tokio::test]
    async fn invalid_parent_id_fails_before_any_call() {
        let store = Arc::new(MockStore::new());
        let mut tree = HierarchyTree::new();
        tree.push_root(node("Feature", "A"));

        let result = run(&store, &tree, &ScopedSettings::default(), 0).await;
        assert!(matches!(
            result,
            Err(EngineError::Precondition(PreconditionError::InvalidParentId(0)))
        ));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_project_fails_before_any_call() {
        let store = Arc::new(MockStore::new());
        let mut tree = HierarchyTree::new();
        tree.push_root(node("Feature", "A"));

        let result = engine(&store)
            .materialize(MaterializeParams {
                tree: &tree,
                parent_id: RemoteId::new(100),
                project: "  ",
                settings: &ScopedSettings::default(),
            })
            .await;
        assert!(matches!(
            result,
            Err(EngineError::Precondition(PreconditionError::MissingProject))
        ));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn all_blank_hierarchy_is_a_precondition_failure() {
        let store = Arc::new(MockStore::new().with_item(root_item(100)));
        let mut tree = HierarchyTree::new();
        tree.push_root(node("Feature", "  "));

        let result = run(&store, &tree, &ScopedSettings::default(), 100).await;
        assert!(matches!(
            result,
            Err(EngineError::Precondition(PreconditionError::EmptyHierarchy))
        ));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn unreadable_decomposing_item_aborts_the_run() {
        // no registered item 100
        let store = Arc::new(MockStore::new());
        let mut tree = HierarchyTree::new();
        tree.push_root(node("Feature", "A"));

        let result = run(&store, &tree, &ScopedSettings::default(), 100).await;
        assert!(matches!(result, Err(EngineError::Remote(RemoteError::NotFound(_)))));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn blank_titles_are_skipped_without_error() {
        let store = Arc::new(MockStore::new().with_item(root_item(100)));
        let mut feature = node("Feature", "A building");
        feature.children.push(node("Task", "Design"));
        feature.children.push(node("Task", ""));
        let mut tree = HierarchyTree::new();
        tree.push_root(feature);

        let report = run(&store, &tree, &ScopedSettings::default(), 100)
            .await
            .unwrap();
        assert!(report.is_success());
        assert_eq!(report.created.len(), 2);

        let calls = store.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].request.title, "A building");
        assert_eq!(calls[0].parent, Some(RemoteId::new(100)));
        let feature_remote = calls[0].outcome.clone().unwrap();
        assert_eq!(calls[1].request.title, "Design");
        assert_eq!(calls[1].parent, Some(feature_remote));
    }

    #[tokio::test]
    async fn parents_are_created_strictly_before_children() {
        let store = Arc::new(MockStore::new().with_item(root_item(100)));
        let mut story = node("User Story", "story");
        story.children.push(node("Task", "t1"));
        story.children.push(node("Task", "t2"));
        let mut feature = node("Feature", "feature");
        feature.children.push(story);
        let mut tree = HierarchyTree::new();
        tree.push_root(feature);
        tree.push_root(node("Feature", "second feature"));

        run(&store, &tree, &ScopedSettings::default(), 100)
            .await
            .unwrap();

        let calls = store.calls();
        let titles: Vec<&str> = calls.iter().map(|c| c.request.title.as_str()).collect();
        assert_eq!(titles, ["feature", "story", "t1", "t2", "second feature"]);
        // every call links to the remote id its parent's call returned
        let remote_of = |title: &str| {
            calls
                .iter()
                .find(|c| c.request.title == title)
                .and_then(|c| c.outcome.clone().ok())
                .unwrap()
        };
        assert_eq!(calls[1].parent, Some(remote_of("feature")));
        assert_eq!(calls[2].parent, Some(remote_of("story")));
        assert_eq!(calls[3].parent, Some(remote_of("story")));
        assert_eq!(calls[4].parent, Some(RemoteId::new(100)));
    }

    #[tokio::test]
    async fn failed_parent_skips_its_subtree_and_spares_siblings() {
        let store = Arc::new(
            MockStore::new()
                .with_item(root_item(100))
                .with_outcomes([MockOutcome::Fail(RemoteError::ServerError {
                    status: 500,
                    body: "boom".into(),
                })]),
        );
        let mut failing = node("Feature", "doomed");
        failing.children.push(node("Task", "never created"));
        let mut surviving = node("Feature", "survivor");
        surviving.children.push(node("Task", "still created"));
        let mut tree = HierarchyTree::new();
        tree.push_root(failing);
        tree.push_root(surviving);

        let report = run(&store, &tree, &ScopedSettings::default(), 100)
            .await
            .unwrap();

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Feature"), "{}", report.errors[0]);
        assert!(report.errors[0].contains("doomed"), "{}", report.errors[0]);
        assert!(report.errors[0].contains("server error"), "{}", report.errors[0]);
        assert_eq!(report.created.len(), 2);

        let calls = store.calls();
        let titles: Vec<&str> = calls.iter().map(|c| c.request.title.as_str()).collect();
        assert_eq!(titles, ["doomed", "survivor", "still created"]);
    }

    #[tokio::test]
    async fn tag_accumulators_thread_through_the_walk() {
        let mut settings = ScopedSettings::default();
        settings.default.insert(
            ty("Feature"),
            policy(TagInheritance::Parent, &["feat"], AssignmentBehavior::None),
        );
        settings.default.insert(
            ty("Task"),
            policy(TagInheritance::Ancestors, &["task"], AssignmentBehavior::None),
        );
        settings.default.insert(
            ty("Bug"),
            policy(TagInheritance::Ancestors, &["bug"], AssignmentBehavior::None),
        );

        let store = Arc::new(MockStore::new().with_item(root_item(100)));
        let mut feature = node("Feature", "feature");
        feature.children.push(node("Task", "task"));
        let mut tree = HierarchyTree::new();
        tree.push_root(feature);
        tree.push_root(node("Bug", "sibling bug"));

        run(&store, &tree, &settings, 100).await.unwrap();

        let calls = store.calls();
        // Parent inheritance at depth zero unions the decomposing item's tags.
        assert_eq!(calls[0].request.tags, ["feat", "root-tag"]);
        // Ancestors at depth one sees the root seed plus the feature's applied set.
        assert_eq!(calls[1].request.tags, ["feat", "root-tag", "task"]);
        // A later sibling never sees the first branch's applied tags.
        assert_eq!(calls[2].request.tags, ["bug", "root-tag"]);
    }

    #[tokio::test]
    async fn assignment_policies_resolve_per_type() {
        let mut settings = ScopedSettings::default();
        settings.default.insert(
            ty("Feature"),
            policy(TagInheritance::None, &[], AssignmentBehavior::DecomposingItem),
        );
        settings.default.insert(
            ty("Task"),
            policy(TagInheritance::None, &[], AssignmentBehavior::Creator),
        );

        let store = Arc::new(MockStore::new().with_item(root_item(100)));
        let mut feature = node("Feature", "feature");
        feature.children.push(node("Task", "task"));
        feature.children.push(node("User Story", "unconfigured"));
        let mut tree = HierarchyTree::new();
        tree.push_root(feature);

        run(&store, &tree, &settings, 100).await.unwrap();

        let calls = store.calls();
        assert_eq!(calls[0].request.assignee, Some(owner()));
        assert_eq!(calls[1].request.assignee, Some(actor()));
        assert_eq!(calls[2].request.assignee, None);
    }

    #[tokio::test]
    async fn attach_comment_setting_adds_the_fixed_body() {
        let mut settings = ScopedSettings::default();
        settings.attach_comment = true;
        settings.comment_body = "decomposed from the parent epic".into();

        let store = Arc::new(MockStore::new().with_item(root_item(100)));
        let mut tree = HierarchyTree::new();
        tree.push_root(node("Feature", "feature"));

        run(&store, &tree, &settings, 100).await.unwrap();
        assert_eq!(
            store.calls()[0].request.comment.as_deref(),
            Some("decomposed from the parent epic")
        );

        let store = Arc::new(MockStore::new().with_item(root_item(100)));
        run(&store, &tree, &ScopedSettings::default(), 100)
            .await
            .unwrap();
        assert_eq!(store.calls()[0].request.comment, None);
    }

    #[tokio::test]
    async fn events_mirror_the_report() {
        let store = Arc::new(
            MockStore::new()
                .with_item(root_item(100))
                .with_outcomes([MockOutcome::Fail(RemoteError::RateLimited)]),
        );
        let mut tree = HierarchyTree::new();
        tree.push_root(node("Feature", "doomed"));
        tree.push_root(node("Feature", "fine"));

        let (tx, mut rx) = broadcast::channel(16);
        let engine = MaterializationEngine::new(
            Arc::clone(&store) as Arc<dyn WorkItemStore>,
            Arc::new(StaticIdentityProvider(actor())),
        )
        .with_events(tx);

        engine
            .materialize(MaterializeParams {
                tree: &tree,
                parent_id: RemoteId::new(100),
                project: "proj",
                settings: &ScopedSettings::default(),
            })
            .await
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event {
                MaterializeEvent::RunStarted { .. } => "started",
                MaterializeEvent::ItemCreated { .. } => "created",
                MaterializeEvent::ItemFailed { .. } => "failed",
                MaterializeEvent::RunFinished { created, failed, .. } => {
                    assert_eq!((created, failed), (1, 1));
                    "finished"
                }
            });
        }
        assert_eq!(kinds, ["started", "failed", "created", "finished"]);
    }
}
