use serde::{Deserialize, Serialize};

use crate::ids::{NodeId, RemoteId, RunId};
use crate::item_type::WorkItemTypeName;

/// Progress events emitted during a materialization run.
/// Observational only; a lagging or absent receiver never affects the run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MaterializeEvent {
    #[serde(rename = "run_started")]
    RunStarted {
        run_id: RunId,
        parent_id: RemoteId,
        pending: usize,
    },

    #[serde(rename = "item_created")]
    ItemCreated {
        run_id: RunId,
        node_id: NodeId,
        remote_id: RemoteId,
        item_type: WorkItemTypeName,
        title: String,
    },

    #[serde(rename = "item_failed")]
    ItemFailed {
        run_id: RunId,
        node_id: NodeId,
        item_type: WorkItemTypeName,
        title: String,
        error: String,
    },

    #[serde(rename = "run_finished")]
    RunFinished {
        run_id: RunId,
        created: usize,
        failed: usize,
    },
}
