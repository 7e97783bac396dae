use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use decomp_core::errors::RemoteError;
use decomp_core::identity::{Identity, IdentityProvider};
use decomp_core::ids::RemoteId;
use decomp_core::store::{CreationRequest, RemoteWorkItem, WorkItemStore};

/// Pre-programmed outcome for one `create_item` call.
#[derive(Clone, Debug)]
pub enum MockOutcome {
    Created(i64),
    Fail(RemoteError),
}

/// One recorded `create_item` call, in submission order.
#[derive(Clone, Debug)]
pub struct RecordedCreate {
    pub request: CreationRequest,
    pub parent: Option<RemoteId>,
    pub outcome: Result<RemoteId, String>,
}

/// Deterministic in-memory store for tests.
///
/// Scripted outcomes are consumed in call order; once the script runs dry,
/// every call succeeds with the next sequential id. Each call is recorded
/// so tests can assert ordering and parent linkage.
#[derive(Default)]
pub struct MockStore {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    items: Mutex<HashMap<i64, RemoteWorkItem>>,
    calls: Mutex<Vec<RecordedCreate>>,
    next_id: AtomicI64,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1000),
            ..Self::default()
        }
    }

    /// Queue outcomes for the next `create_item` calls, in order.
    pub fn with_outcomes(self, outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        self.outcomes.lock().extend(outcomes);
        self
    }

    /// Register an item `get_item` should return.
    pub fn with_item(self, item: RemoteWorkItem) -> Self {
        self.items.lock().insert(item.id.get(), item);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCreate> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl WorkItemStore for MockStore {
    async fn create_item(
        &self,
        request: &CreationRequest,
        parent: Option<RemoteId>,
    ) -> Result<RemoteId, RemoteError> {
        let scripted = self.outcomes.lock().pop_front();
        let result = match scripted {
            Some(MockOutcome::Created(id)) => Ok(RemoteId::new(id)),
            Some(MockOutcome::Fail(error)) => Err(error),
            None => Ok(RemoteId::new(self.next_id.fetch_add(1, Ordering::Relaxed))),
        };
        self.calls.lock().push(RecordedCreate {
            request: request.clone(),
            parent,
            outcome: result.clone().map_err(|e| e.to_string()),
        });
        result
    }

    async fn get_item(&self, id: RemoteId) -> Result<RemoteWorkItem, RemoteError> {
        self.items
            .lock()
            .get(&id.get())
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("work item {id}")))
    }
}

/// Identity provider returning a fixed actor.
pub struct StaticIdentityProvider(pub Identity);

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn current_actor(&self) -> Result<Identity, RemoteError> {
        Ok(self.0.clone())
    }
}
