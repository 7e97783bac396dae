use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::RemoteError;

/// A user identity as known to the remote store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub display_name: String,
    /// Opaque unique handle the remote store resolves assignments with.
    pub descriptor: String,
}

impl Identity {
    pub fn new(display_name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            descriptor: descriptor.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// Resolves the actor performing the current save. Implementations may
/// cache; the materialization engine resolves at most once per run.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_actor(&self) -> Result<Identity, RemoteError>;
}
