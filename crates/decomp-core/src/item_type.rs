use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a work item type (e.g. "Feature", "Task").
///
/// Types are project-configurable on the remote side, so there is no closed
/// enum; equality is case-sensitive and no normalization is applied.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemTypeName(String);

impl WorkItemTypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkItemTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkItemTypeName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for WorkItemTypeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for WorkItemTypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
