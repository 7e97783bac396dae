use decomp_core::errors::RemoteError;
use decomp_core::settings::SettingsError;

use crate::manager::HierarchyError;
use crate::text::ParseError;

/// A materialization run that fails one of these creates nothing and
/// returns a single error; per-node creation failures are reported in the
/// run's result list instead.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("parent work item id {0} is not a valid remote id")]
    InvalidParentId(i64),

    #[error("project identifier is missing")]
    MissingProject,

    #[error("hierarchy contains no items with titles")]
    EmptyHierarchy,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Precondition(#[from] PreconditionError),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
}
