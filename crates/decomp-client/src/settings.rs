use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use decomp_core::rules::HierarchyRuleSet;
use decomp_core::settings::{ScopedSettings, SettingsError, SettingsSource};
use decomp_core::store::RulesProvider;

/// On-disk workspace document: the hierarchy rules and the scoped
/// tag/assignment policy, in one JSON file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WorkspaceFile {
    #[serde(default)]
    pub rules: HierarchyRuleSet,
    #[serde(default)]
    pub settings: ScopedSettings,
}

/// Serves both the settings snapshot and the hierarchy rules from a local
/// JSON file. The file is re-read on every load, matching the
/// read-once-per-run contract of the engine.
pub struct FileSettingsSource {
    path: PathBuf,
}

impl FileSettingsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<WorkspaceFile, SettingsError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| SettingsError::Io(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| SettingsError::Parse(format!("{}: {e}", self.path.display())))
    }
}

#[async_trait]
impl SettingsSource for FileSettingsSource {
    async fn load(&self) -> Result<ScopedSettings, SettingsError> {
        Ok(self.read_file()?.settings)
    }
}

#[async_trait]
impl RulesProvider for FileSettingsSource {
    async fn get_rules(&self) -> Result<HierarchyRuleSet, SettingsError> {
        Ok(self.read_file()?.rules)
    }
}
