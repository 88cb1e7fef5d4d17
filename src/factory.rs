//! Opens the user and system trees from configuration

use crate::config::{self, PrefsConfig, StoreSettings};
use crate::storage::NodeStore;
use crate::tree::{Node, PreferencesTree};
use crate::{Result, Scope};

/// Builds [`PreferencesTree`]s for each scope from a [`PrefsConfig`].
///
/// The factory holds no open state; each call to [`PreferencesFactory::open`]
/// returns an independent tree with its own registry.
#[derive(Debug, Clone, Default)]
pub struct PreferencesFactory {
    config: PrefsConfig,
}

impl PreferencesFactory {
    pub fn new(config: PrefsConfig) -> Self {
        Self { config }
    }

    /// Factory over `nodeprefs.toml` in the working directory, if present
    pub fn from_default_config() -> anyhow::Result<Self> {
        Ok(Self::new(config::load_config(None)?.unwrap_or_default()))
    }

    pub fn config(&self) -> &PrefsConfig {
        &self.config
    }

    pub fn settings(&self, scope: Scope) -> Result<StoreSettings> {
        self.config.resolve(scope)
    }

    /// Open the tree for `scope`, creating the database and table if needed
    pub fn open(&self, scope: Scope) -> Result<PreferencesTree> {
        Self::open_settings(&self.settings(scope)?)
    }

    pub fn open_settings(settings: &StoreSettings) -> Result<PreferencesTree> {
        config::ensure_db_dir(&settings.database)?;
        let store = NodeStore::open_with_timeout(
            &settings.database,
            settings.table.clone(),
            settings.busy_timeout,
        )?;
        tracing::debug!(
            scope = %settings.scope,
            database = %settings.database.display(),
            table = %settings.table,
            "opened preferences store"
        );
        Ok(PreferencesTree::new(store, settings.scope))
    }

    pub fn user_root(&self) -> Result<Node> {
        Ok(self.open(Scope::User)?.root())
    }

    pub fn system_root(&self) -> Result<Node> {
        Ok(self.open(Scope::System)?.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TableName;
    use std::time::Duration;

    fn settings(dir: &std::path::Path, scope: Scope, table: &str) -> StoreSettings {
        StoreSettings {
            scope,
            database: dir.join("nested").join("prefs.db"),
            table: TableName::new(table).unwrap(),
            busy_timeout: Duration::from_millis(100),
        }
    }

    #[test]
    fn test_open_creates_database_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tree = PreferencesFactory::open_settings(&settings(dir.path(), Scope::User, "prefs")).unwrap();

        assert!(dir.path().join("nested").join("prefs.db").exists());
        assert!(tree.root().is_user_node());
        assert!(tree.node_exists("").unwrap());
    }

    #[test]
    fn test_scopes_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let user = PreferencesFactory::open_settings(&settings(dir.path(), Scope::User, "user_prefs")).unwrap();
        let system = PreferencesFactory::open_settings(&settings(dir.path(), Scope::System, "system_prefs")).unwrap();

        user.node("app").unwrap().put("k", "user").unwrap();

        assert!(!system.node_exists("app").unwrap());
        assert!(!system.root().is_user_node());
    }

    #[test]
    fn test_reopen_sees_previous_writes() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), Scope::User, "prefs");
        PreferencesFactory::open_settings(&settings)
            .unwrap()
            .node("app/window")
            .unwrap()
            .put("width", "800")
            .unwrap();

        let tree = PreferencesFactory::open_settings(&settings).unwrap();
        assert_eq!(tree.node("app/window").unwrap().get_i64("width", 0).unwrap(), 800);
    }
}
