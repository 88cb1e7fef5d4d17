use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::scope::Scope;
use crate::storage::{TableName, DEFAULT_BUSY_TIMEOUT, DEFAULT_TABLE};
use crate::{Error, Result};

/// Prefix of every environment variable read by [`PrefsConfig::resolve`]
pub const ENV_PREFIX: &str = "NODEPREFS";

/// Settings that may be given once for both scopes or per scope
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ScopeConfig {
    pub database: Option<String>,
    pub table: Option<String>,
    pub busy_timeout_ms: Option<u64>,
}

/// Contents of `nodeprefs.toml`.
///
/// Top-level values apply to both scopes; `[user]` and `[system]` tables
/// override them.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PrefsConfig {
    pub database: Option<String>,
    pub table: Option<String>,
    pub busy_timeout_ms: Option<u64>,
    #[serde(default)]
    pub user: ScopeConfig,
    #[serde(default)]
    pub system: ScopeConfig,
}

/// Fully resolved location of one scope's tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub scope: Scope,
    pub database: PathBuf,
    pub table: TableName,
    pub busy_timeout: Duration,
}

impl PrefsConfig {
    fn scoped(&self, scope: Scope) -> &ScopeConfig {
        match scope {
            Scope::User => &self.user,
            Scope::System => &self.system,
        }
    }

    /// Resolve settings for `scope` from the process environment and this file
    pub fn resolve(&self, scope: Scope) -> Result<StoreSettings> {
        self.resolve_with(scope, |name| std::env::var(name).ok())
    }

    /// Resolve settings for `scope`, reading variables through `env`.
    ///
    /// For each setting the first hit wins:
    /// `NODEPREFS_<SCOPE>_<NAME>`, `NODEPREFS_<NAME>`, `[<scope>]` in the
    /// file, the top level of the file, then the built-in default.
    pub fn resolve_with<F>(&self, scope: Scope, env: F) -> Result<StoreSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let scoped = self.scoped(scope);
        let lookup = |name: &str| {
            let scoped_var = format!("{}_{}_{}", ENV_PREFIX, scope.as_str().to_uppercase(), name);
            let unscoped_var = format!("{}_{}", ENV_PREFIX, name);
            env(scoped_var.as_str()).or_else(|| env(unscoped_var.as_str()))
        };

        let database = lookup("DATABASE")
            .or_else(|| scoped.database.clone())
            .or_else(|| self.database.clone())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_database_path(scope));

        let table = lookup("TABLE")
            .or_else(|| scoped.table.clone())
            .or_else(|| self.table.clone())
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());

        let busy_timeout = match lookup("BUSY_TIMEOUT_MS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("busy timeout must be milliseconds, got {:?}", raw))
            })?),
            None => scoped.busy_timeout_ms.or(self.busy_timeout_ms),
        }
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_BUSY_TIMEOUT);

        Ok(StoreSettings {
            scope,
            database,
            table: TableName::new(table)?,
            busy_timeout,
        })
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("nodeprefs.toml")
}

pub fn default_database_path(scope: Scope) -> PathBuf {
    default_database_path_in(Path::new("."), scope)
}

pub fn default_database_path_in(base: &Path, scope: Scope) -> PathBuf {
    base.join(".nodeprefs").join(format!("{}.db", scope.as_str()))
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<PrefsConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: PrefsConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &PrefsConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
