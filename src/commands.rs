use crate::{OutputMode, emit_success};
use nodeprefs::config::{self, PrefsConfig, ScopeConfig, StoreSettings};
use nodeprefs::document::{self, Document};
use nodeprefs::ui::{self, Icons};
use nodeprefs::{Lookup, Node, PreferencesFactory, PreferencesTree, Scope, TableName};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Everything a command needs to locate its tree
pub struct Context {
    pub config: PrefsConfig,
    pub config_path: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub table: Option<String>,
    pub scope: Scope,
    pub output_mode: OutputMode,
}

impl Context {
    /// Settings for `scope`; command-line flags beat the environment and the file
    pub fn settings(&self, scope: Scope) -> anyhow::Result<StoreSettings> {
        let mut settings = self.config.resolve(scope)?;
        if let Some(database) = &self.database {
            settings.database = database.clone();
        }
        if let Some(table) = &self.table {
            settings.table = TableName::new(table.as_str())?;
        }
        Ok(settings)
    }

    pub fn open(&self, scope: Scope) -> anyhow::Result<PreferencesTree> {
        Ok(PreferencesFactory::open_settings(&self.settings(scope)?)?)
    }

    fn open_default(&self) -> anyhow::Result<PreferencesTree> {
        self.open(self.scope)
    }
}

/// Handle for `path`, refusing to create it as a side effect of a read
fn existing_node(tree: &PreferencesTree, path: &str) -> anyhow::Result<Node> {
    if !tree.node_exists(path)? {
        anyhow::bail!("no such node: {} ({} scope)", path, tree.scope());
    }
    Ok(tree.node(path)?)
}

pub fn run_init(ctx: &Context, write_config: bool, force: bool) -> anyhow::Result<()> {
    let mut initialized = Vec::new();
    for scope in Scope::all() {
        let settings = ctx.settings(*scope)?;
        PreferencesFactory::open_settings(&settings)?;
        initialized.push(settings);
    }

    let config_path = if write_config {
        let path = ctx.config_path.clone().unwrap_or_else(config::default_config_path);
        let scoped = |settings: &StoreSettings| ScopeConfig {
            database: Some(settings.database.display().to_string()),
            table: Some(settings.table.to_string()),
            busy_timeout_ms: Some(settings.busy_timeout.as_millis() as u64),
        };
        let file = PrefsConfig {
            user: scoped(&initialized[0]),
            system: scoped(&initialized[1]),
            ..Default::default()
        };
        config::write_config(&path, &file, force)?;
        Some(path)
    } else {
        None
    };

    if ctx.output_mode.is_human() {
        ui::header("Preferences initialized");
        for settings in &initialized {
            ui::info(
                settings.scope.as_str(),
                &format!("{} (table {})", settings.database.display(), settings.table),
            );
        }
        if let Some(path) = config_path {
            ui::success(&format!("Wrote {}", path.display()));
        }
    } else {
        let scopes: Vec<_> = initialized
            .iter()
            .map(|s| {
                serde_json::json!({
                    "scope": s.scope,
                    "database": s.database.display().to_string(),
                    "table": s.table.to_string(),
                })
            })
            .collect();
        let data = serde_json::json!({
            "scopes": scopes,
            "config": config_path.map(|p| p.display().to_string()),
        });
        emit_success(ctx.output_mode, "init", data)?;
    }
    Ok(())
}

pub fn run_get(ctx: &Context, path: &str, key: &str, default: Option<String>) -> anyhow::Result<()> {
    let tree = ctx.open_default()?;
    let node = existing_node(&tree, path)?;
    let lookup = node.lookup(key)?;

    if ctx.output_mode.is_human() {
        match (&lookup, default) {
            (Lookup::Value(value), _) => println!("{}", value),
            (Lookup::Null, _) => println!("{}", ui::dim("null")),
            (Lookup::Absent, Some(default)) => println!("{}", default),
            (Lookup::Absent, None) => anyhow::bail!("key {:?} not found at {}", key, node.absolute_path()),
        }
    } else {
        let data = serde_json::json!({
            "node": node.absolute_path(),
            "key": key,
            "present": lookup.is_present(),
            "value": lookup.into_value().or(default),
        });
        emit_success(ctx.output_mode, "get", data)?;
    }
    Ok(())
}

pub fn run_put(ctx: &Context, path: &str, key: &str, value: Option<String>, null: bool) -> anyhow::Result<()> {
    let tree = ctx.open_default()?;
    let node = tree.node(path)?;
    match (&value, null) {
        (Some(_), true) => anyhow::bail!("pass either a value or --null, not both"),
        (Some(value), false) => node.put(key, value)?,
        (None, true) => node.put_null(key)?,
        (None, false) => anyhow::bail!("missing value (use --null to store a key without a value)"),
    }

    if ctx.output_mode.is_human() {
        ui::success(&format!("{} {} = {}", node.absolute_path(), key, value.as_deref().unwrap_or("null")));
    } else {
        let data = serde_json::json!({ "node": node.absolute_path(), "key": key, "value": value });
        emit_success(ctx.output_mode, "put", data)?;
    }
    Ok(())
}

pub fn run_remove(ctx: &Context, path: &str, key: &str) -> anyhow::Result<()> {
    let tree = ctx.open_default()?;
    let node = existing_node(&tree, path)?;
    node.remove(key)?;

    if ctx.output_mode.is_human() {
        ui::success(&format!("Removed {} from {}", key, node.absolute_path()));
    } else {
        let data = serde_json::json!({ "node": node.absolute_path(), "key": key });
        emit_success(ctx.output_mode, "remove", data)?;
    }
    Ok(())
}

pub fn run_keys(ctx: &Context, path: &str) -> anyhow::Result<()> {
    let tree = ctx.open_default()?;
    let node = existing_node(&tree, path)?;
    let mut entries = Vec::new();
    for key in node.keys()? {
        let value = node.get(&key)?;
        entries.push((key, value));
    }

    if ctx.output_mode.is_human() {
        if entries.is_empty() {
            println!("{} No keys at {}", Icons::EMPTY, node.absolute_path());
        } else {
            println!("{}", ui::entries_table(&entries));
        }
    } else {
        let map: serde_json::Map<String, serde_json::Value> = entries
            .into_iter()
            .map(|(key, value)| (key, value.map_or(serde_json::Value::Null, serde_json::Value::String)))
            .collect();
        let data = serde_json::json!({ "node": node.absolute_path(), "keys": map });
        emit_success(ctx.output_mode, "keys", data)?;
    }
    Ok(())
}

pub fn run_children(ctx: &Context, path: &str) -> anyhow::Result<()> {
    let tree = ctx.open_default()?;
    let node = existing_node(&tree, path)?;
    let children = node.child_names()?;

    if ctx.output_mode.is_human() {
        if children.is_empty() {
            println!("{} No children under {}", Icons::EMPTY, node.absolute_path());
        }
        for child in children {
            println!("{} {}", Icons::FOLDER, child);
        }
    } else {
        let data = serde_json::json!({ "node": node.absolute_path(), "children": children });
        emit_success(ctx.output_mode, "children", data)?;
    }
    Ok(())
}

pub fn run_exists(ctx: &Context, path: &str) -> anyhow::Result<()> {
    let tree = ctx.open_default()?;
    let exists = tree.node_exists(path)?;

    if ctx.output_mode.is_human() {
        println!("{}", exists);
    } else {
        let data = serde_json::json!({ "node": path, "exists": exists });
        emit_success(ctx.output_mode, "exists", data)?;
    }
    Ok(())
}

pub fn run_remove_node(ctx: &Context, path: &str) -> anyhow::Result<()> {
    let tree = ctx.open_default()?;
    let node = existing_node(&tree, path)?;
    node.remove_node()?;

    if ctx.output_mode.is_human() {
        println!("{} Removed {} and its subtree", Icons::DEL.style(ui::style(ui::Role::Error)), node.absolute_path());
    } else {
        let data = serde_json::json!({ "node": node.absolute_path() });
        emit_success(ctx.output_mode, "remove-node", data)?;
    }
    Ok(())
}

pub fn run_clear(ctx: &Context, path: &str) -> anyhow::Result<()> {
    let tree = ctx.open_default()?;
    let node = existing_node(&tree, path)?;
    node.clear()?;

    if ctx.output_mode.is_human() {
        ui::success(&format!("Cleared keys of {}", node.absolute_path()));
    } else {
        let data = serde_json::json!({ "node": node.absolute_path() });
        emit_success(ctx.output_mode, "clear", data)?;
    }
    Ok(())
}

pub fn run_export(ctx: &Context, path: &str, output: Option<&Path>, node_only: bool) -> anyhow::Result<()> {
    let tree = ctx.open_default()?;
    let node = existing_node(&tree, path)?;

    let started = Instant::now();
    let spinner = output.map(|_| ui::Spinner::new(&format!("Exporting {}", node.absolute_path())));
    let document = if node_only {
        document::export_node(&node)?
    } else {
        document::export_subtree(&node)?
    };
    if let Some(spinner) = &spinner {
        spinner.finish_and_clear();
    }

    match output {
        Some(file) => {
            document.write_json(std::fs::File::create(file)?)?;
            if ctx.output_mode.is_human() {
                ui::finish_with_summary(started.elapsed(), document.root.node_count(), document.root.key_count());
                ui::summary_row("Written to", &file.display().to_string());
            } else {
                let data = serde_json::json!({
                    "file": file.display().to_string(),
                    "nodes": document.root.node_count(),
                    "keys": document.root.key_count(),
                });
                emit_success(ctx.output_mode, "export", data)?;
            }
        }
        // The document itself is the output.
        None => document.write_json(std::io::stdout().lock())?,
    }
    Ok(())
}

pub fn run_import(ctx: &Context, input: &Path) -> anyhow::Result<()> {
    let document = if input == Path::new("-") {
        Document::read_json(std::io::stdin().lock())?
    } else {
        Document::read_json(std::fs::File::open(input)?)?
    };
    ensure_import_scope(&document, ctx.scope)?;

    let tree = ctx.open_default()?;
    let started = Instant::now();
    let spinner = ui::Spinner::new(&format!("Importing into {}", document.path));
    let stats = document::import(&document, &tree)?;
    spinner.finish_and_clear();

    if ctx.output_mode.is_human() {
        ui::finish_with_summary(started.elapsed(), stats.nodes, stats.keys);
        ui::summary_row("Imported into", &format!("{} ({} scope)", document.path, document.scope));
    } else {
        let data = serde_json::json!({
            "scope": document.scope,
            "path": document.path,
            "nodes": stats.nodes,
            "keys": stats.keys,
        });
        emit_success(ctx.output_mode, "import", data)?;
    }
    Ok(())
}

/// Documents are imported only into the scope they were exported from
fn ensure_import_scope(document: &Document, scope: Scope) -> anyhow::Result<()> {
    if document.scope != scope {
        anyhow::bail!(
            "document was exported from the {} scope; rerun with --scope {}",
            document.scope,
            document.scope
        );
    }
    Ok(())
}

pub fn run_stats(ctx: &Context) -> anyhow::Result<()> {
    let settings = ctx.settings(ctx.scope)?;
    let tree = PreferencesFactory::open_settings(&settings)?;
    let stats = tree.stats()?;

    if ctx.output_mode.is_human() {
        println!(
            "{} {}",
            Icons::STATS,
            format!("Preferences ({} scope)", settings.scope).bold()
        );
        let database = settings.database.display().to_string();
        let nodes = stats.nodes.to_string();
        let keys = stats.keys.to_string();
        println!(
            "{}",
            ui::stats_table(&[
                ("Database", database.as_str()),
                ("Table", stats.table.as_str()),
                ("Nodes", nodes.as_str()),
                ("Keys", keys.as_str()),
            ])
        );
    } else {
        let data = serde_json::json!({
            "scope": settings.scope,
            "database": settings.database.display().to_string(),
            "stats": stats,
        });
        emit_success(ctx.output_mode, "stats", data)?;
    }
    Ok(())
}
