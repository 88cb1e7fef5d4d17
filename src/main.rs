//! nodeprefs CLI - inspect and edit preference trees stored in SQLite

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use nodeprefs::config;
use nodeprefs::Scope;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "nodeprefs")]
#[command(version)]
#[command(about = "Hierarchical preferences stored in a single SQLite table")]
#[command(long_about = r#"
nodeprefs keeps a tree of preference nodes, each holding string keys,
in one SQLite table per scope (user or system).

Example usage:
  nodeprefs init
  nodeprefs put app/window width 800
  nodeprefs keys app/window
  nodeprefs children /
  nodeprefs export / --output prefs.json
  nodeprefs --scope system import prefs.json
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Preference scope (user or system)
    #[arg(short, long, global = true, default_value = "user")]
    scope: String,

    /// Path to the config file (defaults to ./nodeprefs.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file, overriding config and environment
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Table name, overriding config and environment
    #[arg(short, long, global = true)]
    table: Option<String>,

    /// Emit machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the table for both scopes
    Init {
        /// Also write the resolved settings to the config file
        #[arg(long)]
        write_config: bool,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Print the value of a key
    Get {
        /// Node path, e.g. app/window
        node: String,

        /// Key name
        key: String,

        /// Printed when the key is absent
        #[arg(long)]
        default: Option<String>,
    },

    /// Set a key, creating the node if needed
    Put {
        /// Node path
        node: String,

        /// Key name
        key: String,

        /// Value to store
        value: Option<String>,

        /// Store the key without a value
        #[arg(long)]
        null: bool,
    },

    /// Remove a key
    Remove {
        /// Node path
        node: String,

        /// Key name
        key: String,
    },

    /// List the keys and values of a node
    Keys {
        /// Node path
        #[arg(default_value = "/")]
        node: String,
    },

    /// List the immediate children of a node
    Children {
        /// Node path
        #[arg(default_value = "/")]
        node: String,
    },

    /// Check whether a node exists
    Exists {
        /// Node path
        node: String,
    },

    /// Remove a node and everything below it
    RemoveNode {
        /// Node path
        node: String,
    },

    /// Remove every key of a node, keeping its children
    Clear {
        /// Node path
        node: String,
    },

    /// Export a subtree as JSON
    Export {
        /// Node path
        #[arg(default_value = "/")]
        node: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export only the node's own keys
        #[arg(long)]
        node_only: bool,
    },

    /// Import a JSON document; --scope must match the scope it was exported from
    Import {
        /// Input file, or - for stdin
        input: PathBuf,
    },

    /// Show node and key counts
    Stats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

pub fn emit_success(output_mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    match output_mode {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(&envelope)?),
        OutputMode::Human => println!("{}", envelope),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let scope: Scope = cli.scope.parse()?;
    let ctx = Context {
        config: config::load_config(cli.config.as_deref())?.unwrap_or_default(),
        config_path: cli.config,
        database: cli.database,
        table: cli.table,
        scope,
        output_mode: if cli.json { OutputMode::Json } else { OutputMode::Human },
    };

    let result = match cli.command {
        Commands::Init { write_config, force } => commands::run_init(&ctx, write_config, force),
        Commands::Get { node, key, default } => commands::run_get(&ctx, &node, &key, default),
        Commands::Put { node, key, value, null } => commands::run_put(&ctx, &node, &key, value, null),
        Commands::Remove { node, key } => commands::run_remove(&ctx, &node, &key),
        Commands::Keys { node } => commands::run_keys(&ctx, &node),
        Commands::Children { node } => commands::run_children(&ctx, &node),
        Commands::Exists { node } => commands::run_exists(&ctx, &node),
        Commands::RemoveNode { node } => commands::run_remove_node(&ctx, &node),
        Commands::Clear { node } => commands::run_clear(&ctx, &node),
        Commands::Export { node, output, node_only } => {
            commands::run_export(&ctx, &node, output.as_deref(), node_only)
        }
        Commands::Import { input } => commands::run_import(&ctx, &input),
        Commands::Stats => commands::run_stats(&ctx),
    };

    if let Err(e) = &result {
        if ctx.output_mode.is_human() {
            nodeprefs::ui::error(&e.to_string());
        } else {
            let envelope = serde_json::json!({ "ok": false, "error": e.to_string() });
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        std::process::exit(1);
    }

    Ok(())
}
