//! Prefab Bridge CLI
//!
//! Runs the bridge server and drives prefab creation from the command line.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use prefab_core::{
    meta_path, random_canonical_id, serialize_prefab, validate_references, BridgeConfig, LiveNode,
    PrefabMeta, WalkOptions,
};
use prefab_core::types::CONFIG_FILE_NAME;
use prefab_server::{run_server, ServerConfig};

const DEFAULT_PORT: u16 = 44756;

#[derive(Parser)]
#[command(name = "prefab-bridge")]
#[command(about = "Create editor prefab assets from live scene nodes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default prefab-bridge.json
    Init {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Start the bridge server (connects to the editor plugin)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Project directory holding prefab-bridge.json
        #[arg(long)]
        project: Option<PathBuf>,
    },

    /// Show server status
    Status {
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Create a prefab from a live node through the running server
    Create {
        /// Uuid of the node in the open scene
        #[arg(long)]
        node: String,

        /// Prefab name
        #[arg(short, long)]
        name: String,

        /// db:// folder or prefab url
        #[arg(short, long, default_value = "db://assets")]
        save_path: String,

        /// Serialize only the node itself
        #[arg(long)]
        no_children: bool,

        /// Skip components
        #[arg(long)]
        no_components: bool,

        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Serialize a saved node snapshot into a prefab file and meta
    Build {
        /// Snapshot JSON as returned by the scene query
        snapshot: PathBuf,

        /// Prefab name (default: snapshot file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Output prefab path (default: <name>.prefab next to the snapshot)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        no_children: bool,

        #[arg(long)]
        no_components: bool,

        /// Verify every internal reference after writing
        #[arg(long)]
        check: bool,
    },
}

/// Crates whose events are shown at info level by default
const LOG_TARGETS: &[&str] = &[env!("CARGO_CRATE_NAME"), "prefab_server", "prefab_core"];

fn env_filter() -> Result<tracing_subscriber::EnvFilter> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for target in LOG_TARGETS {
        filter = filter.add_directive(format!("{}=info", target).parse()?);
    }
    Ok(filter)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(env_filter()?).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path } => cmd_init(path)?,
        Commands::Serve { port, project } => cmd_serve(port, project).await?,
        Commands::Status { port } => cmd_status(port).await?,
        Commands::Create {
            node,
            name,
            save_path,
            no_children,
            no_components,
            port,
        } => {
            let options = walk_options(no_children, no_components);
            cmd_create(node, name, save_path, options, port).await?;
        }
        Commands::Build {
            snapshot,
            name,
            output,
            no_children,
            no_components,
            check,
        } => {
            let options = walk_options(no_children, no_components);
            cmd_build(&snapshot, name, output, options, check)?;
        }
    }

    Ok(())
}

fn walk_options(no_children: bool, no_components: bool) -> WalkOptions {
    WalkOptions {
        include_children: !no_children,
        include_components: !no_components,
    }
}

fn current_dir_or(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => std::env::current_dir().context("Failed to read current directory"),
    }
}

fn cmd_init(path: Option<PathBuf>) -> Result<()> {
    let project_dir = current_dir_or(path)?;
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    tracing::info!("Initializing prefab bridge config in {}", project_dir.display());
    if config_path.exists() {
        bail!("{} already exists", config_path.display());
    }

    std::fs::create_dir_all(&project_dir).context("Failed to create project directory")?;
    let config_json = serde_json::to_string_pretty(&BridgeConfig::default())?;
    std::fs::write(&config_path, config_json)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Wrote {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Open the project in the editor and enable the bridge plugin");
    println!("  2. Run: prefab-bridge serve");
    Ok(())
}

async fn cmd_serve(port: u16, project: Option<PathBuf>) -> Result<()> {
    let project_dir = current_dir_or(project)?;
    let config = BridgeConfig::load_or_default(&project_dir)
        .with_context(|| format!("Failed to load {}", project_dir.join(CONFIG_FILE_NAME).display()))?;

    println!("Starting prefab bridge on port {}...", port);
    println!("Project root: {}", config.project_root.display());
    run_server(
        ServerConfig {
            port,
            ..Default::default()
        },
        config,
    )
    .await
}

async fn cmd_status(port: u16) -> Result<()> {
    let client = reqwest::Client::new();

    match client.get(format!("http://localhost:{}/health", port)).send().await {
        Ok(response) => {
            let health: serde_json::Value = response.json().await?;
            println!("Server status: {}", serde_json::to_string_pretty(&health)?);
        }
        Err(_) => {
            println!("Server is not running.");
            println!("Start it with: prefab-bridge serve");
        }
    }

    Ok(())
}

async fn cmd_create(node: String, name: String, save_path: String, options: WalkOptions, port: u16) -> Result<()> {
    tracing::info!("Requesting prefab '{}' from node {}", name, node);
    let client = reqwest::Client::new();
    let result: serde_json::Value = client
        .post(format!("http://localhost:{}/prefab/create", port))
        .json(&serde_json::json!({
            "nodeUuid": node,
            "prefabName": name,
            "savePath": save_path,
            "includeChildren": options.include_children,
            "includeComponents": options.include_components,
        }))
        .send()
        .await
        .context("Failed to reach the bridge server. Is `prefab-bridge serve` running?")?
        .json()
        .await
        .context("Invalid response from the bridge server")?;

    if result.get("success").and_then(|v| v.as_bool()) == Some(true) {
        println!("Prefab created: {}", serde_json::to_string_pretty(&result["data"])?);
        return Ok(());
    }

    if let Some(instruction) = result.get("instruction").and_then(|v| v.as_str()) {
        println!("{}", instruction);
    }
    bail!(
        "{}",
        result
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("prefab creation failed")
    )
}

/// Files written by an offline build
struct BuildOutput {
    prefab: PathBuf,
    meta: PathBuf,
    uuid: String,
    records: usize,
    references: Option<usize>,
}

fn build_prefab(
    snapshot: &Path,
    name: Option<String>,
    output: Option<PathBuf>,
    options: WalkOptions,
    check: bool,
    config: &BridgeConfig,
) -> Result<BuildOutput> {
    let content = std::fs::read_to_string(snapshot)
        .with_context(|| format!("Failed to read {}", snapshot.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content).context("Snapshot is not valid JSON")?;
    let tree = LiveNode::from_json(value)?;

    let name = match name {
        Some(name) => name,
        None => snapshot
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .context("Cannot derive a prefab name from the snapshot path")?,
    };
    let prefab = output.unwrap_or_else(|| snapshot.with_file_name(format!("{}.prefab", name)));

    let document = serialize_prefab(&tree, &name, options, &config.serializer)?;
    let references = if check {
        Some(validate_references(&document.to_value()?)?)
    } else {
        None
    };

    let uuid = random_canonical_id();
    let meta = meta_path(&prefab);
    if let Some(parent) = prefab.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    std::fs::write(&prefab, document.to_json()?)
        .with_context(|| format!("Failed to write {}", prefab.display()))?;
    std::fs::write(&meta, PrefabMeta::new(&uuid, &name, &config.meta_version).to_json()?)
        .with_context(|| format!("Failed to write {}", meta.display()))?;
    tracing::info!("Built prefab '{}' ({}) from {}", name, uuid, snapshot.display());

    Ok(BuildOutput {
        prefab,
        meta,
        uuid,
        records: document.records.len(),
        references,
    })
}

fn cmd_build(
    snapshot: &Path,
    name: Option<String>,
    output: Option<PathBuf>,
    options: WalkOptions,
    check: bool,
) -> Result<()> {
    let config = BridgeConfig::load_or_default(&current_dir_or(None)?)?;
    let built = build_prefab(snapshot, name, output, options, check, &config)?;

    println!("Wrote {} ({} records)", built.prefab.display(), built.records);
    println!("Wrote {} (uuid {})", built.meta.display(), built.uuid);
    if let Some(references) = built.references {
        println!("All {} references resolve", references);
    }
    Ok(())
}
