/// crewflow: flow graph editor core for AI crew automation
///
/// Command-line entry point. Creates, imports, exports, arranges, approves and
/// launches flows stored in the local SQLite flow database.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crewflow::config::Config;
use crewflow::flow::{serializer, FlowStorage, FlowTemplate};
use crewflow::runtime::LoggingExecutor;
use crewflow::{FlowEditor, FlowLifecycle};

#[derive(Parser)]
#[command(name = "crewflow", version, about = "Flow graph editor core for AI crew automation")]
struct Cli {
    /// Path to the flow database (defaults to $CREWFLOW_DB_PATH or data/flows.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a flow from a template
    New {
        id: String,
        name: String,
        /// blank, conditional-branch, approval-pipeline or data-processing
        #[arg(long, default_value = "blank")]
        template: FlowTemplate,
        /// Owning crew
        #[arg(long)]
        crew: Option<String>,
    },
    /// Import a flow from an exported JSON file
    Import {
        file: PathBuf,
        /// Auto-arrange the nodes before saving
        #[arg(long)]
        layout: bool,
    },
    /// Export a flow as JSON
    Export {
        id: String,
        /// Output file (prints to stdout when omitted)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// List stored flows
    List,
    /// Auto-arrange a flow's nodes
    Layout { id: String },
    /// Complete a human approval checkpoint
    Approve {
        id: String,
        node: String,
        /// Record the checkpoint as rejected
        #[arg(long)]
        reject: bool,
    },
    /// Launch a flow
    Run { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::default().with_database_path(cli.db);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log.filter))
        .with_target(false)
        .with_level(true)
        .init();

    let storage = Arc::new(FlowStorage::open(&config.storage.database_path).await?);
    let lifecycle = FlowLifecycle::new(storage.clone(), Arc::new(LoggingExecutor));

    match cli.command {
        Commands::New {
            id,
            name,
            template,
            crew,
        } => {
            let mut flow = template.instantiate(id, name)?;
            flow.crew_id = crew;
            let saved = lifecycle.save(flow).await?;
            println!(
                "Created flow '{}' from template '{}' ({} nodes)",
                saved.id,
                template,
                saved.graph.node_count()
            );
        }
        Commands::Import { file, layout } => {
            let flow = serializer::import_from_file(&file)?;
            let flow = if layout {
                let mut editor = FlowEditor::new(flow);
                editor.organize_layout();
                editor.into_flow()
            } else {
                flow
            };
            let saved = lifecycle.save(flow).await?;
            println!("Imported flow '{}' from {}", saved.id, file.display());
        }
        Commands::Export { id, out } => {
            let flow = lifecycle.load(&id).await?;
            match out {
                Some(path) => {
                    serializer::export_to_file(&flow, &path)?;
                    println!("Exported flow '{}' to {}", id, path.display());
                }
                None => println!("{}", serializer::to_json(&flow)?),
            }
        }
        Commands::List => {
            for meta in storage.list_flows().await? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    meta.id,
                    meta.name,
                    meta.crew_id.as_deref().unwrap_or("-"),
                    meta.status,
                    meta.updated_at
                );
            }
        }
        Commands::Layout { id } => {
            let mut editor = FlowEditor::new(lifecycle.load(&id).await?);
            editor.organize_layout();
            lifecycle.save(editor.into_flow()).await?;
            println!("Arranged flow '{}'", id);
        }
        Commands::Approve { id, node, reject } => {
            let mut editor = FlowEditor::new(lifecycle.load(&id).await?);
            if !editor.approve(&node, !reject) {
                anyhow::bail!("flow '{}' has no approval checkpoint on node '{}'", id, node);
            }
            let saved = lifecycle.save(editor.into_flow()).await?;
            let remaining = crewflow::flow::approval::pending_approvals(&saved);
            println!(
                "Checkpoint '{}' completed; {} approval(s) still pending",
                node,
                remaining.len()
            );
        }
        Commands::Run { id } => {
            let flow = lifecycle.load(&id).await?;
            let running = lifecycle.run(flow).await?;
            println!("Flow '{}' is {}", running.id, running.status);
        }
    }

    Ok(())
}
