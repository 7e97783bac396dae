use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use decomp_client::{CachedIdentityProvider, FileSettingsSource, HttpWorkItemStore, PatToken};
use decomp_core::identity::IdentityProvider;
use decomp_core::ids::RemoteId;
use decomp_core::item_type::WorkItemTypeName;
use decomp_core::node::WorkItemNode;
use decomp_core::settings::SettingsSource;
use decomp_core::store::{RulesProvider, WorkItemStore};
use decomp_engine::materialize::MaterializeParams;
use decomp_engine::{MaterializationEngine, TextHierarchyParser};
use decomp_telemetry::{init_telemetry, TelemetryConfig};

const IDENTITY_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "decomp", version, about = "Compose and materialize work item hierarchies")]
struct Cli {
    /// Workspace file holding the hierarchy rules and tag/assignment policy.
    #[arg(long, global = true, default_value = "decomp.json")]
    settings: PathBuf,

    /// Base URL of the work-tracking service.
    #[arg(long, global = true, env = "DECOMP_SERVICE_URL")]
    service_url: Option<String>,

    /// Project the created items belong to.
    #[arg(long, global = true, env = "DECOMP_PROJECT")]
    project: Option<String>,

    /// Emit newline-delimited JSON logs.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print an example hierarchy document for the configured rules.
    Template {
        /// Type of the item the hierarchy would be created under.
        #[arg(long)]
        root_type: String,
    },
    /// Parse and validate a hierarchy document without creating anything.
    Check {
        file: PathBuf,
        /// Validate depth-zero lines against this parent type.
        #[arg(long)]
        root_type: Option<String>,
    },
    /// Create the hierarchy under an existing work item.
    Materialize {
        file: PathBuf,
        /// Remote id of the item to decompose.
        #[arg(long)]
        parent: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_telemetry(TelemetryConfig {
        json_output: cli.json_logs,
        ..TelemetryConfig::default()
    });

    let source = FileSettingsSource::new(&cli.settings);

    match cli.command {
        Command::Template { root_type } => {
            let rules = source.get_rules().await?;
            let parser = TextHierarchyParser::new(&rules);
            let template = parser.example_template(&WorkItemTypeName::from(root_type));
            if template.is_empty() {
                bail!("no child types are configured for that root type");
            }
            print!("{template}");
        }

        Command::Check { file, root_type } => {
            let rules = source.get_rules().await?;
            let parser = TextHierarchyParser::new(&rules);
            let input = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let context = root_type.map(WorkItemTypeName::from);
            let tree = parser.parse(&input, context.as_ref())?;
            render_nodes(tree.roots(), 0);
            println!("{} item(s), all valid", tree.node_count());
        }

        Command::Materialize { file, parent } => {
            let service_url = cli
                .service_url
                .context("--service-url or DECOMP_SERVICE_URL is required")?;
            let project = cli
                .project
                .context("--project or DECOMP_PROJECT is required")?;
            let pat = std::env::var("DECOMP_PAT")
                .map(PatToken::new)
                .context("DECOMP_PAT is required")?;

            let rules = source.get_rules().await?;
            let settings = source.load().await?;
            let input = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;

            let store = HttpWorkItemStore::new(service_url, pat);
            let identity: Arc<dyn IdentityProvider> =
                Arc::new(CachedIdentityProvider::new(store.clone(), IDENTITY_CACHE_TTL));
            let store: Arc<dyn WorkItemStore> = Arc::new(store);

            let parent_id = RemoteId::new(parent);
            let parent_item = store.get_item(parent_id).await?;
            tracing::info!(
                parent = %parent_id,
                item_type = %parent_item.item_type,
                "decomposing '{}'",
                parent_item.title
            );

            let parser = TextHierarchyParser::new(&rules);
            let tree = parser.parse(&input, Some(&parent_item.item_type))?;

            let engine = MaterializationEngine::new(store, identity);
            let report = engine
                .materialize(MaterializeParams {
                    tree: &tree,
                    parent_id,
                    project: &project,
                    settings: &settings,
                })
                .await?;

            for created in &report.created {
                println!("created #{}  {}", created.remote_id, created.title);
            }
            if !report.is_success() {
                bail!(
                    "{} item(s) could not be created:\n{}",
                    report.errors.len(),
                    report.errors.join("\n")
                );
            }
        }
    }

    Ok(())
}

fn render_nodes(nodes: &[WorkItemNode], depth: usize) {
    for node in nodes {
        println!("{}{}: {}", "  ".repeat(depth), node.item_type, node.title);
        render_nodes(&node.children, depth + 1);
    }
}
