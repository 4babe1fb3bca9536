//! toolrelay: chat backend that runs registered HTTP tools from `@{{Tool}}` directives.
//!
//! Usage:
//!   toolrelay init                 Run the setup wizard
//!   toolrelay serve                Start the HTTP API
//!   toolrelay seed                 Register the default tools
//!   toolrelay list [--category T]  List registered tools
//!   toolrelay exec <ID> [--params JSON]
//!   toolrelay process <MESSAGE>

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use toolrelay::chat::{MessagePipeline, OpenAiCompletionClient};
use toolrelay::config::{self, RelayConfig, CONFIG_FILE_NAME};
use toolrelay::server::{self, AppState};
use toolrelay::setup;
use toolrelay::state::{Database, SqliteToolStore, ToolStore};
use toolrelay::tools::{ToolCatalog, ToolExecutor, ToolView};
use toolrelay::types::ToolParams;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "toolrelay")]
#[command(version = "0.1.0")]
#[command(about = "External tool invocation engine for chat backends")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to toolrelay home directory (default: ~/.toolrelay).
    #[arg(long)]
    home: Option<String>,

    /// Log level (debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the first-time setup wizard.
    Init,

    /// Seed default tools and serve the HTTP API until Ctrl+C.
    Serve,

    /// Register the default tools if they are missing.
    Seed,

    /// List registered tools.
    List {
        /// Only show tools with this category tag.
        #[arg(long)]
        category: Option<String>,
    },

    /// Execute a tool by id and print the result.
    Exec {
        id: String,

        /// Parameters as a JSON object.
        #[arg(long)]
        params: Option<String>,
    },

    /// Run the directive pipeline on one message and print the outcome.
    Process { message: String },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let home_dir = match &cli.home {
        Some(home) => PathBuf::from(shellexpand::tilde(home).into_owned()),
        None => config::default_home_dir(),
    };
    let config_path = home_dir.join(CONFIG_FILE_NAME);
    let cfg = config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Initialize logging
    let level = cli.log_level.as_deref().unwrap_or(&cfg.log_level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => cmd_init(&home_dir),
        Commands::Serve => cmd_serve(cfg).await,
        Commands::Seed => cmd_seed(cfg).await,
        Commands::List { category } => cmd_list(cfg, category.as_deref()).await,
        Commands::Exec { id, params } => cmd_exec(cfg, &id, params.as_deref()).await,
        Commands::Process { message } => cmd_process(cfg, &message).await,
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_init(home_dir: &Path) -> Result<()> {
    setup::run_setup_wizard(home_dir)?;
    Ok(())
}

async fn cmd_serve(cfg: RelayConfig) -> Result<()> {
    let addr: SocketAddr = cfg
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address: {}", cfg.listen_addr))?;

    let store = open_store(&cfg)?;
    setup::ensure_weather_tool(&store, &cfg.openweather_api_key).await?;

    let state = app_state(&cfg, Arc::new(store))?;

    println!(
        "{} Serving tool API on http://{} (timeout: {}s)",
        ">>>".green().bold(),
        addr,
        cfg.request_timeout().as_secs(),
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        println!("\n{} Shutting down gracefully...", "<<<".red().bold());
        signal_cancel.cancel();
    });

    server::serve(state, addr, cancel).await?;
    info!("Server shutdown complete");
    Ok(())
}

async fn cmd_seed(cfg: RelayConfig) -> Result<()> {
    let store = open_store(&cfg)?;
    if setup::ensure_weather_tool(&store, &cfg.openweather_api_key).await? {
        println!("{} Registered Weather tool", "+".green().bold());
    } else {
        println!("Weather tool already registered");
    }
    Ok(())
}

async fn cmd_list(cfg: RelayConfig, category: Option<&str>) -> Result<()> {
    let store: Arc<dyn ToolStore> = Arc::new(open_store(&cfg)?);
    let catalog = ToolCatalog::new(store);
    let tools = match category {
        Some(tag) => catalog.list_by_type(tag).await?,
        None => catalog.list_all().await?,
    };

    println!();
    println!("{}", "=== Registered Tools ===".bold());
    println!();
    if tools.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for tool in &tools {
        print_tool(tool);
    }
    println!();
    Ok(())
}

async fn cmd_exec(cfg: RelayConfig, id: &str, params: Option<&str>) -> Result<()> {
    let params: ToolParams = match params {
        Some(raw) => serde_json::from_str(raw).context("--params must be a JSON object")?,
        None => ToolParams::new(),
    };

    let executor = ToolExecutor::from_config(&cfg, Arc::new(open_store(&cfg)?))?;
    match executor.execute(id, &params).await {
        Ok(result) => {
            println!("{}", result);
            Ok(())
        }
        Err(e) => bail!("{} ({})", e, e.kind()),
    }
}

async fn cmd_process(cfg: RelayConfig, message: &str) -> Result<()> {
    let state = app_state(&cfg, Arc::new(open_store(&cfg)?))?;
    let content = state.pipeline.process_incoming_message(message).await?;
    println!("{}", content);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Open the tool database at the configured path.
fn open_store(cfg: &RelayConfig) -> Result<SqliteToolStore> {
    let db_path = cfg.resolved_db_path();
    let db_path = Path::new(&db_path);

    let db = Database::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    Ok(SqliteToolStore::new(Arc::new(Mutex::new(db))))
}

fn app_state(cfg: &RelayConfig, store: Arc<dyn ToolStore>) -> Result<AppState> {
    let executor = ToolExecutor::from_config(cfg, store.clone())?;
    let completion = Arc::new(OpenAiCompletionClient::new(&cfg.completion));
    Ok(AppState {
        catalog: ToolCatalog::new(store),
        pipeline: MessagePipeline::new(executor.clone(), completion),
        executor,
    })
}

fn print_tool(tool: &ToolView) {
    let method = tool
        .http_method
        .map(|m| m.to_string())
        .unwrap_or_else(|| "?".into());
    let status = if tool.is_active {
        "active".green()
    } else {
        "inactive".yellow()
    };
    println!(
        "  {}  {} [{}]  {}",
        tool.name.bold(),
        status,
        tool.tool_type.cyan(),
        tool.id.dimmed(),
    );
    println!("    {} {}", method, tool.endpoint_url);
    println!(
        "    auth: {}  uses: {}  last used: {}",
        tool.auth_type,
        tool.usage_count,
        tool.last_used_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".into()),
    );
}
