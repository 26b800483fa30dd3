use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use weave::Provider;
use weave::core::config::{self, CliOverrides, ResolvedConfig};
use weave::core::reload::{LiveReload, ReloadServer, ReloadSettings};
use weave::core::router::{Router, RouterOptions};
use weave::inference::{CompletionProvider, LmStudioProvider, OpenRouterProvider};
use weave::server;
use weave::workspace::{FileWatcher, LocalWorkspace, Workspace};

#[derive(Parser)]
#[command(name = "weave", about = "Applies AI-written files to a workspace")]
struct Args {
    /// LLM provider to use
    #[arg(short, long, value_enum)]
    provider: Option<Provider>,

    /// Port for the UI WebSocket
    #[arg(long)]
    port: Option<u16>,

    /// Workspace root (repeatable; defaults to the current directory)
    #[arg(short, long = "workspace")]
    workspaces: Vec<PathBuf>,

    /// File to open as a document (repeatable; the last one is active)
    #[arg(long = "open")]
    open: Vec<PathBuf>,
}

/// Callers check [`ResolvedConfig::missing_credential`] first.
fn build_provider(config: &ResolvedConfig) -> Arc<dyn CompletionProvider> {
    match config.provider.as_str() {
        "lmstudio" => Arc::new(LmStudioProvider::new(config.lmstudio_base_url.clone())),
        _ => {
            // Default to openrouter
            let api_key = config.openrouter_api_key.clone().unwrap_or_default();
            Arc::new(OpenRouterProvider::new(
                api_key,
                Some(config.openrouter_base_url.clone()),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to weave.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create("weave.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };
    let overrides = CliOverrides {
        provider: args.provider.as_ref().map(Provider::config_name),
        port: args.port,
    };
    let resolved = config::resolve(&file_config, &overrides);

    if resolved.missing_credential() {
        eprintln!(
            "No OpenRouter API key found. Set OPENROUTER_API_KEY, add api_key under \
             [openrouter] in ~/.weave/config.toml, or run with --provider lm-studio."
        );
        std::process::exit(1);
    }
    let provider = build_provider(&resolved);
    info!(
        "Weave starting up with provider: {} ({})",
        provider.name(),
        resolved.model_name
    );

    let roots = if args.workspaces.is_empty() {
        vec![std::env::current_dir()?]
    } else {
        args.workspaces
            .iter()
            .map(|p| p.canonicalize())
            .collect::<std::io::Result<Vec<_>>>()?
    };
    let workspace = Arc::new(LocalWorkspace::new(roots.clone()));
    for path in &args.open {
        let path = path.canonicalize()?;
        if let Err(e) = workspace.open_document(&path).await {
            warn!("Could not open {}: {}", path.display(), e);
        }
    }

    // Kept alive for the life of the process.
    let _watcher = match FileWatcher::new(&roots, workspace.event_sender()) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("File watching disabled: {}", e);
            None
        }
    };

    let reload = Arc::new(ReloadServer::new(ReloadSettings {
        command: resolved.preview_command.clone(),
        port: resolved.preview_port,
        startup_timeout: resolved.preview_startup_timeout,
        cwd: roots.first().cloned(),
    }));

    let router = Arc::new(Router::build(
        workspace.clone(),
        provider,
        reload.clone(),
        RouterOptions {
            model_name: resolved.model_name.clone(),
            effort: resolved.effort,
            system_prompt: resolved.system_prompt.clone(),
            max_snapshots: resolved.max_snapshots,
        },
    ));

    let listener = server::bind(resolved.port).await?;
    println!("weave listening on ws://127.0.0.1:{}", resolved.port);

    let workspace: Arc<dyn Workspace> = workspace;
    let result = tokio::select! {
        r = server::serve(listener, router, workspace) => r,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    };

    reload.stop().await;
    if let Err(e) = &result {
        error!("Server stopped: {}", e);
    }
    result
}
