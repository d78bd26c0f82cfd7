use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use drawpro_server::config::{self, ServerConfig};
use drawpro_server::server::{self, AppState};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "drawpro-server")]
#[command(about = "Backend for the DrawPro drawing app")]
#[command(long_about = "\
Backend for the DrawPro drawing app

Stores projects as JSON files, exports canvas snapshots to image files, and
runs filters and resizes on data-URL images. Also serves the front-end.

Layout on disk (relative to the working directory by default):

  drawpro.toml          # Optional config (see 'gen-config')
  index.html, app.js    # Front-end, served at /
  projects/             # <project_id>.json, one per saved project
  exports/              # export_<timestamp>.<ext>, served at /exports/

Settings are layered: defaults, then drawpro.toml, then the PORT environment
variable, then command-line flags.

Run 'drawpro-server gen-config' to generate a documented drawpro.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: ./drawpro.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve(ServeArgs),
    /// Print a stock drawpro.toml with all options documented
    GenConfig,
}

/// Overrides for values in the config file.
#[derive(Args, Clone, Default)]
struct ServeArgs {
    /// Interface to bind
    #[arg(long)]
    host: Option<String>,
    /// TCP port
    #[arg(long)]
    port: Option<u16>,
    /// Where saved projects live
    #[arg(long)]
    projects_dir: Option<PathBuf>,
    /// Where exported images are written
    #[arg(long)]
    exports_dir: Option<PathBuf>,
    /// Front-end assets served at /
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

impl ServeArgs {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = self.projects_dir {
            config.storage.projects_dir = dir;
        }
        if let Some(dir) = self.exports_dir {
            config.storage.exports_dir = dir;
        }
        if let Some(dir) = self.static_dir {
            config.storage.static_dir = dir;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => serve(cli.config.as_deref(), args).await,
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(())
        }
    }
}

async fn serve(config_path: Option<&Path>, args: ServeArgs) -> anyhow::Result<()> {
    // RUST_LOG=drawpro_server=debug,tower_http=debug for request traces
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = config::load_config(config_path).context("Failed to load config")?;
    config.apply_env(|key| std::env::var(key).ok())?;
    args.apply(&mut config);
    config.validate()?;

    init_thread_pool(&config.processing);

    let state = AppState::from_config(&config).context("Failed to prepare storage directories")?;
    info!(
        projects = %absolute(state.store.dir()).display(),
        exports = %absolute(state.exports.dir()).display(),
        static_files = %absolute(&state.static_dir).display(),
        "Storage ready"
    );
    let app = server::router(state);

    let bind_addr = config.bind_addr();
    debug!("Attempting to bind to {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", bind_addr))?;
    let addr = listener.local_addr()?;
    info!(
        name = env!("CARGO_PKG_NAME"),
        version = version_string(),
        address = %addr,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Axum server error")?;

    info!("Server shut down gracefully.");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
