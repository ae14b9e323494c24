use anyhow::Context;
use clap::{Parser, Subcommand};
use sightline::ScriptTagGenerator;
use sightline::config::AppConfig;
use sightline::server::{self, AppState};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "sightline", version, about = "Diagnostic script-tag generator")]
struct Cli {
    /// Diagnostics config file (TOML); overrides SIGHTLINE_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the tag endpoints over HTTP.
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Print the tag fragment for one request id.
    Render { request_id: Option<Uuid> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(path) = cli.config {
        config.config_path = Some(path);
    }

    let configuration = config
        .diagnostics()?
        .into_configuration()
        .context("building diagnostics configuration")?;
    tracing::info!(
        scripts = configuration.client_scripts().len(),
        resources = configuration.resources().len(),
        version = %configuration.version(),
        hash = %configuration.hash(),
        "loaded diagnostics configuration"
    );
    let generator = Arc::new(ScriptTagGenerator::new(Arc::new(configuration)));

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            let addr = config.bind_addr;
            let state = AppState::new(config, generator);
            tracing::info!(%addr, "starting sightline server");
            server::run(addr, state).await?;
        }
        Command::Render { request_id } => {
            let request_id = request_id.unwrap_or_else(Uuid::new_v4);
            let fragment = generator.generate(request_id);
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{fragment}").context("writing fragment")?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
