use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing::{error, info};

use kamailio_language_server::logging::init_logger;
use kamailio_language_server::lsp::backend::KamailioBackend;
use kamailio_language_server::lsp::document::DocumentStore;
use kamailio_language_server::settings::ServerSettings;

#[derive(Parser, Debug)]
#[command(name = "kamailio-language-server", version, about = "Language server for Kamailio routing scripts")]
struct Cli {
    /// Log level filter for stderr, e.g. `debug` or `kamailio_language_server=trace`.
    #[arg(long)]
    log_level: Option<String>,

    /// Disable ANSI colors in log output.
    #[arg(long)]
    no_color: bool,

    /// Do not write a session log file.
    #[arg(long)]
    no_file_logging: bool,

    /// Kamailio source checkout used for module documentation.
    #[arg(long, value_name = "DIR")]
    kamailio_source: Option<PathBuf>,

    /// Cookbook JSON file with core documentation.
    #[arg(long, value_name = "FILE")]
    cookbook: Option<PathBuf>,
}

impl Cli {
    fn settings(&self) -> ServerSettings {
        ServerSettings {
            kamailio_source_path: self.kamailio_source.clone(),
            cookbook_path: self.cookbook.clone(),
            log_level: self.log_level.clone(),
            ..ServerSettings::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = init_logger(cli.no_color, cli.log_level.as_deref(), !cli.no_file_logging)
        .context("failed to initialize logging")?;

    let store = DocumentStore::new(cli.settings())
        .inspect_err(|e| error!("Cannot start: {}", e))
        .context("failed to load the Kamailio grammar")?;

    info!("Starting {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    let (service, socket) = LspService::new(|client| KamailioBackend::new(client, store));
    Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
        .serve(service)
        .await;
    info!("Server stopped");
    Ok(())
}
