use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};

use nox_relay::config::RelayConfig;
use nox_relay::utils::logging::init_logging;
use nox_relay::{Proxy, Result};

#[derive(Parser, Debug)]
#[command(name = "nox-relay")]
#[command(about = "Transparent UDP relay for Nox game servers", long_about = None)]
struct Args {
    /// Real game server address
    #[arg(long)]
    server: Option<String>,

    /// Address real clients connect to
    #[arg(long)]
    host: Option<String>,

    /// Record every forwarded datagram to this JSON-lines file
    #[arg(long)]
    file: Option<String>,

    /// TOML configuration file; environment variables are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log every datagram
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn load_config(&self) -> Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::from_file(path)?,
            None => RelayConfig::from_env()?,
        };
        if let Some(server) = &self.server {
            config.proxy.server = server.clone();
        }
        if let Some(host) = &self.host {
            config.proxy.host = host.clone();
        }
        if let Some(file) = &self.file {
            config.proxy.capture_file = Some(file.clone());
        }
        if self.verbose {
            config.logging.log_level = Level::DEBUG;
        }
        if self.json {
            config.logging.json_format = true;
        }
        config.validate_strict()?;
        Ok(config)
    }
}

async fn run(config: RelayConfig) -> Result<()> {
    let host = config.proxy.host_addr()?;
    let proxy = Arc::new(Proxy::from_config(&config.proxy)?);

    let served = tokio::select! {
        res = proxy.listen_and_serve(host) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
            Ok(())
        }
    };

    proxy.close().await?;
    proxy.metrics().log_metrics();
    served
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("nox-relay: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("nox-relay: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Relay stopped");
            ExitCode::FAILURE
        }
    }
}
