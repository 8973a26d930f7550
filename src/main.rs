use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ip_verdict::api::start_api_server;
use ip_verdict::classifier::{Classifier, HttpIpIntel};
use ip_verdict::config::EngineConfig;
use ip_verdict::geolocation::GeoLocator;
use ip_verdict::report::{self, InspectionReport};
use ip_verdict::resolver::resolve_client_ip;
use ip_verdict::signals::RequestSignals;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the identity-resolution API server
    Serve {
        /// Listen address:port, overrides the config value
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Resolve and classify one request from header values
    Inspect {
        /// Header value as "Name: value", repeatable
        #[arg(short = 'H', long = "header", value_name = "HEADER")]
        headers: Vec<String>,

        /// Transport-layer peer address
        #[arg(short, long)]
        peer: Option<IpAddr>,
    },

    /// Look up the cached or live location of an address
    Locate {
        /// Address to locate
        ip: IpAddr,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from("config.json"));
    let mut config = match EngineConfig::from_file(&config_path).await {
        Ok(cfg) => cfg,
        Err(e) => {
            info!(
                "Config file not found or invalid: {}. Using default configuration.",
                e
            );
            EngineConfig::default()
        }
    };
    config.validate()?;

    match cli.command {
        Commands::Serve { listen } => {
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            config.validate()?;
            config.ensure_directories().await?;

            start_api_server(config).await?;
        }

        Commands::Inspect { headers, peer } => {
            config.ensure_directories().await?;

            let pairs = headers.iter().filter_map(|raw| parse_header_arg(raw));
            let signals = RequestSignals::from_pairs(pairs, peer);

            let resolution = resolve_client_ip(&signals);
            let classifier = Classifier::new(HttpIpIntel::new(&config.intel)?);
            let detection = classifier.classify(resolution.client_ip, &signals).await;
            let locator = GeoLocator::from_config(&config)?;
            let location = locator.locate(resolution.client_ip).await;

            let report = InspectionReport {
                resolution,
                detection,
                location,
            };
            info!("{}", report::log_line(&report));
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Locate { ip } => {
            config.ensure_directories().await?;

            let locator = GeoLocator::from_config(&config)?;
            println!("{}", locator.locate(ip).await);
        }
    }

    Ok(())
}

/// Split a CLI header argument of the form "Name: value" or "Name=value"
fn parse_header_arg(raw: &str) -> Option<(String, String)> {
    let (name, value) = raw.split_once(':').or_else(|| raw.split_once('='))?;
    Some((name.trim().to_string(), value.trim().to_string()))
}
