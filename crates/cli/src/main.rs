use anyhow::Context;
use clap::{Parser, Subcommand};
use lib::extract::Extractor;
use lib::store::EnrichedMessage;

#[derive(Parser)]
#[command(name = "dispatch")]
#[command(about = "Dispatch CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: DISPATCH_CONFIG_PATH or ~/.dispatch/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the gateway (webhooks, /api/responders, /dashboard).
    Gateway {
        /// Config file path (default: DISPATCH_CONFIG_PATH or ~/.dispatch/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 8000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Run one extraction against the configured backend and print the result as JSON.
    Extract {
        /// Config file path (default: DISPATCH_CONFIG_PATH or ~/.dispatch/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Message text, e.g. "Taking SAR78, ETA 15 minutes"
        text: String,
    },

    /// List the messages held by a running gateway.
    Responders {
        /// Config file path (default: DISPATCH_CONFIG_PATH or ~/.dispatch/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("dispatch {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Extract { config, text }) => {
            if let Err(e) = run_extract(config, text).await {
                log::error!("extract failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Responders { config }) => {
            if let Err(e) = run_responders(config).await {
                log::error!("responders failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, _path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    lib::gateway::run_gateway(config).await
}

async fn run_extract(config_path: Option<std::path::PathBuf>, text: String) -> anyhow::Result<()> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("message text must not be empty");
    }
    let (config, _path) = lib::config::load_config(config_path)?;
    let extractor = lib::config::build_extractor(&config);
    let result = extractor.extract(text).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_responders(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, _path) = lib::config::load_config(config_path)?;
    let url = format!(
        "http://{}:{}/api/responders",
        config.gateway.bind.trim(),
        config.gateway.port
    );
    let res = reqwest::get(&url)
        .await
        .with_context(|| format!("requesting {}", url))?;
    if !res.status().is_success() {
        anyhow::bail!("GET {} returned {}", url, res.status());
    }
    let messages: Vec<EnrichedMessage> = res.json().await.context("decoding responder list")?;
    if messages.is_empty() {
        println!("no responders yet");
    }
    for m in messages {
        println!(
            "{}  {:<20} {:<10} {:<12} {}",
            m.timestamp, m.name, m.vehicle, m.eta, m.text
        );
    }
    Ok(())
}
