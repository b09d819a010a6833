use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "hookrelay")]
#[command(about = "Relay webhook notifications into Keybase team chats", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Write a default config file (KeybaseBin, ListenAddress, empty Webhooks) if none exists.
    Init {
        /// Config file path (default: HOOKRELAY_CONFIG_PATH or ./config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the webhook relay. Exits non-zero if a message cannot be delivered.
    Serve {
        /// Config file path (default: HOOKRELAY_CONFIG_PATH or ./config.{json,yaml,yml})
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Listen address, e.g. ":8080" or "127.0.0.1:9000" (default from config)
        #[arg(long, short, value_name = "ADDR")]
        listen: Option<String>,
    },

    /// Print a new random token for a webhook registration.
    Token,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("hookrelay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, listen }) => {
            if let Err(e) = run_serve(config, listen).await {
                log::error!("relay failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Token) => {
            println!("{}", hookrelay::config::generate_token());
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(hookrelay::config::default_config_path);
    if hookrelay::init::init_config(&path)? {
        println!("wrote default config to {}", path.display());
    } else {
        println!("config already exists at {}", path.display());
    }
    Ok(())
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    listen: Option<String>,
) -> anyhow::Result<()> {
    let (mut config, path) = hookrelay::config::load_config(config_path)?;
    log::info!("loaded config from {}", path.display());
    config.listen_address =
        listen.unwrap_or_else(|| hookrelay::config::resolve_listen_address(&config));
    let bin = hookrelay::config::resolve_keybase_bin(&config);
    let keybase = hookrelay::channels::KeybaseChat::start(bin.as_str())
        .await
        .with_context(|| format!("starting keybase chat via {}", bin))?;
    log::info!("keybase API user: {}", keybase.username());
    hookrelay::gateway::run_gateway(config, Arc::new(keybase)).await
}
