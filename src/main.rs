use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use gemchat::config::Config;
use gemchat::{logging, ui};

#[derive(Parser)]
#[command(name = "gemchat")]
#[command(version)]
#[command(about = "Chat with an image-aware backend from the terminal", long_about = None)]
struct Cli {
    /// Backend base URL (overrides GEMCHAT_ENDPOINT and the config file)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Config file to use instead of ~/.gemchat/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration
    Config,
    /// Write a config file with the default settings
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(Config::home_dir()?.join("config.toml")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(endpoint) = &cli.endpoint {
        config.apply_endpoint(endpoint.as_str());
    }

    match &cli.command {
        None => {
            let _guard = logging::init(&Config::home_dir()?.join("logs"));
            ui::run(config).await
        }
        Some(Commands::Config) => {
            let rendered = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            println!("# chat url: {}\n", config.chat_url());
            print!("{}", rendered);
            Ok(())
        }
        Some(Commands::InitConfig { force }) => {
            let path = config_path(&cli)?;
            if path.exists() && !*force {
                println!("Config already exists at {} (use --force to replace it)", path.display());
                return Ok(());
            }
            Config::default().save(&path)?;
            println!("Wrote default config to {}", path.display());
            Ok(())
        }
    }
}
