use clap::{Parser, Subcommand};
use std::sync::Arc;

use hal_hipchat::application::services::register_defaults;
use hal_hipchat::infrastructure::adapters;
use hal_hipchat::infrastructure::config::Config;
use hal_hipchat::infrastructure::storage::MemoryStore;
use hal_hipchat::{BotError, Robot};

#[derive(Parser)]
#[command(name = "hal-hipchat")]
#[command(about = "A chat robot with a HipChat adapter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "hal.yaml")]
    config: String,

    /// Adapter name (overrides config)
    #[arg(short, long)]
    adapter: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the robot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    let loaded = Config::resolve(&cli.config);
    let mut config = loaded.as_ref().cloned().unwrap_or_else(|_| Config::load_env());
    if let Some(adapter) = cli.adapter.clone() {
        config.robot.adapter = adapter;
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    if let Err(e) = &loaded {
        tracing::warn!("Failed to load config: {}, using defaults", e);
    }

    match cli.command {
        Commands::Run => {
            if let Err(e) = run_robot(config) {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("hal-hipchat v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config(&cli.config);
        }
    }
}

fn run_robot(config: Config) -> Result<(), BotError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::Internal(format!("Failed to start runtime: {}", e)))?;

    rt.block_on(async {
        let adapter = adapters::build(&config.robot.adapter)?;
        let robot = Robot::new(
            &config.robot.name,
            &config.robot.alias,
            Arc::new(MemoryStore::new()),
        );
        robot.set_adapter(adapter)?;
        register_defaults(&robot)?;

        robot.run().await?;

        tokio::signal::ctrl_c()
            .await
            .map_err(|e| BotError::Internal(format!("Failed to wait for Ctrl-C: {}", e)))?;
        robot.stop().await
    })
}

fn init_config(path: &str) {
    if std::path::Path::new(path).exists() {
        tracing::warn!("{} already exists, not overwriting", path);
        return;
    }

    let yaml = match Config::default().to_yaml() {
        Ok(yaml) => yaml,
        Err(e) => {
            tracing::error!("{}", e);
            return;
        }
    };

    match std::fs::write(path, yaml) {
        Ok(()) => println!("Wrote default config to {}", path),
        Err(e) => tracing::error!("Failed to write {}: {}", path, e),
    }
}
