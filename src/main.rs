mod api;
mod cli;
mod config;
mod db;
mod tracking;

use crate::cli::onboard::run_onboarding;
use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::Config;
use crate::db::Database;
use anyhow::{Context, Result};
use clap::Parser;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard { serve } => {
            let (config, start_now) = run_onboarding(serve)?;
            if start_now {
                run_service(config).await
            } else {
                Ok(())
            }
        }
        Commands::Config { command } => handle_config_command(command),
        Commands::Migrate => handle_migrate(),
        Commands::Serve => {
            let config = load_or_default_config()?;
            run_service(config).await
        }
        Commands::Status => handle_status(),
        Commands::Doctor => handle_doctor(),
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_migrate() -> Result<()> {
    let config = load_or_default_config()?;
    Database::migrate(&config.db_path)?;

    println!("Schema ready: {}", config.db_path.display());
    Ok(())
}

fn handle_status() -> Result<()> {
    let config = load_or_default_config()?;
    let address = config.bind_address()?;

    println!("HeatmapTracker status");
    println!("- api_address: {address}");
    println!("- api_listening: {}", is_port_open(address));
    println!("- db_path: {}", config.db_path.display());
    println!("- allowed_origins: {}", display_origins(&config));

    let database = Database::open(&config.db_path)
        .context("Database not initialized. Run `HeatmapTracker migrate` first.")?;
    let summary = database.summary()?;

    println!("- total_clicks: {}", summary.total_clicks);
    println!("- tracked_pages: {}", summary.distinct_pages);
    println!(
        "- last_click_at: {}",
        summary
            .latest_click_at
            .map(|timestamp| timestamp.to_rfc3339())
            .unwrap_or_else(|| "none".to_string())
    );

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(error) => {
            if config_path.exists() {
                println!("[WARN] config.json invalid: {error:#}");
                issues.push("config invalid".to_string());
            }
            Config::default()
        }
    };

    match Database::open(&config.db_path).and_then(|database| database.schema_ready()) {
        Ok(true) => println!("[OK] SQLite schema ready: {}", config.db_path.display()),
        Ok(false) => {
            println!(
                "[WARN] SQLite reachable but not migrated: {}",
                config.db_path.display()
            );
            issues.push("schema missing".to_string());
        }
        Err(error) => {
            println!("[WARN] SQLite check failed: {error}");
            issues.push("db unreachable".to_string());
        }
    }

    if config.allowed_origins.is_empty() {
        println!("[OK] cross-origin access disabled");
    } else if config.allows_any_origin() {
        println!("[WARN] any origin may call the API; narrow allowed_origins for production");
        issues.push("open cors policy".to_string());
    } else {
        println!("[OK] allowed origins: {}", config.allowed_origins.join(", "));
    }

    match config.bind_address() {
        Ok(address) if is_port_open(address) => {
            println!("[OK] something is listening on {address}");
        }
        Ok(address) => println!("[OK] {address} is free (service not running)"),
        Err(error) => {
            println!("[WARN] invalid bind address: {error}");
            issues.push("invalid bind address".to_string());
        }
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    Database::migrate(&config.db_path)?;

    let shared_config = Arc::new(config);

    info!("HeatmapTracker service started");

    api::run_server(shared_config).await
}

fn display_origins(config: &Config) -> String {
    if config.allowed_origins.is_empty() {
        "none (same-origin only)".to_string()
    } else {
        config.allowed_origins.join(",")
    }
}

fn load_or_default_config() -> Result<Config> {
    if Config::config_path()?.exists() {
        return Config::load();
    }

    let config = Config::default();
    config.ensure_bootstrap_files()?;
    config.save()?;
    Ok(config)
}

fn is_port_open(address: SocketAddr) -> bool {
    TcpStream::connect_timeout(&address, Duration::from_millis(250)).is_ok()
}
