pub mod onboard;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "HeatmapTracker",
    about = "Click collection & heatmap data service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive first-time setup
    Onboard {
        #[arg(long, default_value_t = false)]
        serve: bool,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Initialize the click database schema
    Migrate,
    /// Run the HTTP API until interrupted
    Serve,
    Status,
    Doctor,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, ConfigCommands};
    use clap::Parser;

    #[test]
    fn parses_config_set() {
        let cli = Cli::try_parse_from([
            "HeatmapTracker",
            "config",
            "set",
            "cors.allowed_origins",
            "https://app.example.com",
        ])
        .expect("parse");

        match cli.command {
            Commands::Config {
                command: ConfigCommands::Set { key, value },
            } => {
                assert_eq!(key, "cors.allowed_origins");
                assert_eq!(value, "https://app.example.com");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn onboard_serve_flag_defaults_off() {
        let cli = Cli::try_parse_from(["HeatmapTracker", "onboard"]).expect("parse");
        assert!(matches!(cli.command, Commands::Onboard { serve: false }));
    }
}
