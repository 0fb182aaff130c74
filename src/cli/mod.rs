use anyhow::Context;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::config::Config;
use crate::domain::{estimate::estimate, validate::validate};
use crate::http::server::HttpServer;
use crate::storage::{artifacts, registry::TrackRegistry, retention};

#[derive(Parser)]
#[command(name = "promptwave")]
#[command(version)]
#[command(about = "Simulated text-to-music generation service")]
pub struct Cli {
    /// Path to the config TOML file, built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the http server
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Validate a request and print its processing estimate
    Estimate {
        #[arg(short, long)]
        prompt: String,
        /// Track length in seconds
        #[arg(short, long)]
        duration: Option<i64>,
    },
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Serve { port } => serve(cfg, port),

        Commands::Estimate { prompt, duration } => {
            let request = validate(&prompt, duration, cfg.generation.max_prompt_chars)?;
            println!(
                "{} s of audio, estimated processing time {} s",
                request.duration(),
                estimate(request.duration(), request.prompt())
            );
            Ok(())
        }
    }
}

fn serve(mut cfg: Config, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        cfg.http.port = port;
    }

    let registry = Arc::new(TrackRegistry::new());
    let store = artifacts::open_store(&cfg.downloads);

    if let Some(secs) = cfg.registry.retention_secs {
        retention::spawn_sweeper(
            Arc::clone(&registry),
            Arc::clone(&store),
            Duration::from_secs(secs),
            Duration::from_secs(cfg.registry.sweep_interval_secs),
        )
        .context("Failed to start retention sweeper")?;
        log::info!("Finished tracks are kept for {secs} s");
    }

    let http_server = HttpServer::new(registry, store, &cfg);

    log::info!(
        "HTTP server running at http://{}:{}",
        http_server.config.bind_addr,
        http_server.config.port
    );
    http_server.run();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_port() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["promptwave", "--config", "promptwave.toml", "serve", "--port", "9000"])?;

        assert_eq!(cli.config, Some(PathBuf::from("promptwave.toml")));
        assert!(matches!(cli.command, Commands::Serve { port: Some(9000) }));

        Ok(())
    }

    #[test]
    fn test_parse_estimate_without_duration() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["promptwave", "estimate", "--prompt", "relaxing piano"])?;

        assert!(cli.config.is_none());
        match cli.command {
            Commands::Estimate { prompt, duration } => {
                assert_eq!(prompt, "relaxing piano");
                assert_eq!(duration, None);
            }
            Commands::Serve { .. } => panic!("expected estimate"),
        }

        Ok(())
    }

    #[test]
    fn test_estimate_requires_prompt() {
        assert!(Cli::try_parse_from(["promptwave", "estimate"]).is_err());
    }
}
