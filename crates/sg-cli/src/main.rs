//! sitegraph - Main Entry Point

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sg_engine::{CancelToken, Config, Pipeline, logging};

/// Decompose a corpus of HTML pages into a deduplicated graph
#[derive(Parser)]
#[command(name = "sitegraph")]
#[command(about = "Decompose a corpus of HTML pages into a deduplicated graph", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to ./sitegraph.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Concurrent document tasks
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Directory scanned for HTML files
    #[arg(long, global = true)]
    input_dir: Option<PathBuf>,

    /// Directory receiving snapshots
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Decompose, optionally condense, then unwrap
    Run,

    /// Decompose the input directory only
    Decompose,

    /// Unwrap the snapshot saved in the output directory
    Unwrap,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref()).context("Failed to load configuration")?;
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(workers) = self.workers {
            config.processing.workers = workers;
        }
        if let Some(dir) = &self.input_dir {
            config.paths.input_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.paths.output_dir = dir.clone();
        }
        config.validate().context("Invalid command-line overrides")?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    logging::init(&config.logging.level);

    tracing::info!("Starting sitegraph v{}", sg_engine::VERSION);
    let pipeline = Pipeline::new(config);
    // No interrupt handler is installed, so runs always go to completion.
    // An interrupt kills the process; snapshots are only written between stages.
    let never = CancelToken::new();

    let summary = match cli.command {
        Commands::Run => serde_json::to_string_pretty(&pipeline.run(&never)?)?,
        Commands::Decompose => serde_json::to_string_pretty(&pipeline.decompose(&never)?.1)?,
        Commands::Unwrap => serde_json::to_string_pretty(&pipeline.unwrap_saved()?)?,
    };
    println!("{summary}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sitegraph", "decompose", "--workers", "3", "--input-dir", "pages"]).unwrap();
        assert!(matches!(cli.command, Commands::Decompose));
        assert_eq!(cli.workers, Some(3));
        assert_eq!(cli.input_dir, Some(PathBuf::from("pages")));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["sitegraph"]).is_err());
        assert!(Cli::try_parse_from(["sitegraph", "unwrap", "--log-level", "debug"]).is_ok());
    }
}
