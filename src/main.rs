use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod issues;
mod report;
mod semantic;

use config::Config;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging(args.verbose);

    let mut config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(model) = args.model {
        config.embedding.model = model;
    }

    match args.command {
        cli::Command::Duplicates {
            input,
            threshold,
            neighbors,
            output,
            format,
        } => {
            if let Some(threshold) = threshold {
                config.duplicates.threshold = threshold;
            }
            if let Some(neighbors) = neighbors {
                config.duplicates.neighbors = neighbors;
            }
            config.validate()?;

            cli::handle_duplicates(&config, input, output, format)
        }

        cli::Command::Search {
            query,
            input,
            limit,
            format,
        } => {
            if let Some(limit) = limit {
                config.search.limit = limit;
            }
            config.validate()?;

            cli::handle_search(&config, &query, input, format)
        }
    }
}
