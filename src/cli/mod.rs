use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::report::ReportFormat;

mod handlers;

pub use handlers::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// YAML config file. Defaults are used when omitted.
    #[clap(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Override the embedding model (e.g. "bge-small-en-v1.5")
    #[clap(long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report likely duplicate pairs among open issue titles
    Duplicates {
        /// Issues file: JSON array, gzip compressed or plain
        #[clap(short, long)]
        input: PathBuf,

        /// Similarity a pair must exceed to be reported
        #[clap(short, long)]
        threshold: Option<f32>,

        /// Neighbors to inspect per issue, the issue itself included
        #[clap(short = 'k', long)]
        neighbors: Option<usize>,

        /// Write the report here instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,

        #[clap(short, long, value_enum, default_value = "html")]
        format: ReportFormat,
    },
    /// Find issues whose body is related to a free-text query
    Search {
        /// Free-text query
        query: String,

        /// Issues file: JSON array, gzip compressed or plain
        #[clap(short, long)]
        input: PathBuf,

        /// Number of issues to return
        #[clap(short, long)]
        limit: Option<usize>,

        #[clap(short, long, value_enum, default_value = "text")]
        format: ReportFormat,
    },
}
