use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "smsguard")]
#[command(author, version, about = "SMS spam filter", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "smsguard.yaml", global = true)]
    pub config: String,

    /// Word model file (overrides the configuration)
    #[arg(short, long, global = true)]
    pub model: Option<PathBuf>,

    /// Classify by keywords only
    #[arg(long, global = true)]
    pub keyword_only: bool,

    /// Inference timeout in milliseconds
    #[arg(long, global = true)]
    pub inference_timeout_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reassemble, classify, and store JSON-lines segments
    Ingest {
        /// Segment file, one JSON object per line (`-` for stdin)
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Print the stored messages after the summary
        #[arg(long)]
        list: bool,

        /// Print Prometheus metrics after the summary
        #[arg(long)]
        metrics: bool,
    },

    /// Classify one text and print the result as JSON
    Classify {
        /// Message text
        text: String,
    },

    /// Train a word model from line-per-message files
    Train {
        /// Spam examples, one message per line
        #[arg(long)]
        spam: Option<PathBuf>,

        /// Legitimate examples, one message per line
        #[arg(long)]
        ham: Option<PathBuf>,

        /// Output model file
        #[arg(short, long)]
        output: PathBuf,
    },
}
