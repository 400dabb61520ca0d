use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "persist",
    about = "Persist - write, read and inspect persisted record frames",
    version,
    author
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode users from a JSON file into frames
    Write {
        /// JSON file holding one user or an array of users
        #[arg(short, long)]
        input: PathBuf,

        /// Frame file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Append frames instead of replacing the file
        #[arg(long)]
        append: bool,
    },

    /// Decode every frame in a file
    Read {
        /// Frame file to read
        #[arg(short, long)]
        input: PathBuf,

        /// Output format (defaults to the configured one)
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// Show frame headers without decoding fields
    Inspect {
        /// Frame file to inspect
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Write the sample user and read it back
    Demo {
        /// Frame file to use
        #[arg(short, long, default_value = "user.dat")]
        output: PathBuf,
    },

    /// Show configuration information
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Human-readable listing
    #[default]
    Pretty,
    /// Pretty-printed JSON
    Json,
    /// Single-line JSON
    JsonCompact,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonCompact => write!(f, "json-compact"),
        }
    }
}
