use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "recast")]
#[command(author, version, about = "File conversion service for image, document, audio and video formats")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a single file
    Convert {
        /// Input file to convert
        #[arg(required = true)]
        input: PathBuf,

        /// Target format, e.g. "jpeg" or "pdf"
        #[arg(long)]
        to: String,

        /// Source format (inferred from the file extension if not specified)
        #[arg(long)]
        from: Option<String>,

        /// Where to write the result (defaults to the input path with the target extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List supported formats and conversions
    Formats {
        /// Show the outputs of a single input format
        input: Option<String>,
    },

    /// Check that required conversion engines are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
