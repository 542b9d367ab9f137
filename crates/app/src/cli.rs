//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cupom - turn receipt photos into a (description, amount) guess
#[derive(Parser, Debug)]
#[command(name = "cupom")]
#[command(about = "Extract merchant and total from receipt photos", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Engine configuration file (TOML); built-in defaults when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline over one or more receipt images
    Extract {
        /// Image files (JPEG, PNG, WEBP, ...)
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// OCR language hint, overrides the config (e.g. "por", "eng")
        #[arg(short, long)]
        lang: Option<String>,

        /// Tesseract data directory (only used with the `tesseract` feature)
        #[arg(long)]
        tessdata: Option<PathBuf>,

        /// Print one JSON object per image instead of tab-separated lines
        #[arg(long)]
        json: bool,
    },

    /// Run the text heuristics over already-recognized text
    ParseText {
        /// Text file; reads stdin when omitted
        file: Option<PathBuf>,

        /// Print JSON instead of a tab-separated line
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}
