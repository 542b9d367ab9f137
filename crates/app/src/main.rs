//! Cupom CLI - receipt photo to (description, amount)
//!
//! Usage:
//!   cupom extract photo.jpg [--json]     Run OCR + heuristics over images
//!   cupom parse-text receipt.txt         Heuristics only, over recognized text
//!   cupom config                         Print the effective configuration

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;
use cupom_ocr::ExtractionPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr).compact())
        .init();

    let mut config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Extract { images, lang, tessdata, json } => {
            if let Some(lang) = lang {
                config.language_hint = lang;
            }
            let pipeline = ExtractionPipeline::new(commands::recognizer(tessdata), config);
            commands::cmd_extract(&pipeline, &images, json).await
        }
        Commands::ParseText { file, json } => commands::cmd_parse_text(config, file.as_deref(), json),
        Commands::Config => commands::cmd_config(&config),
    }
}
