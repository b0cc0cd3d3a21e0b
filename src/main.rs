use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use g2b::config::LogLevel;
use g2b::{Config, Converter};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "g2b",
    version,
    about = "Converts a GnuCash SQLite book into a Beancount ledger"
)]
struct Cli {
    /// GnuCash book to read
    #[arg(short = 'i', long = "input", value_parser = existing_path)]
    input: PathBuf,

    /// Beancount ledger to write
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// YAML configuration
    #[arg(short = 'c', long = "config", value_parser = existing_path)]
    config: PathBuf,
}

fn existing_path(arg: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(arg);
    if path.exists() {
        Ok(path)
    } else {
        Err(format!("Path '{}' does not exist.", arg))
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_path(&cli.config)
        .with_context(|| format!("could not load {}", cli.config.display()))?;
    init_logging(config.converter.loglevel);

    Converter::builder()
        .input(cli.input)
        .output(cli.output)
        .config(config)
        .build()
        .run()
        .context("conversion failed")?;
    Ok(())
}
