use std::path::PathBuf;

use clap::Parser;
use pdfqa_core::config::AppConfig;
use pdfqa_lib::{run, Services};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Ask questions about a PDF library; answers are grounded in retrieved passages.
#[derive(Parser)]
#[command(name = "pdfqa")]
#[command(version)]
struct Cli {
    /// Path to the TOML config holding service keys and settings.
    #[arg(long, env = "PDFQA_CONFIG", default_value = "pdfqa.toml")]
    config: PathBuf,

    /// Emit one JSON view per line instead of text.
    #[arg(long)]
    json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let services = match AppConfig::load(&cli.config).and_then(|cfg| Services::from_config(&cfg)) {
        Ok(s) => s,
        Err(e) => {
            error!(code = %e.code, "startup failed");
            eprintln!("pdfqa: {e}");
            std::process::exit(1);
        }
    };
    info!(config = %cli.config.display(), "services ready");

    let pipeline = services.pipeline();
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    if let Err(e) = run(&pipeline, &mut stdin.lock(), &mut stdout.lock(), cli.json) {
        eprintln!("pdfqa: {e}");
        std::process::exit(1);
    }
}
