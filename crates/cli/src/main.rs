use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Commands;

#[derive(Parser)]
#[command(name = "artifact-cache")]
#[command(about = "Inspect and maintain an artifact cache directory", long_about = None)]
#[command(version)]
struct Cli {
    /// Cache root (defaults to the configured root)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let manager = commands::open_manager(cli.root)?;
    let output = cli.command.execute(&manager, cli.json)?;
    println!("{output}");
    Ok(())
}
