//! localcoder: an offline coding agent for a local Ollama model.
//!
//! Runs in a project directory: reads and edits files, runs commands
//! (with approval), and keeps project memory under `.coder/`.

use clap::Parser;
use std::path::PathBuf;

mod console;
mod repl;
mod setup;

#[derive(Parser)]
#[command(
    name = "localcoder",
    about = "localcoder: an offline coding agent for local Ollama models",
    version,
    author
)]
struct Cli {
    /// Model to use (overrides config and LOCALCODER_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Project directory (default: current directory)
    #[arg(short = 'd', long)]
    project_dir: Option<PathBuf>,

    /// Run a single message and exit instead of starting the REPL
    #[arg(long)]
    message: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so streamed replies on stdout stay clean.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let console = console::Console::new();
    let Some(root) = setup::project_dir(&console, cli.project_dir).await? else {
        return Ok(());
    };
    let config = setup::load_config(&root, cli.model)?;
    let mut workspace = setup::open(&console, root, &config).await?;

    match cli.message {
        Some(message) => repl::turn(&console, &mut workspace, &message).await,
        None => repl::run(&console, workspace).await?,
    }

    Ok(())
}
