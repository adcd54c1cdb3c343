//! Command-line interface for loadeval
//!
//! # Usage Examples
//!
//! ```bash
//! # One minute of in-process CPU load, report under ./loadeval-YYYYMMDD-N
//! loadeval run --load cpuspin
//!
//! # Configured run with a note and JSON output
//! loadeval run --config loadeval.yaml --annotate "rt kernel, isolcpus=2-7" --json
//!
//! # Debug logging for the load lifecycle only
//! RUST_LOG=load_modules=debug loadeval run --config loadeval.yaml
//! ```

use clap::Parser;
use load_modules::ModuleRegistry;
use loadeval::cli::{Cli, Commands, RunArgs};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let registry = ModuleRegistry::with_builtin();
    match cli.command {
        Commands::Run(args) => run_loads(args, &registry).await,
        Commands::Modules => {
            for name in registry.names() {
                println!(
                    "{:<12} {}",
                    name,
                    registry.describe(name).unwrap_or_default()
                );
            }
            Ok(())
        }
    }
}

async fn run_loads(args: RunArgs, registry: &ModuleRegistry) -> anyhow::Result<()> {
    let config = args.resolve_config()?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let outcome = loadeval::run(&config, registry, shutdown).await?;

    println!("Report:       {}", outcome.report.display());
    if let Some(archive) = &outcome.archive {
        println!("Archive:      {}", archive.display());
    }
    println!(
        "Duration:     {}",
        loadeval::run_info::Breakdown::from_duration(outcome.elapsed)
    );
    match outcome.load_average {
        Some(avg) => println!("Load average: {avg:.2}"),
        None => println!("Load average: unavailable"),
    }
    if !outcome.not_ready.is_empty() {
        println!("Not ready:    {}", outcome.not_ready.join(", "));
    }
    if outcome.interrupted {
        println!("Run was interrupted before the window ended");
    }
    for failed in outcome.summary.failures() {
        eprintln!(
            "Load '{}' failed: {}",
            failed.name,
            failed.error.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}
