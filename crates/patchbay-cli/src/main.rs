//! Patchbay CLI - validate, inspect and render graph documents.

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patchbay")]
#[command(author, version, about = "Patchbay processing-graph CLI", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a graph document and report every problem
    Validate(commands::validate::ValidateArgs),

    /// Show nodes, connections and render order of a graph
    Inspect(commands::inspect::InspectArgs),

    /// Render a graph to a WAV file
    Render(commands::render::RenderArgs),

    /// List built-in processors and their parameters
    Nodes(commands::nodes::NodesArgs),
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Inspect(args) => commands::inspect::run(args),
        Commands::Render(args) => commands::render::run(args),
        Commands::Nodes(args) => commands::nodes::run(args),
    }
}
