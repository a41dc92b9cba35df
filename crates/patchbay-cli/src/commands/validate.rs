//! Document validation command.

use clap::Args;
use patchbay_config::{build, validate};

use super::common::{load_document, registry};

#[derive(Args)]
pub struct ValidateArgs {
    /// Graph document (TOML path or bundled graph name)
    #[arg(value_name = "GRAPH")]
    graph: String,

    /// Also open the graph, so processors check their parameters
    #[arg(long)]
    open: bool,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let doc = load_document(&args.graph)?;

    if let Err(report) = validate(&doc) {
        println!("{}: {} issue(s)", doc.name, report.issues().len());
        for issue in report.issues() {
            println!("  - {issue}");
        }
        anyhow::bail!("'{}' is invalid", args.graph);
    }

    let built = build(&doc, registry())?;
    if args.open {
        built.graph.open()?;
        built.graph.close()?;
    }

    println!(
        "{}: ok ({} nodes, {} connections)",
        doc.name,
        built.labels.len(),
        doc.connections.len()
    );
    Ok(())
}
