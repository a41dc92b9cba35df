//! Built-in processor listing command.

#![allow(clippy::print_literal)] // Table headers use literal strings

use clap::Args;
use patchbay_nodes::{ParamUnit, builtin_by_name, builtins};

#[derive(Args)]
pub struct NodesArgs {
    /// Show details for a specific builtin
    #[arg(value_name = "NAME")]
    name: Option<String>,
}

fn unit(unit: ParamUnit) -> &'static str {
    match unit {
        ParamUnit::Linear => "",
        ParamUnit::Hertz => "Hz",
        ParamUnit::Seconds => "s",
        ParamUnit::Ratio => "ratio",
        ParamUnit::Count => "count",
    }
}

pub fn run(args: NodesArgs) -> anyhow::Result<()> {
    if let Some(name) = &args.name {
        let builtin = builtin_by_name(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown builtin: {name}"))?;

        println!("{}", builtin.name);
        println!("{}", "=".repeat(builtin.name.len()));
        println!();
        println!("{}", builtin.summary);
        println!("Component: {}", builtin.description);
        println!();

        if builtin.params.is_empty() {
            println!("No fixed parameters.");
            return Ok(());
        }
        println!("Parameters (params = [...], in order):");
        println!();
        println!("  {:3}  {:12}  {:8}  {:10}  {}", "#", "Name", "Default", "Unit", "Range");
        println!("  {:3}  {:12}  {:8}  {:10}  {}", "-", "----", "-------", "----", "-----");
        for (index, spec) in builtin.params.iter().enumerate() {
            println!(
                "  {index:3}  {:12}  {:8}  {:10}  {} to {}",
                spec.name,
                spec.default,
                unit(spec.unit),
                spec.min,
                spec.max
            );
        }
        return Ok(());
    }

    println!("Built-in processors");
    println!("===================");
    println!();
    println!("  {:12}  {:16}  {}", "Name", "Component", "Description");
    println!("  {:12}  {:16}  {}", "----", "---------", "-----------");
    for builtin in builtins() {
        println!(
            "  {:12}  {:16}  {}",
            builtin.name,
            builtin.description.to_string(),
            builtin.summary
        );
    }
    println!();
    println!("Use 'patchbay nodes <NAME>' for parameters.");
    Ok(())
}
