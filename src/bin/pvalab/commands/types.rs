//! Implementation of the `types` subcommand: list the asynchrony registry.

use serde::Serialize;

use pva_rs::taxonomy::{MarkKind, ASYNCHRONY_REGISTRY};

use crate::cli::TypesArgs;
use crate::exit_codes;
use crate::output;

#[derive(Serialize)]
struct TypeRow {
    abbreviation: &'static str,
    name: &'static str,
    position: u8,
    flags: &'static str,
    documentation: &'static str,
}

fn marker_label(marker: MarkKind) -> &'static str {
    match marker {
        MarkKind::VentilatorInspiration => "inspiration mark",
        MarkKind::EffortStart => "effort start",
    }
}

pub fn execute(args: TypesArgs) -> i32 {
    let rows: Vec<TypeRow> = ASYNCHRONY_REGISTRY
        .iter()
        .map(|meta| TypeRow {
            abbreviation: meta.abbreviation,
            name: meta.name,
            position: meta.position,
            flags: marker_label(meta.marker),
            documentation: meta.documentation,
        })
        .collect();

    if args.json {
        match output::to_json(&rows, false) {
            Ok(json) => println!("{}", json),
            Err(msg) => {
                eprintln!("Error: {}", msg);
                return exit_codes::EXECUTION_ERROR;
            }
        }
        return exit_codes::SUCCESS;
    }

    println!("Detectable asynchrony types:\n");
    println!(
        "{:<8} {:<28} {:<5} {:<18} Description",
        "Abbrev", "Name", "Pos", "Flags at"
    );
    println!("{}", "-".repeat(100));

    for row in &rows {
        println!(
            "{:<8} {:<28} {:<5} {:<18} {}",
            row.abbreviation, row.name, row.position, row.flags, row.documentation
        );
    }

    println!();
    println!("Events at the same sample index are ordered by the Pos column.");
    println!("Example: pvalab analyze -f recording.csv --types DT IEE");

    exit_codes::SUCCESS
}
