//! Implementation of the `marks` subcommand: mark extraction without
//! classification, for inspecting what the detectors would see.

use std::path::Path;

use serde::Serialize;

use pva_rs::{BreathCycle, EffortInterval, MarkExtractor, VentilationRecord};

use crate::cli::MarksArgs;
use crate::exit_codes;
use crate::output;
use crate::params;

#[derive(Serialize)]
struct MarksReport {
    file_path: String,
    sample_count: usize,
    breath_count: usize,
    cycles: Vec<BreathCycle>,
    trailing_inspiration: Option<usize>,
    effort_count: usize,
    efforts: Vec<EffortInterval>,
}

pub fn execute(args: MarksArgs) -> i32 {
    if let Err(msg) = params::validate_file(&args.file) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    let extractor_config = match params::build_extractor_config(
        args.debounce_window,
        args.start_threshold,
        args.finish_threshold,
        args.outlier_threshold,
    ) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if !args.quiet {
        eprintln!("Extracting marks from {}...", args.file);
    }

    let record = match VentilationRecord::from_path(Path::new(&args.file)) {
        Ok(record) => record,
        Err(e) => {
            eprintln!("Failed to read recording: {}", e);
            return params::exit_code_for(&e);
        }
    };

    let extractor = match MarkExtractor::new(extractor_config) {
        Ok(extractor) => extractor,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    let (marks, efforts) = match extractor.extract(&record) {
        Ok(extracted) => extracted,
        Err(e) => {
            eprintln!("Mark extraction failed: {}", e);
            return params::exit_code_for(&e);
        }
    };

    let report = MarksReport {
        file_path: args.file.clone(),
        sample_count: record.sample_count(),
        breath_count: marks.cycle_count(),
        trailing_inspiration: marks.trailing_inspiration,
        cycles: marks.cycles,
        effort_count: efforts.len(),
        efforts,
    };

    if !args.quiet {
        eprintln!(
            "  {} breath cycle(s), {} effort interval(s)",
            report.breath_count, report.effort_count
        );
    }

    let json = match output::to_json(&report, args.compact) {
        Ok(json) => json,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    if let Err(msg) = output::write_output(&json, args.output.as_deref()) {
        eprintln!("Error: {}", msg);
        return exit_codes::EXECUTION_ERROR;
    }

    exit_codes::SUCCESS
}
