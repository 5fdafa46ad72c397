//! Implementation of the `batch` subcommand: glob expansion plus a
//! parallel run of the analysis pipeline over every matched file.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use pva_rs::AnalysisResult;

use crate::cli::BatchArgs;
use crate::exit_codes;
use crate::output;
use crate::params;

/// Expand a glob pattern into a sorted list of recording files.
fn resolve_files(pattern: &str) -> Result<Vec<String>, String> {
    let entries = glob::glob(pattern)
        .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    if let Some(p) = path.to_str() {
                        files.push(p.to_string());
                    }
                }
            }
            Err(e) => log::warn!("Skipping unreadable glob match: {}", e),
        }
    }

    files.sort();
    Ok(files)
}

/// Per-file output path: `<dir>/<input stem>_pva.json`.
fn output_path_for(dir: &str, input: &str) -> PathBuf {
    let stem = Path::new(input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("recording");
    Path::new(dir).join(format!("{}_pva.json", stem))
}

pub fn execute(args: BatchArgs) -> i32 {
    let files = match resolve_files(&args.pattern) {
        Ok(files) => files,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if files.is_empty() {
        eprintln!("Error: No files match pattern '{}'", args.pattern);
        return exit_codes::INPUT_ERROR;
    }

    if args.dry_run {
        if !args.quiet {
            eprintln!("Would analyze {} file(s):", files.len());
        }
        for file in &files {
            println!("{}", file);
        }
        return exit_codes::SUCCESS;
    }

    let classifier_config =
        match params::build_classifier_config(args.tolerance, args.trigger_delay) {
            Ok(config) => config,
            Err(msg) => {
                eprintln!("Error: {}", msg);
                return exit_codes::INPUT_ERROR;
            }
        };

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

    let filter = match params::parse_types_filter(args.types.as_ref()) {
        Ok(filter) => filter,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Some(ref dir) = args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Error: Failed to create output directory '{}': {}", dir, e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    let total = files.len();
    if !args.quiet {
        eprintln!(
            "Analyzing {} file(s) on {} thread(s)...",
            total,
            rayon::current_num_threads()
        );
    }
    let started = Instant::now();

    // Analyses are independent; fan out across the pool and collect in
    // input order so downstream output stays deterministic.
    let results: Vec<Result<AnalysisResult, String>> = files
        .par_iter()
        .map(|file| {
            params::validate_file(file)?;
            params::run_pipeline(
                file,
                args.sample_rate,
                classifier_config,
                extractor_config,
                filter.as_ref(),
            )
            .map_err(|e| e.to_string())
        })
        .collect();

    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for (file, result) in files.iter().zip(results) {
        let analysis = match result {
            Ok(analysis) => analysis,
            Err(msg) => {
                eprintln!("  {}: {}", file, msg);
                failed += 1;
                continue;
            }
        };

        let write_result = match args.output_dir {
            Some(ref dir) => {
                let out_path = output_path_for(dir, file);
                output::to_json(&analysis, args.compact)
                    .and_then(|json| output::write_output(&json, out_path.to_str()))
            }
            // Without an output directory, stream one compact JSON line
            // per file to stdout.
            None => output::to_json(&analysis, true)
                .and_then(|json| output::write_output(&json, None)),
        };

        match write_result {
            Ok(()) => {
                succeeded += 1;
                if !args.quiet {
                    eprintln!("  {}: {} event(s)", file, analysis.event_count);
                }
            }
            Err(msg) => {
                eprintln!("  {}: {}", file, msg);
                failed += 1;
            }
        }
    }

    if !args.quiet {
        eprintln!(
            "Batch complete: {} succeeded, {} failed ({:.1}s)",
            succeeded,
            failed,
            started.elapsed().as_secs_f64()
        );
    }

    if failed == 0 {
        exit_codes::SUCCESS
    } else if succeeded > 0 {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::EXECUTION_ERROR
    }
}
