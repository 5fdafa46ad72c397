//! Implementation of the `analyze` subcommand.

use crate::cli::AnalyzeArgs;
use crate::exit_codes;
use crate::output;
use crate::params;

pub fn execute(args: AnalyzeArgs) -> i32 {
    if let Err(msg) = params::validate_file(&args.file) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
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

    if !args.quiet {
        eprintln!("Analyzing {}...", args.file);
        eprintln!(
            "  Tolerance: {} samples, trigger delay: {} samples",
            args.tolerance, args.trigger_delay
        );
    }

    let result = match params::run_pipeline(
        &args.file,
        args.sample_rate,
        classifier_config,
        extractor_config,
        filter.as_ref(),
    ) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            return params::exit_code_for(&e);
        }
    };

    if !args.quiet {
        eprintln!(
            "  {} breath cycle(s), {} effort(s), {} event(s)",
            result.breath_count, result.effort_count, result.event_count
        );
    }

    let json = match output::to_json(&result, args.compact) {
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

    if !args.quiet {
        if let Some(ref path) = args.output {
            eprintln!("Results written to {}", path);
        }
    }

    exit_codes::SUCCESS
}
