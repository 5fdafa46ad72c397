//! Shared parameter validation and the single-file analysis pipeline.
//!
//! Every subcommand funnels its flag values through the builders here so
//! that `analyze`, `marks`, and `batch` reject bad input identically.

use std::collections::HashSet;
use std::path::Path;

use pva_rs::record::{DEFAULT_SAMPLE_RATE, SUPPORTED_EXTENSIONS};
use pva_rs::taxonomy::{ASYNCHRONY_ORDER, ASYNCHRONY_REGISTRY};
use pva_rs::{
    AnalysisResult, AsynchronyClassifier, AsynchronyType, ClassifierConfig, ExtractorConfig,
    MarkExtractor, PvaError, VentilationRecord,
};

use crate::exit_codes;

/// Check that an input path exists and carries a supported extension.
pub fn validate_file(file_path: &str) -> Result<(), String> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("Input file not found: {}", file_path));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(format!(
            "Unsupported file type '{}'. Supported extensions: {}",
            file_path,
            SUPPORTED_EXTENSIONS.join(", ")
        ));
    }

    Ok(())
}

pub fn build_classifier_config(
    tolerance: usize,
    trigger_delay: usize,
) -> Result<ClassifierConfig, String> {
    let config = ClassifierConfig {
        tolerance,
        trigger_delay,
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

pub fn build_extractor_config(
    debounce_window: usize,
    start_threshold: f64,
    finish_threshold: f64,
    outlier_threshold: f64,
) -> Result<ExtractorConfig, String> {
    let config = ExtractorConfig {
        debounce_window,
        start_threshold,
        finish_threshold,
        outlier_threshold,
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Parse `--types` abbreviations into a set of asynchrony kinds.
///
/// Abbreviations are matched case-insensitively against the registry;
/// an unknown one is rejected with the full list of valid choices.
pub fn parse_types_filter(
    types: Option<&Vec<String>>,
) -> Result<Option<HashSet<AsynchronyType>>, String> {
    let Some(abbrevs) = types else {
        return Ok(None);
    };

    let mut filter = HashSet::new();
    for abbrev in abbrevs {
        let found = ASYNCHRONY_REGISTRY
            .iter()
            .find(|meta| meta.abbreviation.eq_ignore_ascii_case(abbrev));
        match found {
            Some(meta) => {
                filter.insert(meta.kind);
            }
            None => {
                return Err(format!(
                    "Unknown asynchrony type '{}'. Valid types: {}",
                    abbrev,
                    ASYNCHRONY_ORDER.join(", ")
                ));
            }
        }
    }

    Ok(Some(filter))
}

/// Pick the sampling rate: an explicit flag wins, then the recording's
/// time column, then the default.
pub fn resolve_sample_rate(
    explicit: Option<f64>,
    record: &VentilationRecord,
) -> Result<f64, String> {
    if let Some(rate) = explicit {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(format!("Sample rate must be positive, got {}", rate));
        }
        return Ok(rate);
    }

    if let Some(rate) = record.infer_sample_rate() {
        log::info!("Inferred sample rate {:.2} Hz from the time column", rate);
        return Ok(rate);
    }

    log::debug!(
        "No time column to infer from, assuming {} Hz",
        DEFAULT_SAMPLE_RATE
    );
    Ok(DEFAULT_SAMPLE_RATE)
}

/// Run the full pipeline over one recording: parse, extract marks,
/// classify, and wrap the events in a result envelope.
///
/// A recording with no detectable breaths or efforts yields an empty
/// event list rather than an error.
pub fn run_pipeline(
    file_path: &str,
    sample_rate: Option<f64>,
    classifier_config: ClassifierConfig,
    extractor_config: ExtractorConfig,
    filter: Option<&HashSet<AsynchronyType>>,
) -> Result<AnalysisResult, PvaError> {
    let record = VentilationRecord::from_path(Path::new(file_path))?;
    let sample_rate =
        resolve_sample_rate(sample_rate, &record).map_err(PvaError::Configuration)?;

    let extractor = MarkExtractor::new(extractor_config)?;
    let (marks, efforts) = extractor.extract(&record)?;

    let breath_count = marks.cycle_count();
    let effort_count = efforts.len();

    let markless = breath_count == 0 && marks.trailing_inspiration.is_none();
    let events = if markless || efforts.is_empty() {
        log::warn!(
            "Nothing to classify in {}: {} breath cycle(s), {} effort interval(s)",
            file_path,
            breath_count,
            effort_count
        );
        Vec::new()
    } else {
        let classifier = AsynchronyClassifier::new(classifier_config)?;
        classifier.classify(&marks, &efforts)?
    };

    let events: Vec<_> = match filter {
        Some(kinds) => events
            .into_iter()
            .filter(|event| kinds.contains(&event.kind))
            .collect(),
        None => events,
    };

    Ok(AnalysisResult::new(
        file_path.to_string(),
        sample_rate,
        classifier_config.tolerance,
        breath_count,
        effort_count,
        &events,
    ))
}

/// Map a pipeline error onto a process exit code.
pub fn exit_code_for(error: &PvaError) -> i32 {
    match error {
        PvaError::IoError(_) => exit_codes::EXECUTION_ERROR,
        _ => exit_codes::INPUT_ERROR,
    }
}
