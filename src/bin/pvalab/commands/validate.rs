//! Implementation of the `validate` subcommand: probe a recording file
//! without running the detectors.

use std::path::Path;

use serde::Serialize;

use pva_rs::record::SUPPORTED_EXTENSIONS;
use pva_rs::VentilationRecord;

use crate::cli::ValidateArgs;
use crate::exit_codes;
use crate::output;

#[derive(Serialize)]
struct ValidationReport {
    file_path: String,
    exists: bool,
    supported_extension: bool,
    size_bytes: Option<u64>,
    sample_count: Option<usize>,
    channels: Option<Vec<&'static str>>,
    inferred_sample_rate: Option<f64>,
    valid: bool,
    error: Option<String>,
}

fn probe(file_path: &str) -> ValidationReport {
    let path = Path::new(file_path);

    let exists = path.exists();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let supported_extension = SUPPORTED_EXTENSIONS.contains(&extension.as_str());
    let size_bytes = std::fs::metadata(path).ok().map(|m| m.len());

    let mut report = ValidationReport {
        file_path: file_path.to_string(),
        exists,
        supported_extension,
        size_bytes,
        sample_count: None,
        channels: None,
        inferred_sample_rate: None,
        valid: false,
        error: None,
    };

    if !exists {
        report.error = Some("file does not exist".to_string());
        return report;
    }
    if !supported_extension {
        report.error = Some(format!(
            "unsupported extension, expected one of: {}",
            SUPPORTED_EXTENSIONS.join(", ")
        ));
        return report;
    }

    match VentilationRecord::from_path(path) {
        Ok(record) => {
            let mut channels = Vec::new();
            if record.time.is_some() {
                channels.push("time");
            }
            if record.pressure.is_some() {
                channels.push("pressure");
            }
            if record.flow.is_some() {
                channels.push("flow");
            }
            channels.push("volume");
            channels.push("pmus");

            report.sample_count = Some(record.sample_count());
            report.inferred_sample_rate = record.infer_sample_rate();
            report.channels = Some(channels);
            report.valid = true;
        }
        Err(e) => {
            report.error = Some(e.to_string());
        }
    }

    report
}

pub fn execute(args: ValidateArgs) -> i32 {
    let report = probe(&args.file);

    if args.json {
        match output::to_json(&report, false) {
            Ok(json) => println!("{}", json),
            Err(msg) => {
                eprintln!("Error: {}", msg);
                return exit_codes::EXECUTION_ERROR;
            }
        }
    } else {
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };

        println!("Validation report for {}", report.file_path);
        println!("  exists:              {}", yes_no(report.exists));
        println!(
            "  supported extension: {}",
            yes_no(report.supported_extension)
        );
        if let Some(size) = report.size_bytes {
            println!("  size:                {} bytes", size);
        }
        if let Some(count) = report.sample_count {
            println!("  samples:             {}", count);
        }
        if let Some(ref channels) = report.channels {
            println!("  channels:            {}", channels.join(", "));
        }
        if let Some(rate) = report.inferred_sample_rate {
            println!("  inferred rate:       {:.2} Hz", rate);
        }
        println!("  valid:               {}", yes_no(report.valid));
        if let Some(ref error) = report.error {
            println!("  error:               {}", error);
        }
    }

    if report.valid {
        exit_codes::SUCCESS
    } else {
        exit_codes::INPUT_ERROR
    }
}
