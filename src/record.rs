//! Ventilation recording reader
//!
//! Recordings are header-labeled tabular text, the format the acquisition
//! tooling writes: a `time,pressure,flow,volume,pmus` header followed by
//! one sample per row, comma- or whitespace-separated. The extractor only
//! needs the volume and Pmus channels; the others are carried through for
//! presentation layers when present.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{PvaError, Result};

/// Sample rate assumed when the recording carries no usable time column.
pub const DEFAULT_SAMPLE_RATE: f64 = 100.0;

/// Recording file extensions the reader accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "txt", "ascii"];

/// Files at or above this size are memory-mapped instead of read whole.
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Time-aligned waveform channels for one recording.
#[derive(Debug, Clone, Default)]
pub struct VentilationRecord {
    pub time: Option<Vec<f64>>,
    pub pressure: Option<Vec<f64>>,
    pub flow: Option<Vec<f64>>,
    pub volume: Vec<f64>,
    pub pmus: Vec<f64>,
}

impl VentilationRecord {
    /// Parse a recording from header-labeled tabular text.
    ///
    /// The first non-comment line names the columns. `volume` and `pmus`
    /// are required; `time`, `pressure`, and `flow` are optional. Rows
    /// with a wrong field count or unparseable/non-finite values are
    /// skipped with a warning so one bad sample cannot shift the channel
    /// alignment.
    ///
    /// # Returns
    /// The parsed record, or `Parse` when required columns are missing or
    /// no data row survived.
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));

        let header_line = lines
            .next()
            .ok_or_else(|| PvaError::Parse("recording is empty".to_string()))?;
        let comma_separated = header_line.contains(',');
        let header: Vec<String> = split_fields(header_line, comma_separated)
            .map(|field| field.to_ascii_lowercase())
            .collect();

        let volume_col = column_index(&header, "volume").ok_or_else(|| {
            PvaError::Parse(format!(
                "required column 'volume' not found in header: {}",
                header_line
            ))
        })?;
        let pmus_col = column_index(&header, "pmus").ok_or_else(|| {
            PvaError::Parse(format!(
                "required column 'pmus' not found in header: {}",
                header_line
            ))
        })?;
        let time_col = column_index(&header, "time");
        let pressure_col = column_index(&header, "pressure");
        let flow_col = column_index(&header, "flow");

        let mut record = Self {
            time: time_col.map(|_| Vec::new()),
            pressure: pressure_col.map(|_| Vec::new()),
            flow: flow_col.map(|_| Vec::new()),
            volume: Vec::new(),
            pmus: Vec::new(),
        };

        let mut skipped = 0usize;
        for (row, line) in lines.enumerate() {
            let fields: Vec<&str> = split_fields(line, comma_separated).collect();
            if fields.len() != header.len() {
                log::warn!(
                    "Row {} has {} field(s), expected {}, skipping",
                    row,
                    fields.len(),
                    header.len()
                );
                skipped += 1;
                continue;
            }

            let values: Option<Vec<f64>> = fields
                .iter()
                .map(|f| f.parse::<f64>().ok().filter(|v| v.is_finite()))
                .collect();
            let Some(values) = values else {
                log::warn!("Row {} has an unparseable or non-finite value, skipping", row);
                skipped += 1;
                continue;
            };

            record.volume.push(values[volume_col]);
            record.pmus.push(values[pmus_col]);
            if let (Some(col), Some(channel)) = (time_col, record.time.as_mut()) {
                channel.push(values[col]);
            }
            if let (Some(col), Some(channel)) = (pressure_col, record.pressure.as_mut()) {
                channel.push(values[col]);
            }
            if let (Some(col), Some(channel)) = (flow_col, record.flow.as_mut()) {
                channel.push(values[col]);
            }
        }

        if record.volume.is_empty() {
            return Err(PvaError::Parse(
                "no valid data rows found in recording".to_string(),
            ));
        }

        log::info!(
            "Loaded recording: {} sample(s) across {} column(s) ({} row(s) skipped)",
            record.volume.len(),
            header.len(),
            skipped
        );

        Ok(record)
    }

    /// Read and parse a recording file.
    ///
    /// The path must exist and carry a supported extension. Large files
    /// are memory-mapped rather than copied into a string.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PvaError::FileNotFound(path.display().to_string()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(PvaError::UnsupportedFileType(format!(
                "'{}' (supported: {})",
                path.display(),
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }

        let size = std::fs::metadata(path)?.len();
        if size >= MMAP_THRESHOLD {
            log::debug!(
                "Memory-mapping {} ({} bytes)",
                path.display(),
                size
            );
            let mmap = mmap_file(path)?;
            let content = std::str::from_utf8(&mmap).map_err(|e| {
                PvaError::Parse(format!("recording is not valid UTF-8 text: {}", e))
            })?;
            Self::parse(content)
        } else {
            let content = std::fs::read_to_string(path)?;
            Self::parse(&content)
        }
    }

    /// Number of samples per channel.
    pub fn sample_count(&self) -> usize {
        self.volume.len()
    }

    /// Sample rate derived from the time column span, when one is present
    /// and strictly increasing overall.
    pub fn infer_sample_rate(&self) -> Option<f64> {
        let time = self.time.as_deref()?;
        if time.len() < 2 {
            return None;
        }
        let span = time[time.len() - 1] - time[0];
        if span <= 0.0 {
            return None;
        }
        Some((time.len() - 1) as f64 / span)
    }
}

/// Open a file and map it into memory (read-only).
fn mmap_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path).map_err(PvaError::IoError)?;
    let mmap = unsafe { Mmap::map(&file).map_err(PvaError::IoError)? };
    Ok(mmap)
}

fn split_fields<'a>(
    line: &'a str,
    comma_separated: bool,
) -> Box<dyn Iterator<Item = &'a str> + 'a> {
    if comma_separated {
        Box::new(line.split(',').map(str::trim))
    } else {
        Box::new(line.split_whitespace())
    }
}

fn column_index(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|column| column == name)
}

// =============================================================================
// TESTS
// =============================================================================
