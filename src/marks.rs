//! Mark extraction — continuous waveforms to discrete event marks
//!
//! Two independent extractors feed the classifier: ventilator transition
//! marks from the volume waveform (parity method) and patient effort
//! intervals from the Pmus waveform (threshold/hysteresis method).

use crate::error::{PvaError, Result};
use crate::record::VentilationRecord;
use crate::types::{EffortInterval, ExtractorConfig, VentilatorMarks};

/// Samples the effort scan looks ahead when testing for a deflection
/// leaving or returning to baseline.
const DEFLECTION_LOOKAHEAD: usize = 10;

/// Waveform-to-marks extractor.
///
/// The volume channel of the supported acquisition hardware is encoded so
/// that the integer parity of a sample toggles exactly at the ventilator's
/// inspiration/expiration transitions. That is a property of the device's
/// fixed-point encoding, not of ventilation in general; hardware with a
/// different encoding needs a different extraction front end.
pub struct MarkExtractor {
    config: ExtractorConfig,
}

impl MarkExtractor {
    /// Create an extractor with the given threshold configuration.
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Extract ventilator transition marks from the volume waveform.
    ///
    /// Walks the integer-rounded samples tracking parity: an even-to-odd
    /// flip records an inspiration mark, odd-to-even an expiration mark.
    /// A leading expiration (recording started mid-breath) is dropped and
    /// a final unpaired inspiration becomes the trailing mark.
    ///
    /// # Arguments
    /// * `volume` - Volume samples in the device's fixed-point scaling
    ///
    /// # Returns
    /// Paired breath cycles in chronological order. A waveform with no
    /// parity flips yields zero cycles, which is valid.
    pub fn extract_ventilator_marks(&self, volume: &[f64]) -> Result<VentilatorMarks> {
        if volume.is_empty() {
            return Err(PvaError::InvalidInput(
                "volume waveform is empty".to_string(),
            ));
        }

        let mut ins_marks: Vec<usize> = Vec::new();
        let mut exp_marks: Vec<usize> = Vec::new();

        let mut odd = is_odd(volume[0]);
        for (i, &sample) in volume.iter().enumerate().skip(1) {
            let now_odd = is_odd(sample);
            if now_odd != odd {
                if now_odd {
                    ins_marks.push(i);
                } else {
                    exp_marks.push(i);
                }
                odd = now_odd;
            }
        }

        // Breaths begin with inspiration by convention; a recording that
        // starts mid-breath produces one leading expiration flip.
        if let Some(&first_exp) = exp_marks.first() {
            if ins_marks.first().map_or(true, |&first_ins| first_exp < first_ins) {
                exp_marks.remove(0);
                log::debug!(
                    "Dropped leading expiration mark at {} (recording starts mid-breath)",
                    first_exp
                );
            }
        }

        // Parity flips alternate, so at most one inspiration is left over.
        let trailing = if ins_marks.len() == exp_marks.len() + 1 {
            ins_marks.pop()
        } else {
            None
        };

        let mut marks = VentilatorMarks::from_sequences(&ins_marks, &exp_marks)?;
        if let Some(index) = trailing {
            marks = marks.with_trailing_inspiration(index)?;
        }

        log::info!(
            "Extracted {} breath cycle(s) from {} volume samples{}",
            marks.cycle_count(),
            volume.len(),
            if marks.trailing_inspiration.is_some() {
                " (plus a trailing inspiration)"
            } else {
                ""
            }
        );

        Ok(marks)
    }

    /// Extract patient effort intervals from the Pmus waveform.
    ///
    /// A start candidate is a near-baseline sample that deflects past the
    /// finish threshold within the lookahead window; a finish candidate is
    /// the symmetric return to baseline. Both scans debounce against the
    /// previously accepted mark. Paired intervals whose trough magnitude
    /// stays below the outlier threshold are discarded as noise.
    pub fn extract_effort_marks(&self, pmus: &[f64]) -> Result<Vec<EffortInterval>> {
        if pmus.is_empty() {
            return Err(PvaError::InvalidInput("Pmus waveform is empty".to_string()));
        }

        let mut starts = self.scan_effort_starts(pmus);
        let mut finishes = self.scan_effort_finishes(pmus);

        // Pairing convention: breaths begin with inspiration, so finish
        // candidates before the first start belong to a cut-off effort.
        if let Some(&first_start) = starts.first() {
            while finishes.first().map_or(false, |&f| f < first_start) {
                let dropped = finishes.remove(0);
                log::debug!(
                    "Dropped leading effort finish at {} before the first start at {}",
                    dropped,
                    first_start
                );
            }
        }

        let paired = starts.len().min(finishes.len());
        starts.truncate(paired);
        finishes.truncate(paired);

        let mut efforts = Vec::with_capacity(paired);
        let mut discarded = 0usize;
        for (&start, &finish) in starts.iter().zip(finishes.iter()) {
            if start >= finish {
                return Err(PvaError::InvalidInput(format!(
                    "effort marks mis-paired: start {} is not before finish {}",
                    start, finish
                )));
            }

            let (peak, trough) = interval_trough(pmus, start, finish);
            if trough.abs() < self.config.outlier_threshold {
                discarded += 1;
                log::debug!(
                    "Discarded effort [{}, {}): trough magnitude {:.3} below outlier threshold {:.3}",
                    start,
                    finish,
                    trough.abs(),
                    self.config.outlier_threshold
                );
                continue;
            }

            efforts.push(EffortInterval::new(start, peak, finish)?);
        }

        log::info!(
            "Extracted {} effort interval(s) from {} Pmus samples ({} discarded as sub-threshold)",
            efforts.len(),
            pmus.len(),
            discarded
        );

        Ok(efforts)
    }

    /// Run both extractions over one recording.
    pub fn extract(
        &self,
        record: &VentilationRecord,
    ) -> Result<(VentilatorMarks, Vec<EffortInterval>)> {
        let vent = self.extract_ventilator_marks(&record.volume)?;
        let efforts = self.extract_effort_marks(&record.pmus)?;
        Ok((vent, efforts))
    }

    fn scan_effort_starts(&self, pmus: &[f64]) -> Vec<usize> {
        let mut marks = Vec::new();
        let mut last_accepted: Option<usize> = None;

        for i in 0..pmus.len().saturating_sub(DEFLECTION_LOOKAHEAD) {
            let near_baseline = pmus[i].abs() < self.config.start_threshold;
            let deflects = pmus[i + DEFLECTION_LOOKAHEAD].abs() > self.config.finish_threshold;
            if near_baseline && deflects && self.debounced(i, last_accepted) {
                marks.push(i);
                last_accepted = Some(i);
            }
        }

        marks
    }

    fn scan_effort_finishes(&self, pmus: &[f64]) -> Vec<usize> {
        let mut marks = Vec::new();
        let mut last_accepted: Option<usize> = None;

        for i in 0..pmus.len().saturating_sub(DEFLECTION_LOOKAHEAD) {
            let deflected = pmus[i].abs() > self.config.finish_threshold;
            let returns = pmus[i + DEFLECTION_LOOKAHEAD].abs() < self.config.start_threshold;
            if deflected && returns && self.debounced(i, last_accepted) {
                marks.push(i);
                last_accepted = Some(i);
            }
        }

        marks
    }

    fn debounced(&self, i: usize, last_accepted: Option<usize>) -> bool {
        last_accepted.map_or(true, |prev| i - prev > self.config.debounce_window)
    }
}

impl Default for MarkExtractor {
    fn default() -> Self {
        Self {
            config: ExtractorConfig::default(),
        }
    }
}

fn is_odd(sample: f64) -> bool {
    (sample.round() as i64).rem_euclid(2) == 1
}

/// Index and value of the most negative sample in `[start, finish)`.
/// Ties resolve to the earliest index.
fn interval_trough(pmus: &[f64], start: usize, finish: usize) -> (usize, f64) {
    let mut peak = start;
    let mut trough = pmus[start];
    for (offset, &value) in pmus[start..finish].iter().enumerate() {
        if value < trough {
            trough = value;
            peak = start + offset;
        }
    }
    (peak, trough)
}

// =============================================================================
// TESTS
// =============================================================================
