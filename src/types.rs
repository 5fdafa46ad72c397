use serde::{Deserialize, Serialize};

use crate::error::{PvaError, Result};

/// Default matching tolerance in samples at 100 Hz.
pub const DEFAULT_TOLERANCE: usize = 10;

/// Default delayed-triggering threshold in samples at 100 Hz.
pub const DEFAULT_TRIGGER_DELAY: usize = 20;

/// Default minimum spacing between accepted effort marks, in samples.
pub const DEFAULT_DEBOUNCE_WINDOW: usize = 50;

/// Default near-baseline magnitude for the Pmus signal, in cmH2O.
pub const DEFAULT_START_THRESHOLD: f64 = 0.1;

/// Default deflected magnitude for the Pmus signal, in cmH2O.
pub const DEFAULT_FINISH_THRESHOLD: f64 = 0.2;

/// Default minimum trough magnitude for a real effort, in cmH2O.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 1.5;

/// One ventilator breath: paired inspiration/expiration transition marks.
///
/// The pairing is explicit rather than positional (two parallel arrays
/// sharing an index), so a cycle can never refer to marks from different
/// breaths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreathCycle {
    /// Sample index where mechanical inspiration starts.
    pub inspiration: usize,
    /// Sample index where the ventilator cycles to expiration.
    pub expiration: usize,
}

/// Ventilator transition marks for one analysis window.
///
/// Cycles are strictly increasing and non-overlapping. A recording cut
/// mid-breath leaves a final inspiration with no expiration yet; that mark
/// is carried as `trailing_inspiration` instead of an unpaired array slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VentilatorMarks {
    pub cycles: Vec<BreathCycle>,
    pub trailing_inspiration: Option<usize>,
}

impl VentilatorMarks {
    /// Build marks from two equal-length, index-aligned mark sequences.
    ///
    /// # Arguments
    /// * `ins_marks` - Inspiration-start sample indices, ascending
    /// * `exp_marks` - Expiration-start sample indices, ascending
    ///
    /// # Returns
    /// Validated marks, or `InvalidInput` on length mismatch or ordering
    /// violations.
    pub fn from_sequences(ins_marks: &[usize], exp_marks: &[usize]) -> Result<Self> {
        if ins_marks.len() != exp_marks.len() {
            return Err(PvaError::InvalidInput(format!(
                "inspiration/expiration mark counts differ: {} vs {}",
                ins_marks.len(),
                exp_marks.len()
            )));
        }

        let cycles = ins_marks
            .iter()
            .zip(exp_marks.iter())
            .map(|(&inspiration, &expiration)| BreathCycle {
                inspiration,
                expiration,
            })
            .collect();

        let marks = Self {
            cycles,
            trailing_inspiration: None,
        };
        marks.validate()?;
        Ok(marks)
    }

    /// Attach an inspiration mark that follows the last complete cycle.
    pub fn with_trailing_inspiration(mut self, index: usize) -> Result<Self> {
        self.trailing_inspiration = Some(index);
        self.validate()?;
        Ok(self)
    }

    /// Re-check all ordering invariants.
    pub fn validate(&self) -> Result<()> {
        let mut prev_expiration: Option<usize> = None;
        for (j, cycle) in self.cycles.iter().enumerate() {
            if cycle.inspiration >= cycle.expiration {
                return Err(PvaError::InvalidInput(format!(
                    "breath cycle {} has inspiration mark {} at or after expiration mark {}",
                    j, cycle.inspiration, cycle.expiration
                )));
            }
            if let Some(end) = prev_expiration {
                if cycle.inspiration <= end {
                    return Err(PvaError::InvalidInput(format!(
                        "breath cycle {} starts at {} but the previous cycle ends at {}",
                        j, cycle.inspiration, end
                    )));
                }
            }
            prev_expiration = Some(cycle.expiration);
        }

        if let (Some(trailing), Some(last)) = (self.trailing_inspiration, self.cycles.last()) {
            if trailing <= last.expiration {
                return Err(PvaError::InvalidInput(format!(
                    "trailing inspiration at {} does not follow the last expiration at {}",
                    trailing, last.expiration
                )));
            }
        }

        Ok(())
    }

    /// Number of complete breath cycles.
    pub fn cycle_count(&self) -> usize {
        self.cycles.len()
    }

    /// All inspiration marks in order, the trailing one included.
    pub fn inspiration_marks(&self) -> impl Iterator<Item = usize> + '_ {
        self.cycles
            .iter()
            .map(|c| c.inspiration)
            .chain(self.trailing_inspiration)
    }

    /// Sample index of the last expiration mark, if any cycle is complete.
    pub fn last_expiration(&self) -> Option<usize> {
        self.cycles.last().map(|c| c.expiration)
    }
}

/// One detected patient respiratory effort on the Pmus waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffortInterval {
    /// Sample index where the effort leaves baseline.
    pub start: usize,
    /// Sample index of the most negative Pmus value within the effort.
    pub peak: usize,
    /// Sample index where the effort returns toward baseline.
    pub finish: usize,
}

impl EffortInterval {
    pub fn new(start: usize, peak: usize, finish: usize) -> Result<Self> {
        let interval = Self {
            start,
            peak,
            finish,
        };
        interval.validate()?;
        Ok(interval)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start >= self.peak || self.peak >= self.finish {
            return Err(PvaError::InvalidInput(format!(
                "effort interval must satisfy start < peak < finish, got {} / {} / {}",
                self.start, self.peak, self.finish
            )));
        }
        Ok(())
    }
}

/// Check that effort intervals are individually valid, ordered by start,
/// and non-overlapping.
pub fn validate_efforts(efforts: &[EffortInterval]) -> Result<()> {
    let mut prev_finish: Option<usize> = None;
    for (i, effort) in efforts.iter().enumerate() {
        effort.validate()?;
        if let Some(end) = prev_finish {
            if effort.start < end {
                return Err(PvaError::InvalidInput(format!(
                    "effort interval {} starting at {} overlaps the previous interval ending at {}",
                    i, effort.start, end
                )));
            }
        }
        prev_finish = Some(effort.finish);
    }
    Ok(())
}

/// The seven patient-ventilator asynchrony classes, reverse trigger split
/// into its single- and double-cycle forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsynchronyType {
    DoubleTrigger,
    ReverseTriggerSingle,
    ReverseTriggerDouble,
    LateCycling,
    DelayedTriggering,
    AutoTrigger,
    EarlyCycling,
    IneffectiveEffort,
}

/// One classified asynchrony occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsynchronyEvent {
    pub kind: AsynchronyType,
    /// Where the event was flagged: a ventilator inspiration mark or a
    /// patient effort start, depending on the kind (see the taxonomy).
    pub sample_index: usize,
}

impl AsynchronyEvent {
    /// Map the flagged sample index onto the recording time axis.
    pub fn time_seconds(&self, sample_rate: f64) -> f64 {
        self.sample_index as f64 / sample_rate
    }
}

/// Tolerance configuration for the asynchrony detectors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Matching tolerance in samples. Subtracted from effort starts only:
    /// triggering may anticipate an effort, cycling may not.
    pub tolerance: usize,
    /// Samples after the effort start beyond which a trigger counts as
    /// delayed.
    pub trigger_delay: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            trigger_delay: DEFAULT_TRIGGER_DELAY,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tolerance == 0 {
            return Err(PvaError::Configuration(
                "tolerance must be greater than 0 samples".to_string(),
            ));
        }
        if self.trigger_delay == 0 {
            return Err(PvaError::Configuration(
                "trigger delay must be greater than 0 samples".to_string(),
            ));
        }
        Ok(())
    }
}

/// Threshold configuration for the mark extractor.
///
/// The defaults are tuned to one acquisition device at 100 Hz; other
/// hardware or sample rates need their own values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Minimum spacing in samples between two accepted start marks (and
    /// between two accepted finish marks).
    pub debounce_window: usize,
    /// Pmus magnitude below which a sample counts as baseline.
    pub start_threshold: f64,
    /// Pmus magnitude above which a sample counts as deflected.
    pub finish_threshold: f64,
    /// Minimum trough magnitude for an interval to count as a real effort.
    pub outlier_threshold: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            start_threshold: DEFAULT_START_THRESHOLD,
            finish_threshold: DEFAULT_FINISH_THRESHOLD,
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.debounce_window == 0 {
            return Err(PvaError::Configuration(
                "debounce window must be greater than 0 samples".to_string(),
            ));
        }
        if self.start_threshold <= 0.0 {
            return Err(PvaError::Configuration(format!(
                "start threshold must be positive, got {}",
                self.start_threshold
            )));
        }
        if self.finish_threshold <= 0.0 {
            return Err(PvaError::Configuration(format!(
                "finish threshold must be positive, got {}",
                self.finish_threshold
            )));
        }
        if self.start_threshold >= self.finish_threshold {
            return Err(PvaError::Configuration(format!(
                "start threshold ({}) must stay below finish threshold ({})",
                self.start_threshold, self.finish_threshold
            )));
        }
        if self.outlier_threshold <= 0.0 {
            return Err(PvaError::Configuration(format!(
                "outlier threshold must be positive, got {}",
                self.outlier_threshold
            )));
        }
        Ok(())
    }
}

/// One event as reported to presentation layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportedEvent {
    pub kind: AsynchronyType,
    pub abbreviation: String,
    pub sample_index: usize,
    pub time_s: f64,
}

/// Analysis result envelope for one recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: String,
    pub file_path: String,
    pub sample_rate: f64,
    pub tolerance: usize,
    pub breath_count: usize,
    pub effort_count: usize,
    pub event_count: usize,
    pub events: Vec<ReportedEvent>,
    pub created_at: String,
}

impl AnalysisResult {
    pub fn new(
        file_path: String,
        sample_rate: f64,
        tolerance: usize,
        breath_count: usize,
        effort_count: usize,
        events: &[AsynchronyEvent],
    ) -> Self {
        let events: Vec<ReportedEvent> = events
            .iter()
            .map(|event| ReportedEvent {
                kind: event.kind,
                abbreviation: crate::taxonomy::AsynchronyMetadata::from_kind(event.kind)
                    .map(|m| m.abbreviation.to_string())
                    .unwrap_or_default(),
                sample_index: event.sample_index,
                time_s: event.time_seconds(sample_rate),
            })
            .collect();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path,
            sample_rate,
            tolerance,
            breath_count,
            effort_count,
            event_count: events.len(),
            events,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sequences_valid() {
        let marks = VentilatorMarks::from_sequences(&[5, 40], &[20, 55]).unwrap();
        assert_eq!(marks.cycle_count(), 2);
        assert_eq!(
            marks.cycles[0],
            BreathCycle {
                inspiration: 5,
                expiration: 20
            }
        );
        assert!(marks.trailing_inspiration.is_none());
    }

    #[test]
    fn test_from_sequences_length_mismatch() {
        let result = VentilatorMarks::from_sequences(&[5, 40, 70], &[20, 55]);
        assert!(matches!(result, Err(PvaError::InvalidInput(_))));
    }

    #[test]
    fn test_from_sequences_inverted_pair() {
        // First expiration precedes the first inspiration
        let result = VentilatorMarks::from_sequences(&[20], &[5]);
        assert!(matches!(result, Err(PvaError::InvalidInput(_))));
    }

    #[test]
    fn test_from_sequences_overlapping_cycles() {
        let result = VentilatorMarks::from_sequences(&[5, 15], &[20, 35]);
        assert!(matches!(result, Err(PvaError::InvalidInput(_))));
    }

    #[test]
    fn test_trailing_inspiration_valid() {
        let marks = VentilatorMarks::from_sequences(&[5], &[20])
            .unwrap()
            .with_trailing_inspiration(30)
            .unwrap();
        assert_eq!(marks.trailing_inspiration, Some(30));
        let inspirations: Vec<usize> = marks.inspiration_marks().collect();
        assert_eq!(inspirations, vec![5, 30]);
    }

    #[test]
    fn test_trailing_inspiration_before_last_expiration() {
        let result = VentilatorMarks::from_sequences(&[5], &[20])
            .unwrap()
            .with_trailing_inspiration(15);
        assert!(matches!(result, Err(PvaError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_marks_are_valid() {
        let marks = VentilatorMarks::from_sequences(&[], &[]).unwrap();
        assert_eq!(marks.cycle_count(), 0);
        assert!(marks.last_expiration().is_none());
    }

    #[test]
    fn test_effort_interval_ordering() {
        assert!(EffortInterval::new(10, 14, 18).is_ok());
        assert!(EffortInterval::new(10, 10, 18).is_err());
        assert!(EffortInterval::new(10, 18, 18).is_err());
        assert!(EffortInterval::new(18, 14, 10).is_err());
    }

    #[test]
    fn test_validate_efforts_overlap() {
        let efforts = vec![
            EffortInterval::new(10, 14, 18).unwrap(),
            EffortInterval::new(16, 20, 25).unwrap(),
        ];
        assert!(matches!(
            validate_efforts(&efforts),
            Err(PvaError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_efforts_back_to_back() {
        // next.start == previous.finish is allowed: intervals are half-open
        let efforts = vec![
            EffortInterval::new(10, 14, 18).unwrap(),
            EffortInterval::new(18, 22, 30).unwrap(),
        ];
        assert!(validate_efforts(&efforts).is_ok());
    }

    #[test]
    fn test_classifier_config_defaults() {
        let config = ClassifierConfig::default();
        assert_eq!(config.tolerance, 10);
        assert_eq!(config.trigger_delay, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_classifier_config_rejects_zero() {
        let config = ClassifierConfig {
            tolerance: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PvaError::Configuration(_))
        ));
    }

    #[test]
    fn test_extractor_config_defaults() {
        let config = ExtractorConfig::default();
        assert_eq!(config.debounce_window, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_extractor_config_rejects_bad_thresholds() {
        let negative = ExtractorConfig {
            start_threshold: -0.1,
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let inverted = ExtractorConfig {
            start_threshold: 0.3,
            finish_threshold: 0.2,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_event_time_mapping() {
        let event = AsynchronyEvent {
            kind: AsynchronyType::AutoTrigger,
            sample_index: 300,
        };
        assert!((event.time_seconds(100.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_asynchrony_type_snake_case() {
        let json = serde_json::to_string(&AsynchronyType::DoubleTrigger).unwrap();
        assert_eq!(json, "\"double_trigger\"");
        let json = serde_json::to_string(&AsynchronyType::IneffectiveEffort).unwrap();
        assert_eq!(json, "\"ineffective_effort\"");
    }

    #[test]
    fn test_analysis_result_envelope() {
        let events = vec![AsynchronyEvent {
            kind: AsynchronyType::AutoTrigger,
            sample_index: 300,
        }];
        let result =
            AnalysisResult::new("rec.csv".to_string(), 100.0, 10, 3, 3, &events);
        assert_eq!(result.event_count, 1);
        assert_eq!(result.events[0].abbreviation, "ATT");
        assert!((result.events[0].time_s - 3.0).abs() < 1e-12);
        assert!(!result.id.is_empty());
        assert!(!result.created_at.is_empty());
    }
}
