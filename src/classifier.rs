//! Asynchrony classification — seven detectors over event-mark sequences
//!
//! Each detector compares the ventilator mark sequence against the patient
//! effort intervals under a tolerance window and flags the sample indices
//! where one asynchrony pattern holds. Detectors are pure functions over
//! immutable inputs and are independently invocable; `classify` runs the
//! whole battery and merges the flags into one ordered event list.

use crate::error::{PvaError, Result};
use crate::taxonomy;
use crate::types::{
    validate_efforts, AsynchronyEvent, AsynchronyType, ClassifierConfig, EffortInterval,
    VentilatorMarks,
};

/// Detector battery for patient-ventilator asynchronies.
///
/// Timing conventions shared by all detectors:
/// - The tolerance subtracts from effort starts only, never from finishes:
///   triggering may anticipate an effort, cycling may not.
/// - Windows that need a bound after the last effort use the synthetic
///   bound `last expiration + 1` instead of reading past the recording.
/// - A matched breath/effort pair yields at most one flag per detector.
pub struct AsynchronyClassifier {
    config: ClassifierConfig,
}

impl AsynchronyClassifier {
    /// Create a classifier with the given tolerance configuration.
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Validate the shared detector precondition.
    ///
    /// Marks must satisfy their ordering invariants, efforts must be
    /// ordered and non-overlapping, and both sides must be non-empty.
    /// Detectors fail fast here rather than scanning garbage.
    fn check_inputs(&self, marks: &VentilatorMarks, efforts: &[EffortInterval]) -> Result<()> {
        marks.validate()?;
        validate_efforts(efforts)?;
        if marks.cycle_count() == 0 && marks.trailing_inspiration.is_none() {
            return Err(PvaError::InvalidInput(
                "no ventilator breath marks to classify against".to_string(),
            ));
        }
        if efforts.is_empty() {
            return Err(PvaError::InvalidInput(
                "no patient effort intervals to classify".to_string(),
            ));
        }
        Ok(())
    }

    /// Detect double triggering: two mechanical inspirations delivered
    /// within one patient effort window.
    ///
    /// Breath `j` is flagged when its inspiration falls in
    /// `[start - tolerance, finish)`, the previous breath already cycled
    /// off before the effort started, and the next inspiration (the
    /// trailing mark counts) arrives before the effort finishes.
    ///
    /// # Returns
    /// Flagged inspiration marks, ascending and deduplicated.
    pub fn detect_double_trigger(
        &self,
        marks: &VentilatorMarks,
        efforts: &[EffortInterval],
    ) -> Result<Vec<usize>> {
        self.check_inputs(marks, efforts)?;

        let mut flags = Vec::new();
        for effort in efforts {
            let window_low = effort.start.saturating_sub(self.config.tolerance);
            for j in 1..marks.cycle_count() {
                let cycle = &marks.cycles[j];
                let next_inspiration = if j + 1 < marks.cycle_count() {
                    Some(marks.cycles[j + 1].inspiration)
                } else {
                    marks.trailing_inspiration
                };
                // No second trigger to pair with at the recording edge
                let Some(next_inspiration) = next_inspiration else {
                    continue;
                };

                if cycle.inspiration >= window_low
                    && cycle.inspiration < effort.finish
                    && marks.cycles[j - 1].expiration < effort.start
                    && next_inspiration < effort.finish
                {
                    flags.push(cycle.inspiration);
                }
            }
        }

        Ok(finalize(flags))
    }

    /// Detect reverse triggering: a patient effort entrained by, rather
    /// than driving, a ventilator-initiated breath.
    ///
    /// Breath `j` matches when its inspiration precedes
    /// `start - tolerance` while its expiration lands after the effort
    /// start. The match is double when the next inspiration still falls
    /// inside the effort, single otherwise. A match on the last complete
    /// cycle classifies single and stops scanning the effort; a trailing
    /// inspiration before `start - tolerance` with no expiration to pair
    /// against also classifies single.
    ///
    /// # Returns
    /// `(single, double)` flagged inspiration marks.
    pub fn detect_reverse_trigger(
        &self,
        marks: &VentilatorMarks,
        efforts: &[EffortInterval],
    ) -> Result<(Vec<usize>, Vec<usize>)> {
        self.check_inputs(marks, efforts)?;

        let mut single = Vec::new();
        let mut double = Vec::new();
        for effort in efforts {
            let window_low = effort.start.saturating_sub(self.config.tolerance);
            let mut stopped = false;

            for j in 0..marks.cycle_count() {
                let cycle = &marks.cycles[j];
                if cycle.inspiration < window_low && cycle.expiration > effort.start {
                    if j + 1 == marks.cycle_count() {
                        single.push(cycle.inspiration);
                        stopped = true;
                        break;
                    }
                    if marks.cycles[j + 1].inspiration < effort.finish {
                        double.push(cycle.inspiration);
                    } else {
                        single.push(cycle.inspiration);
                    }
                }
            }

            if !stopped {
                if let Some(trailing) = marks.trailing_inspiration {
                    if trailing < window_low {
                        single.push(trailing);
                    }
                }
            }
        }

        Ok((finalize(single), finalize(double)))
    }

    /// Detect late cycling: the ventilator keeps inspiring past the end
    /// of the patient effort.
    ///
    /// Breath `j` is flagged when its expiration falls in
    /// `[finish, next effort start]` while its inspiration sits inside
    /// `[start - tolerance, finish]`. The final effort uses the synthetic
    /// bound `last expiration + 1` as its next start.
    pub fn detect_late_cycling(
        &self,
        marks: &VentilatorMarks,
        efforts: &[EffortInterval],
    ) -> Result<Vec<usize>> {
        self.check_inputs(marks, efforts)?;

        let mut flags = Vec::new();
        for (i, effort) in efforts.iter().enumerate() {
            let Some(next_start) = self.next_effort_start(marks, efforts, i) else {
                break;
            };
            let window_low = effort.start.saturating_sub(self.config.tolerance);

            for cycle in &marks.cycles {
                if cycle.expiration >= effort.finish
                    && cycle.expiration <= next_start
                    && cycle.inspiration <= effort.finish
                    && cycle.inspiration >= window_low
                {
                    flags.push(cycle.inspiration);
                }
            }
        }

        Ok(finalize(flags))
    }

    /// Detect delayed triggering: a sluggish trigger response landing more
    /// than the configured delay after the effort start but still inside
    /// the effort. The trailing inspiration mark participates.
    pub fn detect_delayed_triggering(
        &self,
        marks: &VentilatorMarks,
        efforts: &[EffortInterval],
    ) -> Result<Vec<usize>> {
        self.check_inputs(marks, efforts)?;

        let mut flags = Vec::new();
        for effort in efforts {
            let threshold = effort.start + self.config.trigger_delay;
            for inspiration in marks.inspiration_marks() {
                if inspiration > threshold && inspiration < effort.finish {
                    flags.push(inspiration);
                }
            }
        }

        Ok(finalize(flags))
    }

    /// Detect auto triggering: a complete ventilator breath delivered
    /// strictly between one effort's finish and the next effort's start,
    /// with no patient effort behind it.
    ///
    /// A trailing inspiration inside the window never qualifies: without
    /// its expiration the breath cannot be confirmed to fit the gap.
    pub fn detect_auto_trigger(
        &self,
        marks: &VentilatorMarks,
        efforts: &[EffortInterval],
    ) -> Result<Vec<usize>> {
        self.check_inputs(marks, efforts)?;

        let mut flags = Vec::new();
        for (i, effort) in efforts.iter().enumerate() {
            let Some(next_start) = self.next_effort_start(marks, efforts, i) else {
                break;
            };

            for cycle in &marks.cycles {
                if cycle.inspiration > effort.finish
                    && cycle.inspiration < next_start
                    && cycle.expiration > effort.finish
                    && cycle.expiration < next_start
                {
                    flags.push(cycle.inspiration);
                }
            }
        }

        Ok(finalize(flags))
    }

    /// Detect early cycling: the ventilator ends inspiration before the
    /// patient effort has peaked. Flags the effort start.
    pub fn detect_early_cycling(
        &self,
        marks: &VentilatorMarks,
        efforts: &[EffortInterval],
    ) -> Result<Vec<usize>> {
        self.check_inputs(marks, efforts)?;

        let mut flags = Vec::new();
        for effort in efforts {
            let cycled_early = marks.cycles.iter().any(|cycle| {
                cycle.expiration >= effort.start
                    && cycle.expiration <= effort.peak
                    && cycle.inspiration >= effort.start
                    && cycle.inspiration <= effort.peak
            });
            if cycled_early {
                flags.push(effort.start);
            }
        }

        Ok(finalize(flags))
    }

    /// Detect ineffective efforts: a patient effort that produced no
    /// ventilator response at all. Flags the effort start.
    ///
    /// An effort is flagged when no ventilator mark falls strictly inside
    /// `(start, finish)` and no breath overlaps the trigger-anticipation
    /// window: an inspiration in `[start - tolerance, start]` whose
    /// expiration lands after the start, or a trailing inspiration in that
    /// window. A breath triggered well before the window belongs to the
    /// reverse-trigger family instead and does not mask the effort.
    pub fn detect_ineffective_effort(
        &self,
        marks: &VentilatorMarks,
        efforts: &[EffortInterval],
    ) -> Result<Vec<usize>> {
        self.check_inputs(marks, efforts)?;

        let mut flags = Vec::new();
        for effort in efforts {
            let window_low = effort.start.saturating_sub(self.config.tolerance);

            let anticipated = marks.cycles.iter().any(|cycle| {
                cycle.inspiration >= window_low
                    && cycle.inspiration <= effort.start
                    && cycle.expiration > effort.start
            }) || marks
                .trailing_inspiration
                .map_or(false, |t| t >= window_low && t <= effort.start);
            if anticipated {
                continue;
            }

            let strictly_inside = |mark: usize| mark > effort.start && mark < effort.finish;
            let responded = marks
                .cycles
                .iter()
                .any(|cycle| strictly_inside(cycle.inspiration) || strictly_inside(cycle.expiration))
                || marks.trailing_inspiration.map_or(false, strictly_inside);

            if !responded {
                flags.push(effort.start);
            }
        }

        Ok(finalize(flags))
    }

    /// Run every detector and merge the flags into one event list.
    ///
    /// # Arguments
    /// * `marks` - Ventilator transition marks for the analysis window
    /// * `efforts` - Patient effort intervals for the same window
    ///
    /// # Returns
    /// Events sorted by sample index, ties broken by taxonomy position.
    /// An empty list is a valid result; malformed input is an error.
    pub fn classify(
        &self,
        marks: &VentilatorMarks,
        efforts: &[EffortInterval],
    ) -> Result<Vec<AsynchronyEvent>> {
        self.check_inputs(marks, efforts)?;

        let mut events = Vec::new();
        push_events(
            &mut events,
            AsynchronyType::DoubleTrigger,
            self.detect_double_trigger(marks, efforts)?,
        );
        let (single, double) = self.detect_reverse_trigger(marks, efforts)?;
        push_events(&mut events, AsynchronyType::ReverseTriggerSingle, single);
        push_events(&mut events, AsynchronyType::ReverseTriggerDouble, double);
        push_events(
            &mut events,
            AsynchronyType::LateCycling,
            self.detect_late_cycling(marks, efforts)?,
        );
        push_events(
            &mut events,
            AsynchronyType::DelayedTriggering,
            self.detect_delayed_triggering(marks, efforts)?,
        );
        push_events(
            &mut events,
            AsynchronyType::AutoTrigger,
            self.detect_auto_trigger(marks, efforts)?,
        );
        push_events(
            &mut events,
            AsynchronyType::EarlyCycling,
            self.detect_early_cycling(marks, efforts)?,
        );
        push_events(
            &mut events,
            AsynchronyType::IneffectiveEffort,
            self.detect_ineffective_effort(marks, efforts)?,
        );

        events.sort_by_key(|event| (event.sample_index, taxonomy::position_of(event.kind)));

        log::info!(
            "Classified {} asynchrony event(s) across {} breath(s) and {} effort(s)",
            events.len(),
            marks.cycle_count(),
            efforts.len()
        );

        Ok(events)
    }

    /// Upper window bound after effort `i`: the next effort's start, or the
    /// synthetic bound one past the last expiration for the final effort.
    /// `None` when no expiration mark exists to anchor the synthetic bound.
    fn next_effort_start(
        &self,
        marks: &VentilatorMarks,
        efforts: &[EffortInterval],
        i: usize,
    ) -> Option<usize> {
        match efforts.get(i + 1) {
            Some(next) => Some(next.start),
            None => marks.last_expiration().map(|last| last + 1),
        }
    }
}

impl Default for AsynchronyClassifier {
    fn default() -> Self {
        Self {
            config: ClassifierConfig::default(),
        }
    }
}

fn push_events(events: &mut Vec<AsynchronyEvent>, kind: AsynchronyType, indices: Vec<usize>) {
    events.extend(
        indices
            .into_iter()
            .map(|sample_index| AsynchronyEvent { kind, sample_index }),
    );
}

/// Detector outputs are ascending with no duplicate flags.
fn finalize(mut flags: Vec<usize>) -> Vec<usize> {
    flags.sort_unstable();
    flags.dedup();
    flags
}

// =============================================================================
// TESTS
// =============================================================================
