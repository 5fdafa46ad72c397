//! Asynchrony taxonomy — metadata registry for the seven detector families

use serde::{Deserialize, Serialize};

use crate::types::AsynchronyType;

/// Number of registered asynchrony classes (reverse trigger counts twice).
pub const REGISTRY_SIZE: usize = 8;

/// Which mark class a flagged sample index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkKind {
    /// The flag points at a ventilator inspiration mark.
    VentilatorInspiration,
    /// The flag points at a patient effort start mark.
    EffortStart,
}

/// Complete metadata for one asynchrony class
/// Note: Only Serialize is derived since static references can't be deserialized
#[derive(Debug, Clone, Serialize)]
pub struct AsynchronyMetadata {
    pub kind: AsynchronyType,
    pub abbreviation: &'static str,
    pub name: &'static str,
    /// Stable ordering position; breaks ties between events flagged at the
    /// same sample index.
    pub position: u8,
    pub marker: MarkKind,
    pub documentation: &'static str,
}

impl AsynchronyMetadata {
    /// Look up a class by abbreviation
    pub fn from_abbrev(abbrev: &str) -> Option<&'static AsynchronyMetadata> {
        ASYNCHRONY_REGISTRY.iter().find(|m| m.abbreviation == abbrev)
    }

    /// Look up a class by its type tag
    pub fn from_kind(kind: AsynchronyType) -> Option<&'static AsynchronyMetadata> {
        ASYNCHRONY_REGISTRY.iter().find(|m| m.kind == kind)
    }

    /// Look up a class by ordering position
    pub fn from_position(pos: u8) -> Option<&'static AsynchronyMetadata> {
        ASYNCHRONY_REGISTRY.iter().find(|m| m.position == pos)
    }
}

// =============================================================================
// CLASS DEFINITIONS
// =============================================================================

/// Double trigger (DT) - Position 0
pub const DT: AsynchronyMetadata = AsynchronyMetadata {
    kind: AsynchronyType::DoubleTrigger,
    abbreviation: "DT",
    name: "Double trigger",
    position: 0,
    marker: MarkKind::VentilatorInspiration,
    documentation: "Ventilator delivers two inspiration cycles within one patient effort window. Over-triggering.",
};

/// Reverse trigger, single cycle (RTs) - Position 1
pub const RTS: AsynchronyMetadata = AsynchronyMetadata {
    kind: AsynchronyType::ReverseTriggerSingle,
    abbreviation: "RTs",
    name: "Reverse trigger (single)",
    position: 1,
    marker: MarkKind::VentilatorInspiration,
    documentation: "Patient effort entrained by a ventilator-initiated breath, with a single mechanical cycle.",
};

/// Reverse trigger, double cycle (RTd) - Position 2
pub const RTD: AsynchronyMetadata = AsynchronyMetadata {
    kind: AsynchronyType::ReverseTriggerDouble,
    abbreviation: "RTd",
    name: "Reverse trigger (double)",
    position: 2,
    marker: MarkKind::VentilatorInspiration,
    documentation: "Patient effort entrained by a ventilator-initiated breath, followed by a second mechanical cycle inside the effort.",
};

/// Late cycling (LC) - Position 3
pub const LC: AsynchronyMetadata = AsynchronyMetadata {
    kind: AsynchronyType::LateCycling,
    abbreviation: "LC",
    name: "Late cycling",
    position: 3,
    marker: MarkKind::VentilatorInspiration,
    documentation: "Ventilator keeps inspiring past the end of the patient effort.",
};

/// Delayed triggering (DTR) - Position 4
pub const DTR: AsynchronyMetadata = AsynchronyMetadata {
    kind: AsynchronyType::DelayedTriggering,
    abbreviation: "DTR",
    name: "Delayed triggering",
    position: 4,
    marker: MarkKind::VentilatorInspiration,
    documentation: "Mechanical inspiration starts well after the patient effort began. Sluggish trigger response.",
};

/// Auto trigger (ATT) - Position 5
pub const ATT: AsynchronyMetadata = AsynchronyMetadata {
    kind: AsynchronyType::AutoTrigger,
    abbreviation: "ATT",
    name: "Auto trigger",
    position: 5,
    marker: MarkKind::VentilatorInspiration,
    documentation: "Ventilator triggers a breath with no corresponding patient effort at all.",
};

/// Early cycling (EC) - Position 6
pub const EC: AsynchronyMetadata = AsynchronyMetadata {
    kind: AsynchronyType::EarlyCycling,
    abbreviation: "EC",
    name: "Early cycling",
    position: 6,
    marker: MarkKind::EffortStart,
    documentation: "Ventilator ends inspiration before the patient effort has even peaked.",
};

/// Ineffective effort (IEE) - Position 7
pub const IEE: AsynchronyMetadata = AsynchronyMetadata {
    kind: AsynchronyType::IneffectiveEffort,
    abbreviation: "IEE",
    name: "Ineffective effort",
    position: 7,
    marker: MarkKind::EffortStart,
    documentation: "Patient effort produces no ventilator response at all.",
};

/// All classes in detector-table order
pub const ASYNCHRONY_REGISTRY: &[AsynchronyMetadata] =
    &[DT, RTS, RTD, LC, DTR, ATT, EC, IEE];

/// Class abbreviations in detector-table order
pub const ASYNCHRONY_ORDER: &[&str] = &["DT", "RTs", "RTd", "LC", "DTR", "ATT", "EC", "IEE"];

/// Ordering position of a type tag; unknown tags sort last.
pub fn position_of(kind: AsynchronyType) -> u8 {
    AsynchronyMetadata::from_kind(kind)
        .map(|m| m.position)
        .unwrap_or(u8::MAX)
}

// =============================================================================
// TESTS
// =============================================================================
