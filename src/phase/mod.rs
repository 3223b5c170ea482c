//! Phase classification — the family's relational state machine.
//!
//! Classification is recomputed from the current family axes on every
//! call; no prior state is kept. `rolling_window` in the output is a
//! label only.
//!
//! ```text
//!   care ≥ 60 ∧ authority < 40  →  cohesive
//!   care < 40 ∧ authority ≥ 60  →  fracture_risk
//!   otherwise                   →  strained
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PhaseStates;
use crate::model::{
    AxisSet, CurrentPhase, Deltas, EvolutionMode, StateFlags, TimeEvolution,
};

pub const HIGH_THRESHOLD: u8 = 60;
pub const LOW_THRESHOLD: u8 = 40;
/// Neutral midpoint the deltas are measured from.
pub const MIDPOINT: f64 = 50.0;

/// Label fragment that marks a phase as needing repair.
pub const REPAIR_LABEL_MARKER: &str = "Fracture";

/// Discrete relational phase. Rules see the code, never the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseCode {
    Cohesive,
    FractureRisk,
    Strained,
}

impl PhaseCode {
    pub const ALL: [PhaseCode; 3] = [PhaseCode::Cohesive, PhaseCode::FractureRisk, PhaseCode::Strained];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseCode::Cohesive => "cohesive",
            PhaseCode::FractureRisk => "fracture_risk",
            PhaseCode::Strained => "strained",
        }
    }
}

impl fmt::Display for PhaseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition function. Total over every `(care, authority)` pair.
pub fn classify(care_flow: u8, authority_flow: u8) -> PhaseCode {
    if care_flow >= HIGH_THRESHOLD && authority_flow < LOW_THRESHOLD {
        PhaseCode::Cohesive
    } else if care_flow < LOW_THRESHOLD && authority_flow >= HIGH_THRESHOLD {
        PhaseCode::FractureRisk
    } else {
        PhaseCode::Strained
    }
}

/// Round to one decimal place, halves away from zero.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn delta(axis: u8) -> f64 {
    round1((f64::from(axis) - MIDPOINT) / 2.0)
}

/// Classify the family snapshot and derive deltas and flags.
///
/// `repair_required` follows the configured display label, not the code:
/// operators can opt a phase in or out by editing its label text.
pub fn evolve(family: &AxisSet, states: &PhaseStates) -> TimeEvolution {
    let code = classify(family.care_flow, family.authority_flow);
    let label = states.label(code).to_string();
    let repair_required = label.contains(REPAIR_LABEL_MARKER);

    tracing::debug!(phase = %code, label = %label, repair_required, "phase classified");

    TimeEvolution {
        mode: EvolutionMode::RollingWindow,
        current_phase: CurrentPhase { phase_code: code, phase_label: label },
        deltas: Deltas {
            cohesion_delta: delta(family.care_flow),
            friction_delta: delta(family.authority_flow),
        },
        state_flags: StateFlags {
            reversible: true,
            event_prediction_blocked: true,
            repair_required,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes(care: u8, authority: u8) -> AxisSet {
        AxisSet { care_flow: care, authority_flow: authority, ..AxisSet::default() }
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(60, 39), PhaseCode::Cohesive);
        assert_eq!(classify(60, 40), PhaseCode::Strained);
        assert_eq!(classify(59, 0), PhaseCode::Strained);
        assert_eq!(classify(39, 60), PhaseCode::FractureRisk);
        assert_eq!(classify(40, 60), PhaseCode::Strained);
        assert_eq!(classify(39, 59), PhaseCode::Strained);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(10.0), 10.0);
        assert_eq!(round1(-15.0), -15.0);
        assert_eq!(round1(2.25), 2.3);
        assert_eq!(round1(-2.25), -2.3);
        assert_eq!(round1(-24.5), -24.5);
    }

    #[test]
    fn test_evolve_cohesive() {
        let t = evolve(&axes(70, 20), &PhaseStates::default());
        assert_eq!(t.current_phase.phase_code, PhaseCode::Cohesive);
        assert_eq!(t.deltas.cohesion_delta, 10.0);
        assert_eq!(t.deltas.friction_delta, -15.0);
        assert!(!t.state_flags.repair_required);
        assert!(t.state_flags.reversible);
        assert!(t.state_flags.event_prediction_blocked);
    }

    #[test]
    fn test_repair_follows_label_text() {
        let t = evolve(&axes(10, 90), &PhaseStates::default());
        assert_eq!(t.current_phase.phase_code, PhaseCode::FractureRisk);
        assert!(t.state_flags.repair_required);

        let relabeled = PhaseStates::default().with_label(PhaseCode::FractureRisk, "fracture watch");
        assert!(!evolve(&axes(10, 90), &relabeled).state_flags.repair_required);

        let strained = PhaseStates::default().with_label(PhaseCode::Strained, "Pre-Fracture strain");
        assert!(evolve(&axes(50, 50), &strained).state_flags.repair_required);
    }

    #[test]
    fn test_odd_axis_delta_keeps_half() {
        let t = evolve(&axes(51, 0), &PhaseStates::default());
        assert_eq!(t.deltas.cohesion_delta, 0.5);
        assert_eq!(t.deltas.friction_delta, -25.0);
    }

    #[test]
    fn test_serializes_snake_case_code() {
        assert_eq!(serde_json::to_string(&PhaseCode::FractureRisk).unwrap(), "\"fracture_risk\"");
    }
}
