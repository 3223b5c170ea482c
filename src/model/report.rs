//! Report DTOs — everything the pipeline hands back to its caller.
//!
//! All of these are request-scoped and fully derived; nothing here is
//! persisted. Consumers should ignore unknown fields and read missing
//! optional fields as absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::AxisSet;
use crate::gate::GateMode;
use crate::phase::PhaseCode;
use crate::Result;

/// Version stamped on every report.
pub const OUTPUT_CONTRACT_VERSION: &str = "1.0.0";

/// Symmetric flow between two members, keyed `"<idA>_to_<idB>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairFlow {
    pub pair: String,
    #[serde(flatten)]
    pub flows: AxisSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberFlow {
    pub member_id: String,
    pub roles_held: SmallVec<[String; 2]>,
    /// The family snapshot.
    pub incoming_flows: AxisSet,
    /// The member's own axes.
    pub outgoing_flows: AxisSet,
}

/// Family-level baseline: the aggregate snapshot plus its pair and member breakdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub family_axes: AxisSet,
    pub pair_flows: Vec<PairFlow>,
    pub member_flows: Vec<MemberFlow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionMode {
    /// Descriptive only: no history is kept between calls.
    RollingWindow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentPhase {
    pub phase_code: PhaseCode,
    pub phase_label: String,
}

/// Signed offsets from the neutral midpoint, one fractional digit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deltas {
    pub cohesion_delta: f64,
    pub friction_delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFlags {
    pub reversible: bool,
    pub event_prediction_blocked: bool,
    pub repair_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEvolution {
    pub mode: EvolutionMode,
    pub current_phase: CurrentPhase,
    pub deltas: Deltas,
    pub state_flags: StateFlags,
}

/// Audit entry describing why a gate mode was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateLog {
    pub timestamp: DateTime<Utc>,
    pub consent_present: bool,
    pub risk_ack: bool,
    pub phase: PhaseCode,
    pub decision: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub selected_mode: GateMode,
    pub allowed_overlays: Vec<String>,
    pub blocked_overlays: Vec<String>,
    pub log: GateLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub member_count: usize,
    pub pair_count: usize,
    pub axes_in_range: bool,
    pub rules_evaluated: usize,
    pub rules_failed: usize,
}

/// Report sections, in the order they appear in `scope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Baseline,
    TimeEvolution,
    InterventionGate,
    Interpretation,
}

/// The assembled family matrix report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub output_contract_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
    pub baseline: Baseline,
    pub time_evolution: TimeEvolution,
    pub intervention_gate: GateDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<Vec<String>>,
    pub validation: Validation,
    pub scope: Vec<Scope>,
}

impl Report {
    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scope.contains(&scope)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
