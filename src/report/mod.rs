//! Report assembly and the forbidden-vocabulary audit.
//!
//! The audit runs over the serialized report, independent of how each
//! section was produced, so new fields are covered automatically. A hit is
//! an observability signal only; the report is still returned.

use crate::matrix::FamilyAggregate;
use crate::model::{
    Baseline, GateDecision, Member, Report, Scope, TimeEvolution, Validation,
    OUTPUT_CONTRACT_VERSION,
};
use crate::rules::InterpretationOutcome;
use crate::Result;

/// Terms that must never appear as object keys in a report.
pub const FORBIDDEN_TERMS: [&str; 8] = [
    "divorce",
    "advice",
    "diagnosis",
    "custody",
    "abuse",
    "blame",
    "prognosis",
    "verdict",
];

/// Sections always present.
const BASE_SCOPE: [Scope; 3] = [Scope::Baseline, Scope::TimeEvolution, Scope::InterventionGate];

/// Build the final report from stage outputs.
pub fn assemble(
    family_id: Option<&str>,
    members: &[Member],
    aggregate: FamilyAggregate,
    time_evolution: TimeEvolution,
    intervention_gate: GateDecision,
    interpretation: InterpretationOutcome,
) -> Report {
    let validation = Validation {
        member_count: members.len(),
        pair_count: aggregate.pair_flows.len(),
        axes_in_range: aggregate.axes_in_range(),
        rules_evaluated: interpretation.evaluated(),
        rules_failed: interpretation.failed(),
    };

    let interpretation = interpretation.into_templates();
    let mut scope = BASE_SCOPE.to_vec();
    if interpretation.is_some() {
        scope.push(Scope::Interpretation);
    }

    Report {
        output_contract_version: OUTPUT_CONTRACT_VERSION.to_string(),
        family_id: family_id.map(str::to_string),
        baseline: Baseline {
            family_axes: aggregate.family_axes,
            pair_flows: aggregate.pair_flows,
            member_flows: aggregate.member_flows,
        },
        time_evolution,
        intervention_gate,
        interpretation,
        validation,
        scope,
    }
}

/// Result of auditing one report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFindings {
    /// Forbidden terms found as keys, in [`FORBIDDEN_TERMS`] order.
    pub flagged_terms: Vec<&'static str>,
}

impl AuditFindings {
    pub fn is_clean(&self) -> bool {
        self.flagged_terms.is_empty()
    }
}

/// Forbidden terms present as quoted object keys in `json`, case-insensitively.
pub fn scan_forbidden_keys(json: &str) -> Vec<&'static str> {
    let lowered = json.to_lowercase();
    FORBIDDEN_TERMS
        .iter()
        .copied()
        .filter(|term| lowered.contains(&format!("\"{term}\":")))
        .collect()
}

/// Serialize `report` and check it for forbidden keys. Logs a warning on a hit.
pub fn audit_report(report: &Report) -> Result<AuditFindings> {
    let json = serde_json::to_string(report)?;
    let flagged_terms = scan_forbidden_keys(&json);
    if !flagged_terms.is_empty() {
        tracing::warn!(
            terms = ?flagged_terms,
            family_id = report.family_id.as_deref().unwrap_or(""),
            "forbidden vocabulary present in report output"
        );
    }
    Ok(AuditFindings { flagged_terms })
}
