//! Intervention gate — which overlays a caller may receive.
//!
//! Mode priority:
//!
//! 1. no explicit consent                          → `diagnostic_only`
//! 2. fracture phase with acknowledged risk        → `safety_escalation`
//! 3. anything else                                → `user_requested_support`
//!
//! Overlay lists come from the `intervention-gate-modes` document. The
//! returned log entry is data for the caller; nothing is persisted here.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GateModes;
use crate::model::{GateDecision, GateLog, TimeEvolution, UserContext};

/// Phase-code fragment that makes a phase eligible for escalation.
pub const FRACTURE_MARKER: &str = "fracture";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    DiagnosticOnly,
    SafetyEscalation,
    UserRequestedSupport,
}

impl GateMode {
    pub const ALL: [GateMode; 3] = [
        GateMode::DiagnosticOnly,
        GateMode::SafetyEscalation,
        GateMode::UserRequestedSupport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GateMode::DiagnosticOnly => "diagnostic_only",
            GateMode::SafetyEscalation => "safety_escalation",
            GateMode::UserRequestedSupport => "user_requested_support",
        }
    }
}

impl fmt::Display for GateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the gate mode for a phase code.
pub fn select_mode(ctx: &UserContext, phase_code: &str) -> GateMode {
    if !ctx.consent_present() {
        GateMode::DiagnosticOnly
    } else if phase_code.contains(FRACTURE_MARKER) && ctx.risk_acknowledged() {
        GateMode::SafetyEscalation
    } else {
        GateMode::UserRequestedSupport
    }
}

fn decision_text(mode: GateMode, phase_code: &str) -> String {
    match mode {
        GateMode::DiagnosticOnly => {
            "explicit consent absent: diagnostic output only".to_string()
        }
        GateMode::SafetyEscalation => {
            format!("consent and risk acknowledgement present in phase '{phase_code}': safety escalation")
        }
        GateMode::UserRequestedSupport => {
            format!("consent present in phase '{phase_code}': user-requested support")
        }
    }
}

/// Run the gate for the current phase.
pub fn evaluate(
    time: &TimeEvolution,
    ctx: &UserContext,
    modes: &GateModes,
    now: DateTime<Utc>,
) -> GateDecision {
    let phase = time.current_phase.phase_code;
    let mode = select_mode(ctx, phase.as_str());
    let overlays = modes.overlays(mode);
    let decision = decision_text(mode, phase.as_str());

    tracing::info!(
        mode = %mode,
        phase = %phase,
        consent_present = ctx.consent_present(),
        risk_ack = ctx.risk_acknowledged(),
        "intervention gate decided"
    );

    GateDecision {
        selected_mode: mode,
        allowed_overlays: overlays.allow_overlays.clone(),
        blocked_overlays: overlays.forbid_overlays.clone(),
        log: GateLog {
            timestamp: now,
            consent_present: ctx.consent_present(),
            risk_ack: ctx.risk_acknowledged(),
            phase,
            decision,
        },
    }
}
