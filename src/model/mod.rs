//! # Matrix Model
//!
//! Plain DTOs shared by every pipeline stage: chart bodies, axis sets,
//! members and the assembled report.
//!
//! Design rule: this module is pure data — no I/O, no state, no async.

pub mod body;
pub mod axis;
pub mod member;
pub mod report;

pub use body::{BodyName, AxisInput};
pub use axis::AxisSet;
pub use member::{Member, MemberInput, UserContext};
pub use report::{
    Report, Baseline, PairFlow, MemberFlow, Scope, Validation,
    TimeEvolution, EvolutionMode, CurrentPhase, Deltas, StateFlags,
    GateDecision, GateLog, OUTPUT_CONTRACT_VERSION,
};
