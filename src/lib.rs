//! # family-matrix — Family Relational Dynamics Matrix
//!
//! Turns per-member chart longitudes into a family-level relational report.
//!
//! ## Design Principles
//!
//! 1. **Pure pipeline**: every stage is a synchronous function of the previous stage's output
//! 2. **Config up front**: documents are loaded and validated once, then shared read-only
//! 3. **Sandboxed rules**: conditions are parsed by a whitelisted grammar, never executed as code
//! 4. **Observability, not blocking**: rule failures and audit hits are logged, not raised
//!
//! ## Pipeline
//!
//! ```text
//! chart JSON ─► extract ─► matrix (axes, pairs, family) ─► phase ─► gate
//!                                                            │
//!                                                            └► rules ─► report ─► audit
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use family_matrix::{FamilyMatrix, MemberInput, MemoryConfigStore, UserContext};
//! use serde_json::json;
//!
//! # async fn example(store: MemoryConfigStore) -> family_matrix::Result<()> {
//! let matrix = FamilyMatrix::from_store(&store).await?;
//!
//! let members = vec![
//!     MemberInput::new(json!({"Sun": 15.0, "Moon": 65.0})).with_id("parent"),
//!     MemberInput::new(json!({"planets": {"sun": 25.0, "moon": 75.0}})).with_id("child"),
//! ];
//! let report = matrix.compute(&members, &UserContext::new(true, false), Some("fam-1"))?;
//! println!("{}", report.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod extract;
pub mod matrix;
pub mod phase;
pub mod gate;
pub mod rules;
pub mod config;
pub mod report;

use std::sync::Arc;

use chrono::{DateTime, Utc};

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    AxisInput, AxisSet, BodyName, Member, MemberInput, UserContext,
    Report, Scope, TimeEvolution, GateDecision, PairFlow, MemberFlow,
};
pub use config::{
    ConfigCache, ConfigDocuments, ConfigStore, MatrixConfig, MemoryConfigStore,
};
#[cfg(feature = "fs")]
pub use config::DirConfigStore;
pub use phase::PhaseCode;
pub use gate::GateMode;
pub use rules::{InterpretationOutcome, RuleContext};
pub use report::AuditFindings;

// ============================================================================
// Top-level handle
// ============================================================================

/// The primary entry point. Holds a validated configuration snapshot and
/// runs the pipeline against it.
#[derive(Debug, Clone)]
pub struct FamilyMatrix {
    config: Arc<MatrixConfig>,
}

impl FamilyMatrix {
    pub fn with_config(config: impl Into<Arc<MatrixConfig>>) -> Self {
        Self { config: config.into() }
    }

    /// Load and validate configuration from a store.
    pub async fn from_store<S: ConfigStore + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self::with_config(MatrixConfig::load(store).await?))
    }

    /// Use the current snapshot of a shared cache.
    pub fn from_cache(cache: &ConfigCache) -> Self {
        Self { config: cache.snapshot() }
    }

    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }

    /// Compute the report, stamping the gate log with the current time.
    pub fn compute(
        &self,
        members: &[MemberInput],
        ctx: &UserContext,
        family_id: Option<&str>,
    ) -> Result<Report> {
        self.compute_at(members, ctx, family_id, Utc::now())
    }

    /// Compute the report with an explicit gate timestamp.
    ///
    /// Identical inputs and `now` give an identical report.
    pub fn compute_at(
        &self,
        members: &[MemberInput],
        ctx: &UserContext,
        family_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Report> {
        let (report, _) = self.compute_audited_at(members, ctx, family_id, now)?;
        Ok(report)
    }

    /// Compute the report and return the forbidden-vocabulary audit with it.
    pub fn compute_with_audit(
        &self,
        members: &[MemberInput],
        ctx: &UserContext,
        family_id: Option<&str>,
    ) -> Result<(Report, AuditFindings)> {
        self.compute_audited_at(members, ctx, family_id, Utc::now())
    }

    /// [`compute_with_audit`](Self::compute_with_audit) with an explicit gate timestamp.
    pub fn compute_audited_at(
        &self,
        members: &[MemberInput],
        ctx: &UserContext,
        family_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(Report, AuditFindings)> {
        // Phase 1: Extract
        let members = extract::prepare_members(members)?;

        // Phase 2: Aggregate
        let aggregate = matrix::aggregate(&members)?;

        // Phase 3: Classify
        let time = phase::evolve(&aggregate.family_axes, &self.config.phase_states);

        // Phase 4: Gate
        let gate = gate::evaluate(&time, ctx, &self.config.gate_modes, now);

        // Phase 5: Interpret
        let rule_ctx = RuleContext::new(&aggregate.family_axes, &time);
        let interpretation = rules::interpret(self.config.interpretation.as_ref(), &rule_ctx);

        // Phase 6: Assemble + audit
        let report = report::assemble(family_id, &members, aggregate, time, gate, interpretation);
        let findings = report::audit_report(&report)?;

        Ok((report, findings))
    }
}

/// One-shot form of [`FamilyMatrix::compute`].
pub fn compute_family_matrix(
    config: &MatrixConfig,
    members: &[MemberInput],
    ctx: &UserContext,
    family_id: Option<&str>,
) -> Result<Report> {
    FamilyMatrix::with_config(config.clone()).compute(members, ctx, family_id)
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Input error: {0}")]
    InputError(String),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Invalid configuration '{document}': {message}")]
    InvalidConfiguration { document: String, message: String },

    #[error("Rule syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Rule evaluation error: {0}")]
    EvaluationError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Deployment-side failure: a document is missing or malformed.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::ConfigurationMissing(_) | Error::InvalidConfiguration { .. })
    }

    /// Caller-side failure: unusable member data.
    pub fn is_input(&self) -> bool {
        matches!(self, Error::InputError(_))
    }

    /// A single rule failed to parse or evaluate.
    pub fn is_rule(&self) -> bool {
        matches!(self, Error::SyntaxError { .. } | Error::EvaluationError(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
