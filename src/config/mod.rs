//! # Configuration
//!
//! Four documents drive the pipeline:
//!
//! | Key | Required | Shape |
//! |-----|----------|-------|
//! | `phase-states` | yes | `{"states": {"<code>": {"label": "..."}}}` |
//! | `intervention-gate-modes` | yes | `{"modes": {"<mode>": {"allow_overlays": [..], "forbid_overlays": [..]}}}` |
//! | `interpretation-rules` | no | `{"family_rules": [Rule], "temporal_rules": [Rule]}` |
//! | `interpretation-templates` | no | `{"templates": {"<id>": "..."}}` |
//!
//! Documents are decoded and validated once, up front, into an immutable
//! [`MatrixConfig`]. A missing required document or a schema violation
//! fails the load; the pipeline itself never sees partial configuration.

pub mod store;

use hashbrown::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::gate::GateMode;
use crate::phase::PhaseCode;
use crate::rules::{Interpretation, Rule, RuleSet, RuleTier, TemplateSet};
use crate::{Error, Result};

pub use store::{ConfigCache, ConfigStore, MemoryConfigStore};
#[cfg(feature = "fs")]
pub use store::DirConfigStore;

pub const PHASE_STATES: &str = "phase-states";
pub const INTERPRETATION_RULES: &str = "interpretation-rules";
pub const INTERPRETATION_TEMPLATES: &str = "interpretation-templates";
pub const INTERVENTION_GATE_MODES: &str = "intervention-gate-modes";

/// Every document key, in load order.
pub const DOCUMENT_KEYS: [&str; 4] = [
    PHASE_STATES,
    INTERPRETATION_RULES,
    INTERPRETATION_TEMPLATES,
    INTERVENTION_GATE_MODES,
];

// ============================================================================
// Phase states
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseState {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Display labels for every phase code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseStates {
    states: HashMap<PhaseCode, PhaseState>,
}

impl PhaseStates {
    pub fn label(&self, code: PhaseCode) -> &str {
        self.states
            .get(&code)
            .map(|s| s.label.as_str())
            .unwrap_or_else(|| code.as_str())
    }

    pub fn get(&self, code: PhaseCode) -> Option<&PhaseState> {
        self.states.get(&code)
    }

    pub fn with_label(mut self, code: PhaseCode, label: impl Into<String>) -> Self {
        self.states.insert(code, PhaseState { label: label.into(), description: None });
        self
    }

    fn from_document(doc: JsonValue) -> Result<Self> {
        #[derive(Deserialize)]
        struct Doc {
            states: HashMap<String, PhaseState>,
        }

        let doc: Doc = decode(PHASE_STATES, doc)?;
        let mut states = HashMap::new();
        for (code, state) in doc.states {
            match PhaseCode::ALL.iter().find(|c| c.as_str() == code) {
                Some(&known) => {
                    states.insert(known, state);
                }
                None => tracing::warn!(code = %code, "ignoring unknown phase state"),
            }
        }

        for code in PhaseCode::ALL {
            match states.get(&code) {
                None => return Err(invalid(PHASE_STATES, format!("phase '{code}' is not defined"))),
                Some(s) if s.label.trim().is_empty() => {
                    return Err(invalid(PHASE_STATES, format!("phase '{code}' has an empty label")));
                }
                Some(_) => {}
            }
        }

        Ok(Self { states })
    }
}

impl Default for PhaseStates {
    fn default() -> Self {
        let labels = [
            (PhaseCode::Cohesive, "Cohesive"),
            (PhaseCode::FractureRisk, "Fracture Risk"),
            (PhaseCode::Strained, "Strained"),
        ];
        Self {
            states: labels
                .into_iter()
                .map(|(code, label)| (code, PhaseState { label: label.into(), description: None }))
                .collect(),
        }
    }
}

// ============================================================================
// Gate modes
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeOverlays {
    #[serde(default)]
    pub allow_overlays: Vec<String>,
    #[serde(default)]
    pub forbid_overlays: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

static NO_OVERLAYS: ModeOverlays = ModeOverlays {
    allow_overlays: Vec::new(),
    forbid_overlays: Vec::new(),
    description: None,
};

/// Overlay lists per gate mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateModes {
    modes: HashMap<GateMode, ModeOverlays>,
}

impl GateModes {
    pub fn overlays(&self, mode: GateMode) -> &ModeOverlays {
        self.modes.get(&mode).unwrap_or(&NO_OVERLAYS)
    }

    pub fn with_mode(mut self, mode: GateMode, overlays: ModeOverlays) -> Self {
        self.modes.insert(mode, overlays);
        self
    }

    fn from_document(doc: JsonValue) -> Result<Self> {
        #[derive(Deserialize)]
        struct Doc {
            modes: HashMap<String, ModeOverlays>,
        }

        let doc: Doc = decode(INTERVENTION_GATE_MODES, doc)?;
        let mut modes = HashMap::new();
        for (name, overlays) in doc.modes {
            match GateMode::ALL.iter().find(|m| m.as_str() == name) {
                Some(&known) => {
                    modes.insert(known, overlays);
                }
                None => tracing::warn!(mode = %name, "ignoring unknown gate mode"),
            }
        }

        if let Some(missing) = GateMode::ALL.iter().find(|m| !modes.contains_key(*m)) {
            return Err(invalid(INTERVENTION_GATE_MODES, format!("mode '{missing}' is not defined")));
        }

        Ok(Self { modes })
    }
}

impl Default for GateModes {
    fn default() -> Self {
        Self {
            modes: GateMode::ALL.into_iter().map(|m| (m, ModeOverlays::default())).collect(),
        }
    }
}

// ============================================================================
// Interpretation documents
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct RuleDef {
    #[serde(default)]
    id: Option<String>,
    condition: String,
    template_id: String,
}

fn rule_set_from_document(doc: JsonValue) -> Result<RuleSet> {
    #[derive(Deserialize)]
    struct Doc {
        #[serde(default)]
        family_rules: Vec<RuleDef>,
        #[serde(default)]
        temporal_rules: Vec<RuleDef>,
    }

    let doc: Doc = decode(INTERPRETATION_RULES, doc)?;
    let build = |defs: Vec<RuleDef>, tier: RuleTier, prefix: &str| -> Vec<Rule> {
        defs.into_iter()
            .enumerate()
            .map(|(i, d)| {
                let id = d.id.unwrap_or_else(|| format!("{prefix}_{}", i + 1));
                Rule::new(id, tier, d.condition, d.template_id)
            })
            .collect()
    };

    Ok(RuleSet {
        family: build(doc.family_rules, RuleTier::Family, "family"),
        temporal: build(doc.temporal_rules, RuleTier::Temporal, "temporal"),
    })
}

fn templates_from_document(doc: JsonValue) -> Result<TemplateSet> {
    #[derive(Deserialize)]
    struct Doc {
        templates: TemplateSet,
    }

    Ok(decode::<Doc>(INTERPRETATION_TEMPLATES, doc)?.templates)
}

// ============================================================================
// Snapshot
// ============================================================================

/// Raw documents as fetched from a store, keyed by logical name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocuments {
    pub phase_states: Option<JsonValue>,
    pub interpretation_rules: Option<JsonValue>,
    pub interpretation_templates: Option<JsonValue>,
    pub intervention_gate_modes: Option<JsonValue>,
}

impl ConfigDocuments {
    /// Slot for a logical key, or `None` for an unknown key.
    pub fn slot_mut(&mut self, key: &str) -> Option<&mut Option<JsonValue>> {
        match key {
            PHASE_STATES => Some(&mut self.phase_states),
            INTERPRETATION_RULES => Some(&mut self.interpretation_rules),
            INTERPRETATION_TEMPLATES => Some(&mut self.interpretation_templates),
            INTERVENTION_GATE_MODES => Some(&mut self.intervention_gate_modes),
            _ => None,
        }
    }
}

/// Validated, immutable configuration for the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixConfig {
    pub phase_states: PhaseStates,
    pub gate_modes: GateModes,
    /// `None` disables the rule engine.
    pub interpretation: Option<Interpretation>,
}

impl MatrixConfig {
    pub fn from_documents(docs: ConfigDocuments) -> Result<Self> {
        let phase_states = docs
            .phase_states
            .ok_or_else(|| Error::ConfigurationMissing(PHASE_STATES.into()))
            .and_then(PhaseStates::from_document)?;

        let gate_modes = docs
            .intervention_gate_modes
            .ok_or_else(|| Error::ConfigurationMissing(INTERVENTION_GATE_MODES.into()))
            .and_then(GateModes::from_document)?;

        let interpretation = match (docs.interpretation_rules, docs.interpretation_templates) {
            (Some(rules), Some(templates)) => Some(Interpretation {
                rules: rule_set_from_document(rules)?,
                templates: templates_from_document(templates)?,
            }),
            (None, None) => None,
            (rules, _) => {
                let missing = if rules.is_none() { INTERPRETATION_RULES } else { INTERPRETATION_TEMPLATES };
                tracing::warn!(missing, "interpretation disabled: companion document absent");
                None
            }
        };

        tracing::debug!(
            interpretation = interpretation.is_some(),
            rules = interpretation.as_ref().map_or(0, |i| i.rules.len()),
            "matrix configuration loaded"
        );

        Ok(Self { phase_states, gate_modes, interpretation })
    }

    /// Fetch all four documents from `store` and validate them.
    pub async fn load<S: ConfigStore + ?Sized>(store: &S) -> Result<Self> {
        let mut docs = ConfigDocuments::default();
        for key in DOCUMENT_KEYS {
            let doc = store.load_document(key).await?;
            if let Some(slot) = docs.slot_mut(key) {
                *slot = doc;
            }
        }
        Self::from_documents(docs)
    }

    pub fn interpretation_enabled(&self) -> bool {
        self.interpretation.is_some()
    }
}

fn decode<T: DeserializeOwned>(document: &str, doc: JsonValue) -> Result<T> {
    serde_json::from_value(doc).map_err(|e| invalid(document, e.to_string()))
}

fn invalid(document: &str, message: String) -> Error {
    Error::InvalidConfiguration { document: document.into(), message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_docs() -> ConfigDocuments {
        ConfigDocuments {
            phase_states: Some(json!({"states": {
                "cohesive": {"label": "Cohesive"},
                "fracture_risk": {"label": "Fracture Risk", "description": "high strain"},
                "strained": {"label": "Strained"}
            }})),
            interpretation_rules: Some(json!({
                "family_rules": [{"id": "warm", "condition": "care_flow >= 60", "template_id": "t_warm"}],
                "temporal_rules": [{"condition": "cohesion_delta > 0", "template_id": "t_up"}]
            })),
            interpretation_templates: Some(json!({"templates": {"t_warm": "Warm.", "t_up": "Rising."}})),
            intervention_gate_modes: Some(json!({"modes": {
                "diagnostic_only": {"forbid_overlays": ["guidance"]},
                "safety_escalation": {"allow_overlays": ["crisis_resources"]},
                "user_requested_support": {"allow_overlays": ["guidance"], "forbid_overlays": []}
            }})),
        }
    }

    #[test]
    fn test_full_load() {
        let config = MatrixConfig::from_documents(full_docs()).unwrap();
        assert_eq!(config.phase_states.label(PhaseCode::FractureRisk), "Fracture Risk");
        assert_eq!(config.gate_modes.overlays(GateMode::DiagnosticOnly).forbid_overlays, vec!["guidance"]);
        assert!(config.gate_modes.overlays(GateMode::DiagnosticOnly).allow_overlays.is_empty());
        let interp = config.interpretation.unwrap();
        assert_eq!(interp.rules.family[0].id, "warm");
        assert_eq!(interp.rules.temporal[0].id, "temporal_1");
        assert_eq!(interp.templates.get("t_up").map(String::as_str), Some("Rising."));
    }

    #[test]
    fn test_missing_required_documents() {
        let mut docs = full_docs();
        docs.phase_states = None;
        assert!(matches!(
            MatrixConfig::from_documents(docs),
            Err(Error::ConfigurationMissing(k)) if k == PHASE_STATES
        ));

        let mut docs = full_docs();
        docs.intervention_gate_modes = None;
        assert!(matches!(
            MatrixConfig::from_documents(docs),
            Err(Error::ConfigurationMissing(k)) if k == INTERVENTION_GATE_MODES
        ));
    }

    #[test]
    fn test_interpretation_optional() {
        let mut docs = full_docs();
        docs.interpretation_templates = None;
        assert!(!MatrixConfig::from_documents(docs).unwrap().interpretation_enabled());

        let mut docs = full_docs();
        docs.interpretation_rules = None;
        docs.interpretation_templates = None;
        assert!(!MatrixConfig::from_documents(docs).unwrap().interpretation_enabled());
    }

    #[test]
    fn test_phase_states_validated() {
        let mut docs = full_docs();
        docs.phase_states = Some(json!({"states": {"cohesive": {"label": "C"}, "strained": {"label": "S"}}}));
        assert!(matches!(MatrixConfig::from_documents(docs), Err(Error::InvalidConfiguration { .. })));

        let mut docs = full_docs();
        docs.phase_states = Some(json!({"states": {
            "cohesive": {"label": "C"}, "fracture_risk": {"label": " "}, "strained": {"label": "S"}
        }}));
        assert!(matches!(MatrixConfig::from_documents(docs), Err(Error::InvalidConfiguration { .. })));

        let mut docs = full_docs();
        docs.phase_states = Some(json!(["cohesive"]));
        assert!(matches!(MatrixConfig::from_documents(docs), Err(Error::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_gate_modes_validated() {
        let mut docs = full_docs();
        docs.intervention_gate_modes = Some(json!({"modes": {"diagnostic_only": {}}}));
        match MatrixConfig::from_documents(docs) {
            Err(Error::InvalidConfiguration { document, .. }) => assert_eq!(document, INTERVENTION_GATE_MODES),
            other => panic!("Expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_rule_does_not_fail_load() {
        let mut docs = full_docs();
        docs.interpretation_rules = Some(json!({
            "family_rules": [{"condition": "care_flow >=", "template_id": "t_warm"}]
        }));
        let config = MatrixConfig::from_documents(docs).unwrap();
        assert!(config.interpretation.unwrap().rules.family[0].is_malformed());
    }

    #[test]
    fn test_unknown_phase_is_ignored() {
        let mut docs = full_docs();
        docs.phase_states = Some(json!({"states": {
            "cohesive": {"label": "C"}, "fracture_risk": {"label": "F"},
            "strained": {"label": "S"}, "estranged": {"label": "E"}
        }}));
        assert!(MatrixConfig::from_documents(docs).is_ok());
    }
}
