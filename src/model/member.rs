//! Family members and the caller's consent context.

use serde::{Deserialize, Serialize};

use super::AxisInput;

/// A member as supplied by the caller, before chart extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "chart")]
    pub chart_object: serde_json::Value,
}

impl MemberInput {
    pub fn new(chart_object: serde_json::Value) -> Self {
        Self { chart_object, ..Self::default() }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// A member reduced to its resolved longitudes. Immutable for one computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: String,
    pub role: String,
    pub planets: AxisInput,
}

/// Consent and risk flags supplied by the requesting user.
///
/// Both flags count only when explicitly `true`; absent and `null` are
/// treated the same as `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(default)]
    pub user_consent_explicit: Option<bool>,
    #[serde(default)]
    pub risk_acknowledgement_confirmed: Option<bool>,
}

impl UserContext {
    pub fn new(consent: bool, risk_ack: bool) -> Self {
        Self {
            user_consent_explicit: Some(consent),
            risk_acknowledgement_confirmed: Some(risk_ack),
        }
    }

    pub fn consent_present(&self) -> bool {
        self.user_consent_explicit == Some(true)
    }

    pub fn risk_acknowledged(&self) -> bool {
        self.risk_acknowledgement_confirmed == Some(true)
    }
}
