//! # Interpretation Rules
//!
//! Rule conditions are compiled by a small lexer + recursive descent parser
//! into an [`Expr`](ast::Expr) and evaluated against a fixed variable set.
//! There is no way to call functions, touch state or reach outside the
//! [`RuleContext`], whatever the configuration contains.
//!
//! Rules come in two tiers, evaluated family first, then temporal. Each
//! match appends its template text in declaration order; duplicates stay.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod eval;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use ast::Expr;
pub use eval::{RuleContext, RuleValue, KNOWN_VARIABLES, evaluate, matches};

/// Compile a condition string.
pub fn compile(condition: &str) -> Result<Expr> {
    let tokens = lexer::tokenize(condition)?;
    parser::parse_condition(&tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTier {
    Family,
    Temporal,
}

/// A compiled condition, or the syntax error that stopped it compiling.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compiled(Expr),
    Malformed { position: usize, message: String },
}

impl Condition {
    fn compile(source: &str) -> Result<Self> {
        match compile(source) {
            Ok(expr) => Ok(Condition::Compiled(expr)),
            Err(Error::SyntaxError { position, message }) => Ok(Condition::Malformed { position, message }),
            Err(e) => Err(e),
        }
    }
}

/// One configured rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: String,
    pub tier: RuleTier,
    pub source: String,
    pub condition: Condition,
    pub template_id: String,
}

impl Rule {
    /// Compile `source`. A bad condition is kept as non-matching, not rejected.
    pub fn new(
        id: impl Into<String>,
        tier: RuleTier,
        source: impl Into<String>,
        template_id: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let source = source.into();
        let condition = Condition::compile(&source).unwrap_or_else(|e| Condition::Malformed {
            position: 0,
            message: e.to_string(),
        });
        if let Condition::Malformed { position, message } = &condition {
            tracing::warn!(rule = %id, ?tier, position, error = %message, "malformed rule condition; rule will never match");
        }
        Self { id, tier, source, condition, template_id: template_id.into() }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self.condition, Condition::Malformed { .. })
    }

    /// Evaluate against `ctx`. Errors are the caller's to log and skip.
    pub fn check(&self, ctx: &RuleContext) -> Result<bool> {
        match &self.condition {
            Condition::Compiled(expr) => eval::matches(expr, ctx),
            Condition::Malformed { position, message } => Err(Error::SyntaxError {
                position: *position,
                message: message.clone(),
            }),
        }
    }
}

/// Both rule tiers, each in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub family: Vec<Rule>,
    pub temporal: Vec<Rule>,
}

impl RuleSet {
    pub fn len(&self) -> usize {
        self.family.len() + self.temporal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Family tier first, then temporal.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.family.iter().chain(self.temporal.iter())
    }
}

/// Narrative templates keyed by id.
pub type TemplateSet = hashbrown::HashMap<String, String>;

/// Rules and templates together; interpretation runs only when both exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interpretation {
    pub rules: RuleSet,
    pub templates: TemplateSet,
}

/// What the rule engine did for one call.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpretationOutcome {
    /// Rule or template document absent: the engine did not run.
    Disabled,
    /// The engine ran. `templates` may be empty.
    Evaluated {
        templates: Vec<String>,
        evaluated: usize,
        failed: usize,
    },
}

impl InterpretationOutcome {
    /// Report form: `None` when disabled or when nothing matched.
    pub fn into_templates(self) -> Option<Vec<String>> {
        match self {
            InterpretationOutcome::Evaluated { templates, .. } if !templates.is_empty() => Some(templates),
            _ => None,
        }
    }

    pub fn evaluated(&self) -> usize {
        match self {
            InterpretationOutcome::Evaluated { evaluated, .. } => *evaluated,
            InterpretationOutcome::Disabled => 0,
        }
    }

    pub fn failed(&self) -> usize {
        match self {
            InterpretationOutcome::Evaluated { failed, .. } => *failed,
            InterpretationOutcome::Disabled => 0,
        }
    }
}

/// Run every rule and collect matching template text.
pub fn interpret(config: Option<&Interpretation>, ctx: &RuleContext) -> InterpretationOutcome {
    let Some(config) = config else {
        tracing::debug!("interpretation documents absent; rule engine disabled");
        return InterpretationOutcome::Disabled;
    };

    let mut templates = Vec::new();
    let mut failed = 0;

    for rule in config.rules.iter() {
        match rule.check(ctx) {
            Ok(true) => match config.templates.get(&rule.template_id) {
                Some(text) => templates.push(text.clone()),
                None => tracing::warn!(
                    rule = %rule.id,
                    template_id = %rule.template_id,
                    "matched rule references an unknown template"
                ),
            },
            Ok(false) => {}
            Err(e) => {
                failed += 1;
                tracing::warn!(
                    rule = %rule.id,
                    tier = ?rule.tier,
                    condition = %rule.source,
                    error = %e,
                    "rule evaluation failed; treating as non-matching"
                );
            }
        }
    }

    tracing::debug!(matched = templates.len(), failed, "interpretation rules evaluated");

    InterpretationOutcome::Evaluated {
        templates,
        evaluated: config.rules.len(),
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AxisSet;

    fn ctx(care: u8, phase: &str) -> RuleContext {
        RuleContext {
            axes: AxisSet { care_flow: care, ..AxisSet::default() },
            current_phase: phase.into(),
            cohesion_delta: 0.0,
            friction_delta: 0.0,
        }
    }

    fn interpretation() -> Interpretation {
        let mut templates = TemplateSet::new();
        templates.insert("warm".into(), "Care flows freely.".into());
        templates.insert("calm".into(), "The phase is steady.".into());
        Interpretation {
            rules: RuleSet {
                family: vec![
                    Rule::new("f1", RuleTier::Family, "care_flow >= 60 AND current_phase == 'cohesive'", "warm"),
                    Rule::new("f2", RuleTier::Family, "care_flow >= 60 AND", "warm"),
                    Rule::new("f3", RuleTier::Family, "care_flow > 0", "warm"),
                ],
                temporal: vec![
                    Rule::new("t1", RuleTier::Temporal, "current_phase != 'fracture_risk'", "calm"),
                    Rule::new("t2", RuleTier::Temporal, "bogus > 1", "calm"),
                ],
            },
            templates,
        }
    }

    #[test]
    fn test_disabled_without_documents() {
        assert_eq!(interpret(None, &ctx(70, "cohesive")), InterpretationOutcome::Disabled);
        assert_eq!(interpret(None, &ctx(70, "cohesive")).into_templates(), None);
    }

    #[test]
    fn test_matches_in_tier_order_with_duplicates() {
        let outcome = interpret(Some(&interpretation()), &ctx(70, "cohesive"));
        assert_eq!(outcome.failed(), 2);
        assert_eq!(outcome.evaluated(), 5);
        assert_eq!(
            outcome.into_templates().unwrap(),
            vec!["Care flows freely.", "Care flows freely.", "The phase is steady."]
        );
    }

    #[test]
    fn test_condition_needs_both_clauses() {
        let rule = Rule::new("r", RuleTier::Family, "care_flow >= 60 AND current_phase == 'cohesive'", "x");
        assert!(rule.check(&ctx(60, "cohesive")).unwrap());
        assert!(!rule.check(&ctx(59, "cohesive")).unwrap());
        assert!(!rule.check(&ctx(80, "strained")).unwrap());
    }

    #[test]
    fn test_malformed_rule_is_kept_but_never_matches() {
        let rule = Rule::new("bad", RuleTier::Family, "care_flow >>= 1", "x");
        assert!(rule.is_malformed());
        match rule.check(&ctx(99, "cohesive")) {
            Err(Error::SyntaxError { position, .. }) => assert_eq!(position, 11),
            other => panic!("Expected SyntaxError, got {other:?}"),
        }
    }

    #[test]
    fn test_evaluation_failure_stays_an_evaluation_error() {
        let rule = Rule::new("cmp", RuleTier::Family, "current_phase < 3", "x");
        assert!(!rule.is_malformed());
        assert!(matches!(rule.check(&ctx(10, "cohesive")), Err(Error::EvaluationError(_))));
    }

    #[test]
    fn test_oversized_conditions_fail_without_crashing() {
        let deep = format!("{}care_flow > 1{}", "(".repeat(2000), ")".repeat(2000));
        let long = format!("care_flow{} > 1", " + 1".repeat(200_000));
        let config = Interpretation {
            rules: RuleSet {
                family: vec![
                    Rule::new("deep", RuleTier::Family, deep, "warm"),
                    Rule::new("long", RuleTier::Family, long, "warm"),
                    Rule::new("nots", RuleTier::Family, "NOT ".repeat(5000) + "care_flow > 1", "warm"),
                ],
                temporal: vec![Rule::new("ok", RuleTier::Temporal, "care_flow > 1", "calm")],
            },
            templates: interpretation().templates,
        };
        assert!(config.rules.family.iter().all(Rule::is_malformed));

        let outcome = interpret(Some(&config), &ctx(70, "cohesive"));
        assert_eq!(outcome.failed(), 3);
        assert_eq!(outcome.into_templates().unwrap(), vec!["The phase is steady."]);
    }

    #[test]
    fn test_ran_but_nothing_matched() {
        let outcome = interpret(Some(&interpretation()), &ctx(0, "fracture_risk"));
        assert!(matches!(&outcome, InterpretationOutcome::Evaluated { templates, .. } if templates.is_empty()));
        assert_eq!(outcome.into_templates(), None);
    }

    #[test]
    fn test_unknown_template_is_skipped() {
        let mut config = interpretation();
        config.rules.temporal[0].template_id = "missing".into();
        let outcome = interpret(Some(&config), &ctx(70, "cohesive"));
        assert_eq!(outcome.into_templates().unwrap().len(), 2);
    }
}
