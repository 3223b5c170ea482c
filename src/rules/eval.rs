//! Condition evaluation over a fixed variable whitelist.

use std::fmt;

use crate::model::{AxisSet, TimeEvolution};
use crate::{Error, Result};
use super::ast::*;

/// Names a condition may reference. Anything else fails evaluation.
pub const KNOWN_VARIABLES: [&str; 8] = [
    "decision_influence",
    "authority_flow",
    "care_flow",
    "resource_flow",
    "emotional_dependency",
    "current_phase",
    "cohesion_delta",
    "friction_delta",
];

/// Runtime value of a condition sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    Number(f64),
    String(String),
    Bool(bool),
}

impl RuleValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RuleValue::Number(_) => "NUMBER",
            RuleValue::String(_) => "STRING",
            RuleValue::Bool(_) => "BOOLEAN",
        }
    }

    /// Bool as-is, number non-zero and not NaN, string non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            RuleValue::Bool(b) => *b,
            RuleValue::Number(n) => *n != 0.0 && !n.is_nan(),
            RuleValue::String(s) => !s.is_empty(),
        }
    }

    fn as_number(&self, op: BinaryOp) -> Result<f64> {
        match self {
            RuleValue::Number(n) => Ok(*n),
            other => Err(Error::EvaluationError(format!(
                "operator {op} expects NUMBER, got {}",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Number(n) => write!(f, "{n}"),
            RuleValue::String(s) => write!(f, "'{s}'"),
            RuleValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Variable bindings for one evaluation: the family axes plus the phase
/// code and deltas.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleContext {
    pub axes: AxisSet,
    pub current_phase: String,
    pub cohesion_delta: f64,
    pub friction_delta: f64,
}

impl RuleContext {
    pub fn new(axes: &AxisSet, time: &TimeEvolution) -> Self {
        Self {
            axes: *axes,
            current_phase: time.current_phase.phase_code.as_str().to_string(),
            cohesion_delta: time.deltas.cohesion_delta,
            friction_delta: time.deltas.friction_delta,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<RuleValue> {
        match name {
            "current_phase" => Some(RuleValue::String(self.current_phase.clone())),
            "cohesion_delta" => Some(RuleValue::Number(self.cohesion_delta)),
            "friction_delta" => Some(RuleValue::Number(self.friction_delta)),
            axis => self.axes.get(axis).map(|v| RuleValue::Number(f64::from(v))),
        }
    }
}

/// Evaluate an expression to a value.
pub fn evaluate(expr: &Expr, ctx: &RuleContext) -> Result<RuleValue> {
    match expr {
        Expr::Literal(Literal::Number(n)) => Ok(RuleValue::Number(*n)),
        Expr::Literal(Literal::String(s)) => Ok(RuleValue::String(s.clone())),
        Expr::Literal(Literal::Bool(b)) => Ok(RuleValue::Bool(*b)),
        Expr::Variable(name) => ctx
            .lookup(name)
            .ok_or_else(|| Error::EvaluationError(format!("unknown variable '{name}'"))),
        Expr::UnaryOp { op: UnaryOp::Not, expr } => {
            Ok(RuleValue::Bool(!evaluate(expr, ctx)?.is_truthy()))
        }
        Expr::UnaryOp { op: UnaryOp::Negate, expr } => match evaluate(expr, ctx)? {
            RuleValue::Number(n) => Ok(RuleValue::Number(-n)),
            other => Err(Error::EvaluationError(format!(
                "cannot negate {}",
                other.type_name()
            ))),
        },
        // AND/OR short-circuit, so the right side is only checked when reached.
        Expr::BinaryOp { left, op: BinaryOp::And, right } => {
            if !evaluate(left, ctx)?.is_truthy() {
                return Ok(RuleValue::Bool(false));
            }
            Ok(RuleValue::Bool(evaluate(right, ctx)?.is_truthy()))
        }
        Expr::BinaryOp { left, op: BinaryOp::Or, right } => {
            if evaluate(left, ctx)?.is_truthy() {
                return Ok(RuleValue::Bool(true));
            }
            Ok(RuleValue::Bool(evaluate(right, ctx)?.is_truthy()))
        }
        Expr::BinaryOp { left, op, right } => {
            let l = evaluate(left, ctx)?;
            let r = evaluate(right, ctx)?;
            binary(*op, &l, &r)
        }
    }
}

fn binary(op: BinaryOp, l: &RuleValue, r: &RuleValue) -> Result<RuleValue> {
    use std::cmp::Ordering;

    let ordering = |l: &RuleValue, r: &RuleValue| -> Result<Option<Ordering>> {
        match (l, r) {
            (RuleValue::Number(a), RuleValue::Number(b)) => Ok(a.partial_cmp(b)),
            (RuleValue::String(a), RuleValue::String(b)) => Ok(Some(a.cmp(b))),
            _ => Err(Error::EvaluationError(format!(
                "cannot compare {} with {} using {op}",
                l.type_name(),
                r.type_name()
            ))),
        }
    };

    let value = match op {
        BinaryOp::And => RuleValue::Bool(l.is_truthy() && r.is_truthy()),
        BinaryOp::Or => RuleValue::Bool(l.is_truthy() || r.is_truthy()),
        // Strict: values of different types are never equal.
        BinaryOp::Eq => RuleValue::Bool(l == r),
        BinaryOp::Neq => RuleValue::Bool(l != r),
        BinaryOp::Lt => RuleValue::Bool(ordering(l, r)? == Some(Ordering::Less)),
        BinaryOp::Lte => RuleValue::Bool(matches!(ordering(l, r)?, Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Gt => RuleValue::Bool(ordering(l, r)? == Some(Ordering::Greater)),
        BinaryOp::Gte => RuleValue::Bool(matches!(ordering(l, r)?, Some(Ordering::Greater | Ordering::Equal))),
        BinaryOp::Add => RuleValue::Number(l.as_number(op)? + r.as_number(op)?),
        BinaryOp::Sub => RuleValue::Number(l.as_number(op)? - r.as_number(op)?),
        BinaryOp::Mul => RuleValue::Number(l.as_number(op)? * r.as_number(op)?),
        BinaryOp::Div => RuleValue::Number(l.as_number(op)? / r.as_number(op)?),
        BinaryOp::Mod => RuleValue::Number(l.as_number(op)? % r.as_number(op)?),
    };
    Ok(value)
}

/// Evaluate a condition and coerce the result to a match decision.
pub fn matches(expr: &Expr, ctx: &RuleContext) -> Result<bool> {
    Ok(evaluate(expr, ctx)?.is_truthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::compile;

    fn ctx() -> RuleContext {
        RuleContext {
            axes: AxisSet {
                authority_flow: 20,
                care_flow: 70,
                emotional_dependency: 45,
                decision_influence: 33,
                resource_flow: 81,
            },
            current_phase: "cohesive".into(),
            cohesion_delta: 10.0,
            friction_delta: -15.0,
        }
    }

    fn eval(cond: &str) -> Result<bool> {
        matches(&compile(cond)?, &ctx())
    }

    #[test]
    fn test_every_known_variable_resolves() {
        let c = ctx();
        for name in KNOWN_VARIABLES {
            assert!(c.lookup(name).is_some(), "{name} should resolve");
        }
        assert_eq!(c.lookup("care_flow"), Some(RuleValue::Number(70.0)));
        assert_eq!(c.lookup("current_phase"), Some(RuleValue::String("cohesive".into())));
    }

    #[test]
    fn test_comparisons() {
        assert!(eval("care_flow >= 70").unwrap());
        assert!(!eval("care_flow > 70").unwrap());
        assert!(eval("friction_delta < -10").unwrap());
        assert!(eval("authority_flow <= 20 AND resource_flow != 80").unwrap());
        assert!(eval("current_phase == 'cohesive'").unwrap());
        assert!(eval("current_phase === \"cohesive\"").unwrap());
        assert!(!eval("current_phase == 'strained'").unwrap());
    }

    #[test]
    fn test_arithmetic() {
        assert!(eval("care_flow - authority_flow == 50").unwrap());
        assert!(eval("(decision_influence + resource_flow) / 2 > 56").unwrap());
        assert!(eval("emotional_dependency % 10 == 5").unwrap());
        assert!(eval("-cohesion_delta == -10").unwrap());
    }

    #[test]
    fn test_logic_and_truthiness() {
        assert!(eval("care_flow < 10 OR cohesion_delta > 0").unwrap());
        assert!(eval("NOT current_phase == 'strained'").unwrap());
        assert!(eval("care_flow").unwrap());
        assert!(!eval("care_flow - 70").unwrap());
        assert!(eval("true && !false").unwrap());
    }

    #[test]
    fn test_mixed_type_equality_is_false() {
        assert!(!eval("care_flow == '70'").unwrap());
        assert!(eval("care_flow != '70'").unwrap());
    }

    #[test]
    fn test_evaluation_errors() {
        assert!(matches!(eval("unknown_axis > 5"), Err(Error::EvaluationError(_))));
        assert!(matches!(eval("current_phase > 5"), Err(Error::EvaluationError(_))));
        assert!(matches!(eval("current_phase + 1 == 2"), Err(Error::EvaluationError(_))));
        assert!(matches!(eval("-current_phase == 1"), Err(Error::EvaluationError(_))));
    }

    #[test]
    fn test_short_circuit_skips_unknown_variable() {
        assert!(!eval("care_flow < 0 AND mystery > 1").unwrap());
        assert!(eval("care_flow > 0 OR mystery > 1").unwrap());
    }
}
