//! Planet extraction — chart object → [`AxisInput`].
//!
//! Upstream chart formats vary, so resolution is permissive. Per body:
//!
//! 1. a top-level field named exactly after the body (`"Sun"`)
//! 2. `planets.<Name>`
//! 3. `planets.<name>` (lower-cased)
//! 4. `Ascendant` only: the chart's `ascendant` field, or 0
//!
//! An object entry contributes its `longitude`; a bare number is used
//! as-is. Anything else leaves the body unresolved.

use serde_json::Value as JsonValue;

use crate::model::{AxisInput, BodyName, Member, MemberInput};
use crate::{Error, Result};

/// Role assigned when the caller does not name one.
pub const DEFAULT_ROLE: &str = "member";

/// Resolve the ten bodies of one chart.
pub fn extract_planets(chart: &JsonValue) -> AxisInput {
    let nested = present(chart.get("planets"));
    let mut input = AxisInput::new();

    for body in BodyName::ALL {
        let name = body.as_str();
        let entry = present(chart.get(name))
            .or_else(|| nested.and_then(|p| present(p.get(name))))
            .or_else(|| nested.and_then(|p| present(p.get(name.to_lowercase().as_str()))));

        let degree = match entry {
            Some(entry) => longitude_of(entry),
            None if body == BodyName::Ascendant => Some(
                present(chart.get("ascendant"))
                    .and_then(longitude_of)
                    .unwrap_or(0.0),
            ),
            None => None,
        };

        if let Some(degree) = degree {
            input.set(body, degree);
        }
    }

    input
}

/// Treat JSON `null` the same as a missing key.
fn present(v: Option<&JsonValue>) -> Option<&JsonValue> {
    v.filter(|v| !v.is_null())
}

fn longitude_of(entry: &JsonValue) -> Option<f64> {
    match entry {
        JsonValue::Object(map) => map.get("longitude").and_then(JsonValue::as_f64),
        JsonValue::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Normalize one caller-supplied member. `index` is 0-based.
///
/// The id falls back to the name, then to `member_<n>`; the role falls back
/// to [`DEFAULT_ROLE`]. A chart that is not a non-empty object is rejected.
pub fn member_from_input(index: usize, input: &MemberInput) -> Result<Member> {
    let id = input
        .id
        .clone()
        .or_else(|| input.name.clone())
        .unwrap_or_else(|| format!("member_{}", index + 1));

    match &input.chart_object {
        JsonValue::Object(map) if !map.is_empty() => {}
        _ => {
            return Err(Error::InputError(format!(
                "member '{id}' lacks usable chart data"
            )));
        }
    }

    Ok(Member {
        role: input.role.clone().unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        planets: extract_planets(&input.chart_object),
        id,
    })
}

/// Validate and normalize the full member list. Requires at least two members.
pub fn prepare_members(inputs: &[MemberInput]) -> Result<Vec<Member>> {
    if inputs.len() < 2 {
        return Err(Error::InputError(format!(
            "at least 2 members are required, got {}",
            inputs.len()
        )));
    }
    inputs
        .iter()
        .enumerate()
        .map(|(i, m)| member_from_input(i, m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_top_level_field_wins() {
        let chart = json!({
            "Sun": {"longitude": 10.0},
            "planets": {"Sun": {"longitude": 99.0}}
        });
        assert_eq!(extract_planets(&chart).get(BodyName::Sun), Some(10.0));
    }

    #[test]
    fn test_nested_exact_then_lowercase() {
        let chart = json!({
            "planets": {"Moon": 45.5, "saturn": {"longitude": 200.0}}
        });
        let input = extract_planets(&chart);
        assert_eq!(input.get(BodyName::Moon), Some(45.5));
        assert_eq!(input.get(BodyName::Saturn), Some(200.0));
    }

    #[test]
    fn test_unresolved_bodies_are_omitted() {
        let input = extract_planets(&json!({"Sun": 1}));
        assert_eq!(input.get(BodyName::Mars), None);
        assert_eq!(input.get(BodyName::Rahu), None);
        assert_eq!(input.len(), 2); // Sun + synthetic Ascendant
    }

    #[test]
    fn test_ascendant_synthesized() {
        assert_eq!(extract_planets(&json!({"ascendant": 123.4})).get(BodyName::Ascendant), Some(123.4));
        assert_eq!(extract_planets(&json!({"Sun": 5})).get(BodyName::Ascendant), Some(0.0));
    }

    #[test]
    fn test_object_without_longitude_is_unresolved() {
        let input = extract_planets(&json!({"Venus": {"sign": "Leo"}}));
        assert_eq!(input.get(BodyName::Venus), None);
    }

    #[test]
    fn test_null_falls_through() {
        let chart = json!({"Jupiter": null, "planets": {"jupiter": 77}});
        assert_eq!(extract_planets(&chart).get(BodyName::Jupiter), Some(77.0));
    }

    #[test]
    fn test_member_defaults() {
        let m = member_from_input(2, &MemberInput::new(json!({"Sun": 1}))).unwrap();
        assert_eq!(m.id, "member_3");
        assert_eq!(m.role, DEFAULT_ROLE);

        let named = MemberInput::new(json!({"Sun": 1})).with_name("Ada");
        assert_eq!(member_from_input(0, &named).unwrap().id, "Ada");
    }

    #[test]
    fn test_member_without_chart_rejected() {
        let err = member_from_input(0, &MemberInput::default().with_id("x")).unwrap_err();
        assert!(matches!(err, Error::InputError(_)));
        assert!(member_from_input(0, &MemberInput::new(json!({}))).is_err());
        assert!(member_from_input(0, &MemberInput::new(json!([1, 2]))).is_err());
    }

    #[test]
    fn test_prepare_requires_two_members() {
        let one = vec![MemberInput::new(json!({"Sun": 1}))];
        assert!(matches!(prepare_members(&one), Err(Error::InputError(_))));
        assert!(matches!(prepare_members(&[]), Err(Error::InputError(_))));
    }
}
